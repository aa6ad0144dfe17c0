//! Image elements
//!
//! Sources are tried in order: the inline payload saved by the editor, then
//! `ruta_nueva`, then `nombre_archivo`, each looked up as a file. When nothing
//! loads the element becomes a dashed placeholder box.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use log::debug;

use crate::document::{normalize_opacity, Geometry, ImageElement, ImageSource};
use crate::error::{DiagnosticKind, RendererResult};
use crate::image_registry::EmbeddedImage;
use crate::image_utils::decode_base64_payload;
use crate::options::RenderOptions;
use crate::renderer::RenderContext;
use crate::types::Rect;

use super::draw_placeholder_box;

/// Files a path reference may point to, in lookup order.
/// Absolute paths are used as they are; relative ones are tried against the
/// document directory, each asset directory and the working directory.
pub fn candidate_paths(reference: &str, options: &RenderOptions) -> Vec<PathBuf> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Vec::new();
    }
    let path = Path::new(reference);
    if path.is_absolute() {
        return vec![path.to_path_buf()];
    }
    let mut candidates: Vec<PathBuf> = options.search_dirs().iter().map(|dir| dir.join(path)).collect();
    match std::env::current_dir() {
        Ok(cwd) => candidates.push(cwd.join(path)),
        Err(_) => candidates.push(path.to_path_buf()),
    }
    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}

enum Lookup {
    Found(EmbeddedImage),
    Invalid(String),
    Missing,
}

/// Registry key for in-memory image data, so identical payloads share one XObject
pub(crate) fn content_key(prefix: &str, data: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    format!("{}:{:016x}:{}", prefix, hasher.finish(), data.len())
}

fn lookup(ctx: &mut RenderContext<'_>, source: &ImageSource) -> Lookup {
    let mut invalid: Option<String> = None;

    if let Some(payload) = source.inline_data.as_deref().filter(|p| !p.trim().is_empty()) {
        let embedded = decode_base64_payload(payload).and_then(|(mime, bytes)| {
            let mime = mime.or_else(|| source.format.as_ref().map(|f| format!("image/{}", f.to_lowercase())));
            ctx.embed_image_bytes(&content_key("inline", payload.as_bytes()), &bytes, mime.as_deref())
        });
        match embedded {
            Ok(image) => return Lookup::Found(image),
            Err(e) => {
                debug!("Inline image payload unusable, trying paths: {}", e);
                invalid = Some(e.to_string());
            }
        }
    }

    let references = [source.path.as_deref(), source.file_name.as_deref()];
    for reference in references.into_iter().flatten() {
        for candidate in candidate_paths(reference, ctx.options) {
            if !candidate.is_file() {
                continue;
            }
            return match ctx.embed_image_path(&candidate) {
                Ok(image) => Lookup::Found(image),
                Err(e) => Lookup::Invalid(format!("{}: {}", candidate.display(), e)),
            };
        }
    }

    match invalid {
        Some(reason) => Lookup::Invalid(reason),
        None => Lookup::Missing,
    }
}

/// Draw `image` into `rect`, optionally letterboxed, with fill alpha
pub(crate) fn place_image(ctx: &mut RenderContext<'_>, image: &EmbeddedImage, rect: Rect, keep_aspect: bool, opacity: f64) {
    let target = if keep_aspect {
        rect.fit_aspect(image.width as f64, image.height as f64)
    } else {
        rect
    };
    ctx.canvas.save_state();
    ctx.set_alpha(normalize_opacity(opacity));
    ctx.canvas.draw_image(&image.name, target);
    ctx.canvas.restore_state();
}

pub fn render(ctx: &mut RenderContext<'_>, geometry: &Geometry, element: &ImageElement) -> RendererResult<()> {
    let rect = ctx.element_rect(geometry);
    let inner = rect.inset(element.style.inset);

    match lookup(ctx, &element.source) {
        Lookup::Found(image) => {
            if !inner.is_empty() {
                place_image(ctx, &image, inner, element.style.keep_aspect, element.style.opacity);
            }
        }
        Lookup::Invalid(reason) => {
            ctx.report(DiagnosticKind::ImageInvalid, reason);
            draw_placeholder_box(ctx, &rect, "Invalid image");
        }
        Lookup::Missing => {
            let wanted = element
                .source
                .path
                .as_deref()
                .or(element.source.file_name.as_deref())
                .unwrap_or("no source");
            ctx.report(DiagnosticKind::ImageNotFound, format!("image not found: {}", wanted));
            draw_placeholder_box(ctx, &rect, "Image not found");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawOp;
    use crate::elements::test_support::Fixture;
    use crate::image_utils::tests::tiny_png;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::json;

    fn element(value: serde_json::Value) -> ImageElement {
        serde_json::from_value(value).unwrap()
    }

    fn geometry() -> Geometry {
        Geometry { x: 1.0, y: 1.0, width: 4.0, height: 2.0, ..Default::default() }
    }

    #[test]
    fn nothing_to_load_gives_placeholder() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        render(&mut ctx, &geometry(), &element(json!({}))).unwrap();
        let texts: Vec<&str> = ctx
            .canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Image not found"]);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::ImageNotFound);
    }

    #[test]
    fn inline_payload_with_inset_and_opacity() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let url = format!("data:image/png;base64,{}", STANDARD.encode(tiny_png()));
        let image = element(json!({
            "estilo": {"opacidad": 0.4, "reduccion": 2},
            "imagen": {"datos_temp": url, "ruta_nueva": "does/not/exist.png"}
        }));
        render(&mut ctx, &geometry(), &image).unwrap();
        let expected = ctx.element_rect(&geometry()).inset(2.0);
        let DrawOp::Image { rect, alpha, .. } = &ctx.canvas.ops()[0] else { panic!("image") };
        assert_eq!(*rect, expected);
        assert!((alpha - 0.4).abs() < 1e-9);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn keep_aspect_letterboxes() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let image = element(json!({
            "estilo": {"mantener_proporcion": true},
            "imagen": {"datos_temp": STANDARD.encode(tiny_png())}
        }));
        // 4cm x 2cm box, 2x1 px image: fits exactly
        render(&mut ctx, &geometry(), &image).unwrap();
        let DrawOp::Image { rect, .. } = &ctx.canvas.ops()[0] else { panic!("image") };
        assert!((rect.width / rect.height - 2.0).abs() < 1e-9);
    }

    #[test]
    fn file_found_in_asset_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logo.png"), tiny_png()).unwrap();
        let mut fixture = Fixture::new();
        fixture.options = fixture.options.clone().with_asset_path(dir.path());
        let mut ctx = fixture.context();
        let image = element(json!({"imagen": {"ruta_nueva": "missing/elsewhere.png", "nombre_archivo": "logo.png"}}));
        render(&mut ctx, &geometry(), &image).unwrap();
        assert!(matches!(ctx.canvas.ops()[0], DrawOp::Image { .. }));
    }

    #[test]
    fn broken_file_is_reported_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();
        let mut fixture = Fixture::new();
        fixture.options = fixture.options.clone().with_document_dir(dir.path());
        let mut ctx = fixture.context();
        render(&mut ctx, &geometry(), &element(json!({"imagen": {"ruta_nueva": "broken.png"}}))).unwrap();
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::ImageInvalid);
    }

    #[test]
    fn candidate_order() {
        let options = RenderOptions::default().with_document_dir("/doc").with_asset_path("/assets");
        let candidates = candidate_paths("img/a.png", &options);
        assert_eq!(candidates[0], PathBuf::from("/doc/img/a.png"));
        assert_eq!(candidates[1], PathBuf::from("/assets/img/a.png"));
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidate_paths("/abs/a.png", &options), vec![PathBuf::from("/abs/a.png")]);
        assert!(candidate_paths("  ", &options).is_empty());
    }
}
