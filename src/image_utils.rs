//! Image utilities for PDF rendering
//!
//! Every image ends up as an 8-bit RGB XObject, with a separate DeviceGray
//! soft mask when the source carries alpha. Raster formats are decoded with
//! `image`; SVG (typical chart provider output) is rasterised with `resvg`.

use std::io::Write;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::DynamicImage;
use log::debug;
use pdf_writer::{Filter, Pdf, Ref};
use resvg::tiny_skia::{Pixmap, Transform};

use crate::error::{RendererError, RendererResult};
use crate::renderer::RefAllocator;

/// Decoded pixels ready to be written as an XObject
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

/// Decode an inline payload: either a `data:<mime>;base64,<data>` URL or bare base64.
/// Returns the declared MIME type (if any) and the bytes.
pub fn decode_base64_payload(payload: &str) -> RendererResult<(Option<String>, Vec<u8>)> {
    let payload = payload.trim();
    let (mime, data) = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| RendererError::ImageError("malformed data URL".to_string()))?;
            if !header.ends_with(";base64") {
                return Err(RendererError::ImageError("data URL is not base64 encoded".to_string()));
            }
            let mime = header.trim_end_matches(";base64");
            (Some(mime.to_string()).filter(|m| !m.is_empty()), data)
        }
        None => (None, payload),
    };
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| RendererError::ImageError(format!("invalid base64 payload: {}", e)))?;
    Ok((mime, bytes))
}

/// Whether the payload is SVG text rather than a raster image
pub fn is_svg(data: &[u8], mime_type: Option<&str>) -> bool {
    if mime_type.map(|m| m.contains("svg")).unwrap_or(false) {
        return true;
    }
    let head = &data[..data.len().min(512)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

pub fn load_image(path: &Path, svg_dpi: f32) -> RendererResult<RasterImage> {
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RendererError::ImageNotFound(path.display().to_string())
        } else {
            RendererError::IoError(e)
        }
    })?;
    let mime = match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
        Some(ext) if ext == "svg" => Some("image/svg+xml"),
        _ => None,
    };
    load_image_from_bytes(&data, mime, svg_dpi)
}

pub fn load_image_from_bytes(data: &[u8], mime_type: Option<&str>, svg_dpi: f32) -> RendererResult<RasterImage> {
    if data.is_empty() {
        return Err(RendererError::ImageError("empty image payload".to_string()));
    }
    if is_svg(data, mime_type) {
        let svg = std::str::from_utf8(data)
            .map_err(|e| RendererError::ImageError(format!("Invalid UTF-8 SVG data: {}", e)))?;
        return convert_svg(svg, svg_dpi);
    }

    let img = image::load_from_memory(data)
        .map_err(|e| RendererError::ImageError(format!("Failed to decode image: {}", e)))?;
    Ok(split_channels(img))
}

fn split_channels(image: DynamicImage) -> RasterImage {
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for chunk in rgba.as_raw().chunks_exact(4) {
            rgb.extend_from_slice(&chunk[..3]);
            alpha.push(chunk[3]);
        }
        let alpha = if alpha.iter().all(|a| *a == 255) { None } else { Some(alpha) };
        RasterImage { width, height, rgb, alpha }
    } else {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        RasterImage { width, height, rgb: rgb.into_raw(), alpha: None }
    }
}

/// Rasterise SVG at `dpi`, keeping the SVG's own aspect ratio
fn convert_svg(svg_content: &str, dpi: f32) -> RendererResult<RasterImage> {
    let opt = usvg::Options::default();
    let fontdb = usvg::fontdb::Database::new();
    let tree = usvg::Tree::from_str(svg_content, &opt, &fontdb)
        .map_err(|e| RendererError::ImageError(format!("Failed to parse SVG: {}", e)))?;

    let size = tree.size();
    let scale = dpi / 72.0;
    let width = ((size.width() * scale).ceil() as u32).max(1);
    let height = ((size.height() * scale).ceil() as u32).max(1);
    debug!("Rasterising SVG {}x{} pt at {} dpi -> {}x{} px", size.width(), size.height(), dpi, width, height);

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| RendererError::ImageError("Failed to create pixmap for SVG".to_string()))?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied RGBA
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgb.extend_from_slice(&[c.red(), c.green(), c.blue()]);
        alpha.push(c.alpha());
    }
    Ok(RasterImage { width, height, rgb, alpha: Some(alpha) })
}

/// zlib-compress a stream for /FlateDecode
pub fn compress(data: &[u8]) -> RendererResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Write `image` as an XObject at `image_id` (plus its soft mask)
pub fn add_image_to_pdf(
    pdf: &mut Pdf,
    refs: &mut RefAllocator,
    image: &RasterImage,
    image_id: Ref,
) -> RendererResult<()> {
    let smask_id = match &image.alpha {
        Some(alpha) => {
            let smask_id = refs.next();
            let compressed = compress(alpha)?;
            let mut smask = pdf.image_xobject(smask_id, &compressed);
            smask.filter(Filter::FlateDecode);
            smask.width(image.width as i32);
            smask.height(image.height as i32);
            smask.color_space().device_gray();
            smask.bits_per_component(8);
            Some(smask_id)
        }
        None => None,
    };

    let compressed = compress(&image.rgb)?;
    let mut xobject = pdf.image_xobject(image_id, &compressed);
    xobject.filter(Filter::FlateDecode);
    xobject.width(image.width as i32);
    xobject.height(image.height as i32);
    xobject.color_space().device_rgb();
    xobject.bits_per_component(8);
    if let Some(smask_id) = smask_id {
        xobject.s_mask(smask_id);
    }
    debug!("Image XObject {} written: {}x{} px", image_id.get(), image.width, image.height);
    Ok(())
}
