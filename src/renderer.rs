//! Document driver
//!
//! ## Architecture
//!
//! `render_document` validates the document structure up front (page keys,
//! orientations), then renders pages strictly in numeric order. Within a page
//! the visible elements are painted in ascending z-index. All paint state
//! lives in one [`RenderContext`] that is handed by `&mut` to each element
//! renderer.
//!
//! Element failures never abort the document: the canvas is unwound to the
//! depth it had before the element, a [`Diagnostic`] is recorded and a red
//! error box is drawn where the element would have been. Only structural
//! problems return an error.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info, warn};
use pdf_writer::{Filter, Finish, Name, Pdf, Ref, TextStr};
use serde_json::Value;

use crate::canvas::{DrawOp, PdfCanvas};
use crate::document::{Document, Element, ElementKind, Geometry, Page};
use crate::elements;
use crate::error::{Diagnostic, DiagnosticKind, RendererError, RendererResult};
use crate::font_registry::{FontRegistry, StandardFont};
use crate::geometry::{box_to_pdf_rect, rect_to_pdf};
use crate::image_registry::{EmbeddedImage, ImageRegistry};
use crate::image_utils::compress;
use crate::options::RenderOptions;
use crate::placeholder::PlaceholderContext;
use crate::provider::ProviderRegistry;
use crate::types::{Rect, Size};

const CATALOG_ID: i32 = 1;
const PAGE_TREE_ID: i32 = 2;

/// Hands out PDF object ids
#[derive(Debug)]
pub struct RefAllocator {
    next: i32,
}

impl RefAllocator {
    pub fn new(start: i32) -> Self {
        Self { next: start }
    }

    pub fn next(&mut self) -> Ref {
        let id = Ref::new(self.next);
        self.next += 1;
        id
    }
}

/// ExtGState dictionaries keyed by fill alpha
struct GraphicsStates {
    // alpha in thousandths → (object id, resource name)
    states: BTreeMap<u16, (Ref, String)>,
    used_on_page: BTreeMap<String, Ref>,
}

impl GraphicsStates {
    fn new() -> Self {
        Self {
            states: BTreeMap::new(),
            used_on_page: BTreeMap::new(),
        }
    }

    fn get_or_create(&mut self, pdf: &mut Pdf, refs: &mut RefAllocator, alpha: f64) -> String {
        let key = (alpha.clamp(0.0, 1.0) * 1000.0).round() as u16;
        let next_index = self.states.len() + 1;
        let (id, name) = self
            .states
            .entry(key)
            .or_insert_with(|| {
                let id = refs.next();
                pdf.ext_graphics(id).non_stroking_alpha(key as f32 / 1000.0);
                (id, format!("GS{}", next_index))
            })
            .clone();
        self.used_on_page.insert(name.clone(), id);
        name
    }

    fn begin_page(&mut self) {
        self.used_on_page.clear();
    }

    fn write_resources(&self, resources: &mut pdf_writer::writers::Resources<'_>) {
        if self.used_on_page.is_empty() {
            return;
        }
        let mut dict = resources.ext_g_states();
        for (name, id) in &self.used_on_page {
            dict.pair(Name(name.as_bytes()), *id);
        }
    }
}

/// What was painted on one page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub number: u32,
    pub size: Size,
    pub ops: Vec<DrawOp>,
}

/// Result of a render pass
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub pdf: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
    pub pages: Vec<RenderedPage>,
}

impl RenderOutput {
    pub fn page(&self, number: u32) -> Option<&RenderedPage> {
        self.pages.iter().find(|p| p.number == number)
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}

/// Paint state shared by every element renderer during one pass
pub struct RenderContext<'a> {
    pdf: Pdf,
    refs: RefAllocator,
    fonts: FontRegistry,
    images: ImageRegistry,
    gstates: GraphicsStates,
    pub canvas: PdfCanvas,
    page_refs: Vec<Ref>,
    current_page: Option<(Ref, Ref)>,
    page_number: u32,
    page_size: Size,
    element: String,
    diagnostics: Vec<Diagnostic>,
    rendered: Vec<RenderedPage>,
    pub options: &'a RenderOptions,
    pub placeholders: &'a PlaceholderContext,
    pub providers: &'a dyn ProviderRegistry,
    pub data_source: &'a Value,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        options: &'a RenderOptions,
        placeholders: &'a PlaceholderContext,
        providers: &'a dyn ProviderRegistry,
        data_source: &'a Value,
    ) -> Self {
        let mut pdf = Pdf::new();
        pdf.catalog(Ref::new(CATALOG_ID)).pages(Ref::new(PAGE_TREE_ID));
        Self {
            pdf,
            refs: RefAllocator::new(PAGE_TREE_ID + 1),
            fonts: FontRegistry::new(),
            images: ImageRegistry::new(options.svg_dpi),
            gstates: GraphicsStates::new(),
            canvas: PdfCanvas::new(),
            page_refs: Vec::new(),
            current_page: None,
            page_number: 0,
            page_size: options.page_size,
            element: String::new(),
            diagnostics: Vec::new(),
            rendered: Vec::new(),
            options,
            placeholders,
            providers,
            data_source,
        }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    /// Name of the element being rendered
    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Element box in page points
    pub fn element_rect(&self, geometry: &Geometry) -> Rect {
        box_to_pdf_rect(geometry.x, geometry.y, geometry.width, geometry.height, self.page_size.height)
    }

    /// Register `font` for the current page and return its resource name
    pub fn font(&mut self, font: StandardFont) -> String {
        self.fonts.get_or_builtin(&mut self.pdf, &mut self.refs, font)
    }

    /// Set the fill alpha for subsequent painting. Fully opaque needs no ExtGState.
    pub fn set_alpha(&mut self, alpha: f64) {
        if alpha >= 1.0 {
            return;
        }
        let name = self.gstates.get_or_create(&mut self.pdf, &mut self.refs, alpha);
        self.canvas.set_ext_graphics_state(&name, alpha);
    }

    pub fn embed_image_bytes(&mut self, key: &str, data: &[u8], mime: Option<&str>) -> RendererResult<EmbeddedImage> {
        self.images
            .get_or_create_from_bytes(&mut self.pdf, &mut self.refs, key, data, mime)
    }

    pub fn embed_image_path(&mut self, path: &Path) -> RendererResult<EmbeddedImage> {
        self.images.get_or_create_from_path(&mut self.pdf, &mut self.refs, path)
    }

    /// Record a degraded element on the current page
    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            page: self.page_number,
            element: self.element.clone(),
            kind,
            message: message.into(),
        };
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn begin_page(&mut self, number: u32, size: Size) {
        let page_id = self.refs.next();
        let content_id = self.refs.next();
        self.page_refs.push(page_id);
        self.current_page = Some((page_id, content_id));
        self.page_number = number;
        self.page_size = size;
        self.canvas = PdfCanvas::new();
        self.fonts.begin_page();
        self.images.begin_page();
        self.gstates.begin_page();
        debug!("Page {} started ({:.2} x {:.2} pt)", number, size.width, size.height);
    }

    /// Write the current page's content stream and page object
    pub fn finish_page(&mut self) -> RendererResult<()> {
        let Some((page_id, content_id)) = self.current_page.take() else {
            return Ok(());
        };
        let (content, ops) = std::mem::take(&mut self.canvas).finish();
        let raw_len = content.len();
        if self.options.compress_streams {
            let compressed = compress(&content)?;
            self.pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);
        } else {
            self.pdf.stream(content_id, &content);
        }

        let media_box = rect_to_pdf(&Rect::new(0.0, 0.0, self.page_size.width, self.page_size.height));
        let mut page = self.pdf.page(page_id);
        page.media_box(media_box);
        page.parent(Ref::new(PAGE_TREE_ID));
        page.contents(content_id);
        {
            let mut resources = page.resources();
            self.fonts.write_resources(&mut resources);
            self.images.write_resources(&mut resources);
            self.gstates.write_resources(&mut resources);
        }
        page.finish();

        debug!("Page {} finished: {} ops, {} content bytes", self.page_number, ops.len(), raw_len);
        self.rendered.push(RenderedPage {
            number: self.page_number,
            size: self.page_size,
            ops,
        });
        Ok(())
    }

    /// Write the page tree and document info, and return the finished output
    pub fn finish(mut self, title: &str) -> RendererResult<RenderOutput> {
        self.finish_page()?;
        let count = self.page_refs.len() as i32;
        self.pdf
            .pages(Ref::new(PAGE_TREE_ID))
            .kids(self.page_refs.iter().copied())
            .count(count);

        let info_id = self.refs.next();
        let mut info = self.pdf.document_info(info_id);
        if !title.is_empty() {
            info.title(TextStr(title));
        }
        info.creator(TextStr(&self.options.creator));
        info.finish();

        Ok(RenderOutput {
            pdf: self.pdf.finish(),
            diagnostics: self.diagnostics,
            pages: self.rendered,
        })
    }
}

/// Render `document` to PDF bytes.
///
/// Fails only for structural problems: no pages, a page key that is not a
/// positive integer, or an unknown orientation.
pub fn render_document(
    document: &Document,
    data_source: &Value,
    placeholders: &PlaceholderContext,
    providers: &dyn ProviderRegistry,
    options: &RenderOptions,
) -> RendererResult<RenderOutput> {
    let pages = document
        .ordered_pages()?
        .into_iter()
        .map(|(number, page)| {
            let orientation = page.orientation(number)?;
            Ok((number, page, options.page_size.for_orientation(orientation)))
        })
        .collect::<RendererResult<Vec<(u32, &Page, Size)>>>()?;

    info!(
        "Rendering template '{}' (version {}): {} pages",
        document.config.template_name,
        document.config.version,
        pages.len()
    );
    if let Some(declared) = document.config.page_count {
        if declared as usize != pages.len() {
            debug!("num_paginas says {} but the document has {} pages", declared, pages.len());
        }
    }

    let mut ctx = RenderContext::new(options, placeholders, providers, data_source);
    for (number, page, size) in pages {
        ctx.begin_page(number, size);
        for (name, element) in page.paint_order() {
            render_element(&mut ctx, name, element);
        }
        ctx.finish_page()?;
    }

    let output = ctx.finish(&document.config.template_name)?;
    info!(
        "PDF generated: {} bytes ({:.2} MB), {} diagnostics",
        output.pdf.len(),
        output.pdf.len() as f64 / 1_048_576.0,
        output.diagnostics.len()
    );
    Ok(output)
}

/// Dispatch one element, turning any failure into an error box
fn render_element(ctx: &mut RenderContext<'_>, name: &str, element: &Element) {
    ctx.element = name.to_string();
    debug!("Page {}: rendering {} '{}'", ctx.page_number, element.kind_name(), name);

    let depth = ctx.canvas.depth();
    let result = match &element.kind {
        ElementKind::Line(line) => elements::line::render(ctx, &element.geometry, line),
        ElementKind::Rectangle(rect) => elements::rectangle::render(ctx, &element.geometry, rect),
        ElementKind::Text(text) => elements::text::render(ctx, &element.geometry, text),
        ElementKind::Image(image) => elements::image::render(ctx, &element.geometry, image),
        ElementKind::Chart(chart) => elements::chart::render(ctx, &element.geometry, chart),
        ElementKind::Table(table) => elements::table::render(ctx, &element.geometry, table).map(|_| ()),
        ElementKind::Invalid(reason) => Err(RendererError::InvalidValue(name.to_string(), reason.clone())),
        ElementKind::Unknown => {
            ctx.report(DiagnosticKind::UnknownElement, "unknown element type skipped");
            Ok(())
        }
    };

    if let Err(err) = result {
        ctx.canvas.restore_to(depth);
        let message = err.to_string();
        ctx.report(DiagnosticKind::ElementFailed, message.clone());
        let rect = ctx.element_rect(&element.geometry);
        elements::draw_error_box(ctx, &rect, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FnRegistry;
    use serde_json::json;

    fn render(doc: Value) -> RendererResult<RenderOutput> {
        let document = Document::from_value(doc)?;
        let options = RenderOptions::default().with_compression(false);
        render_document(&document, &Value::Null, &PlaceholderContext::new(), &FnRegistry::new(), &options)
    }

    #[test]
    fn empty_document_is_fatal() {
        assert!(matches!(render(json!({"pages": {}})), Err(RendererError::DocumentEmpty)));
    }

    #[test]
    fn bad_orientation_is_fatal_before_any_page() {
        let result = render(json!({"pages": {"1": {}, "2": {"configuracion": {"orientacion": "sideways"}}}}));
        assert!(matches!(result, Err(RendererError::InvalidOrientation { page: 2, .. })));
    }

    #[test]
    fn landscape_pages_are_swapped() {
        let output = render(json!({"pages": {
            "2": {"configuracion": {"orientacion": "landscape"}},
            "1": {}
        }}))
        .unwrap();
        assert_eq!(output.pages.len(), 2);
        assert_eq!(output.pages[0].number, 1);
        assert_eq!(output.pages[0].size, Size::a4());
        assert_eq!(output.pages[1].size, Size::a4().swapped());
        assert!(output.pdf.starts_with(b"%PDF"));
        let text = String::from_utf8_lossy(&output.pdf);
        assert!(text.contains("/Count 2"));
    }

    #[test]
    fn invalid_element_becomes_error_box() {
        let output = render(json!({"pages": {"1": {"elementos": {
            "bad": {"tipo": "linea", "geometria": {"x": 1, "y": 1, "ancho": 2, "alto": 1}, "estilo": {"grosor": "thick"}},
            "other": {"tipo": "widget"}
        }}}}))
        .unwrap();
        let kinds: Vec<DiagnosticKind> = output.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::ElementFailed, DiagnosticKind::UnknownElement]);
        assert_eq!(output.diagnostics[0].element, "bad");
        let ops = &output.pages[0].ops;
        assert!(ops.iter().any(|op| matches!(op, DrawOp::Rect { stroke: Some(c), .. } if *c == crate::types::Color::red())));
    }

    #[test]
    fn alpha_states_are_shared() {
        let mut pdf = Pdf::new();
        let mut refs = RefAllocator::new(3);
        let mut states = GraphicsStates::new();
        let a = states.get_or_create(&mut pdf, &mut refs, 0.5);
        let b = states.get_or_create(&mut pdf, &mut refs, 0.5);
        let c = states.get_or_create(&mut pdf, &mut refs, 0.25);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(states.used_on_page.len(), 2);
    }
}
