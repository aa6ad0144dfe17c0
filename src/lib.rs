//! Template-driven PDF report renderer
//!
//! A template is a JSON document of pages, each holding absolutely positioned
//! elements (lines, rectangles, text, images, charts and tables) laid out in
//! centimeters. Text and parameters may carry `$CURRENT_<field>` placeholders
//! that are filled from a [`PlaceholderContext`]; charts and tables get their
//! content from named providers behind the [`ProviderRegistry`] trait.
//!
//! ```no_run
//! use serde_json::json;
//! use template_pdf_renderer::{render_document, Document, FnRegistry, PlaceholderContext, RenderOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = Document::from_path("report.json".as_ref())?;
//! let context = PlaceholderContext::new().with_field("sensor", json!("INC-7"));
//! let providers = FnRegistry::new();
//! let output = render_document(&document, &json!(null), &context, &providers, &RenderOptions::default())?;
//! std::fs::write("report.pdf", &output.pdf)?;
//! # Ok(())
//! # }
//! ```

mod canvas;
mod font_registry;
mod font_utils;
mod image_registry;
mod image_utils;
mod json_helpers;
mod text_layout;
mod unicode_utils;

pub mod document;
pub mod elements;
pub mod error;
pub mod geometry;
pub mod options;
pub mod placeholder;
pub mod provider;
pub mod renderer;
pub mod types;
pub mod validate;

#[cfg(feature = "python")]
mod python;

pub use canvas::{CanvasState, DrawOp};
pub use document::{Document, Element, ElementKind, Geometry, Page};
pub use error::{Diagnostic, DiagnosticKind, RendererError, RendererResult};
pub use font_registry::StandardFont;
pub use geometry::{cm_to_pt, pt_to_cm, Orientation, PT_PER_CM};
pub use options::RenderOptions;
pub use placeholder::{interpolate, resolve, PlaceholderContext};
pub use provider::{
    ChainRegistry, ChartImage, FnRegistry, ProviderError, ProviderPayload, ProviderRegistry, ScriptRegistry,
    TablePayload,
};
pub use renderer::{render_document, RenderOutput, RenderedPage};
pub use text_layout::{HAlign, VAlign};
pub use types::{Color, Rect, Size};
pub use validate::{check_widths, OverflowLimit, WidthOverflow};
