//! Element renderers
//!
//! One module per element kind. Each `render` takes the shared
//! [`RenderContext`](crate::renderer::RenderContext), the element geometry and
//! its payload. Expected degradations (missing image, failing provider) are
//! handled inside the renderer; anything returned as `Err` is turned into an
//! error box by the driver.

pub mod chart;
pub mod image;
pub mod line;
pub mod rectangle;
pub mod table;
pub mod text;

use crate::font_registry::StandardFont;
use crate::provider::ProviderError;
use crate::renderer::RenderContext;
use crate::types::{Color, Rect};

/// Shorten `message` to `max_chars` characters, marking the cut with "..."
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    if message.chars().count() > max_chars {
        let truncated: String = message.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        message.to_string()
    }
}

/// Error text for a provider failure. The provider name is never cut;
/// only the failure detail is shortened to `max_chars`.
pub fn provider_error_label(err: &ProviderError, max_chars: usize) -> String {
    match err {
        ProviderError::NotFound(name) => format!("provider not found: {}", name),
        ProviderError::Failed { provider, detail } => {
            format!("provider '{}' failed: {}", provider, truncate_message(detail, max_chars))
        }
    }
}

fn label_size(rect: &Rect, preferred: f64) -> f64 {
    preferred.min(rect.height * 0.6).max(4.0)
}

/// Red-bordered box with a (truncated) error message
pub fn draw_error_box(ctx: &mut RenderContext<'_>, rect: &Rect, message: &str) {
    let text = truncate_message(message, ctx.options.error_message_chars);
    draw_error_label(ctx, rect, &text);
}

/// Red-bordered box labelled with `text` as given
pub fn draw_error_label(ctx: &mut RenderContext<'_>, rect: &Rect, text: &str) {
    let font = ctx.font(StandardFont::Helvetica);
    let size = label_size(rect, 7.0);

    ctx.canvas.save_state();
    ctx.canvas.set_fill_color(Color::rgb(1.0, 0.94, 0.94));
    ctx.canvas.set_stroke_color(Color::red());
    ctx.canvas.set_line_width(1.5);
    ctx.canvas.rect(*rect, true, true);

    ctx.canvas.set_fill_color(Color::red());
    ctx.canvas.set_font(&font, size);
    ctx.canvas
        .draw_string(rect.x + 3.0, rect.y + rect.height / 2.0 - size * 0.35, text);
    ctx.canvas.restore_state();
}

/// Neutral dashed box with a grey label, used where content is missing
pub fn draw_placeholder_box(ctx: &mut RenderContext<'_>, rect: &Rect, label: &str) {
    let font = ctx.font(StandardFont::HelveticaOblique);
    let size = label_size(rect, 10.0);

    ctx.canvas.save_state();
    ctx.canvas.set_fill_color(Color::gray(0.96));
    ctx.canvas.set_stroke_color(Color::gray(0.8));
    ctx.canvas.set_line_width(1.0);
    ctx.canvas.set_dash(&[3.0, 2.0], 0.0);
    ctx.canvas.rect(*rect, true, true);

    ctx.canvas.set_fill_color(Color::gray(0.6));
    ctx.canvas.set_font(&font, size);
    ctx.canvas
        .draw_string(rect.x + 5.0, rect.y + rect.height / 2.0 - size * 0.35, &truncate_message(label, 30));
    ctx.canvas.restore_state();
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::Value;

    use crate::options::RenderOptions;
    use crate::placeholder::PlaceholderContext;
    use crate::provider::FnRegistry;
    use crate::renderer::RenderContext;
    use crate::types::Size;

    /// Everything a RenderContext borrows, owned by the test
    pub(crate) struct Fixture {
        pub options: RenderOptions,
        pub placeholders: PlaceholderContext,
        pub providers: FnRegistry,
        pub data_source: Value,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self {
                options: RenderOptions::default().with_compression(false),
                placeholders: PlaceholderContext::new(),
                providers: FnRegistry::new(),
                data_source: Value::Null,
            }
        }

        /// A context with page 1 (A4 portrait) begun
        pub fn context(&self) -> RenderContext<'_> {
            let mut ctx = RenderContext::new(&self.options, &self.placeholders, &self.providers, &self.data_source);
            ctx.begin_page(1, Size::a4());
            ctx
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawOp;

    #[test]
    fn messages_are_truncated_on_char_boundaries() {
        assert_eq!(truncate_message("short", 10), "short");
        assert_eq!(truncate_message("ñañañaña", 3), "ñañ...");
    }

    #[test]
    fn error_box_is_red_and_labelled() {
        let fixture = test_support::Fixture::new();
        let mut ctx = fixture.context();
        let long = "x".repeat(100);
        draw_error_box(&mut ctx, &Rect::new(10.0, 10.0, 100.0, 40.0), &long);
        let ops = ctx.canvas.ops();
        assert!(matches!(&ops[0], DrawOp::Rect { stroke: Some(c), .. } if *c == Color::red()));
        let DrawOp::Text { text, .. } = &ops[1] else { panic!("label") };
        assert_eq!(text.chars().count(), 63);
        assert_eq!(ctx.canvas.depth(), 0);
    }

    #[test]
    fn provider_labels_keep_the_whole_name() {
        let name = "grafico_desplazamientos_acumulados_inclinometro";
        let label = provider_error_label(&ProviderError::NotFound(name.to_string()), 20);
        assert!(label.contains(name));

        let failed = ProviderError::Failed { provider: name.to_string(), detail: "z".repeat(50) };
        let label = provider_error_label(&failed, 20);
        assert!(label.contains(name));
        assert!(label.ends_with(&format!("{}...", "z".repeat(20))));
    }
}
