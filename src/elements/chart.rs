//! Chart elements: an image produced by a provider, scaled into the box

use log::debug;

use crate::document::{ChartElement, Geometry};
use crate::error::{Diagnostic, DiagnosticKind, RendererResult};
use crate::placeholder::resolve;
use crate::provider::{ProviderError, ProviderPayload};
use crate::renderer::RenderContext;

use super::{draw_error_label, provider_error_label, truncate_message};
use super::image::{content_key, place_image};

pub fn render(ctx: &mut RenderContext<'_>, geometry: &Geometry, chart: &ChartElement) -> RendererResult<()> {
    let rect = ctx.element_rect(geometry);
    let name = chart.config.script.trim();
    let params = resolve(&chart.config.params, ctx.placeholders);

    let result = if name.is_empty() {
        Err(ProviderError::NotFound("(no script configured)".to_string()))
    } else {
        debug!("Chart '{}' requesting provider '{}'", ctx.element(), name);
        ctx.providers.invoke(name, &params, ctx.data_source)
    };

    match result {
        Ok(ProviderPayload::Chart(image)) => {
            let key = content_key("chart", &image.data);
            match ctx.embed_image_bytes(&key, &image.data, image.mime.as_deref()) {
                Ok(embedded) => {
                    let inner = rect.inset(chart.style.inset);
                    if !inner.is_empty() {
                        place_image(ctx, &embedded, inner, false, chart.style.opacity);
                    }
                }
                Err(e) => {
                    let detail = truncate_message(&e.to_string(), ctx.options.error_message_chars);
                    let message = format!("{}: {}", name, detail);
                    ctx.report(DiagnosticKind::ImageInvalid, message.clone());
                    draw_error_label(ctx, &rect, &message);
                }
            }
        }
        Ok(ProviderPayload::Table(_)) => {
            let err = ProviderError::Failed {
                provider: name.to_string(),
                detail: "returned a table where an image was expected".to_string(),
            };
            fail(ctx, &rect, &err);
        }
        Err(err) => fail(ctx, &rect, &err),
    }
    Ok(())
}

fn fail(ctx: &mut RenderContext<'_>, rect: &crate::types::Rect, err: &ProviderError) {
    let diagnostic = Diagnostic::from_provider_error(ctx.page_number(), ctx.element(), err);
    ctx.push_diagnostic(diagnostic);
    let label = provider_error_label(err, ctx.options.error_message_chars);
    draw_error_label(ctx, rect, &label);
}
