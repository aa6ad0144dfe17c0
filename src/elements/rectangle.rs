use crate::document::{normalize_opacity, Geometry, RectangleElement};
use crate::error::RendererResult;
use crate::renderer::RenderContext;

/// Filled and/or stroked box. Opacity applies to the fill only.
pub fn render(ctx: &mut RenderContext<'_>, geometry: &Geometry, element: &RectangleElement) -> RendererResult<()> {
    let style = &element.style;
    let rect = ctx.element_rect(geometry);
    let stroke = style.border_width > 0.0;
    let fill = style.fill_color.is_some();
    if !fill && !stroke {
        return Ok(());
    }

    ctx.canvas.save_state();
    if let Some(fill_color) = style.fill_color {
        ctx.set_alpha(normalize_opacity(style.opacity));
        ctx.canvas.set_fill_color(fill_color);
    }
    if stroke {
        ctx.canvas.set_stroke_color(style.border_color);
        ctx.canvas.set_line_width(style.border_width);
    }
    ctx.canvas.rect(rect, fill, stroke);
    ctx.canvas.restore_state();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawOp;
    use crate::elements::test_support::Fixture;
    use crate::types::Color;
    use serde_json::json;

    fn element(value: serde_json::Value) -> RectangleElement {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn zero_border_has_no_stroke() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let geometry = Geometry { x: 1.0, y: 1.0, width: 2.0, height: 2.0, ..Default::default() };
        render(&mut ctx, &geometry, &element(json!({"estilo": {"grosor_borde": 0, "color_relleno": "blue"}}))).unwrap();
        let DrawOp::Rect { fill, stroke, alpha, .. } = &ctx.canvas.ops()[0] else { panic!("rect") };
        assert!(fill.is_some());
        assert_eq!(*stroke, None);
        assert_eq!(*alpha, 1.0);
    }

    #[test]
    fn transparent_fill_is_outline_only() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let geometry = Geometry { x: 1.0, y: 1.0, width: 2.0, height: 2.0, ..Default::default() };
        render(
            &mut ctx,
            &geometry,
            &element(json!({"estilo": {"grosor_borde": 2, "color_borde": "#00ff00", "color_relleno": "transparent"}})),
        )
        .unwrap();
        render(&mut ctx, &geometry, &element(json!({"estilo": {"grosor_borde": 0}}))).unwrap();
        assert_eq!(
            ctx.canvas.ops(),
            &[DrawOp::Rect {
                rect: ctx.element_rect(&geometry),
                fill: None,
                stroke: Some(Color::rgb(0.0, 1.0, 0.0)),
                line_width: 2.0,
                alpha: 1.0,
            }]
        );
    }
}
