use crate::document::{Geometry, TextElement};
use crate::error::RendererResult;
use crate::font_registry::StandardFont;
use crate::placeholder::interpolate;
use crate::renderer::RenderContext;
use crate::text_layout::{fit_font_size, layout_block};

pub fn render(ctx: &mut RenderContext<'_>, geometry: &Geometry, element: &TextElement) -> RendererResult<()> {
    let style = &element.style;
    let text = interpolate(&element.content.text, ctx.placeholders);
    if text.trim().is_empty() {
        return Ok(());
    }

    let rect = ctx.element_rect(geometry);
    let font = StandardFont::resolve(&style.font_family, style.bold, style.italic);
    let mut size = if style.font_size > 0.0 {
        style.font_size
    } else {
        ctx.options.default_font_size
    };
    if element.content.auto_fit {
        size = fit_font_size(&text, font, size, &rect);
    }
    let lines = layout_block(&text, font, size, &rect, style.h_align, style.v_align);
    let font_name = ctx.font(font);

    ctx.canvas.save_state();
    if style.rotation != 0.0 {
        // editor angles are clockwise, PDF rotation is counter-clockwise
        let (cx, cy) = rect.center();
        ctx.canvas.translate(cx, cy);
        ctx.canvas.rotate(-style.rotation);
        ctx.canvas.translate(-cx, -cy);
    }
    ctx.canvas.set_fill_color(style.color);
    ctx.canvas.set_font(&font_name, size);
    for line in &lines {
        for (x, run) in &line.runs {
            ctx.canvas.draw_string(*x, line.baseline, run);
        }
    }
    ctx.canvas.restore_state();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawOp;
    use crate::elements::test_support::Fixture;
    use serde_json::json;

    fn element(value: serde_json::Value) -> TextElement {
        serde_json::from_value(value).unwrap()
    }

    fn texts(ops: &[DrawOp]) -> Vec<(f64, f64, String, f64)> {
        ops.iter()
            .filter_map(|op| match op {
                DrawOp::Text { x, y, text, size, .. } => Some((*x, *y, text.clone(), *size)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn placeholders_and_font_choice() {
        let mut fixture = Fixture::new();
        fixture.placeholders = fixture.placeholders.with_field("sensor", json!("INC-3"));
        let mut ctx = fixture.context();
        let geometry = Geometry { x: 1.0, y: 1.0, width: 8.0, height: 2.0, ..Default::default() };
        let text = element(json!({
            "estilo": {"familia_fuente": "Times New Roman", "negrita": true, "tamano": 14},
            "contenido": {"texto": "Sensor $CURRENT_sensor"}
        }));
        render(&mut ctx, &geometry, &text).unwrap();
        let ops = ctx.canvas.ops();
        let DrawOp::Text { text, font, size, .. } = &ops[0] else { panic!("text") };
        assert_eq!(text, "Sensor INC-3");
        assert_eq!(*size, 14.0);
        // first face registered in this context
        assert_eq!(font, "F1");
        let font_name = ctx.font(StandardFont::TimesBold);
        assert_eq!(font_name, "F1");
    }

    #[test]
    fn empty_text_draws_nothing() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let geometry = Geometry { x: 1.0, y: 1.0, width: 8.0, height: 2.0, ..Default::default() };
        render(&mut ctx, &geometry, &element(json!({"contenido": {"texto": "  "}}))).unwrap();
        assert!(ctx.canvas.ops().is_empty());
    }

    #[test]
    fn auto_fit_reduces_size() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let geometry = Geometry { x: 1.0, y: 1.0, width: 2.0, height: 1.0, ..Default::default() };
        let text = element(json!({
            "estilo": {"tamano": 30},
            "contenido": {"texto": "a long heading that cannot fit", "ajuste_automatico": true}
        }));
        render(&mut ctx, &geometry, &text).unwrap();
        let drawn = texts(ctx.canvas.ops());
        assert!(drawn[0].3 < 30.0);
    }

    #[test]
    fn auto_fit_with_absurd_size_terminates() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let geometry = Geometry { x: 1.0, y: 1.0, width: 6.0, height: 2.0, ..Default::default() };
        let text = element(json!({
            "estilo": {"tamano": 1e20},
            "contenido": {"texto": "Desplazamiento acumulado", "ajuste_automatico": true}
        }));
        render(&mut ctx, &geometry, &text).unwrap();
        let size = texts(ctx.canvas.ops())[0].3;
        assert!(size < 100.0, "size {}", size);
    }

    #[test]
    fn rotation_keeps_state_balanced() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let geometry = Geometry { x: 1.0, y: 1.0, width: 4.0, height: 4.0, ..Default::default() };
        let text = element(json!({"estilo": {"rotacion": 90}, "contenido": {"texto": "Eje Y"}}));
        render(&mut ctx, &geometry, &text).unwrap();
        assert_eq!(ctx.canvas.depth(), 0);
        assert_eq!(texts(ctx.canvas.ops()).len(), 1);
    }

    /// Parse every `cm` operator of a content stream, in order
    fn transforms(content: &[u8]) -> Vec<[f64; 6]> {
        String::from_utf8_lossy(content)
            .lines()
            .filter_map(|line| line.trim().strip_suffix(" cm").map(str::to_string))
            .map(|args| {
                let v: Vec<f64> = args.split_whitespace().map(|n| n.parse().unwrap()).collect();
                [v[0], v[1], v[2], v[3], v[4], v[5]]
            })
            .collect()
    }

    /// Map a user-space point through the concatenated matrices
    fn apply(matrices: &[[f64; 6]], (x, y): (f64, f64)) -> (f64, f64) {
        matrices.iter().rev().fold((x, y), |(x, y), m| (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5]))
    }

    #[test]
    fn rotation_turns_the_block_clockwise_about_the_centre() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let geometry = Geometry { x: 2.0, y: 3.0, width: 6.0, height: 4.0, ..Default::default() };
        let (cx, cy) = ctx.element_rect(&geometry).center();
        let text = element(json!({"estilo": {"rotacion": 90}, "contenido": {"texto": "Eje Y"}}));
        render(&mut ctx, &geometry, &text).unwrap();

        let (content, _) = std::mem::take(&mut ctx.canvas).finish();
        let matrices = transforms(&content);
        assert_eq!(matrices.len(), 3);

        let (x, y) = apply(&matrices, (cx, cy));
        assert!((x - cx).abs() < 1e-3 && (y - cy).abs() < 1e-3);
        // a point right of the centre ends up below it
        let (x, y) = apply(&matrices, (cx + 10.0, cy));
        assert!((x - cx).abs() < 1e-3, "x {}", x);
        assert!((y - (cy - 10.0)).abs() < 1e-3, "y {}", y);
    }

    #[test]
    fn unrotated_text_has_no_transform() {
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let geometry = Geometry { x: 2.0, y: 3.0, width: 6.0, height: 4.0, ..Default::default() };
        render(&mut ctx, &geometry, &element(json!({"contenido": {"texto": "Eje X"}}))).unwrap();
        let (content, _) = std::mem::take(&mut ctx.canvas).finish();
        assert!(transforms(&content).is_empty());
    }
}
