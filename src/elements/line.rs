use crate::document::{Geometry, LineElement};
use crate::error::RendererResult;
use crate::geometry::to_page_point;
use crate::renderer::RenderContext;

/// Endpoints in cm. Explicit x1..y2 win (on the element, then in the
/// geometry); otherwise the segment runs corner to corner across the box.
fn endpoints(geometry: &Geometry, line: &LineElement) -> ((f64, f64), (f64, f64)) {
    let x1 = line.x1.or(geometry.x1).unwrap_or(geometry.x);
    let y1 = line.y1.or(geometry.y1).unwrap_or(geometry.y);
    let x2 = line.x2.or(geometry.x2).unwrap_or(geometry.x + geometry.width);
    let y2 = line.y2.or(geometry.y2).unwrap_or(geometry.y + geometry.height);
    ((x1, y1), (x2, y2))
}

pub fn render(ctx: &mut RenderContext<'_>, geometry: &Geometry, line: &LineElement) -> RendererResult<()> {
    if line.style.width <= 0.0 {
        return Ok(());
    }
    let page_height = ctx.page_size().height;
    let ((x1, y1), (x2, y2)) = endpoints(geometry, line);
    let from = to_page_point(x1, y1, page_height);
    let to = to_page_point(x2, y2, page_height);

    ctx.canvas.save_state();
    ctx.canvas.set_stroke_color(line.style.color);
    ctx.canvas.set_line_width(line.style.width);
    ctx.canvas.line(from.0, from.1, to.0, to.1);
    ctx.canvas.restore_state();
    Ok(())
}
