//! Geometry utilities: centimeter ↔ point conversion and colour parsing
//!
//! Templates are authored in centimeters with a top-left origin and Y growing
//! downward. PDF pages use points with a bottom-left origin and Y growing
//! upward, so every conversion needs the height of the active page.

use pdf_writer::Rect as PdfRect;
use serde::{Deserialize, Serialize};

use crate::types::{Color, Rect, Size};

/// Points per centimeter used by the template editor
pub const PT_PER_CM: f64 = 28.35;

/// Page orientation as written by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "portrait" | "vertical" => Some(Orientation::Portrait),
            "landscape" | "horizontal" => Some(Orientation::Landscape),
            _ => None,
        }
    }
}

impl Size {
    /// Page size for an orientation; `base` is the portrait size
    pub fn for_orientation(&self, orientation: Orientation) -> Size {
        match orientation {
            Orientation::Portrait => *self,
            Orientation::Landscape => self.swapped(),
        }
    }
}

pub fn cm_to_pt(cm: f64) -> f64 {
    cm * PT_PER_CM
}

pub fn pt_to_cm(pt: f64) -> f64 {
    pt / PT_PER_CM
}

/// Convert an editor coordinate to a PDF page coordinate
pub fn to_page_point(x_cm: f64, y_cm: f64, page_height_pt: f64) -> (f64, f64) {
    (cm_to_pt(x_cm), page_height_pt - cm_to_pt(y_cm))
}

/// Inverse of [`to_page_point`]
pub fn from_page_point(x_pt: f64, y_pt: f64, page_height_pt: f64) -> (f64, f64) {
    (pt_to_cm(x_pt), pt_to_cm(page_height_pt - y_pt))
}

/// Convert a top-left anchored box in centimeters to a PDF rectangle
pub fn box_to_pdf_rect(x_cm: f64, y_cm: f64, width_cm: f64, height_cm: f64, page_height_pt: f64) -> Rect {
    let width = cm_to_pt(width_cm);
    let height = cm_to_pt(height_cm);
    let (x, top) = to_page_point(x_cm, y_cm, page_height_pt);
    Rect::new(x, top - height, width, height)
}

/// Convert our Rect to pdf-writer Rect
pub fn rect_to_pdf(rect: &Rect) -> PdfRect {
    PdfRect::new(
        rect.x as f32,
        rect.y as f32,
        (rect.x + rect.width) as f32,
        (rect.y + rect.height) as f32,
    )
}

/// Parse a colour from the editor's formats, falling back to black
pub fn parse_color(color_value: &serde_json::Value) -> Color {
    parse_color_opt(color_value).unwrap_or_else(Color::black)
}

/// Parse a colour; `None` for empty, `none`, `transparent` or unreadable values
pub fn parse_color_opt(color_value: &serde_json::Value) -> Option<Color> {
    match color_value {
        serde_json::Value::String(s) => parse_color_str(s),
        serde_json::Value::Array(arr) if arr.len() >= 3 => {
            let channel = |v: &serde_json::Value| {
                let c = v.as_f64().unwrap_or(0.0);
                if c > 1.0 { c / 255.0 } else { c }
            };
            Some(Color::rgb(channel(&arr[0]), channel(&arr[1]), channel(&arr[2])))
        }
        _ => None,
    }
}

fn parse_color_str(s: &str) -> Option<Color> {
    let s = s.trim();
    if s.starts_with('#') {
        return Color::from_hex(s).ok();
    }

    let lower = s.to_lowercase();
    if let Some(inner) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<f64> = inner
            .split(',')
            .filter_map(|p| p.trim().parse::<f64>().ok())
            .collect();
        if parts.len() >= 3 {
            return Some(Color::rgb(parts[0] / 255.0, parts[1] / 255.0, parts[2] / 255.0));
        }
        return None;
    }

    match lower.as_str() {
        "" | "none" | "transparent" => None,
        "black" | "negro" => Some(Color::black()),
        "white" | "blanco" => Some(Color::white()),
        "red" | "rojo" => Some(Color::rgb(1.0, 0.0, 0.0)),
        "green" | "verde" => Some(Color::rgb(0.0, 0.5, 0.0)),
        "blue" | "azul" => Some(Color::rgb(0.0, 0.0, 1.0)),
        "gray" | "grey" | "gris" => Some(Color::gray(0.5)),
        "yellow" | "amarillo" => Some(Color::rgb(1.0, 1.0, 0.0)),
        "orange" | "naranja" => Some(Color::rgb(1.0, 0.65, 0.0)),
        _ => Color::from_hex(&lower).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_point_round_trip() {
        let height = 841.89;
        for &(x, y) in &[(0.0, 0.0), (1.0, 1.0), (20.99, 29.7), (3.333, 17.5), (-2.0, 40.0)] {
            let (px, py) = to_page_point(x, y, height);
            let (bx, by) = from_page_point(px, py, height);
            assert!((bx - x).abs() < 1e-9, "x {} -> {}", x, bx);
            assert!((by - y).abs() < 1e-9, "y {} -> {}", y, by);
        }
    }

    #[test]
    fn y_axis_is_flipped() {
        let (x, y) = to_page_point(1.0, 1.0, 841.89);
        assert!((x - 28.35).abs() < 1e-9);
        assert!((y - (841.89 - 28.35)).abs() < 1e-9);
    }

    #[test]
    fn box_conversion_anchors_bottom_left() {
        let r = box_to_pdf_rect(1.0, 1.0, 5.0, 3.0, 841.89);
        assert!((r.x - 28.35).abs() < 1e-9);
        assert!((r.width - 141.75).abs() < 1e-9);
        assert!((r.height - 85.05).abs() < 1e-9);
        assert!((r.top() - (841.89 - 28.35)).abs() < 1e-9);
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let a4 = Size::a4();
        let landscape = a4.for_orientation(Orientation::Landscape);
        assert_eq!(landscape.width, a4.height);
        assert_eq!(landscape.height, a4.width);
        assert_eq!(a4.for_orientation(Orientation::Portrait), a4);
        assert_eq!(Orientation::parse("Landscape"), Some(Orientation::Landscape));
        assert_eq!(Orientation::parse("diagonal"), None);
    }

    #[test]
    fn color_formats() {
        assert_eq!(parse_color(&json!("#ff0000")), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(parse_color(&json!("rgb(255, 255, 255)")), Color::white());
        assert_eq!(parse_color(&json!([0, 0, 255])), Color::rgb(0.0, 0.0, 1.0));
        assert_eq!(parse_color_opt(&json!("transparent")), None);
        assert_eq!(parse_color_opt(&json!(null)), None);
        assert_eq!(parse_color(&json!(42)), Color::black());
    }
}
