//! Shared value types: rectangles, sizes and colours in PDF space

use serde::{Deserialize, Deserializer, Serialize};

/// Rectangle with position and size (points, bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn bottom(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Shrink by `amount` points on every edge. Never produces a negative size.
    pub fn inset(&self, amount: f64) -> Self {
        let width = (self.width - 2.0 * amount).max(0.0);
        let height = (self.height - 2.0 * amount).max(0.0);
        Self::new(self.x + amount, self.y + amount, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Largest rectangle with the given aspect ratio centred inside `self`
    pub fn fit_aspect(&self, content_width: f64, content_height: f64) -> Self {
        if content_width <= 0.0 || content_height <= 0.0 || self.is_empty() {
            return *self;
        }
        let scale = (self.width / content_width).min(self.height / content_height);
        let w = content_width * scale;
        let h = content_height * scale;
        Self::new(
            self.x + (self.width - w) / 2.0,
            self.y + (self.height - h) / 2.0,
            w,
            h,
        )
    }
}

/// Size with width and height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// ISO A4 in points
    pub fn a4() -> Self {
        Self::new(595.28, 841.89)
    }

    pub fn swapped(&self) -> Self {
        Self::new(self.height, self.width)
    }
}

/// Color representation (components in 0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(format!("Invalid hex color: #{}", hex));
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => hex[..6].to_string(),
            _ => return Err(format!("Invalid hex color: #{}", hex)),
        };

        let channel = |range: std::ops::Range<usize>| -> Result<f64, String> {
            expanded
                .get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .map(|v| v as f64 / 255.0)
                .ok_or_else(|| format!("Invalid hex color: #{}", hex))
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(&self) -> String {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
    }

    pub fn black() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0 }
    }

    pub fn white() -> Self {
        Self { r: 1.0, g: 1.0, b: 1.0 }
    }

    pub fn red() -> Self {
        Self { r: 0.85, g: 0.1, b: 0.1 }
    }

    pub fn gray(level: f64) -> Self {
        Self { r: level, g: level, b: level }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(crate::geometry::parse_color(&value))
    }
}

/// Deserialize an optional colour where `""`, `"none"` and `"transparent"` mean no colour
pub fn deserialize_color_opt<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(crate::geometry::parse_color_opt(&value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(Color::from_hex("#ffffff").unwrap(), Color::white());
        assert_eq!(Color::from_hex("#000").unwrap(), Color::black());
        assert_eq!(Color::from_hex("ff0000").unwrap().r, 1.0);
        assert!(Color::from_hex("#12").is_err());
        assert_eq!(Color::rgb(1.0, 0.0, 0.0).to_hex(), "#ff0000");
    }

    #[test]
    fn inset_never_negative() {
        let r = Rect::new(0.0, 0.0, 10.0, 4.0).inset(3.0);
        assert_eq!(r.height, 0.0);
        assert!(r.is_empty());
    }

    #[test]
    fn fit_aspect_centres_content() {
        let r = Rect::new(0.0, 0.0, 200.0, 100.0).fit_aspect(50.0, 50.0);
        assert_eq!(r, Rect::new(50.0, 0.0, 100.0, 100.0));
    }
}
