//! Text layout inside a box
//!
//! Content is split on explicit line breaks only; lines are never wrapped.
//! Each line is measured with the standard-font metrics and positioned by
//! the horizontal alignment, then the whole block is shifted vertically.

use serde::Deserialize;

use crate::font_registry::StandardFont;
use crate::types::Rect;

/// Baseline-to-baseline distance as a multiple of the font size
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Smallest size auto-fit will shrink to
pub const MIN_AUTO_FIT_SIZE: f64 = 4.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl HAlign {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "center" | "centre" | "centro" | "centrado" => HAlign::Center,
            "right" | "derecha" => HAlign::Right,
            "justify" | "justified" | "justificado" | "justificar" => HAlign::Justify,
            _ => HAlign::Left,
        }
    }
}

impl From<String> for HAlign {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl VAlign {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "middle" | "center" | "centre" | "medio" | "centro" => VAlign::Middle,
            "bottom" | "abajo" | "inferior" => VAlign::Bottom,
            _ => VAlign::Top,
        }
    }
}

impl From<String> for VAlign {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// One laid-out line: its baseline and the runs to draw on it.
/// Justified lines have one run per word, others a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub baseline: f64,
    pub runs: Vec<(f64, String)>,
}

/// Split on `\n`, tolerating `\r\n`
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').map(|line| line.trim_end_matches('\r')).collect()
}

pub fn line_height(font_size: f64) -> f64 {
    font_size * LINE_HEIGHT_FACTOR
}

/// Baseline of the first line for a block of `line_count` lines
pub fn first_baseline(rect: &Rect, font_size: f64, line_count: usize, v_align: VAlign) -> f64 {
    let block_height = line_count as f64 * line_height(font_size);
    match v_align {
        VAlign::Top => rect.top() - font_size,
        VAlign::Middle => rect.top() - (rect.height - block_height) / 2.0 - font_size,
        VAlign::Bottom => rect.bottom() + block_height - font_size,
    }
}

/// Position every line of `text` inside `rect`
pub fn layout_block(
    text: &str,
    font: StandardFont,
    font_size: f64,
    rect: &Rect,
    h_align: HAlign,
    v_align: VAlign,
) -> Vec<PlacedLine> {
    let lines = split_lines(text);
    let mut baseline = first_baseline(rect, font_size, lines.len(), v_align);
    let step = line_height(font_size);

    let mut placed = Vec::with_capacity(lines.len());
    for line in lines {
        placed.push(PlacedLine {
            baseline,
            runs: place_line(line, font, font_size, rect, h_align),
        });
        baseline -= step;
    }
    placed
}

fn place_line(line: &str, font: StandardFont, font_size: f64, rect: &Rect, h_align: HAlign) -> Vec<(f64, String)> {
    let width = font.text_width(line, font_size);
    match h_align {
        HAlign::Left => vec![(rect.left(), line.to_string())],
        HAlign::Right => vec![(rect.right() - width, line.to_string())],
        HAlign::Center => vec![(rect.left() + (rect.width - width) / 2.0, line.to_string())],
        HAlign::Justify => justify(line, font, font_size, rect)
            .unwrap_or_else(|| vec![(rect.left(), line.to_string())]),
    }
}

/// Spread words across the box width; `None` when there is nothing to spread
fn justify(line: &str, font: StandardFont, font_size: f64, rect: &Rect) -> Option<Vec<(f64, String)>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }
    let widths: Vec<f64> = words.iter().map(|w| font.text_width(w, font_size)).collect();
    let total: f64 = widths.iter().sum();
    let space = font.text_width(" ", font_size);
    let gap = ((rect.width - total) / (words.len() - 1) as f64).max(space);

    let mut x = rect.left();
    let mut runs = Vec::with_capacity(words.len());
    for (word, width) in words.iter().zip(widths) {
        runs.push((x, word.to_string()));
        x += width + gap;
    }
    Some(runs)
}

/// Largest size not above `font_size` at which every line fits the box.
/// Widths and line height scale linearly with the size, so the fit is solved
/// at 1 pt and scaled.
pub fn fit_font_size(text: &str, font: StandardFont, font_size: f64, rect: &Rect) -> f64 {
    let lines = split_lines(text);
    let widest = lines
        .iter()
        .map(|line| font.text_width(line, 1.0))
        .fold(0.0, f64::max);
    let block = lines.len() as f64 * line_height(1.0);

    let by_width = if widest > 0.0 { rect.width / widest } else { f64::INFINITY };
    let by_height = if block > 0.0 { rect.height / block } else { f64::INFINITY };
    // hundredths of a point, rounded down so the result never overshoots
    let fit = (by_width.min(by_height) * 100.0).floor() / 100.0;
    if !font_size.is_finite() || font_size > fit {
        return fit.max(MIN_AUTO_FIT_SIZE);
    }
    font_size.max(MIN_AUTO_FIT_SIZE)
}
