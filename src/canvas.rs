//! High-level Canvas-like API wrapper for pdf-writer
//!
//! Besides emitting content-stream operators, the canvas keeps a journal of
//! the primitives it painted (in user-space coordinates, before any
//! transformation). Element renderers are tested against that journal.

use pdf_writer::{Content, Name, Str};

use crate::types::{Color, Rect};
use crate::unicode_utils::unicode_to_winansi;

/// Canvas state for graphics operations
#[derive(Debug, Clone)]
pub struct CanvasState {
    pub fill_color: Color,
    pub stroke_color: Color,
    pub line_width: f64,
    pub font_name: String,
    pub font_size: f64,
    pub dash_pattern: Option<(Vec<f64>, f64)>,
    /// Fill alpha of the active ExtGState
    pub alpha: f64,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            fill_color: Color::black(),
            stroke_color: Color::black(),
            line_width: 1.0,
            font_name: "F1".to_string(),
            font_size: 12.0,
            dash_pattern: None,
            alpha: 1.0,
        }
    }
}

/// A painted primitive, as recorded by the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        rect: Rect,
        fill: Option<Color>,
        stroke: Option<Color>,
        line_width: f64,
        alpha: f64,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
        width: f64,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        font: String,
        size: f64,
        color: Color,
    },
    Image {
        name: String,
        rect: Rect,
        alpha: f64,
    },
}

/// High-level Canvas wrapper for pdf-writer
pub struct PdfCanvas {
    content: Content,
    state: CanvasState,
    state_stack: Vec<CanvasState>,
    ops: Vec<DrawOp>,
}

impl PdfCanvas {
    pub fn new() -> Self {
        Self {
            content: Content::new(),
            state: CanvasState::default(),
            state_stack: Vec::new(),
            ops: Vec::new(),
        }
    }

    /// Finish the page: returns the raw content stream and the journal
    pub fn finish(self) -> (Vec<u8>, Vec<DrawOp>) {
        (self.content.finish(), self.ops)
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    // ===== State Management =====

    pub fn save_state(&mut self) {
        self.state_stack.push(self.state.clone());
        self.content.save_state();
    }

    pub fn restore_state(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.state = state;
            self.content.restore_state();
        }
    }

    /// Current nesting depth of save_state
    pub fn depth(&self) -> usize {
        self.state_stack.len()
    }

    /// Pop saved states until the stack is back to `depth`.
    /// Used to recover after an element failed half way through drawing.
    pub fn restore_to(&mut self, depth: usize) {
        while self.state_stack.len() > depth {
            self.restore_state();
        }
    }

    // ===== Colors =====

    pub fn set_fill_color(&mut self, color: Color) {
        self.state.fill_color = color;
        self.content.set_fill_rgb(color.r as f32, color.g as f32, color.b as f32);
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.state.stroke_color = color;
        self.content.set_stroke_rgb(color.r as f32, color.g as f32, color.b as f32);
    }

    /// Activate a named ExtGState resource whose fill alpha is `alpha`
    pub fn set_ext_graphics_state(&mut self, name: &str, alpha: f64) {
        self.state.alpha = alpha;
        self.content.set_parameters(Name(name.as_bytes()));
    }

    // ===== Drawing =====

    pub fn rect(&mut self, rect: Rect, fill: bool, stroke: bool) {
        if !fill && !stroke {
            return;
        }
        self.content
            .rect(rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32);
        match (fill, stroke) {
            (true, true) => self.content.fill_nonzero_and_stroke(),
            (true, false) => self.content.fill_nonzero(),
            _ => self.content.stroke(),
        };
        self.ops.push(DrawOp::Rect {
            rect,
            fill: fill.then_some(self.state.fill_color),
            stroke: stroke.then_some(self.state.stroke_color),
            line_width: self.state.line_width,
            alpha: self.state.alpha,
        });
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.content.move_to(x1 as f32, y1 as f32);
        self.content.line_to(x2 as f32, y2 as f32);
        self.content.stroke();
        self.ops.push(DrawOp::Line {
            from: (x1, y1),
            to: (x2, y2),
            color: self.state.stroke_color,
            width: self.state.line_width,
        });
    }

    // ===== Text =====

    pub fn set_font(&mut self, font_name: &str, size: f64) {
        self.state.font_name = font_name.to_string();
        self.state.font_size = size;
    }

    /// Draw one line of text with its baseline starting at (x, y)
    pub fn draw_string(&mut self, x: f64, y: f64, text: &str) {
        if text.is_empty() {
            return;
        }
        self.content.begin_text();
        self.content
            .set_font(Name(self.state.font_name.as_bytes()), self.state.font_size as f32);
        self.content.next_line(x as f32, y as f32);
        let winansi_bytes = unicode_to_winansi(text);
        self.content.show(Str(&winansi_bytes));
        self.content.end_text();
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            font: self.state.font_name.clone(),
            size: self.state.font_size,
            color: self.state.fill_color,
        });
    }

    // ===== Transformations =====

    pub fn translate(&mut self, x: f64, y: f64) {
        self.content.transform([1.0, 0.0, 0.0, 1.0, x as f32, y as f32]);
    }

    /// Counter-clockwise rotation in degrees (PDF convention)
    pub fn rotate(&mut self, angle_degrees: f64) {
        let angle_rad = angle_degrees.to_radians();
        let cos_a = angle_rad.cos() as f32;
        let sin_a = angle_rad.sin() as f32;
        self.content.transform([cos_a, sin_a, -sin_a, cos_a, 0.0, 0.0]);
    }

    // ===== Line Styles =====

    pub fn set_line_width(&mut self, width: f64) {
        self.state.line_width = width;
        self.content.set_line_width(width as f32);
    }

    pub fn set_dash(&mut self, pattern: &[f64], offset: f64) {
        self.state.dash_pattern = Some((pattern.to_vec(), offset));
        self.content
            .set_dash_pattern(pattern.iter().map(|&x| x as f32), offset as f32);
    }

    // ===== Images =====

    /// Paint an image XObject stretched over `rect`
    pub fn draw_image(&mut self, image_name: &str, rect: Rect) {
        self.content.save_state();
        // images are drawn into the unit square; scale and move it onto rect
        self.content.transform([
            rect.width as f32,
            0.0,
            0.0,
            rect.height as f32,
            rect.x as f32,
            rect.y as f32,
        ]);
        self.content.x_object(Name(image_name.as_bytes()));
        self.content.restore_state();
        self.ops.push(DrawOp::Image {
            name: image_name.to_string(),
            rect,
            alpha: self.state.alpha,
        });
    }
}

impl Default for PdfCanvas {
    fn default() -> Self {
        Self::new()
    }
}
