//! Glyph width metrics for the PDF standard fonts
//!
//! Widths are the AFM advance widths (1/1000 em) for printable ASCII.
//! Accented Latin letters borrow the width of their base letter; anything
//! else uses the font's average width. Italic faces share the upright tables.

use crate::unicode_utils::latin_base;

const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 930,
    722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944,
    722, 778, 611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667,
    333, 278, 333, 581, 500, 333,
    500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833,
    556, 500, 556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444,
    394, 220, 394, 520,
];

/// Width table family used for measuring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsFamily {
    Helvetica { bold: bool },
    Times { bold: bool },
    Courier,
}

impl MetricsFamily {
    fn table(&self) -> Option<&'static [u16; 95]> {
        match self {
            MetricsFamily::Helvetica { bold: false } => Some(&HELVETICA),
            MetricsFamily::Helvetica { bold: true } => Some(&HELVETICA_BOLD),
            MetricsFamily::Times { bold: false } => Some(&TIMES_ROMAN),
            MetricsFamily::Times { bold: true } => Some(&TIMES_BOLD),
            MetricsFamily::Courier => None,
        }
    }

    fn fallback_width(&self) -> u16 {
        match self {
            MetricsFamily::Helvetica { .. } => 556,
            MetricsFamily::Times { .. } => 500,
            MetricsFamily::Courier => 600,
        }
    }

    /// Advance width of one character in 1/1000 em
    pub fn char_width(&self, ch: char) -> u16 {
        let Some(table) = self.table() else {
            return 600;
        };
        let base = latin_base(ch);
        let code = base as u32;
        if (0x20..=0x7E).contains(&code) {
            table[(code - 0x20) as usize]
        } else {
            self.fallback_width()
        }
    }

    /// Width of `text` in points at `font_size`
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let units: u32 = text.chars().map(|ch| self.char_width(ch) as u32).sum();
        units as f64 * font_size / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths() {
        let helv = MetricsFamily::Helvetica { bold: false };
        assert_eq!(helv.char_width(' '), 278);
        assert_eq!(helv.char_width('W'), 944);
        assert_eq!(helv.char_width('~'), 584);
        assert_eq!(helv.char_width('á'), helv.char_width('a'));
        assert!((helv.text_width("ii", 10.0) - 4.44).abs() < 1e-9);
    }

    #[test]
    fn courier_is_monospaced() {
        let c = MetricsFamily::Courier;
        assert_eq!(c.text_width("iW", 10.0), c.text_width("mm", 10.0));
    }

    #[test]
    fn bold_is_wider() {
        let regular = MetricsFamily::Times { bold: false }.text_width("Report", 12.0);
        let bold = MetricsFamily::Times { bold: true }.text_width("Report", 12.0);
        assert!(bold > regular);
    }
}
