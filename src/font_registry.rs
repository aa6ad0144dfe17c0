//! Font registry for the PDF standard fonts
//!
//! Templates name arbitrary font families, but only the fourteen standard PDF
//! fonts are guaranteed to render everywhere. Families are mapped onto the
//! Helvetica, Times and Courier faces and each face is written to the PDF
//! once, on first use.

use std::collections::BTreeMap;

use pdf_writer::{Name, Pdf, Ref};

use crate::font_utils::MetricsFamily;
use crate::renderer::RefAllocator;

/// One of the twelve Latin standard faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Sans,
    Serif,
    Mono,
}

impl StandardFont {
    /// Map a family name plus weight/slant onto a standard face.
    /// Unknown families degrade to Helvetica.
    pub fn resolve(family: &str, bold: bool, italic: bool) -> Self {
        let family = Self::classify(family);
        match (family, bold, italic) {
            (Family::Sans, false, false) => StandardFont::Helvetica,
            (Family::Sans, true, false) => StandardFont::HelveticaBold,
            (Family::Sans, false, true) => StandardFont::HelveticaOblique,
            (Family::Sans, true, true) => StandardFont::HelveticaBoldOblique,
            (Family::Serif, false, false) => StandardFont::TimesRoman,
            (Family::Serif, true, false) => StandardFont::TimesBold,
            (Family::Serif, false, true) => StandardFont::TimesItalic,
            (Family::Serif, true, true) => StandardFont::TimesBoldItalic,
            (Family::Mono, false, false) => StandardFont::Courier,
            (Family::Mono, true, false) => StandardFont::CourierBold,
            (Family::Mono, false, true) => StandardFont::CourierOblique,
            (Family::Mono, true, true) => StandardFont::CourierBoldOblique,
        }
    }

    fn classify(family: &str) -> Family {
        let lower = family.trim().to_lowercase();
        let serif = ["times", "serif", "georgia", "garamond", "cambria", "book antiqua", "palatino"];
        let mono = ["courier", "mono", "consolas", "menlo", "lucida console"];
        if mono.iter().any(|m| lower.contains(m)) {
            Family::Mono
        } else if serif.iter().any(|s| lower.contains(s)) && !lower.contains("sans") {
            Family::Serif
        } else {
            Family::Sans
        }
    }

    /// PostScript name written as /BaseFont
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    pub fn metrics(&self) -> MetricsFamily {
        match self {
            StandardFont::Helvetica | StandardFont::HelveticaOblique => MetricsFamily::Helvetica { bold: false },
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => MetricsFamily::Helvetica { bold: true },
            StandardFont::TimesRoman | StandardFont::TimesItalic => MetricsFamily::Times { bold: false },
            StandardFont::TimesBold | StandardFont::TimesBoldItalic => MetricsFamily::Times { bold: true },
            _ => MetricsFamily::Courier,
        }
    }

    /// Width of `text` in points
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        self.metrics().text_width(text, font_size)
    }
}

pub struct FontRegistry {
    // face → (font object id, font resource name)
    fonts: BTreeMap<StandardFont, (Ref, String)>,
    used_on_page: BTreeMap<String, Ref>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self {
            fonts: BTreeMap::new(),
            used_on_page: BTreeMap::new(),
        }
    }

    pub fn get(&self, font: StandardFont) -> Option<(Ref, &str)> {
        self.fonts.get(&font).map(|(id, name)| (*id, name.as_str()))
    }

    /// Get or register a standard font and mark it as used on the current page.
    /// Returns the font resource name (e.g. "F1").
    pub fn get_or_builtin(&mut self, pdf: &mut Pdf, refs: &mut RefAllocator, font: StandardFont) -> String {
        let next_index = self.fonts.len() + 1;
        let (id, name) = self
            .fonts
            .entry(font)
            .or_insert_with(|| {
                let font_id = refs.next();
                pdf.type1_font(font_id)
                    .base_font(Name(font.base_font().as_bytes()))
                    .pair(Name(b"Encoding"), Name(b"WinAnsiEncoding"));
                (font_id, format!("F{}", next_index))
            })
            .clone();
        self.used_on_page.insert(name.clone(), id);
        name
    }

    /// Forget the per-page usage set (call when a new page starts)
    pub fn begin_page(&mut self) {
        self.used_on_page.clear();
    }

    /// Write the fonts used on the current page into its Resources
    pub fn write_resources(&self, resources: &mut pdf_writer::writers::Resources<'_>) {
        if self.used_on_page.is_empty() {
            return;
        }
        let mut dict = resources.fonts();
        for (name, id) in &self.used_on_page {
            dict.pair(Name(name.as_bytes()), *id);
        }
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}
