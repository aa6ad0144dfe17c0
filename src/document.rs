//! Document model
//!
//! Mirrors the JSON written by the template editor. Wire names are the
//! editor's (Spanish) keys; Rust names are English. Everything that is
//! cosmetic or optional has a default so that older templates still load.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{RendererError, RendererResult};
use crate::geometry::Orientation;
use crate::json_helpers::deserialize_lenient_string;
use crate::text_layout::{HAlign, VAlign};
use crate::types::{deserialize_color_opt, Color};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub pages: BTreeMap<String, Page>,
    #[serde(rename = "configuracion", default)]
    pub config: DocumentConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    #[serde(rename = "nombre_plantilla")]
    pub template_name: String,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub version: String,
    #[serde(rename = "num_paginas")]
    pub page_count: Option<u32>,
}

impl Document {
    pub fn from_json(json: &str) -> RendererResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> RendererResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_path(path: &Path) -> RendererResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Pages sorted by their numeric key.
    /// Fails on an empty document or a key that is not a positive integer.
    pub fn ordered_pages(&self) -> RendererResult<Vec<(u32, &Page)>> {
        if self.pages.is_empty() {
            return Err(RendererError::DocumentEmpty);
        }
        let mut pages = self
            .pages
            .iter()
            .map(|(key, page)| match key.trim().parse::<u32>() {
                Ok(number) if number > 0 => Ok((number, page)),
                _ => Err(RendererError::InvalidPageKey(key.clone())),
            })
            .collect::<RendererResult<Vec<_>>>()?;
        pages.sort_by_key(|(number, _)| *number);
        Ok(pages)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(rename = "configuracion", default)]
    pub config: PageConfig,
    #[serde(rename = "elementos", default, deserialize_with = "deserialize_elements")]
    pub elements: BTreeMap<String, Element>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    #[serde(rename = "orientacion")]
    pub orientation: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            orientation: "portrait".to_string(),
        }
    }
}

impl Page {
    pub fn orientation(&self, page_number: u32) -> RendererResult<Orientation> {
        Orientation::parse(&self.config.orientation).ok_or_else(|| RendererError::InvalidOrientation {
            page: page_number,
            value: self.config.orientation.clone(),
        })
    }

    /// Visible elements in paint order: ascending z-index, ties by name
    pub fn paint_order(&self) -> Vec<(&str, &Element)> {
        let mut elements: Vec<(&str, &Element)> = self
            .elements
            .iter()
            .filter(|(_, element)| element.metadata.visible)
            .map(|(name, element)| (name.as_str(), element))
            .collect();
        elements.sort_by(|(a_name, a), (b_name, b)| {
            a.metadata
                .z_index
                .cmp(&b.metadata.z_index)
                .then_with(|| a_name.cmp(b_name))
        });
        elements
    }
}

/// A malformed element must not take the whole page down with it
fn deserialize_elements<'de, D>(deserializer: D) -> Result<BTreeMap<String, Element>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Value> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| {
            let element = Element::deserialize(&value).unwrap_or_else(|e| Element::invalid(&value, e.to_string()));
            (name, element)
        })
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Element {
    #[serde(rename = "geometria", default)]
    pub geometry: Geometry,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(rename = "grupo", default)]
    pub group: Option<Group>,
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    /// Placeholder for an element that failed to parse; keeps what can be read of its envelope
    fn invalid(value: &Value, reason: String) -> Self {
        let geometry = value
            .get("geometria")
            .and_then(|g| Geometry::deserialize(g).ok())
            .unwrap_or_default();
        let metadata = value
            .get("metadata")
            .and_then(|m| Metadata::deserialize(m).ok())
            .unwrap_or_default();
        Self {
            geometry,
            metadata,
            group: None,
            kind: ElementKind::Invalid(reason),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Position and size in centimeters, top-left origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "ancho")]
    pub width: f64,
    #[serde(rename = "alto")]
    pub height: f64,
    pub x1: Option<f64>,
    pub y1: Option<f64>,
    pub x2: Option<f64>,
    pub y2: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(rename = "zIndex")]
    pub z_index: i64,
    pub visible: bool,
    #[serde(rename = "bloqueado")]
    pub locked: bool,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            z_index: 0,
            visible: true,
            locked: false,
        }
    }
}

/// Editor grouping; no effect on output
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Group {
    #[serde(rename = "nombre")]
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "tipo")]
pub enum ElementKind {
    #[serde(rename = "linea", alias = "line")]
    Line(LineElement),
    #[serde(rename = "rectangulo", alias = "rectangle")]
    Rectangle(RectangleElement),
    #[serde(rename = "texto", alias = "text")]
    Text(TextElement),
    #[serde(rename = "imagen", alias = "image")]
    Image(ImageElement),
    #[serde(rename = "grafico", alias = "chart")]
    Chart(ChartElement),
    #[serde(rename = "tabla", alias = "table")]
    Table(TableElement),
    #[serde(skip)]
    Invalid(String),
    #[serde(other)]
    Unknown,
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Line(_) => "linea",
            ElementKind::Rectangle(_) => "rectangulo",
            ElementKind::Text(_) => "texto",
            ElementKind::Image(_) => "imagen",
            ElementKind::Chart(_) => "grafico",
            ElementKind::Table(_) => "tabla",
            ElementKind::Invalid(_) => "invalid",
            ElementKind::Unknown => "unknown",
        }
    }
}

/// Opacity as authored: 0..=1, or a percentage when above 1
pub fn normalize_opacity(value: f64) -> f64 {
    if !value.is_finite() {
        return 1.0;
    }
    let value = if value > 1.0 { value / 100.0 } else { value };
    value.clamp(0.0, 1.0)
}

// ===== Line =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LineElement {
    #[serde(rename = "estilo")]
    pub style: LineStyle,
    pub x1: Option<f64>,
    pub y1: Option<f64>,
    pub x2: Option<f64>,
    pub y2: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LineStyle {
    /// Stroke width in points
    #[serde(rename = "grosor")]
    pub width: f64,
    pub color: Color,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            color: Color::black(),
        }
    }
}

// ===== Rectangle =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RectangleElement {
    #[serde(rename = "estilo")]
    pub style: RectangleStyle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RectangleStyle {
    #[serde(rename = "grosor_borde")]
    pub border_width: f64,
    #[serde(rename = "color_borde")]
    pub border_color: Color,
    #[serde(rename = "color_relleno", deserialize_with = "deserialize_color_opt")]
    pub fill_color: Option<Color>,
    #[serde(rename = "opacidad")]
    pub opacity: f64,
}

impl Default for RectangleStyle {
    fn default() -> Self {
        Self {
            border_width: 1.0,
            border_color: Color::black(),
            fill_color: None,
            opacity: 1.0,
        }
    }
}

// ===== Text =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextElement {
    #[serde(rename = "estilo")]
    pub style: TextStyle,
    #[serde(rename = "contenido")]
    pub content: TextContent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    #[serde(rename = "familia_fuente")]
    pub font_family: String,
    #[serde(rename = "tamano")]
    pub font_size: f64,
    #[serde(rename = "negrita")]
    pub bold: bool,
    #[serde(rename = "cursiva")]
    pub italic: bool,
    pub color: Color,
    #[serde(rename = "alineacion_h")]
    pub h_align: HAlign,
    #[serde(rename = "alineacion_v")]
    pub v_align: VAlign,
    /// Degrees, clockwise as shown in the editor
    #[serde(rename = "rotacion")]
    pub rotation: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            font_size: 12.0,
            bold: false,
            italic: false,
            color: Color::black(),
            h_align: HAlign::Left,
            v_align: VAlign::Top,
            rotation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextContent {
    #[serde(rename = "texto", deserialize_with = "deserialize_lenient_string")]
    pub text: String,
    /// Shrink the font until the block fits the box
    #[serde(rename = "ajuste_automatico")]
    pub auto_fit: bool,
    pub editable: bool,
}

// ===== Image =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageElement {
    #[serde(rename = "estilo")]
    pub style: ImageStyle,
    #[serde(rename = "imagen")]
    pub source: ImageSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageStyle {
    #[serde(rename = "opacidad")]
    pub opacity: f64,
    #[serde(rename = "mantener_proporcion")]
    pub keep_aspect: bool,
    /// Inset in points applied on every edge
    #[serde(rename = "reduccion")]
    pub inset: f64,
}

impl Default for ImageStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            keep_aspect: false,
            inset: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageSource {
    #[serde(rename = "formato")]
    pub format: Option<String>,
    /// Inline payload, base64 or data URL
    #[serde(rename = "datos_temp")]
    pub inline_data: Option<String>,
    #[serde(rename = "ruta_nueva")]
    pub path: Option<String>,
    #[serde(rename = "nombre_archivo")]
    pub file_name: Option<String>,
    #[serde(rename = "estado")]
    pub status: Option<String>,
}

// ===== Chart =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartElement {
    #[serde(rename = "configuracion")]
    pub config: ChartConfig,
    #[serde(rename = "estilo")]
    pub style: ChartStyle,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub script: String,
    #[serde(rename = "formato")]
    pub format: Option<String>,
    #[serde(rename = "parametros")]
    pub params: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    #[serde(rename = "opacidad")]
    pub opacity: f64,
    #[serde(rename = "reduccion")]
    pub inset: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            inset: 0.0,
        }
    }
}

// ===== Table =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableElement {
    #[serde(rename = "configuracion")]
    pub config: TableConfig,
    #[serde(rename = "cuadricula")]
    pub grid: TableGrid,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub script: String,
    #[serde(rename = "parametros")]
    pub params: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableGrid {
    #[serde(rename = "niveles")]
    pub levels: Vec<TableLevel>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum LevelKind {
    #[default]
    Static,
    Autofill,
}

impl From<String> for LevelKind {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "autofill" | "auto" | "autorelleno" | "dinamico" | "dinámico" => LevelKind::Autofill,
            _ => LevelKind::Static,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableLevel {
    #[serde(rename = "tipo")]
    pub kind: LevelKind,
    /// Row height in centimeters
    #[serde(rename = "alto_fila")]
    pub row_height: f64,
    #[serde(rename = "fuente")]
    pub font: LevelFont,
    #[serde(rename = "colores_alternos")]
    pub alternate_colors: AlternateColors,
    #[serde(rename = "columnas")]
    pub columns: Vec<TableColumn>,
    /// Merged over the table's provider parameters for this level
    #[serde(rename = "parametros")]
    pub params: Option<Value>,
}

impl Default for TableLevel {
    fn default() -> Self {
        Self {
            kind: LevelKind::Static,
            row_height: 0.6,
            font: LevelFont::default(),
            alternate_colors: AlternateColors::default(),
            columns: Vec::new(),
            params: None,
        }
    }
}

impl TableLevel {
    /// Sum of the column widths in centimeters
    pub fn total_width(&self) -> f64 {
        self.columns.iter().map(|c| c.width).sum()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LevelFont {
    #[serde(rename = "familia")]
    pub family: String,
    #[serde(rename = "tamano")]
    pub size: f64,
}

impl Default for LevelFont {
    fn default() -> Self {
        Self {
            family: "Helvetica".to_string(),
            size: 8.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlternateColors {
    #[serde(rename = "par")]
    pub even: Color,
    #[serde(rename = "impar")]
    pub odd: Color,
}

impl Default for AlternateColors {
    fn default() -> Self {
        Self {
            even: Color::white(),
            odd: Color::gray(0.949),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableColumn {
    /// Width in centimeters
    #[serde(rename = "ancho")]
    pub width: f64,
    /// Literal text or a `[key]` template
    #[serde(rename = "contenido", deserialize_with = "deserialize_lenient_string")]
    pub content: String,
    #[serde(rename = "formato")]
    pub format: ColumnFormat,
    #[serde(rename = "bordes")]
    pub borders: BorderSet,
}

impl Default for TableColumn {
    fn default() -> Self {
        Self {
            width: 2.0,
            content: String::new(),
            format: ColumnFormat::default(),
            borders: BorderSet::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnFormat {
    #[serde(rename = "color_fuente")]
    pub font_color: Color,
    #[serde(rename = "color_fondo", deserialize_with = "deserialize_color_opt")]
    pub background: Option<Color>,
    #[serde(rename = "alineacion")]
    pub align: HAlign,
    #[serde(rename = "negrita")]
    pub bold: bool,
}

impl Default for ColumnFormat {
    fn default() -> Self {
        Self {
            font_color: Color::black(),
            background: None,
            align: HAlign::Left,
            bold: false,
        }
    }
}

/// The four edges of one cell
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BorderSet {
    #[serde(rename = "superior")]
    pub top: BorderEdge,
    #[serde(rename = "inferior")]
    pub bottom: BorderEdge,
    #[serde(rename = "izquierdo")]
    pub left: BorderEdge,
    #[serde(rename = "derecho")]
    pub right: BorderEdge,
}

impl Default for BorderSet {
    fn default() -> Self {
        Self::uniform(BorderEdge::default())
    }
}

impl BorderSet {
    pub fn uniform(edge: BorderEdge) -> Self {
        Self {
            top: edge.clone(),
            bottom: edge.clone(),
            left: edge.clone(),
            right: edge,
        }
    }

    /// Expand an authoring preset into the four-edge form.
    /// Unknown presets give a full box.
    pub fn from_preset(preset: &str, width: f64, color: Color) -> Self {
        let on = BorderEdge { active: true, width, color };
        let off = BorderEdge { active: false, width, color };
        let pick = |top: bool, bottom: bool, left: bool, right: bool| Self {
            top: if top { on.clone() } else { off.clone() },
            bottom: if bottom { on.clone() } else { off.clone() },
            left: if left { on.clone() } else { off.clone() },
            right: if right { on.clone() } else { off.clone() },
        };
        match preset.trim().to_lowercase().as_str() {
            "none" | "ninguno" => pick(false, false, false, false),
            "top" | "top-only" | "superior" => pick(true, false, false, false),
            "bottom" | "bottom-only" | "inferior" => pick(false, true, false, false),
            "horizontal" => pick(true, true, false, false),
            "vertical" => pick(false, false, true, true),
            _ => pick(true, true, true, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BorderEdge {
    #[serde(rename = "activo")]
    pub active: bool,
    /// Points
    #[serde(rename = "grosor")]
    pub width: f64,
    pub color: Color,
}

impl Default for BorderEdge {
    fn default() -> Self {
        Self {
            active: true,
            width: 0.5,
            color: Color::black(),
        }
    }
}
