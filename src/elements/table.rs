//! Table layout engine
//!
//! A table is a stack of levels. A `static` level is exactly one row built
//! from its column templates; an `autofill` level asks the table's provider
//! for records and becomes one row per record. Rows are stacked from the top
//! of the element until the next row would overflow its height; everything
//! after that is dropped and reported as truncation.
//!
//! Layout (`plan_table`) is separate from painting so the row logic can be
//! checked without a canvas.

use std::sync::OnceLock;

use log::debug;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::document::{Geometry, LevelKind, TableElement, TableLevel};
use crate::error::{Diagnostic, DiagnosticKind, RendererResult};
use crate::font_registry::StandardFont;
use crate::geometry::cm_to_pt;
use crate::json_helpers::{merge_objects, value_to_text};
use crate::placeholder::{interpolate, resolve, PlaceholderContext};
use crate::provider::{ProviderError, ProviderPayload, ProviderRegistry, TablePayload};
use crate::renderer::RenderContext;
use crate::text_layout::HAlign;
use crate::types::{Color, Rect};

use super::provider_error_label;

/// Horizontal text padding inside a cell, in points
const CELL_PADDING: f64 = 2.0;
/// Slack for floating-point accumulation of row heights
const HEIGHT_EPSILON: f64 = 1e-6;

/// What `render` reports back to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableOutcome {
    pub rows_rendered: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowBand {
    Static,
    /// Index of the record within its level; drives the shading parity
    Data(usize),
    /// The level's provider failed
    Error(ProviderError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRow {
    pub level: usize,
    pub band: RowBand,
    /// Points
    pub height: f64,
    pub cells: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TablePlan {
    pub rows: Vec<PlannedRow>,
    pub truncated: bool,
    pub provider_errors: Vec<ProviderError>,
}

fn bracket_regex() -> Option<&'static Regex> {
    static BRACKET: OnceLock<Option<Regex>> = OnceLock::new();
    BRACKET.get_or_init(|| Regex::new(r"\[([^\[\]]+)\]").ok()).as_ref()
}

/// The whole template is a single `[key]`
fn whole_key(template: &str) -> Option<&str> {
    let trimmed = template.trim();
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() || inner.contains(['[', ']']) {
        return None;
    }
    Some(inner.trim())
}

/// Legacy paired-series key: `stem_a`/`stem_b` in column `index` reads
/// `stem_{series}_{pair}`, series `a` on odd columns and `b` on even ones,
/// pair `(index + 1) / 2`.
pub fn paired_series_alias(key: &str, column_index: usize) -> Option<String> {
    let stem = key.strip_suffix("_a").or_else(|| key.strip_suffix("_b"))?;
    if stem.is_empty() {
        return None;
    }
    let series = if column_index % 2 == 1 { 'a' } else { 'b' };
    let pair = (column_index + 1) / 2;
    Some(format!("{}_{}_{}", stem, series, pair))
}

fn lookup_record<'r>(record: &'r Map<String, Value>, key: &str, column_index: usize) -> Option<&'r Value> {
    record
        .get(key)
        .or_else(|| paired_series_alias(key, column_index).and_then(|alias| record.get(&alias)))
}

/// Expand a column template against one provider record.
///
/// A template that is exactly `[key]` tries the key, its paired-series alias,
/// then the provider's header for this column position, and finally gives "".
/// Keys embedded in longer text are replaced when found and left as written
/// otherwise.
pub fn expand_template(template: &str, record: &Map<String, Value>, column_headers: &[String], column_index: usize) -> String {
    if let Some(key) = whole_key(template) {
        return lookup_record(record, key, column_index)
            .map(value_to_text)
            .or_else(|| {
                column_headers
                    .get(column_index)
                    .and_then(|header| record.get(header))
                    .map(value_to_text)
            })
            .unwrap_or_default();
    }
    let Some(re) = bracket_regex() else {
        return template.to_string();
    };
    re.replace_all(template, |caps: &Captures| {
        lookup_record(record, caps[1].trim(), column_index)
            .map(value_to_text)
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// Static cell text: `$CURRENT` tokens, then `[name]` from the context fields
fn static_cell(template: &str, placeholders: &PlaceholderContext) -> String {
    let text = interpolate(template, placeholders);
    let Some(re) = bracket_regex() else {
        return text;
    };
    re.replace_all(&text, |caps: &Captures| {
        placeholders
            .field(caps[1].trim())
            .map(value_to_text)
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// One provider call for an autofill level
fn fetch_rows(
    table: &TableElement,
    level: &TableLevel,
    placeholders: &PlaceholderContext,
    providers: &dyn ProviderRegistry,
    data_source: &Value,
) -> Result<TablePayload, ProviderError> {
    let name = table.config.script.trim();
    if name.is_empty() {
        return Err(ProviderError::NotFound("(no script configured)".to_string()));
    }
    let params = resolve(&merge_objects(&table.config.params, level.params.as_ref()), placeholders);
    match providers.invoke(name, &params, data_source)? {
        ProviderPayload::Table(payload) => Ok(payload),
        ProviderPayload::Chart(_) => Err(ProviderError::Failed {
            provider: name.to_string(),
            detail: "returned an image where table rows were expected".to_string(),
        }),
    }
}

/// Decide which rows are drawn, calling providers for autofill levels.
/// Stops at the first row that would not fit in `max_height` points.
pub fn plan_table(
    table: &TableElement,
    max_height: f64,
    placeholders: &PlaceholderContext,
    providers: &dyn ProviderRegistry,
    data_source: &Value,
) -> TablePlan {
    let mut plan = TablePlan::default();
    let mut used = 0.0;

    'levels: for (level_index, level) in table.grid.levels.iter().enumerate() {
        let height = cm_to_pt(level.row_height);
        let rows: Vec<(RowBand, Vec<String>)> = match level.kind {
            LevelKind::Static => {
                let cells = level
                    .columns
                    .iter()
                    .map(|column| static_cell(&column.content, placeholders))
                    .collect();
                vec![(RowBand::Static, cells)]
            }
            LevelKind::Autofill => match fetch_rows(table, level, placeholders, providers, data_source) {
                Ok(payload) => {
                    debug!("Autofill level {} received {} records", level_index, payload.rows.len());
                    payload
                        .rows
                        .iter()
                        .enumerate()
                        .map(|(record_index, record)| {
                            let cells = level
                                .columns
                                .iter()
                                .enumerate()
                                .map(|(column_index, column)| {
                                    let template = interpolate(&column.content, placeholders);
                                    expand_template(&template, record, &payload.column_headers, column_index)
                                })
                                .collect();
                            (RowBand::Data(record_index), cells)
                        })
                        .collect()
                }
                Err(err) => {
                    plan.provider_errors.push(err.clone());
                    vec![(RowBand::Error(err), Vec::new())]
                }
            },
        };

        for (band, cells) in rows {
            if used + height > max_height + HEIGHT_EPSILON {
                plan.truncated = true;
                break 'levels;
            }
            used += height;
            plan.rows.push(PlannedRow {
                level: level_index,
                band,
                height,
                cells,
            });
        }
    }
    plan
}

pub fn render(ctx: &mut RenderContext<'_>, geometry: &Geometry, table: &TableElement) -> RendererResult<TableOutcome> {
    let rect = ctx.element_rect(geometry);
    let plan = plan_table(table, rect.height, ctx.placeholders, ctx.providers, ctx.data_source);

    for err in &plan.provider_errors {
        let diagnostic = Diagnostic::from_provider_error(ctx.page_number(), ctx.element(), err);
        ctx.push_diagnostic(diagnostic);
    }
    if plan.truncated {
        ctx.report(
            DiagnosticKind::TableTruncated,
            format!("table height reached after {} rows; remaining rows dropped", plan.rows.len()),
        );
    }

    let mut top = rect.top();
    for row in &plan.rows {
        let Some(level) = table.grid.levels.get(row.level) else {
            continue;
        };
        draw_row(ctx, level, row, rect.left(), top);
        top -= row.height;
    }

    Ok(TableOutcome {
        rows_rendered: plan.rows.len(),
        truncated: plan.truncated,
    })
}

fn draw_row(ctx: &mut RenderContext<'_>, level: &TableLevel, row: &PlannedRow, left: f64, top: f64) {
    let bottom = top - row.height;

    if let RowBand::Error(err) = &row.band {
        let width = cm_to_pt(level.total_width());
        let band = Rect::new(left, bottom, width, row.height);
        let font = ctx.font(StandardFont::Helvetica);
        let size = level.font.size.min(row.height * 0.7).max(4.0);
        let text = provider_error_label(err, ctx.options.error_message_chars);
        ctx.canvas.save_state();
        ctx.canvas.set_fill_color(Color::rgb(1.0, 0.94, 0.94));
        ctx.canvas.set_stroke_color(Color::red());
        ctx.canvas.set_line_width(1.0);
        ctx.canvas.rect(band, true, true);
        ctx.canvas.set_fill_color(Color::red());
        ctx.canvas.set_font(&font, size);
        ctx.canvas
            .draw_string(left + CELL_PADDING, bottom + row.height / 2.0 - size * 0.35, &text);
        ctx.canvas.restore_state();
        return;
    }

    let shading = match row.band {
        RowBand::Data(index) if index % 2 == 0 => Some(level.alternate_colors.even),
        RowBand::Data(_) => Some(level.alternate_colors.odd),
        _ => None,
    };

    let mut x = left;
    for (column_index, column) in level.columns.iter().enumerate() {
        let width = cm_to_pt(column.width);
        let cell = Rect::new(x, bottom, width, row.height);
        let text = row.cells.get(column_index).map(String::as_str).unwrap_or("");
        let background = shading.or(column.format.background);

        ctx.canvas.save_state();
        if let Some(fill) = background {
            ctx.canvas.set_fill_color(fill);
            ctx.canvas.rect(cell, true, false);
        }

        if !text.is_empty() {
            let face = StandardFont::resolve(&level.font.family, column.format.bold, false);
            let size = level.font.size;
            let font = ctx.font(face);
            let text_width = face.text_width(text, size);
            let text_x = match column.format.align {
                HAlign::Center => cell.x + (cell.width - text_width) / 2.0,
                HAlign::Right => cell.right() - CELL_PADDING - text_width,
                HAlign::Left | HAlign::Justify => cell.x + CELL_PADDING,
            };
            ctx.canvas.set_fill_color(column.format.font_color);
            ctx.canvas.set_font(&font, size);
            ctx.canvas.draw_string(text_x, cell.y + cell.height / 2.0 - size * 0.35, text);
        }

        let borders = &column.borders;
        let edges = [
            (&borders.top, (cell.left(), cell.top()), (cell.right(), cell.top())),
            (&borders.bottom, (cell.left(), cell.bottom()), (cell.right(), cell.bottom())),
            (&borders.left, (cell.left(), cell.bottom()), (cell.left(), cell.top())),
            (&borders.right, (cell.right(), cell.bottom()), (cell.right(), cell.top())),
        ];
        for (edge, from, to) in edges {
            if !edge.active || edge.width <= 0.0 {
                continue;
            }
            ctx.canvas.set_stroke_color(edge.color);
            ctx.canvas.set_line_width(edge.width);
            ctx.canvas.line(from.0, from.1, to.0, to.1);
        }
        ctx.canvas.restore_state();

        x += width;
    }
}
