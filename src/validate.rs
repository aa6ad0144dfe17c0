//! Advisory layout checks
//!
//! Table column widths are authored by hand and never shrunk at render time.
//! `check_widths` lists the levels that would spill past their element or off
//! the page so a template editor can warn before a report is produced.

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::document::{Document, ElementKind};
use crate::error::RendererResult;
use crate::geometry::pt_to_cm;
use crate::options::RenderOptions;

const WIDTH_TOLERANCE_CM: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowLimit {
    /// Wider than the table element's own box
    Element,
    /// Runs past the right edge of the page
    Page,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidthOverflow {
    pub page: u32,
    pub element: String,
    pub level: usize,
    pub limit: OverflowLimit,
    /// Summed column widths, cm
    pub total_width: f64,
    /// Width available against `limit`, cm
    pub available: f64,
}

impl fmt::Display for WidthOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let against = match self.limit {
            OverflowLimit::Element => "element",
            OverflowLimit::Page => "page",
        };
        write!(
            f,
            "page {}, table '{}', level {}: columns take {:.2} cm, {} allows {:.2} cm",
            self.page, self.element, self.level, self.total_width, against, self.available
        )
    }
}

/// Compare every table level's summed column widths with its element width
/// and with the room left on the page. Fails only on structural problems.
pub fn check_widths(document: &Document, options: &RenderOptions) -> RendererResult<Vec<WidthOverflow>> {
    let mut overflows = Vec::new();
    for (number, page) in document.ordered_pages()? {
        let page_width = pt_to_cm(options.page_size.for_orientation(page.orientation(number)?).width);
        for (name, element) in &page.elements {
            let ElementKind::Table(table) = &element.kind else {
                continue;
            };
            let geometry = &element.geometry;
            let room_on_page = page_width - geometry.x;
            for (level, entry) in table.grid.levels.iter().enumerate() {
                let total_width = entry.total_width();
                let mut push = |limit, available: f64| {
                    overflows.push(WidthOverflow {
                        page: number,
                        element: name.clone(),
                        level,
                        limit,
                        total_width,
                        available,
                    })
                };
                if total_width > geometry.width + WIDTH_TOLERANCE_CM {
                    push(OverflowLimit::Element, geometry.width);
                }
                if total_width > room_on_page + WIDTH_TOLERANCE_CM {
                    push(OverflowLimit::Page, room_on_page);
                }
            }
        }
    }
    debug!("Width check found {} overflowing table levels", overflows.len());
    Ok(overflows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RendererError;
    use serde_json::json;

    fn document(orientation: &str, x: f64, width: f64, columns: &[f64]) -> Document {
        let columns: Vec<_> = columns.iter().map(|w| json!({"ancho": w})).collect();
        Document::from_value(json!({
            "pages": {"1": {
                "configuracion": {"orientacion": orientation},
                "elementos": {
                    "grid": {
                        "tipo": "tabla",
                        "geometria": {"x": x, "y": 2, "ancho": width, "alto": 5},
                        "cuadricula": {"niveles": [{"tipo": "static", "columnas": columns}]}
                    },
                    "title": {"tipo": "texto", "geometria": {"x": 1, "y": 1, "ancho": 40, "alto": 1}}
                }
            }}
        }))
        .unwrap()
    }

    #[test]
    fn fitting_table_is_clean() {
        let doc = document("portrait", 1.0, 10.0, &[4.0, 6.0]);
        assert!(check_widths(&doc, &RenderOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn wider_than_element() {
        let doc = document("portrait", 1.0, 8.0, &[4.0, 6.0]);
        let found = check_widths(&doc, &RenderOptions::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].limit, OverflowLimit::Element);
        assert_eq!(found[0].element, "grid");
        assert!((found[0].total_width - 10.0).abs() < 1e-9);
    }

    #[test]
    fn off_the_page_depends_on_orientation() {
        // A4 portrait is about 21 cm wide
        let doc = document("portrait", 15.0, 10.0, &[5.0, 5.0]);
        let found = check_widths(&doc, &RenderOptions::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].limit, OverflowLimit::Page);
        assert!(found[0].to_string().contains("page 1, table 'grid'"));

        let doc = document("landscape", 15.0, 10.0, &[5.0, 5.0]);
        assert!(check_widths(&doc, &RenderOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn structural_errors_propagate() {
        let doc = document("sideways", 1.0, 10.0, &[1.0]);
        assert!(matches!(
            check_widths(&doc, &RenderOptions::default()),
            Err(RendererError::InvalidOrientation { page: 1, .. })
        ));
    }
}
