use serde::Serialize;

use crate::layer::OverlayCategory;
use crate::symbology::{LINE_COLOR, POINT_FILL, POINT_OUTLINE, POLY_FILL, POLY_OUTLINE};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub fn css_class(&self) -> &'static str {
        match self {
            Corner::TopLeft => "topleft",
            Corner::TopRight => "topright",
            Corner::BottomLeft => "bottomleft",
            Corner::BottomRight => "bottomright",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Swatch {
    Circle {
        fill: &'static str,
        outline: &'static str,
    },
    Line {
        color: &'static str,
    },
    Area {
        fill: &'static str,
        outline: &'static str,
    },
}

impl Swatch {
    fn inline_style(&self) -> String {
        match self {
            Swatch::Circle { fill, outline } => format!(
                "display:inline-block;width:12px;height:12px;border-radius:50%;\
                 background:{fill};border:2px solid {outline};margin-right:8px;"
            ),
            Swatch::Line { color } => format!(
                "display:inline-block;width:18px;height:4px;background:{color};\
                 margin-right:8px;vertical-align:middle;"
            ),
            Swatch::Area { fill, outline } => format!(
                "display:inline-block;width:14px;height:14px;background:{fill};\
                 border:2px solid {outline};margin-right:8px;vertical-align:middle;"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendRow {
    pub category: OverlayCategory,
    pub swatch: Swatch,
}

/// Static color key. Lists every category whether or not it loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: &'static str,
    pub position: Corner,
    pub rows: Vec<LegendRow>,
}

impl Legend {
    pub fn standard() -> Self {
        Legend {
            title: "Legend",
            position: Corner::BottomRight,
            rows: vec![
                LegendRow {
                    category: OverlayCategory::Points,
                    swatch: Swatch::Circle {
                        fill: POINT_FILL,
                        outline: POINT_OUTLINE,
                    },
                },
                LegendRow {
                    category: OverlayCategory::Lines,
                    swatch: Swatch::Line { color: LINE_COLOR },
                },
                LegendRow {
                    category: OverlayCategory::Polygons,
                    swatch: Swatch::Area {
                        fill: POLY_FILL,
                        outline: POLY_OUTLINE,
                    },
                },
            ],
        }
    }

    /// Inner markup of the legend element.
    pub fn to_html(&self) -> String {
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                format!(
                    "<span style=\"{}\"></span>{}",
                    row.swatch.inline_style(),
                    row.category.display_name()
                )
            })
            .collect();
        format!("<b>{}</b><br><br>{}", self.title, rows.join("<br>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_legend_has_three_rows_bottom_right() {
        let legend = Legend::standard();
        assert_eq!(legend.position, Corner::BottomRight);
        let cats: Vec<OverlayCategory> = legend.rows.iter().map(|r| r.category).collect();
        assert_eq!(cats, OverlayCategory::ALL.to_vec());
    }

    #[test]
    fn html_uses_registry_colors() {
        let html = Legend::standard().to_html();
        assert!(html.starts_with("<b>Legend</b><br><br>"));
        assert!(html.contains("border-radius:50%;background:#22C55E;border:2px solid #14532D;"));
        assert!(html.contains("width:18px;height:4px;background:#2563EB;"));
        assert!(html.contains("background:#A78BFA;border:2px solid #7C3AED;"));
        assert!(html.ends_with("</span>Polygons"));
        assert_eq!(html.matches("<br>").count(), 4);
    }
}
