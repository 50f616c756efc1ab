use serde::Serialize;

use crate::layer::OverlayCategory;

pub const POINT_FILL: &str = "#22C55E";
pub const POINT_OUTLINE: &str = "#14532D";
pub const LINE_COLOR: &str = "#2563EB";
pub const POLY_FILL: &str = "#A78BFA";
pub const POLY_OUTLINE: &str = "#7C3AED";

/// Stroke color used for shapes a category has no dedicated style for.
pub const DEFAULT_PATH_COLOR: &str = "#3388ff";

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct CircleMarkerStyle {
    pub radius: f64,
    pub color: &'static str,
    pub weight: f64,
    pub opacity: f64,
    pub fill_color: &'static str,
    pub fill_opacity: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct PathStyle {
    pub color: &'static str,
    pub weight: f64,
    pub opacity: f64,
    /// Falls back to `color` when unset. Only closed shapes are filled.
    pub fill_color: Option<&'static str>,
    pub fill_opacity: f64,
}

impl PathStyle {
    pub fn effective_fill_color(&self) -> &'static str {
        self.fill_color.unwrap_or(self.color)
    }
}

pub const POINT_MARKER_STYLE: CircleMarkerStyle = CircleMarkerStyle {
    radius: 7.0,
    color: POINT_OUTLINE,
    weight: 2.0,
    opacity: 1.0,
    fill_color: POINT_FILL,
    fill_opacity: 0.9,
};

pub const LINE_STYLE: PathStyle = PathStyle {
    color: LINE_COLOR,
    weight: 4.0,
    opacity: 0.9,
    fill_color: None,
    fill_opacity: 0.2,
};

pub const POLYGON_STYLE: PathStyle = PathStyle {
    color: POLY_OUTLINE,
    weight: 2.0,
    opacity: 1.0,
    fill_color: Some(POLY_FILL),
    fill_opacity: 0.45,
};

pub const DEFAULT_PATH_STYLE: PathStyle = PathStyle {
    color: DEFAULT_PATH_COLOR,
    weight: 3.0,
    opacity: 1.0,
    fill_color: None,
    fill_opacity: 0.2,
};

/// Complete symbology for one overlay.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct OverlayStyle {
    pub marker: CircleMarkerStyle,
    pub path: PathStyle,
}

impl OverlayStyle {
    pub fn for_category(category: OverlayCategory) -> Self {
        match category {
            OverlayCategory::Points => OverlayStyle {
                marker: POINT_MARKER_STYLE,
                path: DEFAULT_PATH_STYLE,
            },
            OverlayCategory::Lines => OverlayStyle::from_path(LINE_STYLE),
            OverlayCategory::Polygons => OverlayStyle::from_path(POLYGON_STYLE),
        }
    }

    // Points inside line/polygon datasets reuse the category colors.
    fn from_path(path: PathStyle) -> Self {
        OverlayStyle {
            marker: CircleMarkerStyle {
                radius: POINT_MARKER_STYLE.radius,
                color: path.color,
                weight: path.weight,
                opacity: path.opacity,
                fill_color: path.effective_fill_color(),
                fill_opacity: path.fill_opacity,
            },
            path,
        }
    }
}

/// Parses `#rgb` or `#rrggbb`.
pub fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#')?;
    let expand = |c: u8| c * 16 + c;
    match digits.len() {
        3 => {
            let v = u16::from_str_radix(digits, 16).ok()?;
            Some([
                expand(((v >> 8) & 0xF) as u8),
                expand(((v >> 4) & 0xF) as u8),
                expand((v & 0xF) as u8),
            ])
        }
        6 => {
            let v = u32::from_str_radix(digits, 16).ok()?;
            Some([(v >> 16) as u8, (v >> 8) as u8, v as u8])
        }
        _ => None,
    }
}

/// CSS `rgba(...)` for a hex color and opacity; unknown colors render black.
pub fn rgba_css(hex: &str, alpha: f64) -> String {
    let [r, g, b] = parse_hex_color(hex).unwrap_or([0, 0, 0]);
    let a = alpha.clamp(0.0, 1.0);
    format!("rgba({r},{g},{b},{a})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_style_matches_visual_contract() {
        let s = OverlayStyle::for_category(OverlayCategory::Points).marker;
        assert_eq!(s.radius, 7.0);
        assert_eq!(s.fill_color, "#22C55E");
        assert_eq!(s.fill_opacity, 0.9);
        assert_eq!(s.color, "#14532D");
        assert_eq!(s.weight, 2.0);
    }

    #[test]
    fn line_and_polygon_styles() {
        let l = OverlayStyle::for_category(OverlayCategory::Lines).path;
        assert_eq!((l.color, l.weight, l.opacity), ("#2563EB", 4.0, 0.9));

        let p = OverlayStyle::for_category(OverlayCategory::Polygons).path;
        assert_eq!((p.color, p.weight, p.opacity), ("#7C3AED", 2.0, 1.0));
        assert_eq!(p.effective_fill_color(), "#A78BFA");
        assert_eq!(p.fill_opacity, 0.45);
    }

    #[test]
    fn line_category_markers_use_line_color() {
        let m = OverlayStyle::for_category(OverlayCategory::Lines).marker;
        assert_eq!(m.color, LINE_COLOR);
        assert_eq!(m.fill_color, LINE_COLOR);
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_color("#22C55E"), Some([0x22, 0xC5, 0x5E]));
        assert_eq!(parse_hex_color("#fff"), Some([255, 255, 255]));
        assert_eq!(parse_hex_color("22C55E"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn rgba_css_formats_alpha() {
        assert_eq!(rgba_css("#A78BFA", 0.45), "rgba(167,139,250,0.45)");
        assert_eq!(rgba_css("#000000", 2.0), "rgba(0,0,0,1)");
    }
}
