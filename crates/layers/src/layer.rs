use serde::{Deserialize, Serialize};

/// The three fixed dataset categories.
///
/// Variant order is the display order used by the layer control.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OverlayCategory {
    Points,
    Lines,
    Polygons,
}

impl OverlayCategory {
    pub const ALL: [OverlayCategory; 3] = [
        OverlayCategory::Points,
        OverlayCategory::Lines,
        OverlayCategory::Polygons,
    ];

    /// Name shown in the layer control and legend.
    pub fn display_name(&self) -> &'static str {
        match self {
            OverlayCategory::Points => "Points",
            OverlayCategory::Lines => "Lines",
            OverlayCategory::Polygons => "Polygons",
        }
    }

    /// Stable key used in markup attributes and configuration.
    pub fn key(&self) -> &'static str {
        match self {
            OverlayCategory::Points => "points",
            OverlayCategory::Lines => "lines",
            OverlayCategory::Polygons => "polygons",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "points" | "point" => Some(OverlayCategory::Points),
            "lines" | "line" => Some(OverlayCategory::Lines),
            "polygons" | "polygon" => Some(OverlayCategory::Polygons),
            _ => None,
        }
    }

    /// Popup label for features without a usable `name` property.
    pub fn default_feature_label(&self) -> &'static str {
        match self {
            OverlayCategory::Points => "Point feature",
            OverlayCategory::Lines => "Line feature",
            OverlayCategory::Polygons => "Polygon feature",
        }
    }
}

impl std::fmt::Display for OverlayCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::OverlayCategory;

    #[test]
    fn keys_round_trip() {
        for cat in OverlayCategory::ALL {
            assert_eq!(OverlayCategory::from_key(cat.key()), Some(cat));
        }
        assert_eq!(OverlayCategory::from_key(" Polygon "), Some(OverlayCategory::Polygons));
        assert_eq!(OverlayCategory::from_key("rasters"), None);
    }

    #[test]
    fn display_order_is_points_lines_polygons() {
        let mut cats = vec![
            OverlayCategory::Polygons,
            OverlayCategory::Points,
            OverlayCategory::Lines,
        ];
        cats.sort();
        assert_eq!(cats, OverlayCategory::ALL.to_vec());
    }
}
