use foundation::LatLng;
use layers::OverlayCategory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetUrls {
    pub points: String,
    pub lines: String,
    pub polygons: String,
}

impl Default for DatasetUrls {
    fn default() -> Self {
        Self {
            points: "data/points.geojson".to_string(),
            lines: "data/data/lines.geojson".to_string(),
            polygons: "data/data/data/polygons.geojson".to_string(),
        }
    }
}

impl DatasetUrls {
    pub fn url(&self, category: OverlayCategory) -> &str {
        match category {
            OverlayCategory::Points => &self.points,
            OverlayCategory::Lines => &self.lines,
            OverlayCategory::Polygons => &self.polygons,
        }
    }

    pub fn set_url(&mut self, category: OverlayCategory, url: impl Into<String>) {
        let slot = match category {
            OverlayCategory::Points => &mut self.points,
            OverlayCategory::Lines => &mut self.lines,
            OverlayCategory::Polygons => &mut self.polygons,
        };
        *slot = url.into();
    }
}

/// Viewer settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub datasets: DatasetUrls,
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Pixels kept free on each side when fitting the view to the data.
    pub fit_padding_px: [f64; 2],
    /// Viewport used when there is no real display (headless runs).
    pub viewport_px: [f64; 2],
    pub retina_tiles: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            datasets: DatasetUrls::default(),
            center: LatLng::new(-1.286389, 36.817223),
            zoom: 6.0,
            min_zoom: 0,
            max_zoom: 18,
            fit_padding_px: [25.0, 25.0],
            viewport_px: [1280.0, 720.0],
            retina_tiles: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Json(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Json(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ViewerConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        if payload.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ViewerConfig =
            serde_json::from_str(payload).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.center.is_finite() {
            return Err(ConfigError::Invalid("center must be finite".to_string()));
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !self.zoom.is_finite() {
            return Err(ConfigError::Invalid("zoom must be finite".to_string()));
        }
        if self.fit_padding_px.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ConfigError::Invalid(
                "fit_padding_px must be non-negative".to_string(),
            ));
        }
        if self.viewport_px.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(ConfigError::Invalid("viewport_px must be positive".to_string()));
        }
        for category in OverlayCategory::ALL {
            if self.datasets.url(category).trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "dataset url for {} is empty",
                    category.key()
                )));
            }
        }
        Ok(())
    }

    /// Rewrites relative dataset URLs against `base`.
    pub fn resolve_against(&mut self, base: &str) {
        for category in OverlayCategory::ALL {
            let resolved = resolve_url(base, self.datasets.url(category));
            self.datasets.set_url(category, resolved);
        }
    }
}

/// Joins a relative `url` onto `base`; absolute URLs and rooted paths pass through.
pub fn resolve_url(base: &str, url: &str) -> String {
    let base = base.trim();
    if base.is_empty() || url.contains("://") || url.starts_with('/') {
        return url.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches("./"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_payload_gives_defaults() {
        let config = ViewerConfig::from_json_str("  ").expect("config");
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.datasets.url(OverlayCategory::Polygons), "data/data/data/polygons.geojson");
        assert_eq!(config.zoom, 6.0);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = ViewerConfig::from_json_str(
            r#"{"datasets": {"lines": "roads.geojson"}, "max_zoom": 16}"#,
        )
        .expect("config");
        assert_eq!(config.datasets.lines, "roads.geojson");
        assert_eq!(config.datasets.points, "data/points.geojson");
        assert_eq!(config.max_zoom, 16);
        assert_eq!(config.fit_padding_px, [25.0, 25.0]);
    }

    #[test]
    fn rejects_inverted_zoom_limits() {
        let err = ViewerConfig::from_json_str(r#"{"min_zoom": 10, "max_zoom": 4}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_json() {
        let err = ViewerConfig::from_json_str("{zoom: 3").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn resolves_relative_urls_only() {
        assert_eq!(resolve_url("https://host/maps/", "data/points.geojson"), "https://host/maps/data/points.geojson");
        assert_eq!(resolve_url("https://host", "./a.json"), "https://host/a.json");
        assert_eq!(resolve_url("https://host", "https://other/b.json"), "https://other/b.json");
        assert_eq!(resolve_url("/srv/data", "/abs/c.json"), "/abs/c.json");
        assert_eq!(resolve_url("", "d.json"), "d.json");
    }

    #[test]
    fn resolve_against_rewrites_all_categories() {
        let mut config = ViewerConfig::default();
        config.resolve_against("/srv/site");
        assert_eq!(config.datasets.points, "/srv/site/data/points.geojson");
        assert_eq!(config.datasets.lines, "/srv/site/data/data/lines.geojson");
    }
}
