use layers::OverlayCategory;
use runtime::config::ViewerConfig;
use serde::Serialize;

/// One dataset to fetch and the category it renders as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetRequest {
    pub category: OverlayCategory,
    pub url: String,
}

impl DatasetRequest {
    pub fn new(category: OverlayCategory, url: impl Into<String>) -> Self {
        Self {
            category,
            url: url.into(),
        }
    }

    /// The three configured datasets in category order.
    pub fn defaults(config: &ViewerConfig) -> Vec<DatasetRequest> {
        OverlayCategory::ALL
            .iter()
            .map(|&category| DatasetRequest::new(category, config.datasets.url(category)))
            .collect()
    }
}
