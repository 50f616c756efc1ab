use serde::Serialize;

use crate::html::escape_html;
use crate::layer::OverlayCategory;
use crate::raster::TileProvider;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseLayerEntry {
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayEntry {
    pub category: OverlayCategory,
    pub name: String,
    pub visible: bool,
}

/// Snapshot of the layer switcher: radio buttons for the background layers,
/// checkboxes for the overlays that exist right now.
///
/// Always built whole from current state; there is no incremental update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerControl {
    pub base_layers: Vec<BaseLayerEntry>,
    pub overlays: Vec<OverlayEntry>,
    pub collapsed: bool,
    pub generation: u64,
}

impl LayerControl {
    /// `overlays` may arrive in any order; entries are sorted by category.
    pub fn build<I>(providers: &[TileProvider], active_base: usize, overlays: I, generation: u64) -> Self
    where
        I: IntoIterator<Item = (OverlayCategory, bool)>,
    {
        let base_layers = providers
            .iter()
            .enumerate()
            .map(|(i, p)| BaseLayerEntry {
                name: p.name.to_string(),
                active: i == active_base,
            })
            .collect();

        let mut overlays: Vec<OverlayEntry> = overlays
            .into_iter()
            .map(|(category, visible)| OverlayEntry {
                category,
                name: category.display_name().to_string(),
                visible,
            })
            .collect();
        overlays.sort_by_key(|e| e.category);
        overlays.dedup_by_key(|e| e.category);

        LayerControl {
            base_layers,
            overlays,
            collapsed: false,
            generation,
        }
    }

    pub fn active_base(&self) -> Option<&str> {
        self.base_layers
            .iter()
            .find(|b| b.active)
            .map(|b| b.name.as_str())
    }

    pub fn overlay_names(&self) -> Vec<&str> {
        self.overlays.iter().map(|o| o.name.as_str()).collect()
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<div class=\"layer-control");
        if !self.collapsed {
            html.push_str(" layer-control-expanded");
        }
        html.push_str("\">");

        html.push_str("<div class=\"layer-control-base\">");
        for base in &self.base_layers {
            let name = escape_html(&base.name);
            let checked = if base.active { " checked" } else { "" };
            html.push_str(&format!(
                "<label><input type=\"radio\" name=\"base-layer\" data-base=\"{name}\"{checked}> {name}</label>"
            ));
        }
        html.push_str("</div>");

        if !self.overlays.is_empty() {
            html.push_str("<div class=\"layer-control-separator\"></div>");
            html.push_str("<div class=\"layer-control-overlays\">");
            for overlay in &self.overlays {
                let checked = if overlay.visible { " checked" } else { "" };
                html.push_str(&format!(
                    "<label><input type=\"checkbox\" data-overlay=\"{}\"{checked}> {}</label>",
                    overlay.category.key(),
                    escape_html(&overlay.name)
                ));
            }
            html.push_str("</div>");
        }

        html.push_str("</div>");
        html
    }
}
