use std::collections::BTreeMap;

use foundation::LatLngBounds;
use foundation::math::Point;
use layers::control::LayerControl;
use layers::legend::Legend;
use layers::raster::{BASE_LAYERS, TileProvider, base_layer_index};
use layers::vector::{Overlay, OverlaySummary};
use layers::OverlayCategory;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::ViewerConfig;
use crate::event_bus::{Event, EventBus, EventKind};
use crate::view::MapView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    UnknownBaseLayer(String),
    OverlayNotLoaded(OverlayCategory),
    DuplicateOverlay(OverlayCategory),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::UnknownBaseLayer(name) => write!(f, "unknown base layer: {name}"),
            SessionError::OverlayNotLoaded(category) => {
                write!(f, "overlay not loaded: {category}")
            }
            SessionError::DuplicateOverlay(category) => {
                write!(f, "overlay already loaded: {category}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// A popup opened by clicking a shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Popup {
    pub category: OverlayCategory,
    pub label: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub view: MapView,
    pub bounds: Option<LatLngBounds>,
    pub active_base: &'static str,
    pub attribution: &'static str,
    pub control: LayerControl,
    pub legend: Legend,
    pub overlays: Vec<OverlaySummary>,
    pub events: Vec<Event>,
}

/// Everything one map page owns: the view, the loaded overlays, the running
/// data extent, and the layer switcher built from them.
///
/// All mutation goes through `&mut self`, so a single driver applies load
/// results one at a time in whatever order they finish.
#[derive(Debug)]
pub struct MapSession {
    view: MapView,
    fit_padding: Point,
    overlays: BTreeMap<OverlayCategory, Overlay>,
    bounds: Option<LatLngBounds>,
    active_base: usize,
    control: LayerControl,
    legend: Legend,
    events: EventBus,
}

impl MapSession {
    pub fn new(config: &ViewerConfig) -> Self {
        MapSession {
            view: MapView::from_config(config),
            fit_padding: Point::new(config.fit_padding_px[0], config.fit_padding_px[1]),
            overlays: BTreeMap::new(),
            bounds: None,
            active_base: 0,
            control: LayerControl::build(
                &BASE_LAYERS,
                0,
                std::iter::empty::<(OverlayCategory, bool)>(),
                0,
            ),
            legend: Legend::standard(),
            events: EventBus::new(),
        }
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut MapView {
        &mut self.view
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.bounds
    }

    pub fn control(&self) -> &LayerControl {
        &self.control
    }

    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    pub fn overlay(&self, category: OverlayCategory) -> Option<&Overlay> {
        self.overlays.get(&category)
    }

    /// Loaded overlays bottom to top: polygons, then lines, then points.
    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.values().rev()
    }

    pub fn active_tile_provider(&self) -> &'static TileProvider {
        &BASE_LAYERS[self.active_base]
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    /// Puts a freshly loaded overlay on the map, grows the data extent and
    /// rebuilds the layer control.
    pub fn add_overlay(&mut self, overlay: Overlay) -> Result<(), SessionError> {
        let category = overlay.category;
        if self.overlays.contains_key(&category) {
            warn!("ignoring second load of {category}");
            self.events
                .emit(EventKind::Rejected, format!("{category} already loaded"));
            return Err(SessionError::DuplicateOverlay(category));
        }

        let extent = overlay.bounds();
        info!(
            "{category} loaded: {} features, {} shapes",
            overlay.feature_count,
            overlay.shapes.len()
        );
        self.events.emit(
            EventKind::OverlayAdded,
            format!("{category}: {} features", overlay.feature_count),
        );
        self.overlays.insert(category, overlay);

        self.extend_bounds(extent);
        self.refresh_layer_control();
        Ok(())
    }

    /// Unions `extent` into the running bounds and refits the view.
    ///
    /// Missing or invalid extents are ignored. Returns whether anything changed.
    pub fn extend_bounds(&mut self, extent: Option<LatLngBounds>) -> bool {
        let Some(extent) = extent.filter(LatLngBounds::is_valid) else {
            debug!("skipping empty extent");
            return false;
        };

        let running = match self.bounds {
            Some(b) => b.union(&extent),
            None => extent,
        };
        self.bounds = Some(running);
        self.events.emit(
            EventKind::BoundsExtended,
            format!(
                "[{:.6}, {:.6}] - [{:.6}, {:.6}]",
                running.south_west.lat,
                running.south_west.lng,
                running.north_east.lat,
                running.north_east.lng
            ),
        );

        self.view.fit_bounds(&running, self.fit_padding);
        debug!(zoom = self.view.zoom, "view fitted to data");
        self.events.emit(
            EventKind::ViewFitted,
            format!(
                "center [{:.6}, {:.6}] zoom {}",
                self.view.center.lat, self.view.center.lng, self.view.zoom
            ),
        );
        true
    }

    /// Replaces the layer control with one built from current state.
    pub fn refresh_layer_control(&mut self) {
        let generation = self.control.generation + 1;
        self.control = LayerControl::build(
            &BASE_LAYERS,
            self.active_base,
            self.overlays.values().map(|o| (o.category, o.visible)),
            generation,
        );
        self.events.emit(
            EventKind::ControlRebuilt,
            format!("overlays: {}", self.control.overlay_names().join(", ")),
        );
    }

    /// Logs a failed category. The category stays off the map and out of
    /// the control.
    pub fn record_load_failure(&mut self, category: OverlayCategory, cause: &dyn std::fmt::Display) {
        error!("{category} error: {cause}");
        self.events
            .emit(EventKind::LoadFailed, format!("{category} error: {cause}"));
    }

    pub fn select_base_layer(&mut self, name: &str) -> Result<(), SessionError> {
        let Some(index) = base_layer_index(name) else {
            warn!("unknown base layer {name:?}");
            self.events
                .emit(EventKind::Rejected, format!("unknown base layer {name}"));
            return Err(SessionError::UnknownBaseLayer(name.to_string()));
        };
        self.active_base = index;
        self.events.emit(EventKind::BaseLayerChanged, name);
        self.refresh_layer_control();
        Ok(())
    }

    pub fn set_overlay_visible(
        &mut self,
        category: OverlayCategory,
        visible: bool,
    ) -> Result<(), SessionError> {
        let Some(overlay) = self.overlays.get_mut(&category) else {
            warn!("cannot toggle {category}: not loaded");
            self.events
                .emit(EventKind::Rejected, format!("{category} not loaded"));
            return Err(SessionError::OverlayNotLoaded(category));
        };
        overlay.visible = visible;
        self.events.emit(
            EventKind::OverlayToggled,
            format!("{category} {}", if visible { "shown" } else { "hidden" }),
        );
        self.refresh_layer_control();
        Ok(())
    }

    /// Popup for the topmost visible shape under a viewport pixel.
    pub fn popup_at(&self, at: Point) -> Option<Popup> {
        let projector = self.view.projector();
        self.overlays.values().find_map(|overlay| {
            overlay.hit_test(&projector, at).map(|shape| Popup {
                category: overlay.category,
                label: shape.label.clone(),
                html: shape.popup_html(),
            })
        })
    }

    pub fn report(&self) -> SessionReport {
        let provider = self.active_tile_provider();
        SessionReport {
            view: self.view,
            bounds: self.bounds,
            active_base: provider.name,
            attribution: provider.attribution,
            control: self.control.clone(),
            legend: self.legend.clone(),
            overlays: self.overlays.values().map(Overlay::summary).collect(),
            events: self.events.events().to_vec(),
        }
    }
}
