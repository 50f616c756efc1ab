use foundation::math::{
    MERCATOR_MAX_LAT_DEG, Point, ScreenProjector, bounds_fit_zoom, project, projected_center,
    unproject, wrap_lng_deg,
};
use foundation::{LatLng, LatLngBounds};
use serde::Serialize;

use crate::config::ViewerConfig;

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// Center, zoom and viewport of the map display.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: f64,
    pub viewport: Point,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl MapView {
    pub fn from_config(config: &ViewerConfig) -> Self {
        MapView {
            center: config.center,
            zoom: clamp(config.zoom, config.min_zoom as f64, config.max_zoom as f64),
            viewport: Point::new(config.viewport_px[0], config.viewport_px[1]),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    pub fn projector(&self) -> ScreenProjector {
        ScreenProjector::new(self.center, self.zoom, self.viewport)
    }

    pub fn set_viewport(&mut self, width_px: f64, height_px: f64) {
        if width_px.is_finite() && height_px.is_finite() {
            self.viewport = Point::new(width_px.max(1.0), height_px.max(1.0));
        }
    }

    /// Centers on `bounds` at the largest zoom that keeps it inside the
    /// viewport minus `padding` on each side.
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: Point) {
        let zoom = bounds_fit_zoom(bounds, self.viewport, padding, self.min_zoom, self.max_zoom);
        self.zoom = zoom as f64;
        self.center = projected_center(bounds, self.zoom);
    }

    /// Moves the map content by a pixel delta (content follows the pointer).
    pub fn pan_by(&mut self, dx_px: f64, dy_px: f64) {
        if !dx_px.is_finite() || !dy_px.is_finite() {
            return;
        }
        let c = project(self.center, self.zoom);
        let moved = unproject(Point::new(c.x - dx_px, c.y - dy_px), self.zoom);
        self.center = LatLng::new(
            clamp(moved.lat, -MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG),
            wrap_lng_deg(moved.lng),
        );
    }

    /// Changes zoom by `delta` while keeping the position under `anchor`
    /// (viewport pixels) fixed on screen.
    pub fn zoom_at(&mut self, anchor: Point, delta: f64) {
        if !delta.is_finite() || !anchor.x.is_finite() || !anchor.y.is_finite() {
            return;
        }
        let next_zoom = clamp(self.zoom + delta, self.min_zoom as f64, self.max_zoom as f64);
        if next_zoom == self.zoom {
            return;
        }
        let anchored = self.projector().to_lat_lng(anchor);
        let p = project(anchored, next_zoom);
        let center_px = Point::new(
            p.x - (anchor.x - 0.5 * self.viewport.x),
            p.y - (anchor.y - 0.5 * self.viewport.y),
        );
        let center = unproject(center_px, next_zoom);
        self.zoom = next_zoom;
        self.center = LatLng::new(
            clamp(center.lat, -MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG),
            wrap_lng_deg(center.lng),
        );
    }
}
