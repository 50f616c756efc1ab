//! Spherical Web Mercator in tile-pixel space.
//!
//! At zoom `z` the whole world is a square of `256 * 2^z` pixels with the
//! origin at the north-west corner, the same convention slippy-map tile
//! servers use.

use serde::{Deserialize, Serialize};

use crate::bounds::{LatLng, LatLngBounds};

pub const TILE_SIZE_PX: f64 = 256.0;
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.051_128_779_8;

/// Screen or world pixel coordinate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

pub fn world_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * zoom.exp2()
}

pub fn wrap_lng_deg(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

pub fn project(p: LatLng, zoom: f64) -> Point {
    let size = world_size_px(zoom);
    let lat = clamp(p.lat, -MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG).to_radians();
    let x = (p.lng + 180.0) / 360.0 * size;
    let y = (0.5 - (std::f64::consts::FRAC_PI_4 + 0.5 * lat).tan().ln() / (2.0 * std::f64::consts::PI))
        * size;
    Point::new(x, y)
}

pub fn unproject(p: Point, zoom: f64) -> LatLng {
    let size = world_size_px(zoom);
    let lng = p.x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * p.y / size);
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

/// Largest integer zoom in `[min_zoom, max_zoom]` at which `bounds` fits into
/// `viewport` shrunk by `padding` on every side.
///
/// Falls back to `min_zoom` when nothing fits, so a huge extent still gets a
/// usable view.
pub fn bounds_fit_zoom(
    bounds: &LatLngBounds,
    viewport: Point,
    padding: Point,
    min_zoom: u8,
    max_zoom: u8,
) -> u8 {
    let avail_w = (viewport.x - 2.0 * padding.x).max(0.0);
    let avail_h = (viewport.y - 2.0 * padding.y).max(0.0);

    let mut best = min_zoom;
    for zoom in min_zoom..=max_zoom {
        let nw = project(bounds.north_west(), zoom as f64);
        let se = project(bounds.south_east(), zoom as f64);
        let w = (se.x - nw.x).abs();
        let h = (se.y - nw.y).abs();
        if w <= avail_w && h <= avail_h {
            best = zoom;
        } else {
            break;
        }
    }
    best
}

/// Center of `bounds` taken in projected space, which differs from the
/// arithmetic lat/lng midpoint away from the equator.
pub fn projected_center(bounds: &LatLngBounds, zoom: f64) -> LatLng {
    let nw = project(bounds.north_west(), zoom);
    let se = project(bounds.south_east(), zoom);
    unproject(Point::new(0.5 * (nw.x + se.x), 0.5 * (nw.y + se.y)), zoom)
}

/// Maps geographic positions to viewport pixels for a fixed center and zoom.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScreenProjector {
    pub zoom: f64,
    pub center_px: Point,
    pub viewport: Point,
}

impl ScreenProjector {
    pub fn new(center: LatLng, zoom: f64, viewport: Point) -> Self {
        ScreenProjector {
            zoom,
            center_px: project(center, zoom),
            viewport,
        }
    }

    /// World pixel of the viewport's top-left corner.
    pub fn origin_px(&self) -> Point {
        Point::new(
            self.center_px.x - 0.5 * self.viewport.x,
            self.center_px.y - 0.5 * self.viewport.y,
        )
    }

    pub fn world_to_screen(&self, p: Point) -> Point {
        let origin = self.origin_px();
        Point::new(p.x - origin.x, p.y - origin.y)
    }

    pub fn to_screen(&self, p: LatLng) -> Point {
        self.world_to_screen(project(p, self.zoom))
    }

    pub fn to_lat_lng(&self, screen: Point) -> LatLng {
        let origin = self.origin_px();
        unproject(Point::new(origin.x + screen.x, origin.y + screen.y), self.zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_projects_to_world_center() {
        let p = project(LatLng::new(0.0, 0.0), 0.0);
        assert_close(p.x, 128.0, 1e-9);
        assert_close(p.y, 128.0, 1e-9);
    }

    #[test]
    fn round_trip_project_unproject() {
        let ll = LatLng::new(-1.286389, 36.817223);
        let back = unproject(project(ll, 6.0), 6.0);
        assert_close(back.lat, ll.lat, 1e-9);
        assert_close(back.lng, ll.lng, 1e-9);
    }

    #[test]
    fn polar_latitudes_are_clamped() {
        let p = project(LatLng::new(90.0, 0.0), 0.0);
        assert!(p.y.is_finite());
        assert_close(p.y, 0.0, 1e-6);
    }

    #[test]
    fn wrap_lng_stays_in_range() {
        assert_close(wrap_lng_deg(190.0), -170.0, 1e-9);
        assert_close(wrap_lng_deg(-190.0), 170.0, 1e-9);
        assert_close(wrap_lng_deg(45.0), 45.0, 1e-9);
    }

    #[test]
    fn single_point_fits_at_max_zoom() {
        let b = LatLngBounds::from_point(LatLng::new(-1.28, 36.8));
        let z = bounds_fit_zoom(&b, Point::new(800.0, 600.0), Point::new(25.0, 25.0), 0, 18);
        assert_eq!(z, 18);
    }

    #[test]
    fn whole_world_fits_at_min_zoom() {
        let b = LatLngBounds::new(LatLng::new(-80.0, -179.0), LatLng::new(80.0, 179.0));
        let z = bounds_fit_zoom(&b, Point::new(300.0, 300.0), Point::new(25.0, 25.0), 0, 18);
        assert_eq!(z, 0);
    }

    #[test]
    fn padding_reduces_zoom() {
        // A 10 degree box is ~455 px wide at zoom 6.
        let b = LatLngBounds::new(LatLng::new(-5.0, 30.0), LatLng::new(5.0, 40.0));
        let loose = bounds_fit_zoom(&b, Point::new(500.0, 500.0), Point::new(0.0, 0.0), 0, 18);
        let tight = bounds_fit_zoom(&b, Point::new(500.0, 500.0), Point::new(25.0, 25.0), 0, 18);
        assert_eq!(loose, 6);
        assert_eq!(tight, 5);
    }

    #[test]
    fn projector_centers_on_center() {
        let center = LatLng::new(10.0, 20.0);
        let proj = ScreenProjector::new(center, 5.0, Point::new(400.0, 200.0));
        let s = proj.to_screen(center);
        assert_close(s.x, 200.0, 1e-9);
        assert_close(s.y, 100.0, 1e-9);

        let back = proj.to_lat_lng(Point::new(200.0, 100.0));
        assert_close(back.lat, 10.0, 1e-9);
        assert_close(back.lng, 20.0, 1e-9);
    }
}
