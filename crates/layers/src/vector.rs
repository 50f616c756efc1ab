use foundation::math::{Point, ScreenProjector};
use foundation::{LatLng, LatLngBounds};
use formats::{FeatureCollection, GeoPoint, Geometry};
use serde::Serialize;

use crate::html::escape_html;
use crate::layer::OverlayCategory;
use crate::symbology::OverlayStyle;

/// Extra pixels around thin strokes that still count as a click on them.
const HIT_TOLERANCE_PX: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    CircleMarker(LatLng),
    Polyline(Vec<LatLng>),
    /// Outer ring first, then holes.
    Polygon(Vec<Vec<LatLng>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayShape {
    pub shape: Shape,
    pub label: String,
}

impl OverlayShape {
    pub fn popup_html(&self) -> String {
        format!("<b>{}</b>", escape_html(&self.label))
    }
}

/// Rendered form of one feature collection.
///
/// Built all at once from a parsed collection; never patched afterwards
/// except for its visibility flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub category: OverlayCategory,
    pub style: OverlayStyle,
    pub shapes: Vec<OverlayShape>,
    pub feature_count: usize,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySummary {
    pub category: OverlayCategory,
    pub name: &'static str,
    pub feature_count: usize,
    pub markers: usize,
    pub polylines: usize,
    pub polygons: usize,
    pub bounds: Option<LatLngBounds>,
    pub visible: bool,
    pub labels: Vec<String>,
}

/// Screen-space geometry of an overlay for one view.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OverlayDrawList {
    pub markers: Vec<Point>,
    pub polylines: Vec<Vec<Point>>,
    pub polygons: Vec<Vec<Vec<Point>>>,
}

impl Overlay {
    pub fn from_collection(category: OverlayCategory, collection: &FeatureCollection) -> Self {
        let mut shapes = Vec::new();
        for feature in &collection.features {
            let label = feature
                .name()
                .unwrap_or_else(|| category.default_feature_label().to_string());
            if let Some(geom) = &feature.geometry {
                push_shapes(geom, &label, &mut shapes);
            }
        }

        Overlay {
            category,
            style: OverlayStyle::for_category(category),
            shapes,
            feature_count: collection.features.len(),
            visible: true,
        }
    }

    /// Extent of every shape, `None` for an overlay without coordinates.
    pub fn bounds(&self) -> Option<LatLngBounds> {
        let points = self.shapes.iter().flat_map(|s| match &s.shape {
            Shape::CircleMarker(p) => vec![*p],
            Shape::Polyline(path) => path.clone(),
            Shape::Polygon(rings) => rings.iter().flatten().copied().collect(),
        });
        LatLngBounds::from_points(points)
    }

    pub fn summary(&self) -> OverlaySummary {
        let count = |f: fn(&Shape) -> bool| self.shapes.iter().filter(|s| f(&s.shape)).count();
        OverlaySummary {
            category: self.category,
            name: self.category.display_name(),
            feature_count: self.feature_count,
            markers: count(|s| matches!(s, Shape::CircleMarker(_))),
            polylines: count(|s| matches!(s, Shape::Polyline(_))),
            polygons: count(|s| matches!(s, Shape::Polygon(_))),
            bounds: self.bounds(),
            visible: self.visible,
            labels: self.shapes.iter().map(|s| s.label.clone()).collect(),
        }
    }

    pub fn draw_list(&self, projector: &ScreenProjector) -> OverlayDrawList {
        let mut out = OverlayDrawList::default();
        for s in &self.shapes {
            match &s.shape {
                Shape::CircleMarker(p) => out.markers.push(projector.to_screen(*p)),
                Shape::Polyline(path) => out
                    .polylines
                    .push(path.iter().map(|p| projector.to_screen(*p)).collect()),
                Shape::Polygon(rings) => out.polygons.push(
                    rings
                        .iter()
                        .map(|ring| ring.iter().map(|p| projector.to_screen(*p)).collect())
                        .collect(),
                ),
            }
        }
        out
    }

    /// Topmost shape under a viewport pixel, for opening its popup.
    ///
    /// Shapes are drawn in order, so the search runs back to front.
    pub fn hit_test(&self, projector: &ScreenProjector, at: Point) -> Option<&OverlayShape> {
        if !self.visible {
            return None;
        }
        let marker = self.style.marker;
        let path = self.style.path;
        self.shapes.iter().rev().find(|s| match &s.shape {
            Shape::CircleMarker(p) => {
                let c = projector.to_screen(*p);
                distance(c, at) <= marker.radius + 0.5 * marker.weight
            }
            Shape::Polyline(line) => {
                let pts: Vec<Point> = line.iter().map(|p| projector.to_screen(*p)).collect();
                near_path(&pts, at, 0.5 * path.weight + HIT_TOLERANCE_PX)
            }
            Shape::Polygon(rings) => {
                let rings_px: Vec<Vec<Point>> = rings
                    .iter()
                    .map(|ring| ring.iter().map(|p| projector.to_screen(*p)).collect())
                    .collect();
                inside_rings(&rings_px, at)
                    || rings_px
                        .iter()
                        .any(|ring| near_path(ring, at, 0.5 * path.weight + HIT_TOLERANCE_PX))
            }
        })
    }
}

fn push_shapes(geom: &Geometry, label: &str, out: &mut Vec<OverlayShape>) {
    if let Geometry::GeometryCollection(geoms) = geom {
        for g in geoms {
            push_shapes(g, label, out);
        }
        return;
    }

    let mut push = |shape: Shape| {
        out.push(OverlayShape {
            shape,
            label: label.to_string(),
        })
    };
    match geom {
        Geometry::Point(p) => push(Shape::CircleMarker(p.lat_lng())),
        Geometry::MultiPoint(ps) => {
            for p in ps {
                push(Shape::CircleMarker(p.lat_lng()));
            }
        }
        Geometry::LineString(ps) => push(Shape::Polyline(lat_lngs(ps))),
        Geometry::MultiLineString(lines) => {
            for line in lines {
                push(Shape::Polyline(lat_lngs(line)));
            }
        }
        Geometry::Polygon(rings) => push(Shape::Polygon(polygon_rings(rings))),
        Geometry::MultiPolygon(polys) => {
            for rings in polys {
                push(Shape::Polygon(polygon_rings(rings)));
            }
        }
        Geometry::GeometryCollection(_) => {}
    }
}

fn lat_lngs(points: &[GeoPoint]) -> Vec<LatLng> {
    points.iter().map(GeoPoint::lat_lng).collect()
}

fn polygon_rings(rings: &[Vec<GeoPoint>]) -> Vec<Vec<LatLng>> {
    rings
        .iter()
        .map(|ring| {
            let mut pts = lat_lngs(ring);
            drop_closing_duplicate(&mut pts);
            pts
        })
        .collect()
}

fn drop_closing_duplicate(points: &mut Vec<LatLng>) {
    if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied())
        && points.len() >= 2
        && (first.lat - last.lat).abs() < 1e-9
        && (first.lng - last.lng).abs() < 1e-9
    {
        points.pop();
    }
}

fn distance(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 <= 0.0 {
        return distance(p, a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    distance(p, Point::new(a.x + t * dx, a.y + t * dy))
}

fn near_path(points: &[Point], at: Point, tolerance: f64) -> bool {
    match points {
        [] => false,
        [only] => distance(*only, at) <= tolerance,
        _ => points
            .windows(2)
            .any(|w| segment_distance(at, w[0], w[1]) <= tolerance),
    }
}

// Even-odd rule across all rings, so holes are excluded.
fn inside_rings(rings: &[Vec<Point>], at: Point) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (pi, pj) = (ring[i], ring[j]);
            if (pi.y > at.y) != (pj.y > at.y)
                && at.x < (pj.x - pi.x) * (at.y - pi.y) / (pj.y - pi.y) + pi.x
            {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}
