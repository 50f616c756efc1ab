use foundation::math::{Point, ScreenProjector, TILE_SIZE_PX};
use serde::Serialize;


/// A named background tile source.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TileProvider {
    pub name: &'static str,
    pub url_template: &'static str,
    pub attribution: &'static str,
    pub subdomains: &'static [&'static str],
    pub max_zoom: u8,
}

const ABC: &[&str] = &["a", "b", "c"];

/// Background layers in control order; the first is active at startup.
pub const BASE_LAYERS: [TileProvider; 3] = [
    TileProvider {
        name: "Carto Light",
        url_template: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
        attribution: "&copy; OpenStreetMap &copy; Carto",
        subdomains: ABC,
        max_zoom: 20,
    },
    TileProvider {
        name: "OpenStreetMap",
        url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
        attribution: "&copy; OpenStreetMap contributors",
        subdomains: ABC,
        max_zoom: 19,
    },
    TileProvider {
        name: "ESRI Imagery",
        url_template: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        attribution: "Tiles &copy; Esri",
        subdomains: &[],
        max_zoom: 19,
    },
];

pub fn base_layer_index(name: &str) -> Option<usize> {
    BASE_LAYERS.iter().position(|p| p.name == name)
}

#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug, Serialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

/// One tile to draw, with its top-left corner in viewport pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TilePlacement {
    pub coord: TileCoord,
    pub screen: Point,
}

impl TileProvider {
    pub fn tile_url(&self, coord: TileCoord, retina: bool) -> String {
        let subdomain = if self.subdomains.is_empty() {
            ""
        } else {
            let idx = (coord.x as usize + coord.y as usize) % self.subdomains.len();
            self.subdomains[idx]
        };
        self.url_template
            .replace("{s}", subdomain)
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
            .replace("{r}", if retina { "@2x" } else { "" })
    }

    /// Tiles covering the viewport at the projector's zoom (rounded down and
    /// clamped to the provider's max zoom).
    ///
    /// Columns wrap around the antimeridian, so the same tile can be placed
    /// more than once when the viewport is wider than the world.
    pub fn visible_tiles(&self, projector: &ScreenProjector) -> Vec<TilePlacement> {
        let z = (projector.zoom.floor().max(0.0) as u8).min(self.max_zoom);
        // Tiles at zoom z are scaled onto the projector's (possibly fractional) zoom.
        let scale = (projector.zoom - z as f64).exp2();
        let tile_px = TILE_SIZE_PX * scale;
        let n = 1u32 << z;

        let origin = projector.origin_px();
        let min_tx = (origin.x / tile_px).floor() as i64;
        let max_tx = ((origin.x + projector.viewport.x) / tile_px).ceil() as i64;
        let min_ty = (origin.y / tile_px).floor().max(0.0) as i64;
        let max_ty = (((origin.y + projector.viewport.y) / tile_px).ceil() as i64).min(n as i64);

        let mut out = Vec::new();
        for ty in min_ty..max_ty {
            for tx in min_tx..max_tx {
                let x = tx.rem_euclid(n as i64) as u32;
                out.push(TilePlacement {
                    coord: TileCoord { x, y: ty as u32, z },
                    screen: Point::new(
                        tx as f64 * tile_px - origin.x,
                        ty as f64 * tile_px - origin.y,
                    ),
                });
            }
        }
        out
    }
}
