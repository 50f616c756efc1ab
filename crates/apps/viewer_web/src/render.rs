use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;

use foundation::math::{Point, ScreenProjector, TILE_SIZE_PX};
use layers::symbology::rgba_css;
use layers::vector::Overlay;
use runtime::session::MapSession;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, CanvasWindingRule, HtmlImageElement};

const BACKGROUND: &str = "#e5e7eb";
const MAX_CACHED_TILES: usize = 256;

fn ctx_set_fill_style(ctx: &CanvasRenderingContext2d, value: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("fillStyle"),
        &JsValue::from_str(value),
    );
}

fn ctx_set_stroke_style(ctx: &CanvasRenderingContext2d, value: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("strokeStyle"),
        &JsValue::from_str(value),
    );
}

struct TileEntry {
    image: HtmlImageElement,
    _onload: Closure<dyn FnMut()>,
}

impl Drop for TileEntry {
    // The image may still be downloading; its handler must not outlive the closure.
    fn drop(&mut self) {
        self.image.set_onload(None);
    }
}

/// Background tile images keyed by URL.
#[derive(Default)]
pub struct TileCache {
    entries: HashMap<String, TileEntry>,
}

impl TileCache {
    /// The decoded image for `url`, or `None` while it is still downloading.
    /// The first call starts the download; completion triggers a redraw.
    fn image(&mut self, url: &str) -> Result<Option<&HtmlImageElement>, JsValue> {
        if !self.entries.contains_key(url) {
            let image = HtmlImageElement::new()?;
            let onload = Closure::<dyn FnMut()>::new(crate::request_redraw);
            image.set_onload(Some(onload.as_ref().unchecked_ref()));
            image.set_cross_origin(Some("anonymous"));
            image.set_src(url);
            self.entries.insert(
                url.to_string(),
                TileEntry {
                    image,
                    _onload: onload,
                },
            );
        }
        Ok(self
            .entries
            .get(url)
            .map(|e| &e.image)
            .filter(|img| img.complete() && img.natural_width() > 0))
    }

    fn prune(&mut self, keep: &HashSet<String>) {
        for url in stale_urls(self.entries.keys(), keep) {
            self.entries.remove(&url);
        }
    }
}

/// Cached tiles to evict: nothing until the cache outgrows its limit, then
/// everything not in the current view.
fn stale_urls<'a, I>(cached: I, keep: &HashSet<String>) -> Vec<String>
where
    I: ExactSizeIterator<Item = &'a String>,
{
    if cached.len() <= MAX_CACHED_TILES {
        return Vec::new();
    }
    cached.filter(|url| !keep.contains(*url)).cloned().collect()
}

/// Redraws the whole canvas: background tiles, then overlays bottom to top.
pub fn draw_map(
    ctx: &CanvasRenderingContext2d,
    session: &MapSession,
    tiles: &mut TileCache,
    retina: bool,
) -> Result<(), JsValue> {
    let view = session.view();
    let projector = view.projector();
    ctx.clear_rect(0.0, 0.0, view.viewport.x, view.viewport.y);
    ctx_set_fill_style(ctx, BACKGROUND);
    ctx.fill_rect(0.0, 0.0, view.viewport.x, view.viewport.y);

    let provider = session.active_tile_provider();
    let mut in_view = HashSet::new();
    for placement in provider.visible_tiles(&projector) {
        let size = TILE_SIZE_PX * (projector.zoom - placement.coord.z as f64).exp2();
        let url = provider.tile_url(placement.coord, retina);
        if let Some(image) = tiles.image(&url)? {
            ctx.draw_image_with_html_image_element_and_dw_and_dh(
                image,
                placement.screen.x,
                placement.screen.y,
                size,
                size,
            )?;
        }
        in_view.insert(url);
    }
    tiles.prune(&in_view);

    for overlay in session.overlays().filter(|o| o.visible) {
        draw_overlay(ctx, overlay, &projector)?;
    }
    Ok(())
}

fn trace(ctx: &CanvasRenderingContext2d, points: &[Point], close: bool) {
    let mut iter = points.iter();
    let Some(first) = iter.next() else {
        return;
    };
    ctx.move_to(first.x, first.y);
    for p in iter {
        ctx.line_to(p.x, p.y);
    }
    if close {
        ctx.close_path();
    }
}

fn draw_overlay(
    ctx: &CanvasRenderingContext2d,
    overlay: &Overlay,
    projector: &ScreenProjector,
) -> Result<(), JsValue> {
    let list = overlay.draw_list(projector);
    let path = overlay.style.path;
    let marker = overlay.style.marker;

    ctx.set_line_join("round");
    ctx.set_line_cap("round");

    ctx.set_line_width(path.weight);
    ctx_set_stroke_style(ctx, &rgba_css(path.color, path.opacity));
    ctx_set_fill_style(ctx, &rgba_css(path.effective_fill_color(), path.fill_opacity));
    for rings in &list.polygons {
        ctx.begin_path();
        for ring in rings {
            trace(ctx, ring, true);
        }
        ctx.fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd);
        ctx.stroke();
    }
    for line in &list.polylines {
        ctx.begin_path();
        trace(ctx, line, false);
        ctx.stroke();
    }

    ctx.set_line_width(marker.weight);
    ctx_set_stroke_style(ctx, &rgba_css(marker.color, marker.opacity));
    ctx_set_fill_style(ctx, &rgba_css(marker.fill_color, marker.fill_opacity));
    for c in &list.markers {
        ctx.begin_path();
        ctx.arc(c.x, c.y, marker.radius, 0.0, TAU)?;
        ctx.fill();
        ctx.stroke();
    }
    Ok(())
}
