use console_error_panic_hook::set_once;
use futures_util::StreamExt;
use futures_util::future::{AbortHandle, Abortable};
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use foundation::math::Point;
use layers::OverlayCategory;
use runtime::config::ViewerConfig;
use runtime::event_bus::{Event, EventKind};
use runtime::session::MapSession;
use streaming::{DatasetLoader, DatasetRequest};

mod dom;
mod fetch;
mod render;

use dom::Panels;
use fetch::GlooFetcher;
use render::TileCache;

/// Movement in pixels after which a press counts as a drag, not a click.
const CLICK_SLOP_PX: f64 = 4.0;

#[derive(Debug, Copy, Clone)]
struct Drag {
    last: Point,
    moved: bool,
}

struct Viewer {
    session: MapSession,
    retina: bool,
    panels: Panels,
    tiles: TileCache,
    drag: Option<Drag>,
    suppress_click: bool,
    loading: Option<AbortHandle>,
    shown_control: Option<u64>,
}

thread_local! {
    static STATE: RefCell<Option<Viewer>> = const { RefCell::new(None) };
}

fn with_viewer<R>(f: impl FnOnce(&mut Viewer) -> Result<R, JsValue>) -> Result<R, JsValue> {
    STATE.with(|state| {
        let mut slot = state.borrow_mut();
        let viewer = slot
            .as_mut()
            .ok_or_else(|| JsValue::from_str("viewer not started"))?;
        f(viewer)
    })
}

fn log_event(event: &Event) {
    let line = JsValue::from_str(&event.message);
    match event.kind {
        EventKind::LoadFailed => web_sys::console::error_1(&line),
        EventKind::Rejected => web_sys::console::warn_1(&line),
        _ => web_sys::console::log_1(&line),
    }
}

impl Viewer {
    /// Flushes session changes to the page: log lines, control markup,
    /// attribution and the canvas.
    fn sync(&mut self) -> Result<(), JsValue> {
        for event in self.session.drain_events() {
            log_event(&event);
        }
        let control = self.session.control();
        if self.shown_control != Some(control.generation) {
            self.panels.control.set_inner_html(&control.to_html());
            self.shown_control = Some(control.generation);
        }
        self.panels
            .attribution
            .set_inner_html(self.session.active_tile_provider().attribution);
        self.redraw()
    }

    fn redraw(&mut self) -> Result<(), JsValue> {
        render::draw_map(&self.panels.ctx, &self.session, &mut self.tiles, self.retina)
    }
}

/// Called when a background tile finishes downloading.
pub(crate) fn request_redraw() {
    let result = STATE.with(|state| match state.try_borrow_mut() {
        Ok(mut slot) => match slot.as_mut() {
            Some(viewer) => viewer.redraw(),
            None => Ok(()),
        },
        Err(_) => Ok(()),
    });
    if let Err(err) = result {
        web_sys::console::warn_1(&err);
    }
}

fn spawn_loading(requests: Vec<DatasetRequest>) -> AbortHandle {
    let (handle, registration) = AbortHandle::new_pair();
    let task = Abortable::new(
        async move {
            let fetcher = GlooFetcher;
            let loader = DatasetLoader::new(&fetcher, requests);
            let mut outcomes = std::pin::pin!(loader.outcomes());
            while let Some(outcome) = outcomes.next().await {
                let applied = with_viewer(|viewer| {
                    let category = outcome.category();
                    if let Err(e) = outcome.apply_to(&mut viewer.session) {
                        web_sys::console::warn_1(&JsValue::from_str(&format!(
                            "{category} outcome dropped: {e}"
                        )));
                    }
                    viewer.sync()
                });
                if let Err(err) = applied {
                    web_sys::console::error_1(&err);
                }
            }
            let _ = with_viewer(|viewer| {
                viewer.loading = None;
                Ok(())
            });
        },
        registration,
    );
    spawn_local(async move {
        if task.await.is_err() {
            web_sys::console::log_1(&JsValue::from_str("dataset loading aborted"));
        }
    });
    handle
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Mounts the map into the element with id `container_id` and starts loading
/// the three datasets. `config_json` is an optional `ViewerConfig` document.
#[wasm_bindgen]
pub fn start_viewer(container_id: &str, config_json: Option<String>) -> Result<(), JsValue> {
    let config = ViewerConfig::from_json_str(config_json.as_deref().unwrap_or(""))
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    abort_loading();

    let mut session = MapSession::new(&config);
    let panels = dom::mount(container_id, session.legend())?;
    session
        .view_mut()
        .set_viewport(panels.canvas.width() as f64, panels.canvas.height() as f64);
    panels.attach_listeners()?;

    STATE.with(|state| {
        *state.borrow_mut() = Some(Viewer {
            session,
            retina: config.retina_tiles,
            panels,
            tiles: TileCache::default(),
            drag: None,
            suppress_click: false,
            loading: None,
            shown_control: None,
        });
    });
    with_viewer(|viewer| viewer.sync())?;

    let handle = spawn_loading(DatasetRequest::defaults(&config));
    with_viewer(|viewer| {
        viewer.loading = Some(handle);
        Ok(())
    })
}

/// Cancels dataset fetches that have not finished yet.
#[wasm_bindgen]
pub fn abort_loading() {
    let handle = STATE.with(|state| {
        state
            .borrow_mut()
            .as_mut()
            .and_then(|viewer| viewer.loading.take())
    });
    if let Some(handle) = handle {
        handle.abort();
    }
}

#[wasm_bindgen]
pub fn resize(width: f64, height: f64) -> Result<(), JsValue> {
    with_viewer(|viewer| {
        viewer.panels.canvas.set_width(width.max(1.0) as u32);
        viewer.panels.canvas.set_height(height.max(1.0) as u32);
        viewer.session.view_mut().set_viewport(width, height);
        viewer.redraw()
    })
}

#[wasm_bindgen]
pub fn pointer_down(x_px: f64, y_px: f64) -> Result<(), JsValue> {
    with_viewer(|viewer| {
        viewer.drag = Some(Drag {
            last: Point::new(x_px, y_px),
            moved: false,
        });
        Ok(())
    })
}

#[wasm_bindgen]
pub fn pointer_move(x_px: f64, y_px: f64) -> Result<(), JsValue> {
    with_viewer(|viewer| {
        let Some(drag) = viewer.drag.as_mut() else {
            return Ok(());
        };
        let dx = x_px - drag.last.x;
        let dy = y_px - drag.last.y;
        if !drag.moved && dx.hypot(dy) < CLICK_SLOP_PX {
            return Ok(());
        }
        drag.moved = true;
        drag.last = Point::new(x_px, y_px);
        viewer.session.view_mut().pan_by(dx, dy);
        viewer.panels.hide_popup()?;
        viewer.redraw()
    })
}

#[wasm_bindgen]
pub fn pointer_up() -> Result<(), JsValue> {
    with_viewer(|viewer| {
        if let Some(drag) = viewer.drag.take() {
            viewer.suppress_click = drag.moved;
        }
        Ok(())
    })
}

/// Zooms one level per wheel step, keeping the point under the cursor fixed.
#[wasm_bindgen]
pub fn wheel(x_px: f64, y_px: f64, delta_y: f64) -> Result<(), JsValue> {
    if delta_y == 0.0 || !delta_y.is_finite() {
        return Ok(());
    }
    with_viewer(|viewer| {
        let delta = if delta_y < 0.0 { 1.0 } else { -1.0 };
        viewer
            .session
            .view_mut()
            .zoom_at(Point::new(x_px, y_px), delta);
        viewer.panels.hide_popup()?;
        viewer.redraw()
    })
}

/// Opens the popup of the shape under the cursor, if any, and returns its markup.
#[wasm_bindgen]
pub fn click(x_px: f64, y_px: f64) -> Result<Option<String>, JsValue> {
    with_viewer(|viewer| {
        if std::mem::take(&mut viewer.suppress_click) {
            return Ok(None);
        }
        match viewer.session.popup_at(Point::new(x_px, y_px)) {
            Some(popup) => {
                viewer.panels.show_popup(&popup.html, x_px, y_px)?;
                Ok(Some(popup.html))
            }
            None => {
                viewer.panels.hide_popup()?;
                Ok(None)
            }
        }
    })
}

#[wasm_bindgen]
pub fn select_base_layer(name: &str) -> Result<(), JsValue> {
    with_viewer(|viewer| {
        let selected = viewer.session.select_base_layer(name);
        viewer.sync()?;
        selected.map_err(|e| JsValue::from_str(&e.to_string()))
    })
}

/// `key` is `points`, `lines` or `polygons`.
#[wasm_bindgen]
pub fn set_overlay_visible(key: &str, visible: bool) -> Result<(), JsValue> {
    let category = OverlayCategory::from_key(key)
        .ok_or_else(|| JsValue::from_str(&format!("unknown overlay {key}")))?;
    with_viewer(|viewer| {
        let toggled = viewer.session.set_overlay_visible(category, visible);
        viewer.sync()?;
        toggled.map_err(|e| JsValue::from_str(&e.to_string()))
    })
}

/// Current session state as JSON. Events already forwarded to the console
/// are not repeated.
#[wasm_bindgen]
pub fn get_report() -> Result<String, JsValue> {
    with_viewer(|viewer| {
        serde_json::to_string(&viewer.session.report())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    })
}
