use layers::legend::Legend;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement, HtmlInputElement,
    MouseEvent, WheelEvent,
};

const PANEL_STYLE: &str = "position:absolute;z-index:1000;background:#fff;padding:10px;\
     border-radius:6px;box-shadow:0 1px 5px rgba(0,0,0,0.4);font:13px/1.4 sans-serif;";

/// Elements the viewer writes into, all children of the host container.
pub struct Panels {
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
    pub control: HtmlElement,
    pub attribution: HtmlElement,
    pub popup: HtmlElement,
}

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .ok_or_else(|| JsValue::from_str("no window"))?
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))
}

fn create_div(document: &Document, parent: &Element, style: &str) -> Result<HtmlElement, JsValue> {
    let div = document.create_element("div")?.dyn_into::<HtmlElement>()?;
    div.set_attribute("style", style)?;
    parent.append_child(&div)?;
    Ok(div)
}

fn corner_style(corner: &str) -> &'static str {
    match corner {
        "topleft" => "top:10px;left:10px;",
        "bottomleft" => "bottom:10px;left:10px;",
        "bottomright" => "bottom:24px;right:10px;",
        _ => "top:10px;right:10px;",
    }
}

/// Replaces the container's content with the map canvas and its panels.
pub fn mount(container_id: &str, legend: &Legend) -> Result<Panels, JsValue> {
    let document = document()?;
    let container = document
        .get_element_by_id(container_id)
        .ok_or_else(|| JsValue::from_str(&format!("missing #{container_id}")))?;
    container.set_inner_html("");
    container.set_attribute("style", "position:relative;overflow:hidden;width:100%;height:100%;")?;

    let width = container.client_width().max(1) as u32;
    let height = container.client_height().max(1) as u32;

    let canvas = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()?;
    canvas.set_width(width);
    canvas.set_height(height);
    canvas.set_attribute("style", "display:block;cursor:grab;")?;
    container.append_child(&canvas)?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()?;

    let control = create_div(
        &document,
        &container,
        &format!("{PANEL_STYLE}{}", corner_style("topright")),
    )?;
    let legend_el = create_div(
        &document,
        &container,
        &format!("{PANEL_STYLE}{}", corner_style(legend.position.css_class())),
    )?;
    legend_el.set_class_name(&format!("legend {}", legend.position.css_class()));
    legend_el.set_inner_html(&legend.to_html());

    let attribution = create_div(
        &document,
        &container,
        "position:absolute;z-index:1000;bottom:0;right:0;padding:0 5px;\
         background:rgba(255,255,255,0.8);font:11px sans-serif;",
    )?;
    let popup = create_div(&document, &container, &format!("{PANEL_STYLE}display:none;"))?;

    Ok(Panels {
        canvas,
        ctx,
        control,
        attribution,
        popup,
    })
}

impl Panels {
    pub fn show_popup(&self, html: &str, x_px: f64, y_px: f64) -> Result<(), JsValue> {
        self.popup.set_inner_html(html);
        let style = self.popup.style();
        style.set_property("left", &format!("{}px", x_px + 10.0))?;
        style.set_property("top", &format!("{}px", (y_px - 20.0).max(0.0)))?;
        style.set_property("display", "block")
    }

    pub fn hide_popup(&self) -> Result<(), JsValue> {
        self.popup.style().set_property("display", "none")
    }

    /// Routes control inputs and pointer input on the canvas to the
    /// exported viewer functions.
    ///
    /// The control listener is delegated from its container, so it keeps
    /// working after the control markup is replaced.
    pub fn attach_listeners(&self) -> Result<(), JsValue> {
        let on_change = Closure::<dyn FnMut(web_sys::Event)>::new(|event: web_sys::Event| {
            let Some(input) = event
                .target()
                .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
            else {
                return;
            };
            let result = if let Some(name) = input.get_attribute("data-base") {
                crate::select_base_layer(&name)
            } else if let Some(key) = input.get_attribute("data-overlay") {
                crate::set_overlay_visible(&key, input.checked())
            } else {
                Ok(())
            };
            if let Err(err) = result {
                web_sys::console::warn_1(&err);
            }
        });
        self.control
            .add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())?;
        on_change.forget();

        self.on_mouse("mousedown", |e| {
            crate::pointer_down(e.offset_x() as f64, e.offset_y() as f64)
        })?;
        self.on_mouse("mousemove", |e| {
            crate::pointer_move(e.offset_x() as f64, e.offset_y() as f64)
        })?;
        self.on_mouse("mouseup", |_| crate::pointer_up())?;
        self.on_mouse("mouseleave", |_| crate::pointer_up())?;
        self.on_mouse("click", |e| {
            crate::click(e.offset_x() as f64, e.offset_y() as f64).map(|_| ())
        })?;

        let on_wheel = Closure::<dyn FnMut(WheelEvent)>::new(|e: WheelEvent| {
            e.prevent_default();
            if let Err(err) = crate::wheel(e.offset_x() as f64, e.offset_y() as f64, e.delta_y()) {
                web_sys::console::warn_1(&err);
            }
        });
        self.canvas
            .add_event_listener_with_callback("wheel", on_wheel.as_ref().unchecked_ref())?;
        on_wheel.forget();
        Ok(())
    }

    fn on_mouse(
        &self,
        kind: &str,
        handler: impl Fn(&MouseEvent) -> Result<(), JsValue> + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::<dyn FnMut(MouseEvent)>::new(move |e: MouseEvent| {
            if let Err(err) = handler(&e) {
                web_sys::console::warn_1(&err);
            }
        });
        self.canvas
            .add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }
}
