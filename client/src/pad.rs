use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Event, HtmlButtonElement, HtmlCanvasElement, HtmlElement, Window};

use signflow_shared::PadMessage;

use crate::bindings::{js_object, SignaturePad};
use crate::dom::{alert, get_element};

pub const POP_OUT_URL: &str = "pad.html";
pub const POP_OUT_NAME: &str = "SignFlowPad";
const POP_OUT_WIDTH: i32 = 600;
const POP_OUT_HEIGHT: i32 = 400;

/// The signature capture canvas, backed by signature_pad.
pub struct SignaturePadWidget {
    canvas: HtmlCanvasElement,
    pad: SignaturePad,
}

impl SignaturePadWidget {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        fit_to_parent(&canvas);
        let options = js_object(&[
            ("backgroundColor", JsValue::from_str("rgba(255, 255, 255, 0)")),
            ("penColor", JsValue::from_str("rgb(0, 0, 0)")),
        ])?;
        let pad = SignaturePad::new(&canvas, &options);
        Ok(Self { canvas, pad })
    }

    pub fn is_empty(&self) -> bool {
        self.pad.is_empty()
    }

    pub fn clear(&self) {
        self.pad.clear();
    }

    pub fn to_png_data_url(&self) -> String {
        self.pad.to_data_url("image/png")
    }

    /// Matches the canvas to its container and redraws the strokes, which a
    /// canvas resize would otherwise wipe.
    pub fn resize(&self) {
        let strokes = self.pad.to_data();
        fit_to_parent(&self.canvas);
        self.pad.clear();
        self.pad.from_data(&strokes);
    }
}

fn fit_to_parent(canvas: &HtmlCanvasElement) {
    let Some(parent) = canvas
        .parent_element()
        .and_then(|parent| parent.dyn_into::<HtmlElement>().ok())
    else {
        return;
    };
    canvas.set_width(parent.client_width().max(0) as u32);
    canvas.set_height(parent.client_height().max(0) as u32);
}

pub fn pop_out_features(screen_width: i32, screen_height: i32) -> String {
    let left = (screen_width - POP_OUT_WIDTH) / 2;
    let top = (screen_height - POP_OUT_HEIGHT) / 2;
    format!(
        "width={POP_OUT_WIDTH},height={POP_OUT_HEIGHT},left={left},top={top},resizable=yes,scrollbars=no,status=no"
    )
}

pub fn open_pop_out(window: &Window) -> Result<(), JsValue> {
    let (width, height) = match window.screen() {
        Ok(screen) => (screen.width().unwrap_or(0), screen.height().unwrap_or(0)),
        Err(_) => (0, 0),
    };
    window.open_with_url_and_target_and_features(
        POP_OUT_URL,
        POP_OUT_NAME,
        &pop_out_features(width, height),
    )?;
    Ok(())
}

pub fn message_to_js(message: &PadMessage) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(message).map_err(|err| JsValue::from_str(&err.to_string()))?;
    js_sys::JSON::parse(&json)
}

pub fn message_from_js(value: &JsValue) -> Option<PadMessage> {
    let json = js_sys::JSON::stringify(value).ok()?.as_string()?;
    PadMessage::parse(&json)
}

/// Entry point for the pop-out page: capture a signature and post it back
/// to the window that opened us.
pub fn start_pad_page(window: &Window, document: &Document) -> Result<(), JsValue> {
    let canvas: HtmlCanvasElement = get_element(document, "signature-pad")?;
    let clear_button: HtmlButtonElement = get_element(document, "clear-sig-btn")?;
    let use_button: HtmlButtonElement = get_element(document, "pad-use-btn")?;
    let pad = Rc::new(SignaturePadWidget::new(canvas)?);

    {
        let pad = pad.clone();
        let onresize = Closure::<dyn FnMut()>::new(move || pad.resize());
        window.add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
        onresize.forget();
    }

    {
        let pad = pad.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| pad.clear());
        clear_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let window_cb = window.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            if pad.is_empty() {
                alert(&window_cb, "Please sign first.");
                return;
            }
            let opener = match window_cb.opener() {
                Ok(opener) if !opener.is_null() && !opener.is_undefined() => opener,
                _ => {
                    alert(&window_cb, "The signing window has been closed.");
                    return;
                }
            };
            // The opener lives in another realm, so `instanceof Window` fails.
            let opener = opener.unchecked_into::<Window>();
            let message = PadMessage::AddSignature {
                data: pad.to_png_data_url(),
            };
            let origin = window_cb.location().origin().unwrap_or_else(|_| "*".to_string());
            match message_to_js(&message) {
                Ok(payload) => {
                    if let Err(err) = opener.post_message(&payload, &origin) {
                        web_sys::console::error_2(&"Failed to send signature".into(), &err);
                        return;
                    }
                    pad.clear();
                    let _ = window_cb.close();
                }
                Err(err) => web_sys::console::error_2(&"Failed to encode signature".into(), &err),
            }
        });
        use_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    Ok(())
}
