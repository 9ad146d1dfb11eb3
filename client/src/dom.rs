use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Blob, BlobPropertyBag, Document, HtmlAnchorElement, HtmlButtonElement, HtmlElement, Url,
    Window,
};

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

pub fn create_html(document: &Document, tag: &str, class: &str) -> Result<HtmlElement, JsValue> {
    let element = document
        .create_element(tag)?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {tag}")))?;
    if !class.is_empty() {
        element.set_class_name(class);
    }
    Ok(element)
}

pub fn set_px(element: &HtmlElement, property: &str, value: f64) {
    let _ = element
        .style()
        .set_property(property, &format!("{value}px"));
}

pub fn alert(window: &Window, message: &str) {
    let _ = window.alert_with_message(message);
}

/// Swaps the save button into its busy state and back, restoring the
/// original label.
pub fn set_save_busy(button: &HtmlButtonElement, busy: bool, idle_label: &str) {
    if busy {
        button.set_inner_html("<i class=\"fa-solid fa-spinner fa-spin\"></i> Saving...");
        button.set_disabled(true);
        let _ = button.set_attribute("aria-busy", "true");
    } else {
        button.set_inner_html(idle_label);
        button.set_disabled(false);
        let _ = button.set_attribute("aria-busy", "false");
    }
}

/// Offers `bytes` as a file download through a temporary anchor.
pub fn download_blob(
    window: &Window,
    document: &Document,
    bytes: &[u8],
    file_name: &str,
    mime_type: &str,
) -> Result<(), JsValue> {
    let parts = Array::of1(&Uint8Array::from(bytes));
    let options = BlobPropertyBag::new();
    options.set_type(mime_type);
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    let anchor = document
        .create_element("a")?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|_| JsValue::from_str("Invalid element type: a"))?;
    anchor.set_href(&url);
    anchor.set_download(file_name);
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("Missing body"))?;
    body.append_child(&anchor)?;
    anchor.click();

    let cleanup = Closure::once_into_js(move || {
        anchor.remove();
        let _ = Url::revoke_object_url(&url);
    });
    window.set_timeout_with_callback_and_timeout_and_arguments_0(cleanup.unchecked_ref(), 100)?;
    Ok(())
}
