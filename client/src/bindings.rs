//! Imports of the page-level JavaScript libraries: pdf.js (`pdfjsLib`),
//! pdf-lib (`PDFLib`) and signature_pad (`SignaturePad`). All three are
//! loaded by `index.html` as globals before the wasm module starts.

use js_sys::{Object, Promise, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

#[wasm_bindgen]
extern "C" {
    pub type PdfLoadingTask;

    #[wasm_bindgen(catch, js_namespace = pdfjsLib, js_name = getDocument)]
    pub fn pdfjs_get_document(source: &JsValue) -> Result<PdfLoadingTask, JsValue>;

    #[wasm_bindgen(method, getter)]
    pub fn promise(this: &PdfLoadingTask) -> Promise;

    pub type PdfDocumentProxy;

    #[wasm_bindgen(method, getter, js_name = numPages)]
    pub fn num_pages(this: &PdfDocumentProxy) -> u32;

    /// 1-based page number.
    #[wasm_bindgen(method, js_name = getPage)]
    pub fn get_page(this: &PdfDocumentProxy, number: u32) -> Promise;

    pub type PdfPageProxy;

    #[wasm_bindgen(method, js_name = getViewport)]
    pub fn get_viewport(this: &PdfPageProxy, params: &JsValue) -> PdfViewport;

    #[wasm_bindgen(catch, method)]
    pub fn render(this: &PdfPageProxy, params: &JsValue) -> Result<PdfRenderTask, JsValue>;

    #[wasm_bindgen(method, js_name = getTextContent)]
    pub fn get_text_content(this: &PdfPageProxy) -> Promise;

    /// Media box as `[x0, y0, x1, y1]`.
    #[wasm_bindgen(method, getter)]
    pub fn view(this: &PdfPageProxy) -> JsValue;

    #[wasm_bindgen(method, getter)]
    pub fn rotate(this: &PdfPageProxy) -> f64;

    pub type PdfViewport;

    #[wasm_bindgen(method, getter)]
    pub fn width(this: &PdfViewport) -> f64;

    #[wasm_bindgen(method, getter)]
    pub fn height(this: &PdfViewport) -> f64;

    pub type PdfRenderTask;

    #[wasm_bindgen(method, getter)]
    pub fn promise(this: &PdfRenderTask) -> Promise;

    #[wasm_bindgen(catch, js_namespace = ["PDFLib", "PDFDocument"], js_name = load)]
    pub fn pdflib_load(bytes: &Uint8Array) -> Result<Promise, JsValue>;

    pub type PdfLibDocument;

    #[wasm_bindgen(method, js_name = getPages)]
    pub fn get_pages(this: &PdfLibDocument) -> js_sys::Array;

    #[wasm_bindgen(catch, method, js_name = embedPng)]
    pub fn embed_png(this: &PdfLibDocument, bytes: &Uint8Array) -> Result<Promise, JsValue>;

    #[wasm_bindgen(catch, method)]
    pub fn save(this: &PdfLibDocument) -> Result<Promise, JsValue>;

    pub type PdfLibPage;

    #[wasm_bindgen(method, js_name = getSize)]
    pub fn get_size(this: &PdfLibPage) -> JsValue;

    #[wasm_bindgen(method, js_name = getMediaBox)]
    pub fn get_media_box(this: &PdfLibPage) -> JsValue;

    #[wasm_bindgen(catch, method, js_name = drawImage)]
    pub fn draw_image(
        this: &PdfLibPage,
        image: &JsValue,
        options: &JsValue,
    ) -> Result<(), JsValue>;

    pub type SignaturePad;

    #[wasm_bindgen(constructor)]
    pub fn new(canvas: &HtmlCanvasElement, options: &JsValue) -> SignaturePad;

    #[wasm_bindgen(method, js_name = isEmpty)]
    pub fn is_empty(this: &SignaturePad) -> bool;

    #[wasm_bindgen(method)]
    pub fn clear(this: &SignaturePad);

    #[wasm_bindgen(method, js_name = toDataURL)]
    pub fn to_data_url(this: &SignaturePad, mime_type: &str) -> String;

    #[wasm_bindgen(method, js_name = toData)]
    pub fn to_data(this: &SignaturePad) -> JsValue;

    #[wasm_bindgen(method, js_name = fromData)]
    pub fn from_data(this: &SignaturePad, data: &JsValue);
}

/// Builds a plain JS object from key/value pairs.
pub fn js_object(entries: &[(&str, JsValue)]) -> Result<Object, JsValue> {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &JsValue::from_str(key), value)?;
    }
    Ok(object)
}

pub fn get_f64(target: &JsValue, key: &str) -> Option<f64> {
    Reflect::get(target, &JsValue::from_str(key)).ok()?.as_f64()
}

pub fn get_string(target: &JsValue, key: &str) -> Option<String> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()?
        .as_string()
}

/// Best message available from a thrown JS value.
pub fn js_error_message(value: &JsValue) -> String {
    if let Some(message) = get_string(value, "message") {
        return message;
    }
    if let Some(text) = value.as_string() {
        return text;
    }
    format!("{value:?}")
}
