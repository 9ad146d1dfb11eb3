use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlCanvasElement;

use signflow_shared::{
    DocumentEditor, DocumentMutator, DocumentRenderer, PageSize, PageViewport, PdfRect,
    RenderedDocument, TextFragment,
};

use crate::bindings::{
    get_f64, get_string, js_error_message, js_object, pdfjs_get_document, pdflib_load,
    PdfDocumentProxy, PdfLibDocument, PdfLibPage, PdfPageProxy,
};

async fn await_promise(promise: js_sys::Promise) -> Result<JsValue, String> {
    JsFuture::from(promise)
        .await
        .map_err(|err| js_error_message(&err))
}

/// pdf.js as the page renderer.
pub struct PdfJs;

pub struct PdfJsDocument {
    proxy: PdfDocumentProxy,
    page_count: usize,
}

impl DocumentRenderer for PdfJs {
    type Document = PdfJsDocument;

    async fn load(&self, bytes: &[u8]) -> Result<PdfJsDocument, String> {
        // pdf.js transfers the buffer to its worker, so it gets its own copy.
        let data = Uint8Array::from(bytes);
        let source = js_object(&[("data", data.into())]).map_err(|err| js_error_message(&err))?;
        let task = pdfjs_get_document(&source).map_err(|err| js_error_message(&err))?;
        let proxy: PdfDocumentProxy = await_promise(task.promise()).await?.unchecked_into();
        let page_count = proxy.num_pages() as usize;
        Ok(PdfJsDocument { proxy, page_count })
    }
}

impl PdfJsDocument {
    async fn page(&self, page_index: usize) -> Result<PdfPageProxy, String> {
        if page_index >= self.page_count {
            return Err(format!("Page {} does not exist", page_index + 1));
        }
        let page = await_promise(self.proxy.get_page(page_index as u32 + 1)).await?;
        Ok(page.unchecked_into())
    }

    /// Rasterizes one page into `canvas`, sizing the canvas to the viewport.
    pub async fn render_page(
        &self,
        page_index: usize,
        scale: f64,
        canvas: &HtmlCanvasElement,
    ) -> Result<PageViewport, String> {
        let page = self.page(page_index).await?;
        let viewport = viewport_of(&page, page_index, scale)?;
        let scaled = page.get_viewport(&scale_params(scale)?);
        canvas.set_width(viewport.rendered_width.round() as u32);
        canvas.set_height(viewport.rendered_height.round() as u32);
        let context = canvas
            .get_context("2d")
            .map_err(|err| js_error_message(&err))?
            .ok_or_else(|| "Canvas 2d context unavailable".to_string())?;
        let params = js_object(&[("canvasContext", context.into()), ("viewport", scaled.into())])
            .map_err(|err| js_error_message(&err))?;
        let task = page.render(&params).map_err(|err| js_error_message(&err))?;
        await_promise(task.promise()).await?;
        Ok(viewport)
    }
}

fn scale_params(scale: f64) -> Result<JsValue, String> {
    js_object(&[("scale", JsValue::from_f64(scale))])
        .map(JsValue::from)
        .map_err(|err| js_error_message(&err))
}

fn media_box(page: &PdfPageProxy) -> Option<[f64; 4]> {
    let view = page.view().dyn_into::<Array>().ok()?;
    if view.length() < 4 {
        return None;
    }
    let mut media_box = [0.0; 4];
    for (slot, value) in media_box.iter_mut().zip(view.iter()) {
        *slot = value.as_f64()?;
    }
    Some(media_box)
}

fn viewport_of(page: &PdfPageProxy, page_index: usize, scale: f64) -> Result<PageViewport, String> {
    let rotation = page.rotate() as i32;
    let view_box = match media_box(page) {
        Some(view_box) => view_box,
        None => {
            let unscaled = page.get_viewport(&scale_params(1.0)?);
            [0.0, 0.0, unscaled.width(), unscaled.height()]
        }
    };
    Ok(PageViewport::from_view_box(page_index, view_box, rotation, scale))
}

/// Converts pdf.js text items. Marked-content entries carry no `str` and are
/// skipped.
fn text_fragments_from(content: &JsValue) -> Vec<TextFragment> {
    let Ok(items) = js_sys::Reflect::get(content, &JsValue::from_str("items")) else {
        return Vec::new();
    };
    let Ok(items) = items.dyn_into::<Array>() else {
        return Vec::new();
    };
    let mut fragments = Vec::with_capacity(items.length() as usize);
    for item in items.iter() {
        let Some(text) = get_string(&item, "str") else {
            continue;
        };
        let Ok(raw) = js_sys::Reflect::get(&item, &JsValue::from_str("transform")) else {
            continue;
        };
        let Ok(raw) = raw.dyn_into::<Array>() else {
            continue;
        };
        if raw.length() < 6 {
            continue;
        }
        let mut transform = [0.0; 6];
        for (slot, value) in transform.iter_mut().zip(raw.iter()) {
            *slot = value.as_f64().unwrap_or(0.0);
        }
        fragments.push(TextFragment {
            text,
            transform,
            width: get_f64(&item, "width").unwrap_or(0.0),
        });
    }
    fragments
}

impl RenderedDocument for PdfJsDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn viewport(&self, page_index: usize, scale: f64) -> Result<PageViewport, String> {
        let page = self.page(page_index).await?;
        viewport_of(&page, page_index, scale)
    }

    async fn text_fragments(&self, page_index: usize) -> Result<Vec<TextFragment>, String> {
        let page = self.page(page_index).await?;
        let content = await_promise(page.get_text_content()).await?;
        Ok(text_fragments_from(&content))
    }
}

/// pdf-lib as the document mutator.
pub struct PdfLib;

pub struct PdfLibEditor {
    document: PdfLibDocument,
    pages: Vec<PdfLibPage>,
}

impl DocumentMutator for PdfLib {
    type Editor = PdfLibEditor;

    async fn load(&self, bytes: &[u8]) -> Result<PdfLibEditor, String> {
        let data = Uint8Array::from(bytes);
        let promise = pdflib_load(&data).map_err(|err| js_error_message(&err))?;
        let document: PdfLibDocument = await_promise(promise).await?.unchecked_into();
        let pages = document
            .get_pages()
            .iter()
            .map(|page| page.unchecked_into::<PdfLibPage>())
            .collect();
        Ok(PdfLibEditor { document, pages })
    }
}

impl DocumentEditor for PdfLibEditor {
    type Image = JsValue;

    fn page_size(&self, page_index: usize) -> Option<PageSize> {
        let size = self.pages.get(page_index)?.get_size();
        Some(PageSize::new(
            get_f64(&size, "width")?,
            get_f64(&size, "height")?,
        ))
    }

    async fn embed_png(&mut self, png: &[u8]) -> Result<JsValue, String> {
        let data = Uint8Array::from(png);
        let promise = self
            .document
            .embed_png(&data)
            .map_err(|err| js_error_message(&err))?;
        await_promise(promise).await
    }

    fn draw_image(
        &mut self,
        page_index: usize,
        image: &JsValue,
        rect: PdfRect,
    ) -> Result<(), String> {
        let page = self
            .pages
            .get(page_index)
            .ok_or_else(|| format!("Page {} does not exist", page_index + 1))?;
        // pdf-lib draws in raw user space, so shift by the media box origin.
        let origin = page.get_media_box();
        let origin_x = get_f64(&origin, "x").unwrap_or(0.0);
        let origin_y = get_f64(&origin, "y").unwrap_or(0.0);
        let options = js_object(&[
            ("x", JsValue::from_f64(rect.x + origin_x)),
            ("y", JsValue::from_f64(rect.y + origin_y)),
            ("width", JsValue::from_f64(rect.width)),
            ("height", JsValue::from_f64(rect.height)),
        ])
        .map_err(|err| js_error_message(&err))?;
        page.draw_image(image, &options)
            .map_err(|err| js_error_message(&err))
    }

    async fn save(&mut self) -> Result<Vec<u8>, String> {
        let promise = self.document.save().map_err(|err| js_error_message(&err))?;
        let saved = await_promise(promise).await?;
        Ok(Uint8Array::new(&saved).to_vec())
    }
}
