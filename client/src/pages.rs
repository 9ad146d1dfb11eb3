use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlCanvasElement, HtmlElement};

use signflow_shared::{RenderedDocument, SessionError};

use crate::dom::{create_html, set_px};
use crate::geometry::{PAGE_CONTAINER_CLASS, PAGE_INDEX_ATTR};
use crate::pdf::PdfJsDocument;

fn render_error(message: &str) -> SessionError {
    SessionError::Render(message.to_string())
}

fn page_container(
    document: &Document,
    page_index: usize,
) -> Result<(HtmlElement, HtmlCanvasElement), SessionError> {
    let container = create_html(document, "div", PAGE_CONTAINER_CLASS)
        .map_err(|_| render_error("Failed to create page"))?;
    container
        .set_attribute(PAGE_INDEX_ATTR, &page_index.to_string())
        .map_err(|_| render_error("Failed to label page"))?;
    let canvas = document
        .create_element("canvas")
        .ok()
        .and_then(|element| element.dyn_into::<HtmlCanvasElement>().ok())
        .ok_or_else(|| render_error("Failed to create canvas"))?;
    container
        .append_child(&canvas)
        .map_err(|_| render_error("Failed to attach canvas"))?;
    Ok((container, canvas))
}

/// Rasterizes every page at `scale` into detached containers, in order. The
/// page currently on screen is not touched, so a failure leaves it as is.
pub async fn render_pages(
    document: &Document,
    pdf: &PdfJsDocument,
    scale: f64,
) -> Result<Vec<HtmlElement>, SessionError> {
    let mut pages = Vec::with_capacity(pdf.page_count());
    for page_index in 0..pdf.page_count() {
        let (container, canvas) = page_container(document, page_index)?;
        let viewport = pdf
            .render_page(page_index, scale, &canvas)
            .await
            .map_err(SessionError::Render)?;
        set_px(&container, "width", viewport.rendered_width);
        set_px(&container, "height", viewport.rendered_height);
        pages.push(container);
    }
    Ok(pages)
}

/// Replaces the wrapper's content with freshly rendered pages.
pub fn mount_pages(wrapper: &HtmlElement, pages: &[HtmlElement]) -> Result<(), SessionError> {
    wrapper.set_inner_html("");
    for page in pages {
        wrapper
            .append_child(page)
            .map_err(|_| render_error("Failed to attach page"))?;
    }
    Ok(())
}
