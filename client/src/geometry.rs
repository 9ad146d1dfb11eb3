use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement};

use signflow_shared::{ContainerRect, OverlayGeometry, OverlayId, OverlayLayout, PageHost, PageSize};

pub const PAGE_CONTAINER_CLASS: &str = "pdf-page-container";
pub const OVERLAY_CLASS: &str = "draggable-signature";
pub const PAGE_INDEX_ATTR: &str = "data-page-index";
pub const OVERLAY_ID_ATTR: &str = "data-overlay-id";

pub fn page_index_of(element: &Element) -> Option<usize> {
    element.get_attribute(PAGE_INDEX_ATTR)?.parse().ok()
}

pub fn offset_box(element: &HtmlElement) -> OverlayGeometry {
    OverlayGeometry {
        left: element.offset_left() as f64,
        top: element.offset_top() as f64,
        width: element.offset_width() as f64,
        height: element.offset_height() as f64,
    }
}

/// The rendered pages as they sit in the document. Page containers are
/// looked up by `data-page-index`, overlays by `data-overlay-id`.
#[derive(Clone)]
pub struct DomLayout {
    document: Document,
    wrapper: HtmlElement,
}

impl DomLayout {
    pub fn new(document: Document, wrapper: HtmlElement) -> Self {
        Self { document, wrapper }
    }

    pub fn page_container(&self, page_index: usize) -> Option<HtmlElement> {
        let selector = format!(".{PAGE_CONTAINER_CLASS}[{PAGE_INDEX_ATTR}=\"{page_index}\"]");
        self.wrapper
            .query_selector(&selector)
            .ok()
            .flatten()
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
    }

    pub fn overlay_element(&self, overlay: OverlayId) -> Option<HtmlElement> {
        let selector = format!(".{OVERLAY_CLASS}[{OVERLAY_ID_ATTR}=\"{}\"]", overlay.0);
        self.wrapper
            .query_selector(&selector)
            .ok()
            .flatten()
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
    }
}

impl PageHost for DomLayout {
    type Error = String;

    fn container_at(&self, x: f64, y: f64) -> Option<usize> {
        let element = self.document.element_from_point(x as f32, y as f32)?;
        let container = element
            .closest(&format!(".{PAGE_CONTAINER_CLASS}"))
            .ok()
            .flatten()?;
        page_index_of(&container)
    }

    fn container_rect(&self, page_index: usize) -> Option<ContainerRect> {
        let container = self.page_container(page_index)?;
        let rect = container.get_bounding_client_rect();
        Some(ContainerRect {
            left: rect.left(),
            top: rect.top(),
            width: container.offset_width() as f64,
            height: container.offset_height() as f64,
        })
    }

    fn reparent(&mut self, overlay: OverlayId, to_page: usize) -> Result<(), String> {
        let element = self
            .overlay_element(overlay)
            .ok_or_else(|| format!("Signature {overlay} is not in the page"))?;
        let container = self
            .page_container(to_page)
            .ok_or_else(|| format!("Page {} not found in view", to_page + 1))?;
        // appendChild detaches from the old parent as part of the same call.
        container
            .append_child(&element)
            .map(|_| ())
            .map_err(|err| crate::bindings::js_error_message(&err))
    }
}

impl OverlayLayout for DomLayout {
    fn overlay_geometry(&self, overlay: OverlayId) -> Option<(usize, OverlayGeometry)> {
        let element = self.overlay_element(overlay)?;
        let parent = element.parent_element()?;
        Some((page_index_of(&parent)?, offset_box(&element)))
    }

    fn page_size(&self, page_index: usize) -> Option<PageSize> {
        let container = self.page_container(page_index)?;
        Some(PageSize::new(
            container.offset_width() as f64,
            container.offset_height() as f64,
        ))
    }
}
