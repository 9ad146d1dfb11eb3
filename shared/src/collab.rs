//! Contracts of the external collaborators the session drives: the page
//! renderer, the document mutator and the live page layout. Errors are plain
//! messages because they are only ever shown to the user.
#![allow(async_fn_in_trait)]

use crate::geometry::{OverlayGeometry, PageSize, PageViewport, PdfRect};
use crate::keywords::TextFragment;
use crate::overlay::OverlayId;

pub trait DocumentRenderer {
    type Document: RenderedDocument;

    async fn load(&self, bytes: &[u8]) -> Result<Self::Document, String>;
}

pub trait RenderedDocument {
    fn page_count(&self) -> usize;
    async fn viewport(&self, page_index: usize, scale: f64) -> Result<PageViewport, String>;
    async fn text_fragments(&self, page_index: usize) -> Result<Vec<TextFragment>, String>;
}

pub trait DocumentMutator {
    type Editor: DocumentEditor;

    async fn load(&self, bytes: &[u8]) -> Result<Self::Editor, String>;
}

pub trait DocumentEditor {
    type Image;

    /// Page size in PDF points.
    fn page_size(&self, page_index: usize) -> Option<PageSize>;
    async fn embed_png(&mut self, png: &[u8]) -> Result<Self::Image, String>;
    fn draw_image(
        &mut self,
        page_index: usize,
        image: &Self::Image,
        rect: PdfRect,
    ) -> Result<(), String>;
    async fn save(&mut self) -> Result<Vec<u8>, String>;
}

/// Read side of the displayed pages, consulted at save time.
pub trait OverlayLayout {
    /// Page the overlay is attached to and its box within that page.
    fn overlay_geometry(&self, overlay: OverlayId) -> Option<(usize, OverlayGeometry)>;
    /// Displayed size of a page container in pixels.
    fn page_size(&self, page_index: usize) -> Option<PageSize>;
}
