use serde::{Deserialize, Serialize};

pub mod collab;
pub mod drag;
pub mod geometry;
pub mod keywords;
pub mod overlay;
pub mod placement;
pub mod session;

pub use collab::{
    DocumentEditor, DocumentMutator, DocumentRenderer, OverlayLayout, RenderedDocument,
};
pub use drag::{ContainerRect, DragController, DragState, DragStep, PageHost};
pub use geometry::{
    clamp_position, to_pdf, to_viewport, OverlayGeometry, PageSize, PageViewport, PdfRect,
    ScaleFactors,
};
pub use keywords::{find_signature_anchor, TextFragment, DEFAULT_KEYWORDS};
pub use overlay::{OverlayId, SignatureImage, SignatureOverlay};
pub use placement::{place_default, Placement, PlacementConfig, PlacementSource};
pub use session::{
    validate_upload, DocumentSession, SaveOutcome, SessionError, SignedDocument, Stamp,
};

/// Messages exchanged between the main window and the pop-out signing pad.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum PadMessage {
    #[serde(rename = "ADD_SIGNATURE")]
    AddSignature { data: String },
}

impl PadMessage {
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}
