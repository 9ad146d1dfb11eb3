use std::collections::HashMap;

use signflow_shared::{DocumentSession, DragController, OverlayId, SignatureImage};

use crate::config::ClientConfig;
use crate::drag::DragListeners;
use crate::overlay::OverlayHandlers;
use crate::pdf::PdfJsDocument;

pub type Session = DocumentSession<PdfJsDocument>;

pub struct State {
    /// `None` while an async operation (load, placement, save) holds the
    /// session.
    pub session: Option<Session>,
    /// Signatures that arrived while the session was held; placed as soon as
    /// it comes back.
    pub pending_signatures: Vec<SignatureImage>,
    pub config: ClientConfig,
    pub drag: DragController,
    pub drag_listeners: Option<DragListeners>,
    pub overlay_handlers: HashMap<OverlayId, OverlayHandlers>,
}

/// What `cancel_drag` tore down: the overlay that was being dragged and its
/// document listeners, already released.
pub struct CancelledDrag {
    pub overlay: Option<OverlayId>,
    pub listeners: Option<DragListeners>,
}

impl State {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            session: Some(DocumentSession::new(config.render_scale)),
            pending_signatures: Vec::new(),
            config,
            drag: DragController::new(),
            drag_listeners: None,
            overlay_handlers: HashMap::new(),
        }
    }

    /// Ends any drag in progress and releases its document listeners.
    pub fn cancel_drag(&mut self) -> CancelledDrag {
        let overlay = self.drag.end();
        let listeners = self.drag_listeners.take().map(|mut listeners| {
            listeners.release();
            listeners
        });
        CancelledDrag { overlay, listeners }
    }

    pub fn defer_signature(&mut self, image: SignatureImage) {
        self.pending_signatures.push(image);
    }

    /// Hands the session back and returns the signatures queued meanwhile,
    /// oldest first.
    pub fn restore_session(&mut self, session: Session) -> Vec<SignatureImage> {
        self.session = Some(session);
        std::mem::take(&mut self.pending_signatures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use signflow_shared::SignatureOverlay;

    fn image(tag: &str) -> SignatureImage {
        SignatureImage::from_data_url(format!("data:image/png;base64,{tag}"))
    }

    #[test]
    fn signatures_wait_for_the_session() {
        let mut state = State::new(ClientConfig::default());
        let session = state.session.take().unwrap();
        state.defer_signature(image("AAAA"));
        state.defer_signature(image("BBBB"));

        let pending = state.restore_session(session);
        assert_eq!(pending, vec![image("AAAA"), image("BBBB")]);
        assert!(state.session.is_some());
        assert!(state.pending_signatures.is_empty());
        let restored = state.session.take().unwrap();
        assert!(state.restore_session(restored).is_empty());
    }

    #[test]
    fn cancel_reports_the_dragged_overlay() {
        let mut state = State::new(ClientConfig::default());
        let overlay = SignatureOverlay {
            id: OverlayId(7),
            image: image("AAAA"),
            page_index: 0,
            left: 10.0,
            top: 20.0,
            width: 150.0,
            height: 100.0,
        };
        assert!(state.drag.begin(&overlay, 15.0, 25.0));

        let cancelled = state.cancel_drag();
        assert_eq!(cancelled.overlay, Some(OverlayId(7)));
        assert!(cancelled.listeners.is_none());
        assert!(!state.drag.is_dragging());
        assert_eq!(state.cancel_drag().overlay, None);
    }
}
