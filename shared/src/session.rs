use crate::collab::{
    DocumentEditor, DocumentMutator, DocumentRenderer, OverlayLayout, RenderedDocument,
};
use crate::geometry::{to_pdf, PageSize, PdfRect};
use crate::overlay::{OverlayId, SignatureImage, SignatureOverlay};
use crate::placement::{place_default, place_without_text, Placement, PlacementConfig};

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const SIGNED_FILE_NAME: &str = "signed_document.pdf";
pub const DEFAULT_RENDER_SCALE: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Please upload a valid PDF file.")]
    InvalidFileType(String),
    #[error("Please upload a PDF first.")]
    NoDocument,
    #[error("Please wait for the current operation to finish.")]
    Busy,
    #[error("Please sign first.")]
    EmptySignature,
    #[error("Page {} not found in view.", .0 + 1)]
    PageMissing(usize),
    #[error("Signature {0} is not attached to a page.")]
    OverlayDetached(OverlayId),
    #[error("Error loading PDF: {0}")]
    Load(String),
    #[error("Error rendering page: {0}")]
    Render(String),
    #[error("Error reading signature image: {0}")]
    Image(String),
    #[error("Error embedding signature: {0}")]
    Embed(String),
    #[error("Error drawing signature: {0}")]
    Draw(String),
    #[error("Error saving PDF: {0}")]
    Serialize(String),
}

impl SessionError {
    /// Bad input from the user rather than a failing collaborator.
    pub fn is_input_rejection(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidFileType(_)
                | SessionError::NoDocument
                | SessionError::Busy
                | SessionError::EmptySignature
        )
    }
}

/// One signature as it was written into the saved document.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    pub overlay: OverlayId,
    pub page_index: usize,
    pub rect: PdfRect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedDocument {
    pub bytes: Vec<u8>,
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub stamps: Vec<Stamp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    NothingToSave,
    Saved(SignedDocument),
}

pub fn validate_upload(mime_type: &str) -> Result<(), SessionError> {
    if mime_type == PDF_MIME_TYPE {
        Ok(())
    } else {
        Err(SessionError::InvalidFileType(mime_type.to_string()))
    }
}

pub struct DocumentSession<D> {
    document: Option<D>,
    original_bytes: Vec<u8>,
    page_count: usize,
    overlays: Vec<SignatureOverlay>,
    next_id: u64,
    render_scale: f64,
}

impl<D> Default for DocumentSession<D> {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_SCALE)
    }
}

impl<D> DocumentSession<D> {
    pub fn new(render_scale: f64) -> Self {
        Self {
            document: None,
            original_bytes: Vec::new(),
            page_count: 0,
            overlays: Vec::new(),
            next_id: 1,
            render_scale,
        }
    }

    pub fn render_scale(&self) -> f64 {
        self.render_scale
    }

    pub fn document(&self) -> Option<&D> {
        self.document.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn original_bytes(&self) -> &[u8] {
        &self.original_bytes
    }

    pub fn overlays(&self) -> &[SignatureOverlay] {
        &self.overlays
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&SignatureOverlay> {
        self.overlays.iter().find(|overlay| overlay.id == id)
    }

    pub fn overlay_mut(&mut self, id: OverlayId) -> Option<&mut SignatureOverlay> {
        self.overlays.iter_mut().find(|overlay| overlay.id == id)
    }

    pub fn remove_overlay(&mut self, id: OverlayId) -> Option<SignatureOverlay> {
        let index = self.overlays.iter().position(|overlay| overlay.id == id)?;
        Some(self.overlays.remove(index))
    }
}

impl<D: RenderedDocument> DocumentSession<D> {
    /// Replaces the current document. Prior overlays are discarded only once
    /// the new document has loaded; a failed load leaves everything as it was.
    pub async fn load<R>(&mut self, renderer: &R, bytes: Vec<u8>) -> Result<usize, SessionError>
    where
        R: DocumentRenderer<Document = D>,
    {
        let document = renderer.load(&bytes).await.map_err(SessionError::Load)?;
        Ok(self.replace_document(document, bytes))
    }

    /// Commits an already loaded document, discarding every overlay. Lets the
    /// caller finish rendering before the previous document goes away.
    pub fn replace_document(&mut self, document: D, bytes: Vec<u8>) -> usize {
        self.page_count = document.page_count();
        self.document = Some(document);
        self.original_bytes = bytes;
        self.overlays.clear();
        self.page_count
    }

    /// Creates an overlay on the last page, auto-positioned near a signature
    /// label when the page text has one.
    pub async fn place_signature(
        &mut self,
        image: SignatureImage,
        size: PageSize,
        config: &PlacementConfig,
    ) -> Result<(SignatureOverlay, Placement), SessionError> {
        if image.is_empty() {
            return Err(SessionError::EmptySignature);
        }
        let document = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        let page_index = self
            .page_count
            .checked_sub(1)
            .ok_or(SessionError::PageMissing(0))?;
        let viewport = document
            .viewport(page_index, self.render_scale)
            .await
            .map_err(SessionError::Render)?;
        let placement = match document.text_fragments(page_index).await {
            Ok(fragments) => place_default(&fragments, &viewport, size, config),
            Err(reason) => place_without_text(&viewport, size, config, reason),
        };

        let overlay = SignatureOverlay {
            id: OverlayId(self.next_id),
            image,
            page_index,
            left: placement.left,
            top: placement.top,
            width: size.width,
            height: size.height,
        };
        self.next_id += 1;
        self.overlays.push(overlay.clone());
        Ok((overlay, placement))
    }

    /// Bakes every overlay into a copy of the original bytes. Geometry is
    /// read back from the live layout, so whatever the user sees is what gets
    /// written. Any failure aborts the whole save.
    pub async fn save<M, L>(&self, mutator: &M, layout: &L) -> Result<SaveOutcome, SessionError>
    where
        M: DocumentMutator,
        L: OverlayLayout + ?Sized,
    {
        if self.document.is_none() {
            return Err(SessionError::NoDocument);
        }
        if self.overlays.is_empty() {
            return Ok(SaveOutcome::NothingToSave);
        }

        let mut editor = mutator
            .load(&self.original_bytes)
            .await
            .map_err(SessionError::Load)?;
        let mut stamps = Vec::with_capacity(self.overlays.len());
        for overlay in &self.overlays {
            let (page_index, geometry) = layout
                .overlay_geometry(overlay.id)
                .ok_or(SessionError::OverlayDetached(overlay.id))?;
            let dom_page = layout
                .page_size(page_index)
                .ok_or(SessionError::PageMissing(page_index))?;
            let pdf_page = editor
                .page_size(page_index)
                .ok_or(SessionError::PageMissing(page_index))?;

            let png = overlay.image.png_bytes().map_err(SessionError::Image)?;
            let image = editor.embed_png(&png).await.map_err(SessionError::Embed)?;
            let rect = to_pdf(&geometry, dom_page, pdf_page);
            editor
                .draw_image(page_index, &image, rect)
                .map_err(SessionError::Draw)?;
            stamps.push(Stamp {
                overlay: overlay.id,
                page_index,
                rect,
            });
        }

        let bytes = editor.save().await.map_err(SessionError::Serialize)?;
        Ok(SaveOutcome::Saved(SignedDocument {
            bytes,
            file_name: SIGNED_FILE_NAME,
            mime_type: PDF_MIME_TYPE,
            stamps,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use futures::executor::block_on;

    use super::*;
    use crate::geometry::{OverlayGeometry, PageViewport};
    use crate::keywords::TextFragment;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";
    const SIG: PageSize = PageSize {
        width: 150.0,
        height: 60.0,
    };

    struct FakeDocument {
        pages: Vec<(f64, f64)>,
        text: Result<Vec<TextFragment>, String>,
    }

    impl RenderedDocument for FakeDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        async fn viewport(&self, page_index: usize, scale: f64) -> Result<PageViewport, String> {
            let (width, height) = self
                .pages
                .get(page_index)
                .copied()
                .ok_or_else(|| format!("no page {page_index}"))?;
            Ok(PageViewport::new(page_index, width, height, scale))
        }

        async fn text_fragments(&self, _page_index: usize) -> Result<Vec<TextFragment>, String> {
            self.text.clone()
        }
    }

    struct FakeRenderer {
        pages: usize,
        text: Result<Vec<TextFragment>, String>,
    }

    impl DocumentRenderer for FakeRenderer {
        type Document = FakeDocument;

        async fn load(&self, bytes: &[u8]) -> Result<FakeDocument, String> {
            if !bytes.starts_with(b"%PDF") {
                return Err("Invalid PDF structure".into());
            }
            Ok(FakeDocument {
                pages: vec![(612.0, 792.0); self.pages],
                text: self.text.clone(),
            })
        }
    }

    struct FakeEditor {
        embedded: usize,
        draws: Vec<(usize, PdfRect)>,
        fail_embed: bool,
    }

    impl DocumentEditor for FakeEditor {
        type Image = usize;

        fn page_size(&self, page_index: usize) -> Option<PageSize> {
            (page_index < 3).then(|| PageSize::new(612.0, 792.0))
        }

        async fn embed_png(&mut self, png: &[u8]) -> Result<usize, String> {
            if self.fail_embed {
                return Err("The input is not a PNG file!".into());
            }
            assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
            self.embedded += 1;
            Ok(self.embedded)
        }

        fn draw_image(
            &mut self,
            page_index: usize,
            image: &usize,
            rect: PdfRect,
        ) -> Result<(), String> {
            assert!(*image <= self.embedded);
            self.draws.push((page_index, rect));
            Ok(())
        }

        async fn save(&mut self) -> Result<Vec<u8>, String> {
            Ok(format!("%PDF-signed/{}", self.draws.len()).into_bytes())
        }
    }

    #[derive(Default)]
    struct FakeMutator {
        fail_embed: bool,
    }

    impl DocumentMutator for FakeMutator {
        type Editor = FakeEditor;

        async fn load(&self, bytes: &[u8]) -> Result<FakeEditor, String> {
            assert!(bytes.starts_with(b"%PDF"));
            Ok(FakeEditor {
                embedded: 0,
                draws: Vec::new(),
                fail_embed: self.fail_embed,
            })
        }
    }

    struct FakeLayout {
        pages: HashMap<usize, PageSize>,
        overlays: HashMap<OverlayId, (usize, OverlayGeometry)>,
    }

    impl OverlayLayout for FakeLayout {
        fn overlay_geometry(&self, overlay: OverlayId) -> Option<(usize, OverlayGeometry)> {
            self.overlays.get(&overlay).copied()
        }

        fn page_size(&self, page_index: usize) -> Option<PageSize> {
            self.pages.get(&page_index).copied()
        }
    }

    fn fragment(text: &str) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            transform: [10.0, 0.0, 0.0, 10.0, 72.0, 200.0],
            width: 60.0,
        }
    }

    fn loaded_session(
        pages: usize,
        text: Result<Vec<TextFragment>, String>,
    ) -> DocumentSession<FakeDocument> {
        let renderer = FakeRenderer { pages, text };
        let mut session = DocumentSession::new(1.5);
        block_on(session.load(&renderer, b"%PDF-1.7".to_vec())).unwrap();
        session
    }

    #[test]
    fn upload_must_be_pdf() {
        assert!(validate_upload("application/pdf").is_ok());
        let err = validate_upload("image/png").unwrap_err();
        assert!(err.is_input_rejection());
        assert_eq!(err.to_string(), "Please upload a valid PDF file.");
    }

    #[test]
    fn placing_without_document_is_rejected() {
        let mut session: DocumentSession<FakeDocument> = DocumentSession::default();
        let result = block_on(session.place_signature(
            SignatureImage::from_data_url(PNG),
            SIG,
            &PlacementConfig::default(),
        ));
        assert_eq!(result.unwrap_err(), SessionError::NoDocument);
        assert!(session.overlays().is_empty());
    }

    #[test]
    fn empty_signature_is_rejected() {
        let mut session = loaded_session(1, Ok(Vec::new()));
        let result = block_on(session.place_signature(
            SignatureImage::from_data_url(""),
            SIG,
            &PlacementConfig::default(),
        ));
        assert_eq!(result.unwrap_err(), SessionError::EmptySignature);
    }

    #[test]
    fn places_on_last_page_near_anchor() {
        let mut session = loaded_session(3, Ok(vec![fragment("Signature")]));
        let (overlay, placement) = block_on(session.place_signature(
            SignatureImage::from_data_url(PNG),
            SIG,
            &PlacementConfig::default(),
        ))
        .unwrap();
        assert_eq!(overlay.page_index, 2);
        assert!(placement.is_anchored());
        assert_eq!(overlay.left, 108.0 + 90.0 + 20.0);
        assert_eq!(overlay.top, 888.0 - 40.0);
        assert_eq!(session.overlays().len(), 1);
    }

    #[test]
    fn extraction_failure_falls_back() {
        let mut session = loaded_session(1, Err("text layer unavailable".into()));
        let (overlay, placement) = block_on(session.place_signature(
            SignatureImage::from_data_url(PNG),
            SIG,
            &PlacementConfig::default(),
        ))
        .unwrap();
        assert_eq!((overlay.left, overlay.top), (50.0, 1188.0 - 200.0));
        assert!(!placement.is_anchored());
    }

    #[test]
    fn new_upload_discards_overlays() {
        let mut session = loaded_session(2, Ok(Vec::new()));
        block_on(session.place_signature(
            SignatureImage::from_data_url(PNG),
            SIG,
            &PlacementConfig::default(),
        ))
        .unwrap();
        assert_eq!(session.overlays().len(), 1);

        let renderer = FakeRenderer {
            pages: 4,
            text: Ok(Vec::new()),
        };
        let pages = block_on(session.load(&renderer, b"%PDF-2.0".to_vec())).unwrap();
        assert_eq!(pages, 4);
        assert!(session.overlays().is_empty());
        assert_eq!(session.original_bytes(), b"%PDF-2.0");
    }

    #[test]
    fn failed_load_keeps_previous_state() {
        let mut session = loaded_session(2, Ok(Vec::new()));
        block_on(session.place_signature(
            SignatureImage::from_data_url(PNG),
            SIG,
            &PlacementConfig::default(),
        ))
        .unwrap();
        let renderer = FakeRenderer {
            pages: 1,
            text: Ok(Vec::new()),
        };
        let err = block_on(session.load(&renderer, b"garbage".to_vec())).unwrap_err();
        assert!(matches!(err, SessionError::Load(_)));
        assert!(!err.is_input_rejection());
        assert_eq!(session.page_count(), 2);
        assert_eq!(session.overlays().len(), 1);
        assert_eq!(session.original_bytes(), b"%PDF-1.7");
    }

    #[test]
    fn replacing_document_commits_without_renderer() {
        let mut session = loaded_session(2, Ok(Vec::new()));
        block_on(session.place_signature(
            SignatureImage::from_data_url(PNG),
            SIG,
            &PlacementConfig::default(),
        ))
        .unwrap();
        let document = FakeDocument {
            pages: vec![(612.0, 792.0); 3],
            text: Ok(Vec::new()),
        };
        assert_eq!(session.replace_document(document, b"%PDF-1.4".to_vec()), 3);
        assert!(session.is_loaded());
        assert_eq!(session.page_count(), 3);
        assert!(session.overlays().is_empty());
        assert_eq!(session.original_bytes(), b"%PDF-1.4");
    }

    #[test]
    fn busy_is_reported_to_the_user() {
        let err = SessionError::Busy;
        assert!(err.is_input_rejection());
        assert_eq!(err.to_string(), "Please wait for the current operation to finish.");
        assert!(!DocumentSession::<FakeDocument>::default().is_loaded());
    }

    #[test]
    fn save_without_overlays_is_a_no_op() {
        let session = loaded_session(1, Ok(Vec::new()));
        let layout = FakeLayout {
            pages: HashMap::new(),
            overlays: HashMap::new(),
        };
        let outcome = block_on(session.save(&FakeMutator::default(), &layout)).unwrap();
        assert_eq!(outcome, SaveOutcome::NothingToSave);
    }

    fn session_with_reference_overlay() -> (DocumentSession<FakeDocument>, FakeLayout) {
        let mut session = loaded_session(1, Ok(Vec::new()));
        let (overlay, _) = block_on(session.place_signature(
            SignatureImage::from_data_url(PNG),
            SIG,
            &PlacementConfig::default(),
        ))
        .unwrap();
        let layout = FakeLayout {
            pages: HashMap::from([(0, PageSize::new(600.0, 600.0))]),
            overlays: HashMap::from([(
                overlay.id,
                (
                    0,
                    OverlayGeometry {
                        left: 50.0,
                        top: 300.0,
                        width: 150.0,
                        height: 60.0,
                    },
                ),
            )]),
        };
        (session, layout)
    }

    #[test]
    fn save_is_stable_for_unmoved_overlays() {
        let (session, layout) = session_with_reference_overlay();
        let mutator = FakeMutator::default();
        let first = block_on(session.save(&mutator, &layout)).unwrap();
        let second = block_on(session.save(&mutator, &layout)).unwrap();
        assert_eq!(first, second);

        let SaveOutcome::Saved(document) = first else {
            panic!("expected a saved document");
        };
        assert_eq!(document.file_name, "signed_document.pdf");
        assert_eq!(document.mime_type, "application/pdf");
        assert_eq!(document.bytes, b"%PDF-signed/1");
        let rect = document.stamps[0].rect;
        assert!((rect.x - 51.0).abs() < 1e-9);
        assert!((rect.y - 316.8).abs() < 1e-9);
        assert!((rect.width - 153.0).abs() < 1e-9);
        assert!((rect.height - 79.2).abs() < 1e-9);
    }

    #[test]
    fn embed_failure_aborts_save() {
        let (session, layout) = session_with_reference_overlay();
        let mutator = FakeMutator { fail_embed: true };
        let err = block_on(session.save(&mutator, &layout)).unwrap_err();
        assert_eq!(
            err,
            SessionError::Embed("The input is not a PNG file!".into())
        );
        assert_eq!(session.overlays().len(), 1);
    }

    #[test]
    fn detached_overlay_aborts_save() {
        let (session, mut layout) = session_with_reference_overlay();
        layout.overlays.clear();
        let err = block_on(session.save(&FakeMutator::default(), &layout)).unwrap_err();
        assert!(matches!(err, SessionError::OverlayDetached(_)));
    }

    #[test]
    fn remove_overlay_drops_it_from_save() {
        let (mut session, layout) = session_with_reference_overlay();
        let id = session.overlays()[0].id;
        assert!(session.remove_overlay(id).is_some());
        assert!(session.remove_overlay(id).is_none());
        let outcome = block_on(session.save(&FakeMutator::default(), &layout)).unwrap();
        assert_eq!(outcome, SaveOutcome::NothingToSave);
    }

    #[test]
    fn page_missing_message_is_one_based() {
        assert_eq!(
            SessionError::PageMissing(0).to_string(),
            "Page 1 not found in view."
        );
    }
}
