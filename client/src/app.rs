use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    Document, Event, HtmlButtonElement, HtmlCanvasElement, HtmlElement, HtmlInputElement,
    MessageEvent, Window,
};

use signflow_shared::{
    validate_upload, DocumentRenderer, PadMessage, PlacementSource, SaveOutcome, SessionError,
    SignatureImage,
};

use crate::bindings::js_error_message;
use crate::config::ClientConfig;
use crate::dom::{alert, download_blob, get_element, set_save_busy};
use crate::drag::settle_cancelled;
use crate::geometry::DomLayout;
use crate::overlay::{attach_overlay, detach_all};
use crate::pad::{message_from_js, open_pop_out, start_pad_page, SignaturePadWidget};
use crate::pages::{mount_pages, render_pages};
use crate::pdf::{PdfJs, PdfLib};
use crate::state::{Session, State};

const NO_SIGNATURES_MESSAGE: &str = "No signatures added to the document.";

/// Everything an event handler needs. Cheap to clone into closures.
#[derive(Clone)]
pub struct AppContext {
    pub window: Window,
    pub document: Document,
    pub state: Rc<RefCell<State>>,
    pub layout: DomLayout,
    pub wrapper: HtmlElement,
    pub save_button: HtmlButtonElement,
    pub save_label: Rc<String>,
    pub pad: Rc<SignaturePadWidget>,
}

impl AppContext {
    fn debug(&self) -> bool {
        self.state.borrow().config.debug
    }

    fn log(&self, message: &str) {
        if self.debug() {
            web_sys::console::log_1(&message.into());
        }
    }

    fn report(&self, err: &SessionError) {
        if !err.is_input_rejection() {
            web_sys::console::error_1(&err.to_string().into());
        }
        alert(&self.window, &err.to_string());
    }
}

fn document_ready_state(document: &Document) -> Option<String> {
    Reflect::get(document.as_ref(), &JsValue::from_str("readyState"))
        .ok()?
        .as_string()
}

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let started = Rc::new(Cell::new(false));

    if document_ready_state(&document).as_deref() == Some("complete") {
        started.set(true);
        return start();
    }

    let onload_started = started.clone();
    let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
        if onload_started.replace(true) {
            return;
        }
        if let Err(err) = start() {
            web_sys::console::error_1(&err);
        }
    });
    window.add_event_listener_with_callback("load", onload.as_ref().unchecked_ref())?;
    onload.forget();

    Ok(())
}

/// The same bundle serves the main page and the pop-out pad; which one we
/// are on is decided by the markup present.
fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    if document.get_element_by_id("pdf-wrapper").is_some() {
        start_app(window, document)
    } else {
        start_pad_page(&window, &document)
    }
}

fn start_app(window: Window, document: Document) -> Result<(), JsValue> {
    let config = ClientConfig::from_window(&window);
    if config.debug {
        let href = window.location().href().ok().unwrap_or_default();
        web_sys::console::log_1(
            &format!(
                "SignFlow debug enabled href={href} scale={} overlay={}x{}",
                config.render_scale, config.overlay_size.width, config.overlay_size.height
            )
            .into(),
        );
    }

    let upload: HtmlInputElement = get_element(&document, "pdf-upload")?;
    let save_button: HtmlButtonElement = get_element(&document, "save-pdf-btn")?;
    let wrapper: HtmlElement = get_element(&document, "pdf-wrapper")?;
    let canvas: HtmlCanvasElement = get_element(&document, "signature-pad")?;
    let clear_button: HtmlButtonElement = get_element(&document, "clear-sig-btn")?;
    let add_button: HtmlButtonElement = get_element(&document, "add-sig-btn")?;
    let pop_out_button: HtmlButtonElement = get_element(&document, "pop-out-btn")?;

    save_button.set_disabled(true);
    let ctx = AppContext {
        window: window.clone(),
        document: document.clone(),
        state: Rc::new(RefCell::new(State::new(config))),
        layout: DomLayout::new(document.clone(), wrapper.clone()),
        wrapper,
        save_label: Rc::new(save_button.inner_html()),
        save_button: save_button.clone(),
        pad: Rc::new(SignaturePadWidget::new(canvas)?),
    };

    {
        let ctx = ctx.clone();
        let onchange = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(input) = event
                .target()
                .and_then(|target| target.dyn_into::<HtmlInputElement>().ok())
            else {
                return;
            };
            let Some(file) = input.files().and_then(|files| files.get(0)) else {
                return;
            };
            if let Err(err) = validate_upload(&file.type_()) {
                ctx.report(&err);
                return;
            }
            let ctx = ctx.clone();
            spawn_local(async move {
                let bytes = match JsFuture::from(file.array_buffer()).await {
                    Ok(buffer) => Uint8Array::new(&buffer).to_vec(),
                    Err(err) => {
                        ctx.report(&SessionError::Load(js_error_message(&err)));
                        return;
                    }
                };
                load_document(&ctx, bytes).await;
            });
        });
        upload.add_event_listener_with_callback("change", onchange.as_ref().unchecked_ref())?;
        onchange.forget();
    }

    {
        let ctx = ctx.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| ctx.pad.clear());
        clear_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let ctx = ctx.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            if ctx.pad.is_empty() {
                alert(&ctx.window, "Please sign first.");
                return;
            }
            let image = SignatureImage::from_data_url(ctx.pad.to_png_data_url());
            let ctx = ctx.clone();
            spawn_local(async move {
                add_signature(&ctx, image).await;
            });
        });
        add_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let ctx = ctx.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            if let Err(err) = open_pop_out(&ctx.window) {
                web_sys::console::error_2(&"Failed to open signing pad".into(), &err);
            }
        });
        pop_out_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let ctx = ctx.clone();
        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let own_origin = ctx.window.location().origin().ok();
            if own_origin.as_deref() != Some(event.origin().as_str()) {
                ctx.log(&format!("Ignoring message from {}", event.origin()));
                return;
            }
            let Some(PadMessage::AddSignature { data }) = message_from_js(&event.data()) else {
                return;
            };
            let image = SignatureImage::from_data_url(data);
            let ctx = ctx.clone();
            spawn_local(async move {
                add_signature(&ctx, image).await;
            });
        });
        window.add_event_listener_with_callback("message", onmessage.as_ref().unchecked_ref())?;
        onmessage.forget();
    }

    {
        let ctx = ctx.clone();
        let onresize = Closure::<dyn FnMut()>::new(move || ctx.pad.resize());
        window.add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
        onresize.forget();
    }

    {
        let ctx = ctx.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            let ctx = ctx.clone();
            spawn_local(async move {
                save_document(&ctx).await;
            });
        });
        save_button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    ctx.log("SignFlow ready");
    Ok(())
}

/// Claims the session for an async operation, ending any drag first. `None`
/// means another operation already holds it.
fn take_session(ctx: &AppContext) -> Option<Session> {
    let (session, cancelled) = {
        let mut state = ctx.state.borrow_mut();
        let session = state.session.take()?;
        (session, state.cancel_drag())
    };
    settle_cancelled(ctx, cancelled);
    Some(session)
}

/// Hands the session back, gates the save button on an open document and
/// places any signature that arrived in the meantime.
fn restore_session(ctx: &AppContext, session: Session) {
    ctx.save_button.set_disabled(!session.is_loaded());
    let pending = ctx.state.borrow_mut().restore_session(session);
    for image in pending {
        let ctx = ctx.clone();
        spawn_local(async move {
            add_signature(&ctx, image).await;
        });
    }
}

async fn load_document(ctx: &AppContext, bytes: Vec<u8>) {
    let Some(mut session) = take_session(ctx) else {
        ctx.report(&SessionError::Busy);
        return;
    };

    // Load and render off-screen first; the current document stays intact
    // until both have succeeded.
    let scale = session.render_scale();
    let opened = async {
        let pdf = PdfJs.load(&bytes).await.map_err(SessionError::Load)?;
        let pages = render_pages(&ctx.document, &pdf, scale).await?;
        Ok::<_, SessionError>((pdf, pages))
    }
    .await;

    match opened {
        Ok((pdf, pages)) => {
            detach_all(ctx);
            let page_count = session.replace_document(pdf, bytes);
            match mount_pages(&ctx.wrapper, &pages) {
                Ok(()) => ctx.log(&format!("Loaded document with {page_count} pages")),
                Err(err) => ctx.report(&err),
            }
        }
        Err(err) => ctx.report(&err),
    }
    restore_session(ctx, session);
}

async fn add_signature(ctx: &AppContext, image: SignatureImage) {
    let (size, placement_config) = {
        let state = ctx.state.borrow();
        (state.config.overlay_size, state.config.placement.clone())
    };
    let taken = ctx.state.borrow_mut().session.take();
    let Some(mut session) = taken else {
        ctx.state.borrow_mut().defer_signature(image);
        ctx.log("Busy, signature queued");
        return;
    };
    let placed = session.place_signature(image, size, &placement_config).await;
    restore_session(ctx, session);

    match placed {
        Ok((overlay, placement)) => {
            match &placement.source {
                PlacementSource::Anchor { text } => {
                    ctx.log(&format!("Signature {} placed near \"{text}\"", overlay.id));
                }
                PlacementSource::Fallback { reason: Some(reason) } => {
                    web_sys::console::warn_1(
                        &format!("Text extraction failed, using default position: {reason}").into(),
                    );
                }
                PlacementSource::Fallback { reason: None } => {
                    ctx.log(&format!("Signature {} placed at default position", overlay.id));
                }
            }
            if let Err(err) = attach_overlay(ctx, &overlay) {
                ctx.report(&err);
            }
        }
        Err(err) => ctx.report(&err),
    }
}

async fn save_document(ctx: &AppContext) {
    let Some(session) = take_session(ctx) else {
        ctx.report(&SessionError::Busy);
        return;
    };

    set_save_busy(&ctx.save_button, true, &ctx.save_label);
    let outcome = session.save(&PdfLib, &ctx.layout).await;
    match outcome {
        Ok(SaveOutcome::NothingToSave) => alert(&ctx.window, NO_SIGNATURES_MESSAGE),
        Ok(SaveOutcome::Saved(signed)) => {
            ctx.log(&format!("Saved {} signatures", signed.stamps.len()));
            if let Err(err) = download_blob(
                &ctx.window,
                &ctx.document,
                &signed.bytes,
                signed.file_name,
                signed.mime_type,
            ) {
                web_sys::console::error_2(&"Failed to start download".into(), &err);
                alert(&ctx.window, "Error saving PDF: the download could not be started.");
            }
        }
        Err(err) => ctx.report(&err),
    }
    set_save_busy(&ctx.save_button, false, &ctx.save_label);
    restore_session(ctx, session);
}
