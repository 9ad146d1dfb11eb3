use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Event, HtmlElement, HtmlImageElement, PointerEvent, ScrollBehavior, ScrollIntoViewOptions,
    ScrollLogicalPosition,
};

use signflow_shared::{OverlayId, SessionError, SignatureOverlay};

use crate::app::AppContext;
use crate::dom::{create_html, set_px};
use crate::drag::{drag_start_handler, settle_cancelled};
use crate::geometry::{OVERLAY_CLASS, OVERLAY_ID_ATTR};

/// Listeners bound to one overlay element, dropped with it.
pub struct OverlayHandlers {
    element: HtmlElement,
    delete_button: HtmlElement,
    on_down: Closure<dyn FnMut(PointerEvent)>,
    on_delete: Closure<dyn FnMut(Event)>,
}

impl Drop for OverlayHandlers {
    fn drop(&mut self) {
        let _ = self.element.remove_event_listener_with_callback(
            "pointerdown",
            self.on_down.as_ref().unchecked_ref(),
        );
        let _ = self.delete_button.remove_event_listener_with_callback(
            "click",
            self.on_delete.as_ref().unchecked_ref(),
        );
    }
}

fn build_element(
    ctx: &AppContext,
    overlay: &SignatureOverlay,
) -> Result<(HtmlElement, HtmlElement), JsValue> {
    let container = create_html(&ctx.document, "div", OVERLAY_CLASS)?;
    container.set_attribute(OVERLAY_ID_ATTR, &overlay.id.0.to_string())?;
    set_px(&container, "left", overlay.left);
    set_px(&container, "top", overlay.top);
    set_px(&container, "width", overlay.width);
    set_px(&container, "height", overlay.height);

    let image = ctx
        .document
        .create_element("img")?
        .dyn_into::<HtmlImageElement>()
        .map_err(|_| JsValue::from_str("Invalid element type: img"))?;
    image.set_src(overlay.image.data_url());
    image.set_alt("Signature");
    image.set_draggable(false);
    container.append_child(&image)?;

    let delete_button = create_html(&ctx.document, "button", "delete-sig-btn")?;
    delete_button.set_attribute("type", "button")?;
    delete_button.set_attribute("aria-label", "Remove signature")?;
    delete_button.set_inner_html("<i class=\"fa-solid fa-times\"></i>");
    container.append_child(&delete_button)?;
    Ok((container, delete_button))
}

/// Puts a freshly placed overlay into its page container and makes it
/// draggable. On failure the overlay is dropped from the session again so
/// model and page never disagree.
pub fn attach_overlay(ctx: &AppContext, overlay: &SignatureOverlay) -> Result<(), SessionError> {
    let Some(page) = ctx.layout.page_container(overlay.page_index) else {
        forget_overlay(ctx, overlay.id);
        return Err(SessionError::PageMissing(overlay.page_index));
    };
    let built = build_element(ctx, overlay).and_then(|(element, delete_button)| {
        page.append_child(&element)?;
        Ok((element, delete_button))
    });
    let (element, delete_button) = match built {
        Ok(parts) => parts,
        Err(err) => {
            web_sys::console::error_2(&"Failed to build signature element".into(), &err);
            forget_overlay(ctx, overlay.id);
            return Err(SessionError::PageMissing(overlay.page_index));
        }
    };

    let on_down = drag_start_handler(ctx, overlay.id);
    let _ = element
        .add_event_listener_with_callback("pointerdown", on_down.as_ref().unchecked_ref());
    let on_delete = delete_handler(ctx, overlay.id);
    let _ = delete_button
        .add_event_listener_with_callback("click", on_delete.as_ref().unchecked_ref());
    ctx.state.borrow_mut().overlay_handlers.insert(
        overlay.id,
        OverlayHandlers {
            element: element.clone(),
            delete_button,
            on_down,
            on_delete,
        },
    );

    let options = ScrollIntoViewOptions::new();
    options.set_behavior(ScrollBehavior::Smooth);
    options.set_block(ScrollLogicalPosition::Center);
    element.scroll_into_view_with_scroll_into_view_options(&options);
    Ok(())
}

fn forget_overlay(ctx: &AppContext, id: OverlayId) {
    if let Some(session) = ctx.state.borrow_mut().session.as_mut() {
        session.remove_overlay(id);
    }
}

fn delete_handler(ctx: &AppContext, id: OverlayId) -> Closure<dyn FnMut(Event)> {
    let ctx = ctx.clone();
    Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        event.stop_propagation();
        let (handlers, cancelled) = {
            let mut state = ctx.state.borrow_mut();
            let Some(session) = state.session.as_mut() else {
                return;
            };
            session.remove_overlay(id);
            let cancelled = (state.drag.active_overlay() == Some(id)).then(|| state.cancel_drag());
            (state.overlay_handlers.remove(&id), cancelled)
        };
        if let Some(cancelled) = cancelled {
            settle_cancelled(&ctx, cancelled);
        }
        if let Some(element) = ctx.layout.overlay_element(id) {
            element.remove();
        }
        // The handler set owns this closure; release it after returning.
        if let Some(handlers) = handlers {
            wasm_bindgen_futures::spawn_local(async move {
                drop(handlers);
            });
        }
    })
}

/// Removes every overlay element and its listeners, e.g. before a new
/// document replaces the pages.
pub fn detach_all(ctx: &AppContext) {
    let handlers = std::mem::take(&mut ctx.state.borrow_mut().overlay_handlers);
    for (_, handler) in handlers {
        handler.element.remove();
    }
}
