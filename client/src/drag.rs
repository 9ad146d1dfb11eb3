use js_sys::Function;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, PointerEvent};

use signflow_shared::OverlayId;

use crate::app::AppContext;
use crate::dom::set_px;
use crate::state::{CancelledDrag, State};

const ACTIVE_CLASS: &str = "active";
const DELETE_BUTTON_SELECTOR: &str = ".delete-sig-btn";
const MOVE_EVENTS: [&str; 1] = ["pointermove"];
const END_EVENTS: [&str; 2] = ["pointerup", "pointercancel"];

/// Document-level move/up listeners that exist only for one drag. Dropping
/// the guard (or calling `release`) unregisters them.
pub struct DragListeners {
    document: Document,
    on_move: Closure<dyn FnMut(PointerEvent)>,
    on_end: Closure<dyn FnMut(PointerEvent)>,
    attached: bool,
}

impl DragListeners {
    fn attach(
        document: &Document,
        on_move: Closure<dyn FnMut(PointerEvent)>,
        on_end: Closure<dyn FnMut(PointerEvent)>,
    ) -> Result<Self, JsValue> {
        let mut listeners = Self {
            document: document.clone(),
            on_move,
            on_end,
            attached: true,
        };
        let on_move: &Function = listeners.on_move.as_ref().unchecked_ref();
        let on_end: &Function = listeners.on_end.as_ref().unchecked_ref();
        let attached = MOVE_EVENTS
            .iter()
            .map(|event| (*event, on_move))
            .chain(END_EVENTS.iter().map(|event| (*event, on_end)))
            .try_for_each(|(event, callback)| {
                listeners
                    .document
                    .add_event_listener_with_callback(event, callback)
            });
        if let Err(err) = attached {
            listeners.release();
            return Err(err);
        }
        Ok(listeners)
    }

    pub fn release(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        let on_move: &Function = self.on_move.as_ref().unchecked_ref();
        let on_end: &Function = self.on_end.as_ref().unchecked_ref();
        for event in MOVE_EVENTS {
            let _ = self.document.remove_event_listener_with_callback(event, on_move);
        }
        for event in END_EVENTS {
            let _ = self.document.remove_event_listener_with_callback(event, on_end);
        }
    }
}

impl Drop for DragListeners {
    fn drop(&mut self) {
        self.release();
    }
}

/// Clears the dragging style after `State::cancel_drag` and frees the
/// listeners once the running handler has returned.
pub fn settle_cancelled(ctx: &AppContext, cancelled: CancelledDrag) {
    if let Some(id) = cancelled.overlay {
        set_active(ctx, id, false);
    }
    if let Some(listeners) = cancelled.listeners {
        wasm_bindgen_futures::spawn_local(async move {
            drop(listeners);
        });
    }
}

fn set_active(ctx: &AppContext, id: OverlayId, active: bool) {
    if let Some(element) = ctx.layout.overlay_element(id) {
        let classes = element.class_list();
        let _ = if active {
            classes.add_1(ACTIVE_CLASS)
        } else {
            classes.remove_1(ACTIVE_CLASS)
        };
    }
}

fn started_on_delete_button(event: &PointerEvent) -> bool {
    event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .and_then(|element| element.closest(DELETE_BUTTON_SELECTOR).ok().flatten())
        .is_some()
}

/// Pointer-down handler for one overlay element: Idle -> Dragging, and arms
/// the per-drag listeners.
pub fn drag_start_handler(ctx: &AppContext, id: OverlayId) -> Closure<dyn FnMut(PointerEvent)> {
    let ctx = ctx.clone();
    Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
        if event.button() != 0 || started_on_delete_button(&event) {
            return;
        }
        event.prevent_default();
        let x = event.client_x() as f64;
        let y = event.client_y() as f64;
        {
            let mut state = ctx.state.borrow_mut();
            let State { session, drag, .. } = &mut *state;
            let Some(overlay) = session.as_ref().and_then(|session| session.overlay(id)) else {
                return;
            };
            if !drag.begin(overlay, x, y) {
                return;
            }
        }
        set_active(&ctx, id, true);

        let listeners = DragListeners::attach(
            &ctx.document,
            drag_move_handler(&ctx, id),
            drag_end_handler(&ctx, id),
        );
        let mut state = ctx.state.borrow_mut();
        match listeners {
            Ok(listeners) => state.drag_listeners = Some(listeners),
            Err(err) => {
                state.drag.end();
                drop(state);
                set_active(&ctx, id, false);
                web_sys::console::error_2(&"Failed to start drag".into(), &err);
            }
        }
    })
}

fn drag_move_handler(ctx: &AppContext, id: OverlayId) -> Closure<dyn FnMut(PointerEvent)> {
    let ctx = ctx.clone();
    Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
        event.prevent_default();
        let x = event.client_x() as f64;
        let y = event.client_y() as f64;
        let mut layout = ctx.layout.clone();
        let mut state = ctx.state.borrow_mut();
        let debug = state.config.debug;
        let State { session, drag, .. } = &mut *state;
        let Some(overlay) = session.as_mut().and_then(|session| session.overlay_mut(id)) else {
            return;
        };
        match drag.drag_to(overlay, x, y, &mut layout) {
            Ok(Some(step)) => {
                if let Some(element) = layout.overlay_element(id) {
                    set_px(&element, "left", step.left);
                    set_px(&element, "top", step.top);
                }
                if step.reparented && debug {
                    web_sys::console::log_1(
                        &format!("Signature {id} moved to page {}", step.page_index + 1).into(),
                    );
                }
            }
            Ok(None) => {}
            Err(err) => {
                web_sys::console::warn_1(
                    &format!("Signature {id} could not change page: {err}").into(),
                );
            }
        }
    })
}

fn drag_end_handler(ctx: &AppContext, id: OverlayId) -> Closure<dyn FnMut(PointerEvent)> {
    let ctx = ctx.clone();
    Closure::<dyn FnMut(PointerEvent)>::new(move |_event: PointerEvent| {
        let listeners = {
            let mut state = ctx.state.borrow_mut();
            state.drag.end();
            state.drag_listeners.take()
        };
        set_active(&ctx, id, false);
        if let Some(mut listeners) = listeners {
            listeners.release();
            // This closure is owned by the guard; free it once the handler
            // has returned.
            wasm_bindgen_futures::spawn_local(async move {
                drop(listeners);
            });
        }
    })
}
