//! UI events: listener wiring and the single dispatcher loop.
//!
//! Listeners only translate DOM events into [`UiEvent`]s on a channel. The
//! dispatcher is the one place that touches the controller, one event at a
//! time, and spawns the network halves of save and delete.

use gloo_events::{EventListener, EventListenerOptions};
use gloo_timers::callback::Timeout;
use marginalia_core::{AnnotationId, DetailView, HostElements};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use wasm_bindgen::JsCast;

use crate::annotator::BrowserSession;
use crate::selection::read_selection;
use crate::surface::highlight_at;
use crate::views::{DELETE_LINK_CLASS, ITEM_CLASS};

/// Everything the dispatcher reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Fetch and render the document's annotations.
    Load,
    /// Pointer went down in the document.
    PointerActivity,
    /// `selectionchange` on the page.
    SelectionChanged,
    /// Pointer released in the document, after the selection settled.
    SelectionReleased,
    /// The "annotate" button was clicked.
    AffordanceInvoked,
    Save,
    Cancel,
    /// A highlight was clicked.
    OpenDetail(AnnotationId),
    CloseDetail,
    /// Scroll to and pulse a highlight.
    Reveal(AnnotationId),
    /// Delete requested from the list.
    Delete(AnnotationId),
    /// Delete requested from the detail popup.
    DeleteShown,
    Shutdown,
}

/// Message shown before any delete request goes out.
pub const CONFIRM_DELETE: &str = "Delete this annotation?";

fn send(events: &UnboundedSender<UiEvent>, event: UiEvent) {
    if events.send(event).is_err() {
        tracing::debug!(target: "marginalia::events", "dispatcher gone, dropping event");
    }
}

fn on_click(
    document: &web_sys::Document,
    id: &str,
    events: &UnboundedSender<UiEvent>,
    event: UiEvent,
) -> Option<EventListener> {
    let target = document.get_element_by_id(id)?;
    let events = events.clone();
    Some(EventListener::new(&target, "click", move |_| {
        send(&events, event.clone())
    }))
}

/// Attach every page listener. Dropping the returned listeners detaches them.
pub fn attach(
    document: &web_sys::Document,
    container: &web_sys::Element,
    elements: &HostElements,
    can_annotate: bool,
    events: &UnboundedSender<UiEvent>,
) -> Vec<EventListener> {
    let mut listeners = Vec::new();

    if can_annotate {
        let tx = events.clone();
        listeners.push(EventListener::new(container, "mousedown", move |_| {
            send(&tx, UiEvent::PointerActivity)
        }));

        // The selection is only final once the current event has finished.
        let tx = events.clone();
        listeners.push(EventListener::new(container, "mouseup", move |_| {
            let tx = tx.clone();
            Timeout::new(0, move || send(&tx, UiEvent::SelectionReleased)).forget();
        }));

        let tx = events.clone();
        listeners.push(EventListener::new(document, "selectionchange", move |_| {
            send(&tx, UiEvent::SelectionChanged)
        }));

        listeners.extend(on_click(
            document,
            &elements.annotate_button_id,
            events,
            UiEvent::AffordanceInvoked,
        ));
        listeners.extend(on_click(document, &elements.save_id, events, UiEvent::Save));
        listeners.extend(on_click(document, &elements.cancel_id, events, UiEvent::Cancel));
    }

    // Highlight clicks, delegated from the container.
    let tx = events.clone();
    listeners.push(EventListener::new(container, "click", move |event| {
        let id = event
            .target()
            .and_then(|target| target.dyn_into::<web_sys::Element>().ok())
            .and_then(|target| highlight_at(&target));
        if let Some(id) = id {
            send(&tx, UiEvent::OpenDetail(id));
        }
    }));

    listeners.extend(on_click(
        document,
        &elements.view_close_id,
        events,
        UiEvent::CloseDetail,
    ));
    listeners.extend(on_click(
        document,
        &elements.view_delete_id,
        events,
        UiEvent::DeleteShown,
    ));

    if let Some(list) = document.get_element_by_id(&elements.list_id) {
        let tx = events.clone();
        listeners.push(EventListener::new_with_options(
            &list,
            "click",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let Some(target) = event
                    .target()
                    .and_then(|target| target.dyn_into::<web_sys::Element>().ok())
                else {
                    return;
                };
                let clicked = list_click(&target);
                if matches!(clicked.first(), Some(UiEvent::Delete(_))) {
                    event.prevent_default();
                }
                for ui in clicked {
                    send(&tx, ui);
                }
            },
        ));
    }

    tracing::debug!(target: "marginalia::events", count = listeners.len(), can_annotate, "listeners attached");
    listeners
}

/// Events for a click on `target` inside the list.
///
/// The delete link requests a delete. Anywhere else on an item reveals the
/// highlight and opens its detail popup.
pub fn list_click(target: &web_sys::Element) -> Vec<UiEvent> {
    if let Some(link) = target.closest(&format!(".{DELETE_LINK_CLASS}")).ok().flatten() {
        return link
            .get_attribute("data-id")
            .map(|id| vec![UiEvent::Delete(AnnotationId::from(id.as_str()))])
            .unwrap_or_default();
    }

    let Some(item) = target.closest(&format!(".{ITEM_CLASS}")).ok().flatten() else {
        return Vec::new();
    };
    match item.get_attribute("data-id") {
        Some(id) => {
            let id = AnnotationId::from(id.as_str());
            vec![UiEvent::Reveal(id.clone()), UiEvent::OpenDetail(id)]
        }
        None => Vec::new(),
    }
}

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

/// Process events until [`UiEvent::Shutdown`] or until every sender is gone.
pub async fn run_dispatcher(
    session: BrowserSession,
    mut events: UnboundedReceiver<UiEvent>,
    confirm_deletes: bool,
) {
    while let Some(event) = events.recv().await {
        tracing::trace!(target: "marginalia::events", ?event, "dispatching");
        match event {
            UiEvent::Shutdown => break,
            UiEvent::Load => {
                let session = session.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    // Failures are logged by the session; the page stays usable.
                    let _ = session.load().await;
                });
            }
            UiEvent::PointerActivity => session.controller().borrow_mut().pointer_activity(),
            UiEvent::SelectionChanged => {
                let mut controller = session.controller().borrow_mut();
                let selection = read_selection(controller.surface().container());
                controller.selection_changed(&selection);
            }
            UiEvent::SelectionReleased => {
                let mut controller = session.controller().borrow_mut();
                let selection = read_selection(controller.surface().container());
                controller.selection_changed(&selection);
                controller.selection_released(&selection);
            }
            UiEvent::AffordanceInvoked => {
                let mut controller = session.controller().borrow_mut();
                let selection = read_selection(controller.surface().container());
                controller.invoke_affordance(&selection);
            }
            UiEvent::Save => {
                let session = session.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(err) = session.save().await {
                        alert(&format!("Could not save annotation: {}", err.user_message()));
                    }
                });
            }
            UiEvent::Cancel => session.controller().borrow_mut().cancel_create(),
            UiEvent::OpenDetail(id) => {
                session.controller().borrow_mut().open_detail(&id);
            }
            UiEvent::CloseDetail => session.controller().borrow_mut().close_detail(),
            UiEvent::Reveal(id) => {
                session.controller().borrow_mut().reveal(&id);
            }
            UiEvent::Delete(id) => request_delete(&session, id, confirm_deletes),
            UiEvent::DeleteShown => {
                let shown = session
                    .controller()
                    .borrow()
                    .detail()
                    .and_then(|detail| detail.shown_id());
                if let Some(id) = shown {
                    request_delete(&session, id, confirm_deletes);
                }
            }
        }
    }
    tracing::debug!(target: "marginalia::events", "dispatcher stopped");
}

fn request_delete(session: &BrowserSession, id: AnnotationId, confirm_deletes: bool) {
    if confirm_deletes && !confirm(CONFIRM_DELETE) {
        return;
    }
    let session = session.clone();
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(err) = session.delete(&id).await {
            alert(&format!("Could not delete annotation: {}", err.user_message()));
        }
    });
}
