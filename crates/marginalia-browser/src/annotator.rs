//! Mounting the annotator on a page.

use gloo_events::EventListener;
use marginalia_core::{AnnotateError, AnnotationSession, AnnotatorConfig, Controller, RegistryEvent};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::events::{self, UiEvent};
use crate::service::HttpAnnotationService;
use crate::surface::BrowserSurface;
use crate::views::{DomDetail, DomList, DomPopover};

/// Document event fired whenever the sidebar list gains or loses an entry.
pub const UPDATED_EVENT: &str = "annotations:updated";

pub type BrowserController = Controller<BrowserSurface, DomList, DomPopover, DomDetail>;
pub type BrowserSession =
    AnnotationSession<HttpAnnotationService, BrowserSurface, DomList, DomPopover, DomDetail>;

/// A mounted annotator. Dropping it detaches every listener and stops the dispatcher.
pub struct Annotator {
    session: BrowserSession,
    events: UnboundedSender<UiEvent>,
    _listeners: Vec<EventListener>,
}

impl Annotator {
    /// Attach to the page described by `config` and start loading annotations.
    ///
    /// Fails with [`AnnotateError::MissingHost`] when the document container is
    /// not on the page.
    pub fn mount(config: AnnotatorConfig) -> Result<Self, AnnotateError> {
        config.validate()?;

        let window = web_sys::window().ok_or_else(|| AnnotateError::Config("no window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| AnnotateError::Config("no document".into()))?;
        let elements = config.elements.clone();
        let container = document
            .get_element_by_id(&elements.doc_id)
            .ok_or_else(|| AnnotateError::MissingHost(elements.doc_id.clone()))?;

        let (tx, rx) = mpsc::unbounded_channel();

        let surface = BrowserSurface::new(container.clone(), config.pulse_millis);
        let mut controller = BrowserController::new(surface, config.clone());
        if let Some(list) = DomList::find(&document, &elements) {
            controller = controller.with_list(list);
        }
        if let Some(popover) = DomPopover::find(&document, &elements) {
            controller = controller.with_popover(popover);
        }
        if let Some(detail) = DomDetail::find(&document, &elements) {
            controller = controller.with_detail(detail);
        }

        let target = document.clone();
        controller.on_registry_changed(move |event: &RegistryEvent| {
            tracing::trace!(target: "marginalia::annotator", ?event, "announcing update");
            if let Ok(dom_event) = web_sys::Event::new(UPDATED_EVENT) {
                let _ = target.dispatch_event(&dom_event);
            }
        });

        let origin = window.location().origin().unwrap_or_default();
        let service = HttpAnnotationService::new(config.api_base_or(&origin));
        let session = AnnotationSession::new(controller, service);

        let listeners = events::attach(&document, &container, &elements, config.can_annotate, &tx);

        // Queued before the dispatcher starts, so it is the first thing handled.
        let _ = tx.send(UiEvent::Load);
        wasm_bindgen_futures::spawn_local(events::run_dispatcher(
            session.clone(),
            rx,
            config.confirm_deletes,
        ));

        tracing::info!(
            target: "marginalia::annotator",
            document = %config.document_id,
            can_annotate = config.can_annotate,
            "annotator mounted"
        );
        Ok(Self {
            session,
            events: tx,
            _listeners: listeners,
        })
    }

    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    /// Queue an event as if it came from the page.
    pub fn send(&self, event: UiEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for Annotator {
    fn drop(&mut self) {
        let _ = self.events.send(UiEvent::Shutdown);
        tracing::debug!(target: "marginalia::annotator", "annotator unmounted");
    }
}
