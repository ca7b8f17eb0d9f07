//! Async driver pairing a shared [`Controller`] with an [`AnnotationService`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::controller::{Controller, LoadSummary};
use crate::error::AnnotateError;
use crate::platform::{CreatePopover, DetailView, DocumentSurface, ListView};
use crate::service::AnnotationService;
use crate::types::{Annotation, AnnotationId, DocumentId};

/// A document view bound to its annotation service.
///
/// The controller is only borrowed inside the synchronous halves of each
/// operation, so event handlers can use it while requests are in flight.
pub struct AnnotationSession<S, D, L, P, C> {
    controller: Rc<RefCell<Controller<D, L, P, C>>>,
    service: Rc<S>,
    document: DocumentId,
}

impl<S, D, L, P, C> Clone for AnnotationSession<S, D, L, P, C> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            service: self.service.clone(),
            document: self.document.clone(),
        }
    }
}

impl<S, D, L, P, C> AnnotationSession<S, D, L, P, C>
where
    S: AnnotationService,
    D: DocumentSurface,
    L: ListView,
    P: CreatePopover,
    C: DetailView,
{
    pub fn new(controller: Controller<D, L, P, C>, service: S) -> Self {
        let document = controller.config().document_id.clone();
        Self {
            controller: Rc::new(RefCell::new(controller)),
            service: Rc::new(service),
            document,
        }
    }

    pub fn controller(&self) -> &Rc<RefCell<Controller<D, L, P, C>>> {
        &self.controller
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    /// Fetch and show every annotation of the document.
    #[tracing::instrument(level = "debug", skip(self), fields(document = %self.document))]
    pub async fn load(&self) -> Result<LoadSummary, AnnotateError> {
        let ticket = self.controller.borrow_mut().begin_load();
        let annotations = match self.service.list(&self.document).await {
            Ok(annotations) => annotations,
            Err(err) => {
                tracing::error!(target: "marginalia::session", error = %err, "loading annotations failed");
                self.controller.borrow_mut().abandon_load(ticket);
                return Err(err.into());
            }
        };
        Ok(self.controller.borrow_mut().finish_load(ticket, annotations))
    }

    /// Submit the open popover. `Ok(None)` when there was nothing to save.
    #[tracing::instrument(level = "debug", skip(self), fields(document = %self.document))]
    pub async fn save(&self) -> Result<Option<Annotation>, AnnotateError> {
        let Some(pending) = self.controller.borrow_mut().begin_save() else {
            return Ok(None);
        };
        let result = self
            .service
            .create(&self.document, &pending.request())
            .await;
        self.controller.borrow_mut().finish_save(pending, result)
    }

    /// Delete `id`. `Ok(false)` when a delete for it was already in flight.
    #[tracing::instrument(level = "debug", skip(self, id), fields(%id))]
    pub async fn delete(&self, id: &AnnotationId) -> Result<bool, AnnotateError> {
        let Some(pending) = self.controller.borrow_mut().begin_delete(id) else {
            return Ok(false);
        };
        let result = self.service.delete(pending.id()).await;
        self.controller
            .borrow_mut()
            .finish_delete(pending, result)
            .map(|()| true)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use tokio::sync::oneshot;

    use super::*;
    use crate::config::AnnotatorConfig;
    use crate::error::ServiceError;
    use crate::memory::{MemoryDetail, MemoryDocument, MemoryList, MemoryPopover};
    use crate::offset_map::{RawPosition, RawRange, RawSelection};
    use crate::types::{CreatedAnnotation, NewAnnotation};

    /// Service whose responses are queued up front, or held open on a channel.
    #[derive(Default)]
    struct ScriptedService {
        lists: RefCell<VecDeque<Result<Vec<Annotation>, ServiceError>>>,
        creates: RefCell<VecDeque<oneshot::Receiver<Result<CreatedAnnotation, ServiceError>>>>,
        deletes: RefCell<VecDeque<Result<(), ServiceError>>>,
        created: RefCell<Vec<NewAnnotation>>,
    }

    impl AnnotationService for ScriptedService {
        async fn list(&self, _document: &DocumentId) -> Result<Vec<Annotation>, ServiceError> {
            self.lists
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn create(
            &self,
            _document: &DocumentId,
            annotation: &NewAnnotation,
        ) -> Result<CreatedAnnotation, ServiceError> {
            self.created.borrow_mut().push(annotation.clone());
            let rx = self.creates.borrow_mut().pop_front();
            match rx {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(ServiceError::Transport("dropped".into()))),
                None => Err(ServiceError::Transport("unscripted".into())),
            }
        }

        async fn delete(&self, _id: &AnnotationId) -> Result<(), ServiceError> {
            self.deletes.borrow_mut().pop_front().unwrap_or(Ok(()))
        }
    }

    type TestSession =
        AnnotationSession<ScriptedService, MemoryDocument, MemoryList, MemoryPopover, MemoryDetail>;

    fn stored(id: &str, start: usize, end: usize) -> Annotation {
        Annotation {
            id: id.into(),
            start,
            end,
            anchor: String::new(),
            color: None,
            content: None,
            comments: Vec::new(),
            user: "ada".into(),
            can_delete: true,
        }
    }

    fn session(text: &str, service: ScriptedService) -> TestSession {
        let mut config = AnnotatorConfig::new("doc-1");
        config.can_annotate = true;
        let controller = Controller::new(MemoryDocument::from_fragments([text]), config)
            .with_list(MemoryList::new())
            .with_popover(MemoryPopover::new())
            .with_detail(MemoryDetail::new());
        AnnotationSession::new(controller, service)
    }

    fn open_popover(session: &TestSession, start: usize, end: usize, note: &str) {
        let mut c = session.controller().borrow_mut();
        let node = c.surface().text_fragments()[0].node;
        let selection = RawSelection::Range(RawRange::new(
            RawPosition::new(node, start),
            RawPosition::new(node, end),
        ));
        c.selection_released(&selection);
        c.popover_mut().unwrap().type_note(note);
    }

    #[tokio::test]
    async fn test_load_renders_service_annotations() {
        let service = ScriptedService::default();
        service
            .lists
            .borrow_mut()
            .push_back(Ok(vec![stored("1", 0, 5), stored("1", 0, 5)]));
        let session = session("Hello world", service);

        let summary = session.load().await.unwrap();
        assert_eq!(summary.rendered, 1);
        assert_eq!(summary.duplicates, 1);
        let c = session.controller().borrow();
        assert_eq!(c.surface().highlight_spans().len(), 1);
        assert_eq!(c.list().unwrap().entries().len(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_is_reported() {
        let service = ScriptedService::default();
        service
            .lists
            .borrow_mut()
            .push_back(Err(ServiceError::Transport("offline".into())));
        let session = session("Hello world", service);

        let err = session.load().await.unwrap_err();
        assert!(matches!(err, AnnotateError::Service(_)));
        assert!(session.controller().borrow().registry().is_empty());
    }

    #[tokio::test]
    async fn test_save_sends_draft_and_renders() {
        let service = ScriptedService::default();
        let (tx, rx) = oneshot::channel();
        service.creates.borrow_mut().push_back(rx);
        tx.send(Ok(CreatedAnnotation { id: "4".into() })).unwrap();
        let session = session("Hello world", service);

        open_popover(&session, 6, 11, "nice");
        let created = session.save().await.unwrap().unwrap();
        assert_eq!(created.id.as_str(), "4");

        let sent = session.service.created.borrow();
        assert_eq!(
            sent[0],
            NewAnnotation {
                start: 6,
                end: 11,
                anchor: "world".into(),
                note: "nice".into()
            }
        );
        assert!(session.controller().borrow().surface().has_span(&"4".into()));
    }

    #[tokio::test]
    async fn test_save_without_popover_is_noop() {
        let session = session("Hello world", ScriptedService::default());
        assert_eq!(session.save().await.unwrap(), None);
        assert!(session.service.created.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_annotation() {
        let service = ScriptedService::default();
        service.lists.borrow_mut().push_back(Ok(vec![stored("1", 0, 5)]));
        service.deletes.borrow_mut().push_back(Err(ServiceError::Http {
            status: 403,
            message: "not yours".into(),
        }));
        let session = session("Hello world", service);
        session.load().await.unwrap();

        let err = session.delete(&"1".into()).await.unwrap_err();
        assert_eq!(err.user_message(), "not yours");
        assert!(session.controller().borrow().surface().has_span(&"1".into()));

        assert!(session.delete(&"1".into()).await.unwrap());
        let c = session.controller().borrow();
        assert!(!c.surface().has_span(&"1".into()));
        assert!(!c.registry().has(&"1".into()));
    }

    #[tokio::test]
    async fn test_create_then_delete_race_does_not_resurrect() {
        let service = ScriptedService::default();
        let (tx, rx) = oneshot::channel();
        service.creates.borrow_mut().push_back(rx);
        // The racing load already sees the new annotation.
        service.lists.borrow_mut().push_back(Ok(vec![stored("8", 0, 5)]));
        let session = session("Hello world", service);

        open_popover(&session, 0, 5, "");
        let saving = {
            let session = session.clone();
            async move { session.save().await }
        };
        let racing = async {
            session.load().await.unwrap();
            assert!(session.delete(&"8".into()).await.unwrap());
            tx.send(Ok(CreatedAnnotation { id: "8".into() })).unwrap();
        };
        let (saved, ()) = tokio::join!(saving, racing);

        assert_eq!(saved.unwrap(), None);
        let c = session.controller().borrow();
        assert!(!c.surface().has_span(&"8".into()));
        assert!(!c.list().unwrap().contains(&"8".into()));
        assert!(!c.registry().has(&"8".into()));
    }
}
