//! Interaction controller: the create flow, detail popup and delete transaction.
//!
//! Every network round trip is split into a `begin_*` call that captures
//! what the request needs and a `finish_*` call that applies the response.
//! Both halves are synchronous, so each runs to completion inside one event
//! turn and the controller never needs to be borrowed across an await.
//! [`crate::session::AnnotationSession`] pairs them with a service.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::AnnotatorConfig;
use crate::error::{AnnotateError, ServiceError};
use crate::offset_map::{RawSelection, selection_to_normalized_range};
use crate::platform::{CreatePopover, DetailView, DocumentSurface, ListView};
use crate::registry::{Registry, RegistryEvent};
use crate::render::{
    HighlightRequest, RenderOutcome, SkipReason, cleanup_duplicate_spans, remove_highlights,
    render_highlight,
};
use crate::types::{Annotation, AnnotationId, CreatedAnnotation, Draft, NewAnnotation};
use crate::views::{DetailContent, ListEntry};

/// Where the create flow stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CreateState {
    #[default]
    Idle,
    /// Pointer or selection activity in the document.
    Selecting,
    /// A usable selection exists; the affordance is enabled.
    Selected,
    /// The popover is open for this draft.
    PopoverOpen(Draft),
    /// A create request is in flight.
    Saving,
}

/// Issued by [`Controller::begin_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// A create request waiting for its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    ticket: u64,
    draft: Draft,
    note: String,
}

impl PendingSave {
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    /// Body of the create request.
    pub fn request(&self) -> NewAnnotation {
        NewAnnotation::from_draft(&self.draft, &self.note)
    }
}

/// A delete request waiting for its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    id: AnnotationId,
}

impl PendingDelete {
    pub fn id(&self) -> &AnnotationId {
        &self.id
    }
}

/// What a bulk load did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rendered: usize,
    pub already_rendered: usize,
    pub skipped: usize,
    /// Repeated ids in the response.
    pub duplicates: usize,
    /// Ids deleted while the load was in flight.
    pub suppressed: usize,
    /// Duplicate spans unwrapped by the cleanup pass.
    pub merged_spans: usize,
}

/// Owns the document surface, the optional views and the registry for one
/// document view.
pub struct Controller<D, L, P, C> {
    surface: D,
    list: Option<L>,
    popover: Option<P>,
    detail: Option<C>,
    registry: Registry,
    config: AnnotatorConfig,
    state: CreateState,
    next_ticket: u64,
    /// Tickets of loads and creates still waiting for a response.
    in_flight: BTreeSet<u64>,
    /// Ticket counter value at the time each id was deleted. Kept only while
    /// an older ticket is still in flight.
    deleted: HashMap<AnnotationId, u64>,
    deleting: HashSet<AnnotationId>,
}

impl<D, L, P, C> Controller<D, L, P, C>
where
    D: DocumentSurface,
    L: ListView,
    P: CreatePopover,
    C: DetailView,
{
    pub fn new(surface: D, config: AnnotatorConfig) -> Self {
        Self {
            surface,
            list: None,
            popover: None,
            detail: None,
            registry: Registry::new(),
            config,
            state: CreateState::Idle,
            next_ticket: 0,
            in_flight: BTreeSet::new(),
            deleted: HashMap::new(),
            deleting: HashSet::new(),
        }
    }

    pub fn with_list(mut self, list: L) -> Self {
        self.list = Some(list);
        self
    }

    pub fn with_popover(mut self, popover: P) -> Self {
        self.popover = Some(popover);
        self
    }

    pub fn with_detail(mut self, detail: C) -> Self {
        self.detail = Some(detail);
        self
    }

    // === Accessors ===

    pub fn surface(&self) -> &D {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut D {
        &mut self.surface
    }

    pub fn list(&self) -> Option<&L> {
        self.list.as_ref()
    }

    pub fn popover(&self) -> Option<&P> {
        self.popover.as_ref()
    }

    pub fn popover_mut(&mut self) -> Option<&mut P> {
        self.popover.as_mut()
    }

    pub fn detail(&self) -> Option<&C> {
        self.detail.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn state(&self) -> &CreateState {
        &self.state
    }

    /// Subscribe to list insertions and deletions.
    pub fn on_registry_changed(&mut self, listener: impl Fn(&RegistryEvent) + 'static) {
        self.registry.on_changed(listener);
    }

    fn issue_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight.insert(ticket);
        ticket
    }

    fn retire_ticket(&mut self, ticket: u64) {
        self.in_flight.remove(&ticket);
        self.prune_tombstones();
    }

    /// Drop tombstones that no outstanding request predates.
    fn prune_tombstones(&mut self) {
        let oldest = self.in_flight.first().copied();
        self.deleted
            .retain(|_, &mut deleted_at| oldest.is_some_and(|ticket| ticket < deleted_at));
    }

    /// Whether `id` was deleted after a request holding `ticket` went out.
    fn is_suppressed(&self, id: &AnnotationId, ticket: u64) -> bool {
        self.deleted
            .get(id)
            .is_some_and(|&deleted_at| ticket < deleted_at)
    }

    // === Rendering ===

    /// Draw one annotation's highlight.
    pub fn render_annotation(&mut self, annotation: &Annotation) -> RenderOutcome {
        let Some(range) = annotation.range() else {
            tracing::warn!(
                target: "marginalia::controller",
                id = %annotation.id,
                start = annotation.start,
                end = annotation.end,
                "{}",
                AnnotateError::InvalidRange {
                    start: annotation.start,
                    end: annotation.end,
                }
            );
            return RenderOutcome::Skipped(SkipReason::InvalidRange);
        };
        let color = annotation
            .color
            .as_ref()
            .unwrap_or(&self.config.default_color);
        render_highlight(
            &mut self.surface,
            &mut self.registry,
            HighlightRequest {
                id: &annotation.id,
                range,
                color: Some(color),
                tooltip: annotation.tooltip(),
            },
        )
    }

    /// Insert a list entry unless one exists. Returns whether one was added.
    pub fn list_annotation(&mut self, annotation: &Annotation) -> bool {
        let Some(list) = self.list.as_mut() else {
            return false;
        };
        if list.contains(&annotation.id) {
            tracing::debug!(target: "marginalia::controller", id = %annotation.id, "already listed");
            return false;
        }
        let entry = ListEntry::from_annotation(annotation, self.config.anchor_label_limit);
        if let Err(err) = list.prepend(&entry) {
            tracing::warn!(target: "marginalia::controller", id = %annotation.id, error = %err, "could not list annotation");
            return false;
        }
        self.registry
            .notify(RegistryEvent::Listed(annotation.id.clone()));
        true
    }

    /// Highlight then list one annotation.
    pub fn show_annotation(&mut self, annotation: &Annotation) -> RenderOutcome {
        let outcome = self.render_annotation(annotation);
        self.list_annotation(annotation);
        outcome
    }

    // === Load ===

    pub fn begin_load(&mut self) -> LoadTicket {
        LoadTicket(self.issue_ticket())
    }

    /// Apply a bulk load: dedupe by id, show each, then merge duplicate spans.
    pub fn finish_load(&mut self, ticket: LoadTicket, annotations: Vec<Annotation>) -> LoadSummary {
        let mut summary = LoadSummary::default();
        let mut seen = HashSet::new();

        for annotation in annotations {
            if !seen.insert(annotation.id.clone()) {
                tracing::debug!(target: "marginalia::controller", id = %annotation.id, "duplicate id in load");
                summary.duplicates += 1;
                continue;
            }
            if self.is_suppressed(&annotation.id, ticket.0) {
                tracing::debug!(target: "marginalia::controller", id = %annotation.id, "deleted while loading");
                summary.suppressed += 1;
                continue;
            }
            match self.show_annotation(&annotation) {
                RenderOutcome::Rendered => summary.rendered += 1,
                RenderOutcome::AlreadyRendered => summary.already_rendered += 1,
                RenderOutcome::Skipped(_) => summary.skipped += 1,
            }
        }

        summary.merged_spans = cleanup_duplicate_spans(&mut self.surface);
        self.retire_ticket(ticket.0);
        tracing::debug!(target: "marginalia::controller", ?summary, "load applied");
        summary
    }

    /// Forget a load whose request failed.
    pub fn abandon_load(&mut self, ticket: LoadTicket) {
        self.retire_ticket(ticket.0);
    }

    // === Create flow ===

    fn creating_enabled(&self) -> bool {
        self.config.can_annotate && self.popover.is_some()
    }

    fn set_affordance(&mut self, enabled: bool) {
        if let Some(popover) = self.popover.as_mut() {
            popover.set_affordance_enabled(enabled);
        }
    }

    /// Pointer went down or moved inside the document.
    pub fn pointer_activity(&mut self) {
        if self.creating_enabled() && self.state == CreateState::Idle {
            self.state = CreateState::Selecting;
        }
    }

    /// The live selection changed.
    pub fn selection_changed(&mut self, selection: &RawSelection<D::Node>) {
        if !self.creating_enabled() {
            return;
        }
        match self.state {
            CreateState::PopoverOpen(_) | CreateState::Saving => return,
            CreateState::Idle | CreateState::Selecting | CreateState::Selected => {}
        }

        let usable = selection.range().is_some();
        self.state = if usable {
            CreateState::Selected
        } else if self.state == CreateState::Idle {
            CreateState::Idle
        } else {
            CreateState::Selecting
        };
        self.set_affordance(usable);
    }

    /// Selection released over the document. Opens the popover on a usable selection.
    pub fn selection_released(&mut self, selection: &RawSelection<D::Node>) -> Option<&Draft> {
        if !self.creating_enabled() || self.state == CreateState::Saving {
            return None;
        }

        let Some(range) = selection.range() else {
            tracing::debug!(target: "marginalia::controller", ?selection, "no usable selection");
            return None;
        };
        let fragments = self.surface.text_fragments();
        let Some(selected) = selection_to_normalized_range(&fragments, range) else {
            tracing::debug!(target: "marginalia::controller", "selection maps to no text");
            return None;
        };

        if let Some(popover) = self.popover.as_mut() {
            popover.open();
        }
        tracing::debug!(
            target: "marginalia::controller",
            start = selected.range.start,
            end = selected.range.end,
            "create popover opened"
        );
        self.state = CreateState::PopoverOpen(Draft {
            range: selected.range,
            anchor: selected.anchor,
        });
        match &self.state {
            CreateState::PopoverOpen(draft) => Some(draft),
            _ => None,
        }
    }

    /// The "annotate" affordance was invoked explicitly.
    pub fn invoke_affordance(&mut self, selection: &RawSelection<D::Node>) -> Option<&Draft> {
        self.selection_released(selection)
    }

    /// Dismiss the popover without side effects. Ignored while saving.
    pub fn cancel_create(&mut self) {
        if self.state == CreateState::Saving {
            return;
        }
        if let Some(popover) = self.popover.as_mut() {
            popover.close();
        }
        self.state = CreateState::Idle;
    }

    /// Capture the draft and note for a create request.
    pub fn begin_save(&mut self) -> Option<PendingSave> {
        let CreateState::PopoverOpen(draft) = std::mem::take(&mut self.state) else {
            return None;
        };
        let note = self
            .popover
            .as_ref()
            .map(|p| p.note())
            .unwrap_or_default();
        self.state = CreateState::Saving;
        Some(PendingSave {
            ticket: self.issue_ticket(),
            draft,
            note,
        })
    }

    /// Apply a create response.
    ///
    /// The popover closes, the selection is cleared and the affordance is
    /// disabled whatever the outcome. On success the new annotation is
    /// listed and highlighted from the local draft and returned; `None`
    /// means it was deleted before the response arrived.
    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        result: Result<CreatedAnnotation, ServiceError>,
    ) -> Result<Option<Annotation>, AnnotateError> {
        if let Some(popover) = self.popover.as_mut() {
            popover.close();
            popover.set_affordance_enabled(false);
        }
        self.surface.clear_selection();
        self.state = CreateState::Idle;

        let created = match result {
            Ok(created) => created,
            Err(err) => {
                tracing::error!(target: "marginalia::controller", error = %err, "create failed");
                self.retire_ticket(pending.ticket);
                return Err(err.into());
            }
        };

        let annotation = Annotation::from_created(
            created,
            &pending.draft,
            &pending.note,
            &self.config.author_label,
        );
        let suppressed = self.is_suppressed(&annotation.id, pending.ticket);
        self.retire_ticket(pending.ticket);
        if suppressed {
            tracing::debug!(target: "marginalia::controller", id = %annotation.id, "deleted before create completed");
            return Ok(None);
        }

        self.list_annotation(&annotation);
        self.render_annotation(&annotation);
        Ok(Some(annotation))
    }

    // === Detail popup ===

    /// Show the detail popup for `id`. Returns false without a popup.
    pub fn open_detail(&mut self, id: &AnnotationId) -> bool {
        if self.detail.is_none() {
            return false;
        }
        let snapshot = self.list.as_ref().and_then(|list| list.snapshot(id));
        let title = self
            .surface
            .spans_for(id)
            .first()
            .and_then(|span| self.surface.span_title(span));
        let content = DetailContent::assemble(id.clone(), snapshot.as_ref(), title.as_deref());

        match self.detail.as_mut() {
            Some(detail) => {
                detail.show(&content);
                true
            }
            None => false,
        }
    }

    pub fn close_detail(&mut self) {
        if let Some(detail) = self.detail.as_mut() {
            detail.hide();
        }
    }

    /// Scroll the first highlight for `id` into view and pulse it.
    pub fn reveal(&mut self, id: &AnnotationId) -> bool {
        match self.surface.spans_for(id).first() {
            Some(span) => {
                self.surface.reveal(span);
                true
            }
            None => {
                tracing::debug!(target: "marginalia::controller", %id, "nothing to reveal");
                false
            }
        }
    }

    // === Delete ===

    /// Start deleting `id`. `None` if a delete for it is already in flight.
    pub fn begin_delete(&mut self, id: &AnnotationId) -> Option<PendingDelete> {
        if !self.deleting.insert(id.clone()) {
            tracing::debug!(target: "marginalia::controller", %id, "delete already in flight");
            return None;
        }
        Some(PendingDelete { id: id.clone() })
    }

    /// Apply a delete response.
    ///
    /// On success the popup (if showing this id), the list entry, every
    /// highlight span and the registry id go, in that order. Once the service
    /// has confirmed, the teardown always completes; a span the surface
    /// refuses to unwrap is logged and left behind. On failure nothing
    /// changes.
    pub fn finish_delete(
        &mut self,
        pending: PendingDelete,
        result: Result<(), ServiceError>,
    ) -> Result<(), AnnotateError> {
        let id = pending.id;
        self.deleting.remove(&id);
        result.inspect_err(|err| {
            tracing::error!(target: "marginalia::controller", %id, error = %err, "delete failed");
        })?;

        if let Some(detail) = self.detail.as_mut() {
            if detail.shown_id().as_ref() == Some(&id) {
                detail.hide();
            }
        }
        let unlisted = self.list.as_mut().is_some_and(|list| list.remove(&id));
        let unwrapped = remove_highlights(&mut self.surface, &id);
        let known = self.registry.remove(&id);
        self.deleted.insert(id.clone(), self.next_ticket);
        self.prune_tombstones();

        tracing::debug!(target: "marginalia::controller", %id, unlisted, unwrapped, known, "annotation deleted");
        if unlisted || unwrapped > 0 || known {
            self.registry.notify(RegistryEvent::Removed(id));
        }
        Ok(())
    }
}
