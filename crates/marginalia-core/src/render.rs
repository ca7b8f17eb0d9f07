//! Highlight rendering: placing, deduplicating and removing spans.

use crate::offset_map::normalized_range_to_raw;
use std::collections::HashSet;

use crate::platform::{DocumentSurface, HighlightMark, PlatformError};
use crate::registry::Registry;
use crate::types::{AnnotationId, HighlightColor, NormalizedRange};

/// Everything needed to draw one annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRequest<'a> {
    pub id: &'a AnnotationId,
    pub range: NormalizedRange,
    /// Stored color. `None` falls back to the default highlight.
    pub color: Option<&'a HighlightColor>,
    pub tooltip: &'a str,
}

/// Why a render placed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The stored range is empty or inverted.
    InvalidRange,
    /// The range starts at or past the end of the document text.
    OutOfBounds,
    /// The surface refused the computed range.
    Platform(PlatformError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A new span was inserted.
    Rendered,
    /// A span for the id was already there.
    AlreadyRendered,
    /// Nothing could be placed for this id.
    Skipped(SkipReason),
}

impl RenderOutcome {
    /// Whether a span for the id is on the surface after the call.
    pub fn is_present(&self) -> bool {
        !matches!(self, RenderOutcome::Skipped(_))
    }
}

/// Draw one annotation, at most once per id.
///
/// A span already in the document (from a racing render or server-side
/// markup) is adopted into the registry instead of drawn again. Failures to
/// place the span are logged and reported as [`RenderOutcome::Skipped`] so
/// a batch can carry on.
pub fn render_highlight<S: DocumentSurface>(
    surface: &mut S,
    registry: &mut Registry,
    request: HighlightRequest<'_>,
) -> RenderOutcome {
    let id = request.id;
    if registry.has(id) {
        tracing::debug!(target: "marginalia::render", %id, "already rendered");
        return RenderOutcome::AlreadyRendered;
    }
    if surface.has_span(id) {
        tracing::debug!(target: "marginalia::render", %id, "span already in document");
        registry.add(id.clone());
        return RenderOutcome::AlreadyRendered;
    }

    let fragments = surface.text_fragments();
    let Some(raw) = normalized_range_to_raw(&fragments, request.range) else {
        tracing::warn!(
            target: "marginalia::render",
            %id,
            start = request.range.start,
            end = request.range.end,
            "range is outside the document text"
        );
        return RenderOutcome::Skipped(SkipReason::OutOfBounds);
    };

    let mark = HighlightMark {
        id: id.clone(),
        color: request.color.cloned().unwrap_or_default(),
        title: request.tooltip.to_string(),
    };
    if let Err(err) = surface.wrap_range(&raw, &mark) {
        tracing::warn!(
            target: "marginalia::render",
            %id,
            start = request.range.start,
            end = request.range.end,
            error = %err,
            "could not place highlight"
        );
        return RenderOutcome::Skipped(SkipReason::Platform(err));
    }

    registry.add(id.clone());
    tracing::trace!(target: "marginalia::render", %id, ?raw, "highlight placed");
    RenderOutcome::Rendered
}

/// Unwrap every span after the first for each id. Returns how many went.
pub fn cleanup_duplicate_spans<S: DocumentSurface>(surface: &mut S) -> usize {
    let mut seen = HashSet::new();
    let mut removed = 0;
    for (id, span) in surface.highlight_spans() {
        if seen.insert(id.clone()) {
            continue;
        }
        match surface.unwrap_span(&span) {
            Ok(()) => removed += 1,
            Err(err) => {
                tracing::warn!(target: "marginalia::render", %id, error = %err, "could not remove duplicate span")
            }
        }
    }
    if removed > 0 {
        tracing::debug!(target: "marginalia::render", removed, "merged duplicate highlight spans");
    }
    removed
}

/// Unwrap every span for `id`. Returns how many were removed.
///
/// A span that cannot be unwrapped is logged and skipped.
pub fn remove_highlights<S: DocumentSurface>(surface: &mut S, id: &AnnotationId) -> usize {
    let mut removed = 0;
    for span in surface.spans_for(id) {
        match surface.unwrap_span(&span) {
            Ok(()) => removed += 1,
            Err(err) => {
                tracing::warn!(target: "marginalia::render", %id, error = %err, "could not remove highlight span")
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, NodeId};
    use crate::offset_map::{RawRange, TextFragment};

    fn request<'a>(id: &'a AnnotationId, start: usize, end: usize) -> HighlightRequest<'a> {
        HighlightRequest {
            id,
            range: NormalizedRange::new(start, end).unwrap(),
            color: None,
            tooltip: "",
        }
    }

    /// Wraps a document and refuses every wrap.
    struct FailingSurface(MemoryDocument);

    impl DocumentSurface for FailingSurface {
        type Node = NodeId;

        fn text_fragments(&self) -> Vec<TextFragment<NodeId>> {
            self.0.text_fragments()
        }
        fn highlight_spans(&self) -> Vec<(AnnotationId, NodeId)> {
            self.0.highlight_spans()
        }
        fn span_title(&self, span: &NodeId) -> Option<String> {
            self.0.span_title(span)
        }
        fn wrap_range(
            &mut self,
            _range: &RawRange<NodeId>,
            _mark: &HighlightMark,
        ) -> Result<NodeId, PlatformError> {
            Err("range no longer valid".into())
        }
        fn unwrap_span(&mut self, span: &NodeId) -> Result<(), PlatformError> {
            self.0.unwrap_span(span)
        }
        fn reveal(&mut self, span: &NodeId) {
            self.0.reveal(span)
        }
        fn clear_selection(&mut self) {
            self.0.clear_selection()
        }
    }

    #[test]
    fn test_render_across_fragments() {
        let mut doc = MemoryDocument::default();
        let root = doc.root();
        doc.append_text(root, "  He");
        let b = doc.append_element(root, "b");
        doc.append_text(b, "ll");
        doc.append_text(root, "o   world");
        let mut registry = Registry::new();

        let id = AnnotationId::from("7");
        let outcome = render_highlight(&mut doc, &mut registry, request(&id, 0, 5));

        assert_eq!(outcome, RenderOutcome::Rendered);
        assert!(registry.has(&id));
        insta::assert_snapshot!(
            doc.to_html(),
            @r#"  <mark class="ann" data-id="7" style="background: yellow; color: inherit;">He<b>ll</b>o</mark>   world"#
        );
        let span = doc.spans_for(&id)[0];
        assert_eq!(doc.activate(span), Some(id));
    }

    #[test]
    fn test_render_twice_is_one_span() {
        let mut doc = MemoryDocument::from_fragments(["Hello world"]);
        let mut registry = Registry::new();
        let id = AnnotationId::from("1");

        assert_eq!(
            render_highlight(&mut doc, &mut registry, request(&id, 6, 11)),
            RenderOutcome::Rendered
        );
        assert_eq!(
            render_highlight(&mut doc, &mut registry, request(&id, 6, 11)),
            RenderOutcome::AlreadyRendered
        );
        assert_eq!(doc.spans_for(&id).len(), 1);
    }

    #[test]
    fn test_existing_span_is_adopted() {
        let mut doc = MemoryDocument::from_fragments(["Hello world"]);
        let id = AnnotationId::from("1");
        render_highlight(&mut doc, &mut Registry::new(), request(&id, 0, 5));

        // Fresh registry, as after a second load against the same page.
        let mut registry = Registry::new();
        let outcome = render_highlight(&mut doc, &mut registry, request(&id, 0, 5));
        assert_eq!(outcome, RenderOutcome::AlreadyRendered);
        assert!(registry.has(&id));
        assert_eq!(doc.highlight_spans().len(), 1);
    }

    #[test]
    fn test_tooltip_and_color() {
        let mut doc = MemoryDocument::from_fragments(["Hello world"]);
        let id = AnnotationId::from("1");
        let color = HighlightColor::new("#ffd");
        let req = HighlightRequest {
            color: Some(&color),
            tooltip: "my note",
            ..request(&id, 0, 5)
        };
        render_highlight(&mut doc, &mut Registry::new(), req);

        let span = doc.spans_for(&id)[0];
        assert_eq!(doc.span_title(&span).as_deref(), Some("my note"));
        assert_eq!(
            doc.attribute(span, "style"),
            Some("background: #ffd; color: inherit;")
        );
    }

    #[test]
    fn test_out_of_bounds_is_skipped() {
        let mut doc = MemoryDocument::from_fragments(["Hello"]);
        let mut registry = Registry::new();
        let id = AnnotationId::from("1");

        let outcome = render_highlight(&mut doc, &mut registry, request(&id, 5, 9));
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::OutOfBounds));
        assert!(!outcome.is_present());
        assert!(!registry.has(&id));
    }

    #[test]
    fn test_end_past_document_clamps() {
        let mut doc = MemoryDocument::from_fragments(["Hello world"]);
        let id = AnnotationId::from("1");
        let outcome = render_highlight(&mut doc, &mut Registry::new(), request(&id, 6, 40));
        assert_eq!(outcome, RenderOutcome::Rendered);
        let span = doc.spans_for(&id)[0];
        assert_eq!(doc.text_content(span), "world");
    }

    #[test]
    fn test_platform_failure_is_skipped_not_registered() {
        let mut surface = FailingSurface(MemoryDocument::from_fragments(["Hello"]));
        let mut registry = Registry::new();
        let id = AnnotationId::from("1");

        let outcome = render_highlight(&mut surface, &mut registry, request(&id, 0, 5));
        assert!(matches!(
            outcome,
            RenderOutcome::Skipped(SkipReason::Platform(_))
        ));
        assert!(!registry.has(&id));
    }

    #[test]
    fn test_cleanup_keeps_first_span() {
        let mut doc = MemoryDocument::from_fragments(["one two three"]);
        let id = AnnotationId::from("1");
        let other = AnnotationId::from("2");
        // Separate registries simulate two racing renders.
        render_highlight(&mut doc, &mut Registry::new(), request(&id, 0, 3));
        render_highlight(&mut doc, &mut Registry::new(), request(&other, 4, 7));
        let fragments = doc.text_fragments();
        let three = fragments.iter().find(|f| f.text == " three").unwrap().node;
        doc.wrap_range(
            &RawRange::new(
                crate::offset_map::RawPosition::new(three, 1),
                crate::offset_map::RawPosition::new(three, 6),
            ),
            &HighlightMark {
                id: id.clone(),
                color: HighlightColor::default(),
                title: String::new(),
            },
        )
        .unwrap();
        assert_eq!(doc.spans_for(&id).len(), 2);

        assert_eq!(cleanup_duplicate_spans(&mut doc), 1);
        let spans = doc.spans_for(&id);
        assert_eq!(spans.len(), 1);
        assert_eq!(doc.text_content(spans[0]), "one");
        assert_eq!(doc.spans_for(&other).len(), 1);
        assert_eq!(doc.text_content(doc.root()), "one two three");
    }

    #[test]
    fn test_remove_then_render_again() {
        let mut doc = MemoryDocument::from_fragments(["Hello world"]);
        let mut registry = Registry::new();
        let id = AnnotationId::from("1");
        render_highlight(&mut doc, &mut registry, request(&id, 0, 5));

        assert_eq!(remove_highlights(&mut doc, &id), 1);
        registry.remove(&id);
        assert!(!doc.has_span(&id));
        assert_eq!(doc.to_html(), "Hello world");

        assert_eq!(
            render_highlight(&mut doc, &mut registry, request(&id, 0, 5)),
            RenderOutcome::Rendered
        );
    }
}
