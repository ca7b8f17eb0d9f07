//! Platform abstraction traits for annotation hosts.
//!
//! These traits define the interface between the annotation logic and the
//! thing actually displaying the document (browser DOM, the in-memory
//! document in [`crate::memory`], ...). The core decides *what* to draw and
//! remove; implementations only know how to touch their own tree.

use std::fmt;

use crate::offset_map::{RawRange, TextFragment};
use crate::types::{AnnotationId, HighlightColor};
use crate::views::{DetailContent, ListEntry, ListEntrySnapshot};

/// Element name of a highlight span.
pub const HIGHLIGHT_TAG: &str = "mark";
/// Class carried by every highlight span.
pub const HIGHLIGHT_CLASS: &str = "ann";
/// Attribute holding the annotation id on a highlight span.
pub const HIGHLIGHT_ID_ATTR: &str = "data-id";
/// Transient class added when a highlight is revealed from the list.
pub const PULSE_CLASS: &str = "pulse";

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError(pub String);

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PlatformError {}

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// What a highlight span looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightMark {
    pub id: AnnotationId,
    pub color: HighlightColor,
    /// Hover text. Empty means no title attribute.
    pub title: String,
}

impl HighlightMark {
    /// Inline style: the highlight background, with the text color left alone.
    pub fn style(&self) -> String {
        format!("background: {}; color: inherit;", self.color.css_value())
    }
}

/// The annotated document.
///
/// `Node` is a cheap handle; handles are compared with `==` to match
/// selection boundaries against text fragments.
pub trait DocumentSurface {
    type Node: Clone + PartialEq + fmt::Debug;

    /// Text nodes under the document container, in document order.
    ///
    /// Must be computed fresh on every call.
    fn text_fragments(&self) -> Vec<TextFragment<Self::Node>>;

    /// Every highlight span in the container, in document order.
    fn highlight_spans(&self) -> Vec<(AnnotationId, Self::Node)>;

    /// Highlight spans for one annotation, in document order.
    fn spans_for(&self, id: &AnnotationId) -> Vec<Self::Node> {
        self.highlight_spans()
            .into_iter()
            .filter(|(span_id, _)| span_id == id)
            .map(|(_, span)| span)
            .collect()
    }

    /// Whether at least one span for `id` is present.
    fn has_span(&self, id: &AnnotationId) -> bool {
        !self.spans_for(id).is_empty()
    }

    /// Hover text of a span, if any.
    fn span_title(&self, span: &Self::Node) -> Option<String>;

    /// Move the contents of `range` into a new highlight span and return it.
    ///
    /// Ranges crossing element boundaries split the partially covered
    /// elements, the way a DOM `Range` extraction does.
    fn wrap_range(
        &mut self,
        range: &RawRange<Self::Node>,
        mark: &HighlightMark,
    ) -> Result<Self::Node, PlatformError>;

    /// Replace a span with its own contents.
    fn unwrap_span(&mut self, span: &Self::Node) -> Result<(), PlatformError>;

    /// Bring a span into view and pulse it.
    fn reveal(&mut self, span: &Self::Node);

    /// Drop the user's live selection.
    fn clear_selection(&mut self);
}

/// The sidebar list of annotations, newest first.
pub trait ListView {
    /// Whether an entry for `id` is present.
    fn contains(&self, id: &AnnotationId) -> bool;

    /// Insert an entry at the top of the list.
    fn prepend(&mut self, entry: &ListEntry) -> Result<(), PlatformError>;

    /// Remove the entry for `id`, returning whether one was there.
    fn remove(&mut self, id: &AnnotationId) -> bool;

    /// What the entry for `id` currently shows.
    ///
    /// Read back from the rendered entry, so it reflects whatever the list
    /// displays now rather than what was first inserted.
    fn snapshot(&self, id: &AnnotationId) -> Option<ListEntrySnapshot>;
}

/// The read-only detail popup.
pub trait DetailView {
    fn show(&mut self, content: &DetailContent);

    fn hide(&mut self);

    /// Id the popup is currently open for.
    fn shown_id(&self) -> Option<AnnotationId>;
}

/// The create popover and the "annotate" affordance.
pub trait CreatePopover {
    /// Show the popover with an empty note.
    fn open(&mut self);

    fn close(&mut self);

    /// Note text as currently entered.
    fn note(&self) -> String;

    /// Enable or disable the affordance that opens the popover.
    fn set_affordance_enabled(&mut self, enabled: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_style_keeps_text_color() {
        let mark = HighlightMark {
            id: "1".into(),
            color: HighlightColor::default(),
            title: String::new(),
        };
        assert_eq!(mark.style(), "background: yellow; color: inherit;");
    }

    #[test]
    fn test_platform_error_from_str() {
        let err: PlatformError = "no window".into();
        assert_eq!(err.to_string(), "no window");
    }
}
