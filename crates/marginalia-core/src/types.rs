//! Core annotation types: ids, normalized ranges, the annotation record and drafts.
//!
//! These types are platform-agnostic; the DOM layer only ever sees them
//! through the traits in [`crate::platform`].

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Deserializer, Serialize};
use smol_str::{SmolStr, ToSmolStr};

/// Opaque annotation identifier, unique within a document.
///
/// The service hands out integers today; ids are kept as strings so the
/// DOM attribute, the JSON value and the registry key all compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AnnotationId(SmolStr);

impl AnnotationId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<u64> for AnnotationId {
    fn from(n: u64) -> Self {
        Self(n.to_smolstr())
    }
}

impl<'de> Deserialize<'de> for AnnotationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(SmolStr),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self(n.to_smolstr()),
            Raw::Str(s) => Self(s),
        })
    }
}

/// Identifier of the annotated document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(SmolStr);

impl DocumentId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        AnnotationId::deserialize(deserializer).map(|id| Self(id.0))
    }
}

/// Highlight background color.
///
/// Only the default is ever produced by the create path; stored values are
/// applied verbatim. Per-annotation colors would start here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighlightColor(SmolStr);

impl HighlightColor {
    pub const DEFAULT: &'static str = "yellow";

    pub fn new(color: impl Into<SmolStr>) -> Self {
        Self(color.into())
    }

    /// CSS value for the `background` property.
    pub fn css_value(&self) -> &str {
        &self.0
    }
}

impl Default for HighlightColor {
    fn default() -> Self {
        Self(SmolStr::new_static(Self::DEFAULT))
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Half-open `[start, end)` range in normalized offset space, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizedRange {
    pub start: usize,
    pub end: usize,
}

impl NormalizedRange {
    /// Create a range, rejecting empty and inverted ones.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Which side of a fragment boundary a position prefers.
///
/// A normalized offset that sits exactly between two text fragments can be
/// expressed as the end of the first or the start of the second. `Before`
/// sticks to the end of the previous fragment, `After` to the start of the
/// next one.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    #[default]
    Before,
    After,
}

/// A sub-entry of an annotation's thread. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
}

/// An annotation as served by the annotation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub anchor: String,
    #[serde(default)]
    pub color: Option<HighlightColor>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub can_delete: bool,
}

impl Annotation {
    /// Build the full record for a just-created annotation.
    ///
    /// This is the one place where the service's minimal create response and
    /// the locally held draft are reconciled into the shape `list` returns.
    pub fn from_created(
        created: CreatedAnnotation,
        draft: &Draft,
        note: &str,
        author: &str,
    ) -> Self {
        let note = note.trim();
        let comments = if note.is_empty() {
            Vec::new()
        } else {
            vec![Comment {
                id: None,
                user: author.to_string(),
                text: note.to_string(),
            }]
        };

        Self {
            id: created.id,
            start: draft.range.start,
            end: draft.range.end,
            anchor: draft.anchor.clone(),
            color: None,
            content: (!note.is_empty()).then(|| note.to_string()),
            comments,
            user: author.to_string(),
            can_delete: true,
        }
    }

    /// The stored range, if it is a valid non-empty one.
    pub fn range(&self) -> Option<NormalizedRange> {
        NormalizedRange::new(self.start, self.end)
    }

    /// The note, treating an empty string as absent.
    pub fn note(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    /// Hover text for the highlight: the note if present, else the anchor.
    pub fn tooltip(&self) -> &str {
        self.note().unwrap_or(&self.anchor)
    }
}

/// A selection captured while the create popover is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub range: NormalizedRange,
    pub anchor: String,
}

/// Body of a create request. The client never sends a color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAnnotation {
    pub start: usize,
    pub end: usize,
    pub anchor: String,
    pub note: String,
}

impl NewAnnotation {
    pub fn from_draft(draft: &Draft, note: &str) -> Self {
        Self {
            start: draft.range.start,
            end: draft.range.end,
            anchor: draft.anchor.clone(),
            note: note.trim().to_string(),
        }
    }
}

/// Successful create response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedAnnotation {
    pub id: AnnotationId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_id_from_number_or_string() {
        let a: AnnotationId = serde_json::from_str("42").unwrap();
        let b: AnnotationId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, AnnotationId::from(42u64));
        assert_eq!(a.to_string(), "42");
    }

    #[test]
    fn test_annotation_deserializes_service_shape() {
        let json = r#"{
            "id": 7, "start": 0, "end": 5, "anchor": "Hello", "color": "yellow",
            "user": "ada", "content": "", "can_delete": false,
            "comments": [{"id": 1, "text": "first", "user": "ada"}]
        }"#;
        let ann: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(ann.id.as_str(), "7");
        assert_eq!(ann.range(), NormalizedRange::new(0, 5));
        assert_eq!(ann.note(), None);
        assert_eq!(ann.tooltip(), "Hello");
        assert_eq!(ann.comments.len(), 1);
    }

    #[test]
    fn test_annotation_tolerates_missing_optional_fields() {
        let ann: Annotation = serde_json::from_str(r#"{"id": "a", "start": 3, "end": 9}"#).unwrap();
        assert_eq!(ann.color, None);
        assert!(!ann.can_delete);
        assert!(ann.comments.is_empty());
    }

    #[test]
    fn test_normalized_range_rejects_empty_and_inverted() {
        assert!(NormalizedRange::new(3, 3).is_none());
        assert!(NormalizedRange::new(4, 3).is_none());
        let r = NormalizedRange::new(2, 6).unwrap();
        assert_eq!(r.len(), 4);
        assert_eq!(r.to_range(), 2..6);
    }

    #[test]
    fn test_from_created_reconciles_draft_and_response() {
        let draft = Draft {
            range: NormalizedRange::new(6, 11).unwrap(),
            anchor: "world".into(),
        };
        let ann = Annotation::from_created(
            CreatedAnnotation { id: "12".into() },
            &draft,
            "  check this  ",
            "you",
        );
        assert_eq!(ann.id.as_str(), "12");
        assert_eq!((ann.start, ann.end), (6, 11));
        assert_eq!(ann.note(), Some("check this"));
        assert_eq!(ann.comments[0].text, "check this");
        assert_eq!(ann.comments[0].user, "you");
        assert!(ann.can_delete);
        assert_eq!(ann.color, None);

        let bare = Annotation::from_created(CreatedAnnotation { id: "13".into() }, &draft, "", "you");
        assert!(bare.comments.is_empty());
        assert_eq!(bare.tooltip(), "world");
    }

    #[test]
    fn test_new_annotation_omits_color() {
        let draft = Draft {
            range: NormalizedRange::new(0, 5).unwrap(),
            anchor: "Hello".into(),
        };
        let body = serde_json::to_value(NewAnnotation::from_draft(&draft, " hi ")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"start": 0, "end": 5, "anchor": "Hello", "note": "hi"})
        );
    }
}
