//! Content models for the sidebar list and the detail popup.

use crate::types::{Annotation, AnnotationId, Comment};

/// Default number of normalized chars of the anchor shown in the list.
pub const DEFAULT_ANCHOR_LABEL_LIMIT: usize = 64;

/// Text shown in the detail popup when there is nothing else to show.
pub const NO_CONTENT: &str = "No content.";

/// Shorten an anchor to `limit` chars, with an ellipsis when cut.
pub fn truncate_label(anchor: &str, limit: usize) -> String {
    let mut chars = anchor.chars();
    let mut label: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        label.push('…');
    }
    label
}

/// One line of the comment block: `user: text`.
pub fn comment_line(comment: &Comment) -> String {
    format!("{}: {}", comment.user, comment.text)
}

/// A sidebar entry, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub id: AnnotationId,
    pub author: String,
    pub anchor_label: String,
    pub note: Option<String>,
    pub comment_lines: Vec<String>,
    pub can_delete: bool,
}

impl ListEntry {
    pub fn from_annotation(annotation: &Annotation, label_limit: usize) -> Self {
        Self {
            id: annotation.id.clone(),
            author: annotation.user.clone(),
            anchor_label: truncate_label(&annotation.anchor, label_limit),
            note: annotation.note().map(str::to_string),
            comment_lines: annotation.comments.iter().map(comment_line).collect(),
            can_delete: annotation.can_delete,
        }
    }

    pub fn snapshot(&self) -> ListEntrySnapshot {
        ListEntrySnapshot {
            note: self.note.clone(),
            comment_lines: self.comment_lines.clone(),
            can_delete: self.can_delete,
        }
    }
}

/// The parts of a rendered list entry the detail popup reads back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntrySnapshot {
    pub note: Option<String>,
    pub comment_lines: Vec<String>,
    pub can_delete: bool,
}

/// Content of the detail popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailContent {
    pub id: AnnotationId,
    pub text: String,
    /// Whether the delete action is shown.
    pub can_delete: bool,
}

impl DetailContent {
    /// Assemble popup content for `id`.
    ///
    /// Prefers the list entry (note, then comment lines, blank-line
    /// separated), then the highlight's hover text, then [`NO_CONTENT`].
    /// Without a list entry the delete action stays hidden.
    pub fn assemble(
        id: AnnotationId,
        entry: Option<&ListEntrySnapshot>,
        span_title: Option<&str>,
    ) -> Self {
        let mut parts = Vec::new();
        if let Some(entry) = entry {
            if let Some(note) = entry.note.as_deref().map(str::trim) {
                if !note.is_empty() {
                    parts.push(note.to_string());
                }
            }
            if !entry.comment_lines.is_empty() {
                parts.push(entry.comment_lines.join("\n"));
            }
        }

        let text = if parts.is_empty() {
            span_title
                .filter(|t| !t.is_empty())
                .unwrap_or(NO_CONTENT)
                .to_string()
        } else {
            parts.join("\n\n")
        };

        Self {
            id,
            text,
            can_delete: entry.is_some_and(|e| e.can_delete),
        }
    }
}
