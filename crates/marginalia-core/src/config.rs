//! Annotator configuration: host element ids, permissions and display
//! options, deserialized from the embedding page.

use serde::{Deserialize, Serialize};

use crate::error::AnnotateError;
use crate::types::{DocumentId, HighlightColor};
use crate::views::DEFAULT_ANCHOR_LABEL_LIMIT;

/// Ids of the host page elements the annotator attaches to.
///
/// Only the document container is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostElements {
    pub doc_id: String,
    pub list_id: String,
    pub popover_id: String,
    pub note_input_id: String,
    pub save_id: String,
    pub cancel_id: String,
    pub annotate_button_id: String,
    pub view_id: String,
    pub view_content_id: String,
    pub view_close_id: String,
    pub view_delete_id: String,
}

impl Default for HostElements {
    fn default() -> Self {
        Self {
            doc_id: "doc".to_owned(),
            list_id: "ann-list".to_owned(),
            popover_id: "ann-pop".to_owned(),
            note_input_id: "ann-text".to_owned(),
            save_id: "ann-save".to_owned(),
            cancel_id: "ann-cancel".to_owned(),
            annotate_button_id: "annotate-btn".to_owned(),
            view_id: "ann-view".to_owned(),
            view_content_id: "ann-view-content".to_owned(),
            view_close_id: "ann-view-close".to_owned(),
            view_delete_id: "ann-view-delete".to_owned(),
        }
    }
}

/// Annotator settings, as handed over by the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotatorConfig {
    /// The document whose annotations are shown.
    pub document_id: DocumentId,
    /// Whether the viewer may create annotations. Gates the selection listeners.
    pub can_annotate: bool,
    /// Base URL of the annotation service. `None` means the page origin.
    pub api_base: Option<String>,
    #[serde(flatten)]
    pub elements: HostElements,
    /// Highlight color for annotations stored without one.
    pub default_color: HighlightColor,
    /// Anchor chars shown in a list entry before the ellipsis.
    pub anchor_label_limit: usize,
    /// How long the reveal pulse stays on, in milliseconds.
    pub pulse_millis: u32,
    /// Ask before deleting.
    pub confirm_deletes: bool,
    /// Author name on optimistically created entries.
    pub author_label: String,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            document_id: DocumentId::default(),
            can_annotate: false,
            api_base: None,
            elements: HostElements::default(),
            default_color: HighlightColor::default(),
            anchor_label_limit: DEFAULT_ANCHOR_LABEL_LIMIT,
            pulse_millis: 1600,
            confirm_deletes: true,
            author_label: "you".to_owned(),
        }
    }
}

impl AnnotatorConfig {
    pub fn new(document_id: impl Into<DocumentId>) -> Self {
        Self {
            document_id: document_id.into(),
            ..Self::default()
        }
    }

    /// Check the settings that have no usable default.
    pub fn validate(&self) -> Result<(), AnnotateError> {
        if self.document_id.is_empty() {
            return Err(AnnotateError::Config("documentId is required".into()));
        }
        if self.elements.doc_id.trim().is_empty() {
            return Err(AnnotateError::Config("docId must not be empty".into()));
        }
        if self.anchor_label_limit == 0 {
            return Err(AnnotateError::Config(
                "anchorLabelLimit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Service base URL without a trailing slash, falling back to `origin`.
    pub fn api_base_or(&self, origin: &str) -> String {
        self.api_base
            .as_deref()
            .filter(|base| !base.trim().is_empty())
            .unwrap_or(origin)
            .trim_end_matches('/')
            .to_owned()
    }
}
