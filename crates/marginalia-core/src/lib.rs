//! marginalia-core: text annotation logic without DOM dependencies.
//!
//! This crate provides:
//! - `Normalizer` - whitespace-collapsing offset arithmetic
//! - `NormalizedLayout` - raw (node, offset) <-> normalized offset mapping
//! - `DocumentSurface` and view traits the host implements
//! - Highlight rendering, the registry and the interaction `Controller`
//! - `AnnotationSession` - async load/save/delete over an `AnnotationService`
//! - `MemoryDocument` - an in-memory host for headless use and tests

pub mod config;
pub mod controller;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod offset_map;
pub mod platform;
pub mod registry;
pub mod render;
pub mod service;
pub mod session;
pub mod types;
pub mod views;

pub use config::{AnnotatorConfig, HostElements};
pub use controller::{CreateState, Controller, LoadSummary, LoadTicket, PendingDelete, PendingSave};
pub use error::{AnnotateError, ServiceError};
pub use memory::{MemoryDetail, MemoryDocument, MemoryList, MemoryPopover, NodeId};
pub use normalize::{Normalizer, document_len, is_collapsible_whitespace, normalize};
pub use offset_map::{
    NormalizedLayout, NormalizedSelection, RawPosition, RawRange, RawSelection, TextFragment,
    normalized_range_to_raw, selection_to_normalized_range,
};
pub use platform::{
    CreatePopover, DetailView, DocumentSurface, HighlightMark, ListView, PlatformError,
};
pub use registry::{Registry, RegistryEvent};
pub use render::{
    HighlightRequest, RenderOutcome, SkipReason, cleanup_duplicate_spans, remove_highlights,
    render_highlight,
};
pub use service::AnnotationService;
pub use session::AnnotationSession;
pub use smol_str::SmolStr;
pub use types::{
    Affinity, Annotation, AnnotationId, Comment, CreatedAnnotation, DocumentId, Draft,
    HighlightColor, NewAnnotation, NormalizedRange,
};
pub use views::{DetailContent, ListEntry, ListEntrySnapshot};
