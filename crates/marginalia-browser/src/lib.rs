//! Browser DOM layer for marginalia text annotations.
//!
//! This crate implements the `marginalia-core` host traits over web-sys and
//! wires page events to the core controller. It assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `surface`: the `#doc` container, highlight marks and UTF-16 conversion
//! - `selection`: live selection to raw text positions
//! - `views`: sidebar list, detail popup and create popover
//! - `service`: the JSON annotation service over reqwest
//! - `events`: page listeners and the dispatcher loop
//! - `annotator`: mounting everything on a page
//! - `bindings`: the `mountAnnotator` JS entry point
//!
//! # Re-exports
//!
//! This crate re-exports `marginalia-core` for convenience, so consumers
//! only need to depend on `marginalia-browser`.

// Re-export core crate
pub use marginalia_core;
pub use marginalia_core::*;

pub mod annotator;
pub mod bindings;
pub mod events;
pub mod selection;
pub mod service;
pub mod surface;
pub mod views;

pub use annotator::{Annotator, BrowserController, BrowserSession, UPDATED_EVENT};
pub use bindings::{AnnotatorHandle, mount_annotator};
pub use events::{UiEvent, list_click};
pub use selection::read_selection;
pub use service::HttpAnnotationService;
pub use surface::{BrowserSurface, char_to_utf16_offset, highlight_at, utf16_to_char_offset};
pub use views::{DomDetail, DomList, DomPopover};
