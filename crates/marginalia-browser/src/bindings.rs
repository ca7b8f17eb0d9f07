//! JS entry point.
//!
//! ```js
//! import init, { mountAnnotator } from "./marginalia_browser.js";
//! await init();
//! const handle = mountAnnotator({ documentId: "12", canAnnotate: true });
//! ```

use std::sync::Once;

use marginalia_core::{AnnotateError, AnnotatorConfig};
use serde::Deserialize;
use serde_wasm_bindgen::Deserializer;
use wasm_bindgen::prelude::*;

use crate::annotator::Annotator;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        use tracing::Level;
        use tracing::subscriber::set_global_default;
        use tracing_subscriber::Registry;
        use tracing_subscriber::layer::SubscriberExt;

        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };
        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );
        // The host page may already have installed a subscriber.
        let _ = set_global_default(Registry::default().with(wasm_layer));
    });
}

/// Handle to a mounted annotator.
#[wasm_bindgen]
pub struct AnnotatorHandle {
    inner: Option<Annotator>,
}

#[wasm_bindgen]
impl AnnotatorHandle {
    /// Detach all listeners. Highlights already drawn stay on the page.
    pub fn unmount(&mut self) {
        self.inner.take();
    }

    #[wasm_bindgen(getter)]
    pub fn mounted(&self) -> bool {
        self.inner.is_some()
    }
}

/// Mount the annotator described by `config`.
///
/// Returns `undefined` when the page has no document container.
#[wasm_bindgen(js_name = mountAnnotator)]
pub fn mount_annotator(config: JsValue) -> Result<Option<AnnotatorHandle>, JsError> {
    console_error_panic_hook::set_once();
    init_tracing();

    let config = AnnotatorConfig::deserialize(Deserializer::from(config))
        .map_err(|e| JsError::new(&format!("Invalid annotator config: {}", e)))?;

    match Annotator::mount(config) {
        Ok(annotator) => Ok(Some(AnnotatorHandle {
            inner: Some(annotator),
        })),
        Err(AnnotateError::MissingHost(id)) => {
            tracing::warn!(target: "marginalia::annotator", element = %id, "no document container, annotations disabled");
            Ok(None)
        }
        Err(err) => Err(JsError::new(&err.to_string())),
    }
}
