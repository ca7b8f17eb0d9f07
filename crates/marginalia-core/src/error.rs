//! Error types for annotation operations.
//!
//! Only real failures live here. Expected races (duplicate renders, empty
//! selections, deleting something already gone) are reported as `None`,
//! `false` or an outcome enum, never as an error.

use miette::Diagnostic;

use crate::platform::PlatformError;

/// Failure talking to the annotation service.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    #[diagnostic(code(marginalia::service::http))]
    Http { status: u16, message: String },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    #[diagnostic(code(marginalia::service::transport))]
    Transport(String),

    /// The response body was not what we expected.
    #[error("could not decode response: {0}")]
    #[diagnostic(code(marginalia::service::decode))]
    Decode(String),
}

impl ServiceError {
    /// Message suitable for showing to the user.
    ///
    /// Prefers the body the server sent with an error status.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Http { status, message } => {
                let message = message.trim();
                if message.is_empty() {
                    format!("HTTP error {status}")
                } else {
                    message.to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

/// Main error type for marginalia operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum AnnotateError {
    /// Annotation service failure. Nothing was changed locally.
    #[error(transparent)]
    #[diagnostic_source]
    Service(#[from] ServiceError),

    /// The host document or a view could not be updated.
    #[error("platform error: {0}")]
    #[diagnostic(code(marginalia::platform))]
    Platform(#[from] PlatformError),

    /// A required host element is not on the page.
    #[error("required element #{0} not found")]
    #[diagnostic(
        code(marginalia::missing_host),
        help("annotations are disabled on this page")
    )]
    MissingHost(String),

    /// A stored range that cannot denote any text.
    #[error("invalid range {start}..{end}")]
    #[diagnostic(code(marginalia::invalid_range))]
    InvalidRange { start: usize, end: usize },

    /// Bad or incomplete configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(marginalia::config))]
    Config(String),
}

impl AnnotateError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AnnotateError::Service(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}
