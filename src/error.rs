//! Error types for the template renderer
//!
//! Structural problems with the document (no pages, bad page keys, unknown
//! orientations) are fatal and surface as [`RendererError`]. Everything that
//! goes wrong inside a single element is recorded as a [`Diagnostic`] and
//! drawn as a marker on the page instead.

use serde::Serialize;
use thiserror::Error;

use crate::provider::ProviderError;

/// Custom error type for renderer operations
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("Document has no pages")]
    DocumentEmpty,

    #[error("Invalid page key '{0}': expected a positive integer")]
    InvalidPageKey(String),

    #[error("Page {page}: invalid orientation '{value}'")]
    InvalidOrientation { page: u32, value: String },

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid value for field '{0}': {1}")]
    InvalidValue(String, String),
}

/// Result type alias for renderer operations
pub type RendererResult<T> = Result<T, RendererError>;

/// Helper to convert serde_json errors
impl From<serde_json::Error> for RendererError {
    fn from(err: serde_json::Error) -> Self {
        RendererError::JsonError(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<RendererError> for pyo3::PyErr {
    fn from(err: RendererError) -> Self {
        pyo3::PyErr::new::<pyo3::exceptions::PyValueError, _>(err.to_string())
    }
}

/// What went wrong with an element that was rendered in degraded form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ImageNotFound,
    ImageInvalid,
    ProviderNotFound,
    ProviderError,
    TableTruncated,
    ElementFailed,
    UnknownElement,
}

/// A non-fatal problem found while rendering one element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub page: u32,
    pub element: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn from_provider_error(page: u32, element: &str, err: &ProviderError) -> Self {
        let kind = match err {
            ProviderError::NotFound(_) => DiagnosticKind::ProviderNotFound,
            ProviderError::Failed { .. } => DiagnosticKind::ProviderError,
        };
        Self {
            page,
            element: element.to_string(),
            kind,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {} / {}: {}", self.page, self.element, self.message)
    }
}
