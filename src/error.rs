//! Repository error types.
//!
//! Every failure surfaced by a [`Repository`](crate::repository::Repository)
//! is a [`RepositoryError`]. Storage and validation failures carry a
//! [`RepositoryException`], which labels the message with the owning model
//! and keeps a normalized list of [`ErrorDetail`] records.

use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;

// =============================================================================
// Error Details
// =============================================================================

/// A field-level validation error reported by a backend or a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field (or dotted path) the error refers to.
    pub field: String,
    /// Human-readable description.
    pub message: String,
    /// Machine-readable error kind (e.g. `"required"`, `"unique"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// One structured detail record attached to a [`RepositoryException`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            errors: Vec::new(),
        }
    }

    /// Normalizes a backend failure into a detail list.
    ///
    /// A structured detail list supplied by the backend is adopted unchanged.
    /// Otherwise a single entry is synthesized from the driver-level message
    /// (falling back to the top-level message) and the field errors.
    pub fn extract(error: &BackendError) -> Vec<ErrorDetail> {
        if let Some(details) = &error.details {
            return details.clone();
        }

        let message = error
            .driver_message
            .as_deref()
            .unwrap_or(&error.message)
            .to_string();

        vec![ErrorDetail {
            message: Some(message),
            errors: error.field_errors.clone(),
        }]
    }
}

// =============================================================================
// Repository Exception
// =============================================================================

/// A failure labelled with the name of the model it happened on.
///
/// Displays as `"[Model] message"`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[{model}] {message}")]
pub struct RepositoryException {
    model: String,
    message: String,
    details: Vec<ErrorDetail>,
}

impl RepositoryException {
    /// Creates an exception with no details.
    pub fn new(message: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Creates an exception from a backend failure, extracting its details.
    pub fn from_backend(
        message: impl Into<String>,
        model: impl Into<String>,
        error: &BackendError,
    ) -> Self {
        Self {
            model: model.into(),
            message: message.into(),
            details: ErrorDetail::extract(error),
        }
    }

    /// Creates an exception with an explicit detail list.
    pub fn with_details(
        message: impl Into<String>,
        model: impl Into<String>,
        details: Vec<ErrorDetail>,
    ) -> Self {
        Self {
            model: model.into(),
            message: message.into(),
            details,
        }
    }

    /// The display message, prefixed with the model name.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }
}

// =============================================================================
// Repository Error
// =============================================================================

/// Errors returned by repositories and the registry.
#[derive(Error, Debug)]
pub enum RepositoryError {
    // Storage errors
    #[error(transparent)]
    Backend(RepositoryException),

    #[error(transparent)]
    Validation(RepositoryException),

    #[error("[{model}] no record matches the given criteria")]
    NotFound { model: String },

    // Wiring errors
    #[error("Model '{0}' is not registered with the storage backend")]
    UnknownModel(String),

    #[error("Repository '{0}' is not registered")]
    UnknownRepository(String),

    #[error("Store error: {0}")]
    Store(String),

    // Input errors
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(#[from] serde_json::Error),

    // Extension errors, propagated as raised
    #[error(transparent)]
    Hook(anyhow::Error),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl RepositoryError {
    /// Wraps a backend failure for the given model.
    pub fn backend(model: &str, error: &BackendError) -> Self {
        tracing::warn!(model, error = %error, "Backend operation failed");
        Self::Backend(RepositoryException::from_backend(
            error.message.clone(),
            model,
            error,
        ))
    }

    /// Wraps a hook failure without altering it.
    pub fn hook(error: impl Into<anyhow::Error>) -> Self {
        Self::Hook(error.into())
    }

    /// The model-labelled exception, for backend and validation failures.
    pub fn exception(&self) -> Option<&RepositoryException> {
        match self {
            Self::Backend(e) | Self::Validation(e) => Some(e),
            _ => None,
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "BACKEND_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::UnknownModel(_) => "UNKNOWN_MODEL",
            Self::UnknownRepository(_) => "UNKNOWN_REPOSITORY",
            Self::Store(_) => "STORE_ERROR",
            Self::InvalidCriteria(_) => "INVALID_CRITERIA",
            Self::Hook(_) => "HOOK_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
