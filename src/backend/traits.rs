//! Core traits for storage backend abstraction.
//!
//! A storage backend exposes one [`ModelHandle`] per entity type. The
//! repository layer only ever talks to backends through this trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::criteria::QueryDescriptor;
use crate::error::{ErrorDetail, FieldError};
use crate::models::{CreateOptions, Page, Payload, Record, TransactionHandle};

/// A failure reported by a storage backend.
///
/// Backends fill in whatever they know. The top-level `message` is always
/// present; drivers may add a lower-level message, field errors, or a fully
/// structured detail list.
#[derive(Debug, Clone, Default, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    /// Message reported by the underlying database driver.
    pub driver_message: Option<String>,
    /// Field-level validation errors.
    pub field_errors: Vec<FieldError>,
    /// Structured details, adopted as-is when present.
    pub details: Option<Vec<ErrorDetail>>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_driver_message(mut self, message: impl Into<String>) -> Self {
        self.driver_message = Some(message.into());
        self
    }

    pub fn with_field_error(mut self, error: FieldError) -> Self {
        self.field_errors.push(error);
        self
    }

    pub fn with_details(mut self, details: Vec<ErrorDetail>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Executes compiled queries and mutations for one entity type.
///
/// Cancellation and timeouts are the implementor's concern; they should
/// surface as a [`BackendError`] like any other failure.
#[async_trait]
pub trait ModelHandle: Send + Sync {
    /// Name of the model this handle serves.
    fn model_name(&self) -> &str;

    /// Returns every record matching the descriptor.
    async fn find_all(&self, query: &QueryDescriptor) -> Result<Vec<Record>, BackendError>;

    /// Returns the first matching record, if any.
    async fn find_one(&self, query: &QueryDescriptor) -> Result<Option<Record>, BackendError>;

    /// Returns the matching records within offset/limit, plus the total count.
    async fn find_and_count_all(&self, query: &QueryDescriptor) -> Result<Page, BackendError>;

    /// Persists a new record and returns it as stored.
    async fn create(&self, payload: Payload, options: &CreateOptions)
        -> Result<Record, BackendError>;

    /// Persists several records in one call, preserving order.
    async fn bulk_create(
        &self,
        payloads: Vec<Payload>,
        options: &CreateOptions,
    ) -> Result<Vec<Record>, BackendError>;

    /// Writes a located record back, identified by its `id`.
    ///
    /// Only the keys present in `record` are written; the located record may
    /// be a projection of the stored row. Returns the full stored row.
    async fn save(
        &self,
        record: Record,
        transaction: Option<&TransactionHandle>,
    ) -> Result<Record, BackendError>;

    /// Removes a located record, identified by its `id`.
    async fn destroy(
        &self,
        record: &Record,
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), BackendError>;
}
