//! Save hooks invoked around repository mutations.

use std::fmt;

use async_trait::async_trait;

use crate::error::RepositoryError;
use crate::models::Record;

/// The mutation a hook is invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Create,
    BulkCreate,
    Update,
    Delete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Create => "create",
            Phase::BulkCreate => "bulkCreate",
            Phase::Update => "update",
            Phase::Delete => "delete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook receives and returns: one record or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    One(Record),
    Many(Vec<Record>),
}

impl Subject {
    /// Unwraps a single record; a batch here is a hook contract violation.
    pub(crate) fn into_one(self, phase: Phase) -> Result<Record, RepositoryError> {
        match self {
            Subject::One(record) => Ok(record),
            Subject::Many(_) => Err(RepositoryError::hook(anyhow::anyhow!(
                "{} hook returned a batch where a single record was expected",
                phase
            ))),
        }
    }

    /// Unwraps a batch; a single record here is a hook contract violation.
    pub(crate) fn into_many(self, phase: Phase) -> Result<Vec<Record>, RepositoryError> {
        match self {
            Subject::Many(records) => Ok(records),
            Subject::One(_) => Err(RepositoryError::hook(anyhow::anyhow!(
                "{} hook returned a single record where a batch was expected",
                phase
            ))),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Subject::One(_) => 1,
            Subject::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extension points around every repository mutation.
///
/// `before_save` runs after protected fields are stripped and before
/// validation; whatever it returns is what the repository validates and
/// persists (for [`Phase::Delete`], the record it returns is the one
/// destroyed). `after_save` receives the persisted result plus the payload
/// the caller sent, and its return value is handed back to the caller.
///
/// Errors are propagated to the caller as returned.
#[async_trait]
pub trait SaveHooks: Send + Sync {
    async fn before_save(
        &self,
        subject: Subject,
        phase: Phase,
    ) -> Result<Subject, RepositoryError> {
        tracing::debug!(%phase, count = subject.len(), "Before save");
        Ok(subject)
    }

    async fn after_save(
        &self,
        subject: Subject,
        phase: Phase,
        extra: Option<&Subject>,
    ) -> Result<Subject, RepositoryError> {
        tracing::debug!(
            %phase,
            count = subject.len(),
            with_payload = extra.is_some(),
            "After save"
        );
        Ok(subject)
    }
}

/// Hooks that only trace. Used when a repository is given none.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooks;

impl SaveHooks for TracingHooks {}
