//! Opaque transaction handles.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use ulid::Ulid;

/// Handle to an in-flight backend transaction.
///
/// The repository layer never inspects it; it is carried by criteria and
/// create options and forwarded to the backend, which decides what it means.
/// Clones refer to the same transaction.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TransactionHandle {
    id: Arc<str>,
}

impl TransactionHandle {
    /// Creates a handle with a freshly generated ULID.
    pub fn new() -> Self {
        Self::from_id(generate_ulid())
    }

    /// Wraps a backend-assigned transaction identifier.
    pub fn from_id(id: impl Into<Arc<str>>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Default for TransactionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TransactionHandle").field(&self.id).finish()
    }
}

impl Serialize for TransactionHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id)
    }
}

/// Generates a new ULID string.
pub fn generate_ulid() -> String {
    Ulid::new().to_string()
}
