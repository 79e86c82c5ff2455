//! Data shapes shared by criteria, repositories and backends.

mod transaction;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

pub use transaction::{generate_ulid, TransactionHandle};

/// A write payload: field name to JSON value.
pub type Payload = Map<String, JsonValue>;

/// A record located in or returned by the backend.
///
/// Records carry the backend-assigned `id` field.
pub type Record = Payload;

/// Records returned together with the total number of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub rows: Vec<Record>,
    /// Matches before offset/limit were applied.
    pub count: u64,
}

/// Options forwarded verbatim to the backend's create primitives.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Related entities to create/return alongside the record.
    pub include: Vec<JsonValue>,
    pub transaction: Option<TransactionHandle>,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, include: JsonValue) -> Self {
        self.include.push(include);
        self
    }

    pub fn in_transaction(mut self, transaction: TransactionHandle) -> Self {
        self.transaction = Some(transaction);
        self
    }
}
