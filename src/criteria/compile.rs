//! Compilation of criteria into backend-neutral query descriptors.

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::base::{Conditions, Criteria, OrderBy};
use crate::models::TransactionHandle;

/// Page size used when a caller gives none.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// A normalized query, ready for a backend to execute.
///
/// A key is present only when it carries a value; sequence keys are also
/// dropped when empty. `subQuery` and `distinct` are present on every
/// descriptor compiled from a criteria, and absent from the empty descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<Conditions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<OrderBy>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_query: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl QueryDescriptor {
    /// Returns true if no key is present.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges offset and limit for the given page into the descriptor.
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.offset = Some(pagination.offset());
        self.limit = Some(pagination.page_size);
        self
    }
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    /// Resolves a page request; `None` and `0` fall back to page 1 and
    /// [`DEFAULT_PAGE_SIZE`].
    pub fn new(page: Option<u64>, page_size: Option<u64>) -> Self {
        Self::with_default_size(page, page_size, DEFAULT_PAGE_SIZE)
    }

    /// Like [`new`](Self::new) with a custom fallback page size.
    pub fn with_default_size(page: Option<u64>, page_size: Option<u64>, default_size: u64) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            page_size: page_size
                .filter(|s| *s > 0)
                .unwrap_or_else(|| default_size.max(1)),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Compiles a criteria into a query descriptor.
///
/// An absent criteria compiles to the empty descriptor. Absent `where`,
/// `attributes` and `transaction` values are dropped, as are empty `include`,
/// `order` and `group` lists. `subQuery` defaults to `false` and `distinct`
/// to `true`.
pub fn compile(criteria: Option<&dyn Criteria>) -> QueryDescriptor {
    let Some(criteria) = criteria else {
        return QueryDescriptor::default();
    };

    QueryDescriptor {
        where_: criteria.build_where(),
        attributes: criteria.build_attributes(),
        include: non_empty(criteria.build_include()),
        order: non_empty(criteria.build_order()),
        group: non_empty(criteria.build_group()),
        transaction: criteria.transaction().cloned(),
        sub_query: Some(criteria.sub_query().unwrap_or(false)),
        distinct: Some(criteria.distinct().unwrap_or(true)),
        offset: None,
        limit: None,
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
