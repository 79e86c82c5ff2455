//! Criteria matching a single record by identifier.

use serde_json::Value as JsonValue;

use super::base::{Conditions, Criteria};
use crate::models::TransactionHandle;

/// Filters by `id` equality, optionally inside a transaction.
///
/// Used by every by-id convenience operation of the repository.
#[derive(Debug, Clone)]
pub struct IdentityCriteria {
    id: JsonValue,
    transaction: Option<TransactionHandle>,
}

impl IdentityCriteria {
    pub fn new(id: impl Into<JsonValue>) -> Self {
        Self {
            id: id.into(),
            transaction: None,
        }
    }

    pub fn with_transaction(id: impl Into<JsonValue>, transaction: Option<TransactionHandle>) -> Self {
        Self {
            id: id.into(),
            transaction,
        }
    }

    pub fn id(&self) -> &JsonValue {
        &self.id
    }
}

impl Criteria for IdentityCriteria {
    fn build_where(&self) -> Option<Conditions> {
        let mut conditions = Conditions::new();
        conditions.insert("id".to_string(), self.id.clone());
        Some(conditions)
    }

    fn transaction(&self) -> Option<&TransactionHandle> {
        self.transaction.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_where_is_exactly_the_id() {
        let criteria = IdentityCriteria::new("42");
        let expected = json!({"id": "42"});
        assert_eq!(JsonValue::Object(criteria.build_where().unwrap()), expected);
    }

    #[test]
    fn test_numeric_id() {
        let criteria = IdentityCriteria::new(42);
        assert_eq!(criteria.build_where().unwrap()["id"], json!(42));
    }

    #[test]
    fn test_carries_transaction() {
        let tx = TransactionHandle::from_id("tx-7");
        let criteria = IdentityCriteria::with_transaction("42", Some(tx.clone()));
        assert_eq!(criteria.transaction(), Some(&tx));
        assert!(IdentityCriteria::new("42").transaction().is_none());
    }
}
