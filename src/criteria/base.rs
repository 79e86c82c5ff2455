//! The criteria contract and the general-purpose criteria builder.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::models::TransactionHandle;

/// Field to condition mapping. Conditions are opaque to this crate.
pub type Conditions = Map<String, JsonValue>;

/// Sort direction of an [`OrderBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

/// A `(field, direction)` sort spec.
///
/// Serializes as a two-element array: `["createdAt", "DESC"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, Direction)", into = "(String, Direction)")]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

impl From<(String, Direction)> for OrderBy {
    fn from((field, direction): (String, Direction)) -> Self {
        Self { field, direction }
    }
}

impl From<OrderBy> for (String, Direction) {
    fn from(order: OrderBy) -> Self {
        (order.field, order.direction)
    }
}

/// A declarative description of a query.
///
/// Implementors expose what they filter, project, include, order and group
/// by. Every accessor has an empty default, so a criteria type only overrides
/// what it actually constrains:
///
/// ```ignore
/// struct PublishedPosts;
///
/// impl Criteria for PublishedPosts {
///     fn build_where(&self) -> Option<Conditions> {
///         let mut conditions = Conditions::new();
///         conditions.insert("status".into(), json!("published"));
///         Some(conditions)
///     }
///
///     fn build_order(&self) -> Vec<OrderBy> {
///         vec![OrderBy::desc("publishedAt")]
///     }
/// }
/// ```
///
/// Accessors are read-only; [`compile`](super::compile) never mutates the
/// criteria it reads.
pub trait Criteria: Send + Sync {
    /// Filter conditions.
    fn build_where(&self) -> Option<Conditions> {
        None
    }

    /// Projection descriptor (included/excluded fields).
    fn build_attributes(&self) -> Option<JsonValue> {
        None
    }

    /// Related-entity include specs, in order.
    fn build_include(&self) -> Vec<JsonValue> {
        Vec::new()
    }

    fn build_order(&self) -> Vec<OrderBy> {
        Vec::new()
    }

    fn build_group(&self) -> Vec<String> {
        Vec::new()
    }

    /// Transaction the query should run in.
    fn transaction(&self) -> Option<&TransactionHandle> {
        None
    }

    /// Whether the limit applies inside sub-queries. Compiled default: `false`.
    fn sub_query(&self) -> Option<bool> {
        None
    }

    /// Whether counts only consider distinct rows. Compiled default: `true`.
    fn distinct(&self) -> Option<bool> {
        None
    }
}

/// General-purpose criteria assembled with a fluent builder.
///
/// # Example
///
/// ```ignore
/// let criteria = QueryCriteria::new()
///     .filter("status", "active")
///     .order_by(OrderBy::desc("createdAt"))
///     .include(json!({"model": "Profile"}));
///
/// let users = repository.all(Some(&criteria)).await?;
/// ```
///
/// Deserializes from the same shape the compiler produces, which lets a
/// criteria be read from JSON:
///
/// ```json
/// {"where": {"status": "active"}, "order": [["createdAt", "DESC"]]}
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct QueryCriteria {
    #[serde(rename = "where")]
    where_: Option<Conditions>,
    attributes: Option<JsonValue>,
    include: Vec<JsonValue>,
    order: Vec<OrderBy>,
    group: Vec<String>,
    #[serde(skip)]
    transaction: Option<TransactionHandle>,
    sub_query: Option<bool>,
    distinct: Option<bool>,
}

impl QueryCriteria {
    /// Creates a criteria that constrains nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition on `field`, replacing any previous condition on it.
    pub fn filter(mut self, field: impl Into<String>, condition: impl Into<JsonValue>) -> Self {
        self.where_
            .get_or_insert_with(Conditions::new)
            .insert(field.into(), condition.into());
        self
    }

    /// Replaces the whole condition map.
    pub fn where_clause(mut self, conditions: Conditions) -> Self {
        self.where_ = Some(conditions);
        self
    }

    pub fn attributes(mut self, attributes: JsonValue) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn include(mut self, include: JsonValue) -> Self {
        self.include.push(include);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group.push(field.into());
        self
    }

    pub fn in_transaction(mut self, transaction: TransactionHandle) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn with_sub_query(mut self, sub_query: bool) -> Self {
        self.sub_query = Some(sub_query);
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = Some(distinct);
        self
    }
}

impl Criteria for QueryCriteria {
    fn build_where(&self) -> Option<Conditions> {
        self.where_.clone()
    }

    fn build_attributes(&self) -> Option<JsonValue> {
        self.attributes.clone()
    }

    fn build_include(&self) -> Vec<JsonValue> {
        self.include.clone()
    }

    fn build_order(&self) -> Vec<OrderBy> {
        self.order.clone()
    }

    fn build_group(&self) -> Vec<String> {
        self.group.clone()
    }

    fn transaction(&self) -> Option<&TransactionHandle> {
        self.transaction.as_ref()
    }

    fn sub_query(&self) -> Option<bool> {
        self.sub_query
    }

    fn distinct(&self) -> Option<bool> {
        self.distinct
    }
}
