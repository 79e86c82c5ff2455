//! In-process reference backend.
//!
//! Keeps records in memory and executes descriptors with a deliberately small
//! feature set:
//!
//! - `where`: scalar values match by equality, arrays match membership
//! - `attributes`: `["a", "b"]`, `{"include": [...]}` or `{"exclude": [...]}`
//! - `order`, `offset`, `limit`
//!
//! Includes are ignored and grouping is rejected. Transactions are accepted
//! but provide no isolation. Useful for tests, fixtures and the CLI.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::backend::{BackendError, ModelHandle, ModelRegistry};
use crate::criteria::{Direction, OrderBy, QueryDescriptor};
use crate::error::FieldError;
use crate::models::{generate_ulid, CreateOptions, Page, Payload, Record, TransactionHandle};

/// One in-memory model table.
pub struct MemoryModel {
    name: String,
    unique: Vec<String>,
    records: RwLock<Vec<Record>>,
}

impl MemoryModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: Vec::new(),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Seeds the table with records stored as given.
    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = RwLock::new(records);
        self
    }

    /// Enforces uniqueness of `field` on insert and save.
    pub fn unique(mut self, field: impl Into<String>) -> Self {
        self.unique.push(field.into());
        self
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn select(&self, records: &[Record], query: &QueryDescriptor) -> Result<Vec<Record>, BackendError> {
        if query.group.is_some() {
            return Err(BackendError::new(format!(
                "grouping is not supported by the memory store ({})",
                self.name
            )));
        }
        if let Some(include) = &query.include {
            tracing::trace!(model = %self.name, count = include.len(), "Ignoring includes");
        }

        let mut matched = Vec::new();
        for record in records {
            if matches(record, query)? {
                matched.push(record.clone());
            }
        }

        if let Some(order) = &query.order {
            matched.sort_by(|a, b| compare_records(a, b, order));
        }
        Ok(matched)
    }

    /// Applies offset, limit and projection to matched records.
    fn window(&self, matched: Vec<Record>, query: &QueryDescriptor) -> Result<Vec<Record>, BackendError> {
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|record| self.project(record, query))
            .collect()
    }

    fn project(&self, record: Record, query: &QueryDescriptor) -> Result<Record, BackendError> {
        match &query.attributes {
            None => Ok(record),
            Some(attributes) => project(record, attributes),
        }
    }

    fn check_unique(
        &self,
        records: &[Record],
        candidate: &Record,
        ignore_id: Option<&JsonValue>,
    ) -> Result<(), BackendError> {
        for field in &self.unique {
            let Some(value) = candidate.get(field) else {
                continue;
            };
            let clash = records.iter().any(|existing| {
                existing.get(field) == Some(value)
                    && (ignore_id.is_none() || existing.get("id") != ignore_id)
            });
            if clash {
                return Err(BackendError::new("Validation error")
                    .with_driver_message(format!("Duplicate entry {} for key '{}'", value, field))
                    .with_field_error(
                        FieldError::new(field.clone(), format!("{} must be unique", field))
                            .with_kind("unique"),
                    ));
            }
        }
        Ok(())
    }

    fn stamp_new(&self, mut payload: Payload) -> Record {
        let now = JsonValue::String(Utc::now().to_rfc3339());
        payload
            .entry("id")
            .or_insert_with(|| JsonValue::String(generate_ulid()));
        payload.insert("createdAt".to_string(), now.clone());
        payload.insert("updatedAt".to_string(), now);
        payload
    }
}

#[async_trait]
impl ModelHandle for MemoryModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn find_all(&self, query: &QueryDescriptor) -> Result<Vec<Record>, BackendError> {
        let records = self.records.read().await;
        let matched = self.select(&records, query)?;
        self.window(matched, query)
    }

    async fn find_one(&self, query: &QueryDescriptor) -> Result<Option<Record>, BackendError> {
        let records = self.records.read().await;
        let offset = query.offset.unwrap_or(0) as usize;

        self.select(&records, query)?
            .into_iter()
            .nth(offset)
            .map(|record| self.project(record, query))
            .transpose()
    }

    async fn find_and_count_all(&self, query: &QueryDescriptor) -> Result<Page, BackendError> {
        let records = self.records.read().await;
        let matched = self.select(&records, query)?;
        let count = matched.len() as u64;
        let rows = self.window(matched, query)?;
        Ok(Page { rows, count })
    }

    async fn create(
        &self,
        payload: Payload,
        options: &CreateOptions,
    ) -> Result<Record, BackendError> {
        log_transaction(&self.name, "create", options.transaction.as_ref());
        let mut records = self.records.write().await;
        let record = self.stamp_new(payload);
        self.check_unique(&records, &record, None)?;
        records.push(record.clone());
        Ok(record)
    }

    async fn bulk_create(
        &self,
        payloads: Vec<Payload>,
        options: &CreateOptions,
    ) -> Result<Vec<Record>, BackendError> {
        log_transaction(&self.name, "bulk_create", options.transaction.as_ref());
        let mut records = self.records.write().await;

        // Validate the whole batch before inserting anything.
        let mut staged: Vec<Record> = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let record = self.stamp_new(payload);
            self.check_unique(&records, &record, None)?;
            self.check_unique(&staged, &record, None)?;
            staged.push(record);
        }

        records.extend(staged.iter().cloned());
        Ok(staged)
    }

    async fn save(
        &self,
        record: Record,
        transaction: Option<&TransactionHandle>,
    ) -> Result<Record, BackendError> {
        log_transaction(&self.name, "save", transaction);
        let id = record
            .get("id")
            .cloned()
            .ok_or_else(|| BackendError::new("cannot save a record without an id"))?;

        let mut records = self.records.write().await;
        let position = records
            .iter()
            .position(|existing| existing.get("id") == Some(&id))
            .ok_or_else(|| BackendError::new(format!("record {} no longer exists", id)))?;

        // Only the given keys are written; fields left out of a projected
        // record keep their stored values.
        let mut stored = records[position].clone();
        stored.extend(record);
        stored.insert(
            "updatedAt".to_string(),
            JsonValue::String(Utc::now().to_rfc3339()),
        );
        self.check_unique(&records, &stored, Some(&id))?;

        records[position] = stored.clone();
        Ok(stored)
    }

    async fn destroy(
        &self,
        record: &Record,
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), BackendError> {
        log_transaction(&self.name, "destroy", transaction);
        let id = record
            .get("id")
            .ok_or_else(|| BackendError::new("cannot destroy a record without an id"))?;

        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|existing| existing.get("id") != Some(id));

        if records.len() == before {
            return Err(BackendError::new(format!("record {} no longer exists", id)));
        }
        Ok(())
    }
}

/// Builds a model registry from a fixture document.
///
/// The document maps model names to arrays of records:
///
/// ```json
/// {"User": [{"id": "1", "name": "Ann"}], "Post": []}
/// ```
pub fn registry_from_fixtures(fixtures: &JsonValue) -> Result<ModelRegistry, BackendError> {
    let models = fixtures
        .as_object()
        .ok_or_else(|| BackendError::new("fixtures must be an object of model name to records"))?;

    let mut registry = ModelRegistry::new();
    for (name, rows) in models {
        let rows = rows
            .as_array()
            .ok_or_else(|| BackendError::new(format!("fixtures for '{}' must be an array", name)))?;

        let records = rows
            .iter()
            .map(|row| {
                row.as_object().cloned().ok_or_else(|| {
                    BackendError::new(format!("fixture rows for '{}' must be objects", name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        registry = registry.register(MemoryModel::new(name.clone()).with_records(records));
    }
    Ok(registry)
}

// -----------------------------------------------------------------------------
// Descriptor evaluation
// -----------------------------------------------------------------------------

fn log_transaction(model: &str, operation: &str, transaction: Option<&TransactionHandle>) {
    if let Some(tx) = transaction {
        tracing::trace!(model, operation, transaction = tx.id(), "Memory store in transaction");
    }
}

fn matches(record: &Record, query: &QueryDescriptor) -> Result<bool, BackendError> {
    let Some(conditions) = &query.where_ else {
        return Ok(true);
    };

    for (field, condition) in conditions {
        let value = record.get(field).unwrap_or(&JsonValue::Null);
        let hit = match condition {
            JsonValue::Object(_) => {
                return Err(BackendError::new(format!(
                    "operator conditions on '{}' are not supported by the memory store",
                    field
                )))
            }
            JsonValue::Array(options) => options.contains(value),
            scalar => value == scalar,
        };
        if !hit {
            return Ok(false);
        }
    }
    Ok(true)
}

fn project(record: Record, attributes: &JsonValue) -> Result<Record, BackendError> {
    let names = |value: &JsonValue| -> Result<Vec<String>, BackendError> {
        value
            .as_array()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .ok_or_else(|| BackendError::new("attribute lists must be arrays of field names"))
    };

    match attributes {
        JsonValue::Array(_) => {
            let keep = names(attributes)?;
            Ok(record.into_iter().filter(|(k, _)| keep.contains(k)).collect())
        }
        JsonValue::Object(rules) => {
            let mut record = record;
            if let Some(include) = rules.get("include") {
                let keep = names(include)?;
                record.retain(|k, _| keep.contains(k));
            }
            if let Some(exclude) = rules.get("exclude") {
                let drop = names(exclude)?;
                record.retain(|k, _| !drop.contains(k));
            }
            Ok(record)
        }
        _ => Err(BackendError::new("unsupported attributes descriptor")),
    }
}

fn compare_records(a: &Record, b: &Record, order: &[OrderBy]) -> Ordering {
    for key in order {
        let left = a.get(&key.field).unwrap_or(&JsonValue::Null);
        let right = b.get(&key.field).unwrap_or(&JsonValue::Null);
        let ordering = compare_values(left, right);
        let ordering = match key.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => Ordering::Equal,
        (JsonValue::Null, _) => Ordering::Less,
        (_, JsonValue::Null) => Ordering::Greater,
        (JsonValue::Number(x), JsonValue::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
