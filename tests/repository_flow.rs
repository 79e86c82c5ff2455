//! Repository orchestration against a recording backend.
//!
//! The recording handle captures every call so tests can assert exactly what
//! reached the backend: payloads after field protection and hooks, compiled
//! descriptors, and forwarded transactions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use quarry::backend::{BackendError, ModelHandle, ModelRegistry};
use quarry::criteria::{IdentityCriteria, QueryCriteria, QueryDescriptor};
use quarry::error::{FieldError, RepositoryError};
use quarry::models::{CreateOptions, Page, Payload, Record, TransactionHandle};
use quarry::repository::{
    FieldKind, Phase, Repository, RepositoryDefinition, RepositoryRegistry, SaveHooks, Schema,
    Subject,
};

// =============================================================================
// Recording backend
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    FindAll(QueryDescriptor),
    FindOne(QueryDescriptor),
    FindAndCountAll(QueryDescriptor),
    Create(Payload, Option<String>),
    BulkCreate(Vec<Payload>, Option<String>),
    Save(Record, Option<String>),
    Destroy(Record, Option<String>),
}

#[derive(Default)]
struct RecordingModel {
    records: Mutex<Vec<Record>>,
    calls: Mutex<Vec<Call>>,
    failure: Option<BackendError>,
}

impl RecordingModel {
    fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    fn failing(error: BackendError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| {
                !matches!(
                    call,
                    Call::FindAll(_) | Call::FindOne(_) | Call::FindAndCountAll(_)
                )
            })
            .collect()
    }

    fn log(&self, call: Call) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn matching(&self, query: &QueryDescriptor) -> Vec<Record> {
        let conditions = query.where_.clone().unwrap_or_default();
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| conditions.iter().all(|(k, v)| record.get(k) == Some(v)))
            .cloned()
            .collect()
    }
}

fn tx_id(transaction: Option<&TransactionHandle>) -> Option<String> {
    transaction.map(|t| t.id().to_string())
}

#[async_trait]
impl ModelHandle for RecordingModel {
    fn model_name(&self) -> &str {
        "User"
    }

    async fn find_all(&self, query: &QueryDescriptor) -> Result<Vec<Record>, BackendError> {
        self.log(Call::FindAll(query.clone()))?;
        Ok(self.matching(query))
    }

    async fn find_one(&self, query: &QueryDescriptor) -> Result<Option<Record>, BackendError> {
        self.log(Call::FindOne(query.clone()))?;
        Ok(self.matching(query).into_iter().next())
    }

    async fn find_and_count_all(&self, query: &QueryDescriptor) -> Result<Page, BackendError> {
        self.log(Call::FindAndCountAll(query.clone()))?;
        let rows = self.matching(query);
        Ok(Page {
            count: rows.len() as u64,
            rows,
        })
    }

    async fn create(
        &self,
        payload: Payload,
        options: &CreateOptions,
    ) -> Result<Record, BackendError> {
        self.log(Call::Create(payload.clone(), tx_id(options.transaction.as_ref())))?;
        let mut record = payload;
        record.insert("id".into(), json!("generated"));
        Ok(record)
    }

    async fn bulk_create(
        &self,
        payloads: Vec<Payload>,
        options: &CreateOptions,
    ) -> Result<Vec<Record>, BackendError> {
        self.log(Call::BulkCreate(
            payloads.clone(),
            tx_id(options.transaction.as_ref()),
        ))?;
        Ok(payloads)
    }

    async fn save(
        &self,
        record: Record,
        transaction: Option<&TransactionHandle>,
    ) -> Result<Record, BackendError> {
        self.log(Call::Save(record.clone(), tx_id(transaction)))?;
        Ok(record)
    }

    async fn destroy(
        &self,
        record: &Record,
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), BackendError> {
        self.log(Call::Destroy(record.clone(), tx_id(transaction)))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn payload(value: JsonValue) -> Payload {
    value.as_object().cloned().unwrap()
}

fn repository(model: RecordingModel) -> (Arc<RecordingModel>, Repository) {
    let model = Arc::new(model);
    let mut models = ModelRegistry::new();
    models.insert(model.clone());
    let repository = Repository::new(&models, "User").unwrap();
    (model, repository)
}

fn ann() -> Record {
    payload(json!({
        "id": "u1",
        "name": "Ann",
        "email": "ann@example.com",
        "createdAt": "2024-01-01T00:00:00Z"
    }))
}

fn user_schema(create_mode: bool) -> Schema {
    let schema = Schema::new()
        .required("name", FieldKind::String)
        .optional("age", FieldKind::Integer);
    if create_mode {
        schema.required("email", FieldKind::String)
    } else {
        schema.optional("email", FieldKind::String)
    }
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_pagination_defaults_to_first_page_of_ten() {
    let (model, users) = repository(RecordingModel::default());

    users.all_paginated(None, None, None).await.unwrap();
    users.all_paginated(None, Some(3), Some(5)).await.unwrap();
    users.all_paginated(None, Some(0), Some(0)).await.unwrap();

    let windows: Vec<_> = model
        .calls()
        .into_iter()
        .map(|call| match call {
            Call::FindAndCountAll(query) => (query.offset, query.limit),
            other => panic!("unexpected call {:?}", other),
        })
        .collect();

    assert_eq!(
        windows,
        vec![(Some(0), Some(10)), (Some(10), Some(5)), (Some(0), Some(10))]
    );
}

#[tokio::test]
async fn test_all_without_criteria_sends_empty_descriptor() {
    let (model, users) = repository(RecordingModel::with_records(vec![ann()]));

    let rows = users.all(None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(model.calls(), vec![Call::FindAll(QueryDescriptor::default())]);
}

#[tokio::test]
async fn test_one_by_id_queries_identity() {
    let (model, users) = repository(RecordingModel::with_records(vec![ann()]));

    let found = users.one_by_id("u1").await.unwrap();
    assert_eq!(found, Some(ann()));

    let Call::FindOne(query) = &model.calls()[0] else {
        panic!("expected find_one");
    };
    assert_eq!(query.where_, Some(payload(json!({"id": "u1"}))));
    assert!(users.one_by_id("nobody").await.unwrap().is_none());
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn test_create_strips_protected_fields() {
    let (model, users) = repository(RecordingModel::default());

    let created = users
        .create(
            payload(json!({
                "id": "forged",
                "createdAt": "1999-01-01T00:00:00Z",
                "updatedAt": "1999-01-01T00:00:00Z",
                "name": "Ann"
            })),
            CreateOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(model.writes(), vec![Call::Create(payload(json!({"name": "Ann"})), None)]);
    assert_eq!(created["id"], json!("generated"));
}

#[tokio::test]
async fn test_create_forwards_options_transaction() {
    let (model, users) = repository(RecordingModel::default());
    let tx = TransactionHandle::from_id("tx-1");

    users
        .bulk_create(
            vec![payload(json!({"name": "A", "id": 1})), payload(json!({"name": "B"}))],
            CreateOptions::new().in_transaction(tx),
        )
        .await
        .unwrap();

    assert_eq!(
        model.writes(),
        vec![Call::BulkCreate(
            vec![payload(json!({"name": "A"})), payload(json!({"name": "B"}))],
            Some("tx-1".to_string())
        )]
    );
}

#[tokio::test]
async fn test_update_merges_and_forwards_transaction() {
    let (model, users) = repository(RecordingModel::with_records(vec![ann()]));
    let tx = TransactionHandle::from_id("tx-2");

    let updated = users
        .update(
            "u1",
            payload(json!({"name": "Annie", "createdAt": "forged"})),
            Some(tx),
        )
        .await
        .unwrap();

    assert_eq!(updated["name"], json!("Annie"));
    assert_eq!(updated["createdAt"], json!("2024-01-01T00:00:00Z"));

    let calls = model.calls();
    let Call::FindOne(query) = &calls[0] else {
        panic!("expected the record to be located first");
    };
    assert_eq!(query.transaction.as_ref().map(|t| t.id()), Some("tx-2"));
    assert!(matches!(&calls[1], Call::Save(_, Some(id)) if id == "tx-2"));
}

#[tokio::test]
async fn test_update_by_criteria_without_match_is_not_found() {
    let (model, users) = repository(RecordingModel::with_records(vec![ann()]));

    let criteria = QueryCriteria::new().filter("name", "Nobody");
    let err = users
        .update_by_criteria(&criteria, payload(json!({"name": "X"})))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "[User] no record matches the given criteria");
    assert!(model.writes().is_empty());
}

#[tokio::test]
async fn test_delete_returns_destroyed_record() {
    let (model, users) = repository(RecordingModel::with_records(vec![ann()]));

    let deleted = users.delete("u1", None).await.unwrap();
    assert_eq!(deleted, ann());
    assert_eq!(model.writes(), vec![Call::Destroy(ann(), None)]);

    let err = users
        .delete_by_criteria(&IdentityCriteria::new("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

// =============================================================================
// Backend failures
// =============================================================================

#[tokio::test]
async fn test_backend_failure_is_labelled_with_model() {
    let backend = BackendError::new("Validation error")
        .with_driver_message("duplicate key value violates unique constraint")
        .with_field_error(FieldError::new("email", "email must be unique").with_kind("unique"));
    let (_, users) = repository(RecordingModel::failing(backend));

    let err = users
        .create(payload(json!({"email": "a@b.c"})), CreateOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "BACKEND_ERROR");
    let exception = err.exception().unwrap();
    assert_eq!(exception.message(), "[User] Validation error");
    assert_eq!(exception.model(), "User");

    let details = exception.details();
    assert_eq!(details.len(), 1);
    assert_eq!(
        details[0].message.as_deref(),
        Some("duplicate key value violates unique constraint")
    );
    assert_eq!(details[0].errors[0].kind.as_deref(), Some("unique"));
}

#[tokio::test]
async fn test_read_failure_is_wrapped_too() {
    let (_, users) = repository(RecordingModel::failing(BackendError::new("connection reset")));

    let err = users.all(None).await.unwrap_err();
    assert_eq!(err.to_string(), "[User] connection reset");
    assert_eq!(
        err.exception().unwrap().details()[0].message.as_deref(),
        Some("connection reset")
    );
}

// =============================================================================
// Hooks
// =============================================================================

/// Lowercases emails before writes, stamps results, and archives on delete.
struct AuditHooks;

#[async_trait]
impl SaveHooks for AuditHooks {
    async fn before_save(&self, subject: Subject, phase: Phase) -> Result<Subject, RepositoryError> {
        let normalize = |mut record: Record| {
            if let Some(JsonValue::String(email)) = record.get("email") {
                let email = email.to_lowercase();
                record.insert("email".into(), json!(email));
            }
            if phase == Phase::Delete {
                record.insert("archived".into(), json!(true));
            }
            record
        };
        Ok(match subject {
            Subject::One(record) => Subject::One(normalize(record)),
            Subject::Many(records) => Subject::Many(records.into_iter().map(normalize).collect()),
        })
    }

    async fn after_save(
        &self,
        subject: Subject,
        phase: Phase,
        extra: Option<&Subject>,
    ) -> Result<Subject, RepositoryError> {
        let Subject::One(mut record) = subject else {
            return Ok(subject);
        };
        record.insert("phase".into(), json!(phase.as_str()));
        if let Some(Subject::One(sent)) = extra {
            record.insert("sentKeys".into(), json!(sent.len()));
        }
        Ok(Subject::One(record))
    }
}

struct RejectingHooks;

#[async_trait]
impl SaveHooks for RejectingHooks {
    async fn before_save(&self, _: Subject, phase: Phase) -> Result<Subject, RepositoryError> {
        Err(RepositoryError::hook(anyhow::anyhow!("{} is closed", phase)))
    }
}

#[tokio::test]
async fn test_hooks_transform_payload_and_result() {
    let (model, users) = repository(RecordingModel::default());
    let users = users.with_hooks(AuditHooks);

    let created = users
        .create(payload(json!({"email": "ANN@EXAMPLE.COM"})), CreateOptions::new())
        .await
        .unwrap();

    assert_eq!(
        model.writes(),
        vec![Call::Create(payload(json!({"email": "ann@example.com"})), None)]
    );
    assert_eq!(created["phase"], json!("create"));
    assert_eq!(created["sentKeys"], json!(1));
}

#[tokio::test]
async fn test_delete_hook_result_is_destroyed() {
    let (model, users) = repository(RecordingModel::with_records(vec![ann()]));
    let users = users.with_hooks(AuditHooks);

    let deleted = users.delete("u1", None).await.unwrap();

    assert_eq!(deleted["archived"], json!(true));
    assert!(deleted.get("phase").is_none());
    assert_eq!(model.writes(), vec![Call::Destroy(deleted, None)]);
}

#[tokio::test]
async fn test_hook_error_propagates_unchanged() {
    let (model, users) = repository(RecordingModel::with_records(vec![ann()]));
    let users = users.with_hooks(RejectingHooks);

    let err = users
        .create(payload(json!({"name": "x"})), CreateOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "HOOK_ERROR");
    assert_eq!(err.to_string(), "create is closed");

    let err = users.delete("u1", None).await.unwrap_err();
    assert_eq!(err.to_string(), "delete is closed");
    assert!(model.writes().is_empty());
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_auto_validation_failure_prevents_write() {
    let (model, users) = repository(RecordingModel::default());
    let users = users.with_validator(user_schema).with_auto_validation(true);

    let err = users
        .create(payload(json!({"name": "Ann"})), CreateOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(err.to_string(), "[User] \"email\" is required");
    let errors = &err.exception().unwrap().details()[0].errors;
    assert_eq!(errors[0].field, "email");
    assert!(model.writes().is_empty());
}

#[tokio::test]
async fn test_auto_validation_ignores_keys_outside_schema() {
    let (model, users) = repository(RecordingModel::default());
    let users = users.with_validator(user_schema).with_auto_validation(true);

    users
        .create(
            payload(json!({"name": "Ann", "email": "a@b.c", "nickname": "A"})),
            CreateOptions::new(),
        )
        .await
        .unwrap();

    // The full payload reaches the backend; only validation is restricted.
    assert_eq!(model.writes().len(), 1);
}

#[tokio::test]
async fn test_update_validates_against_located_record() {
    let (model, users) = repository(RecordingModel::with_records(vec![ann()]));
    let users = users.with_validator(user_schema).with_auto_validation(true);

    users
        .update("u1", payload(json!({"age": 31})), None)
        .await
        .unwrap();

    let err = users
        .update("u1", payload(json!({"age": "old"})), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert!(err.to_string().contains("\"age\" must be of type integer"));

    let saves = model
        .writes()
        .into_iter()
        .filter(|call| matches!(call, Call::Save(..)))
        .count();
    assert_eq!(saves, 1);
}

/// Fills in a default email before creates.
struct DefaultEmailHooks;

#[async_trait]
impl SaveHooks for DefaultEmailHooks {
    async fn before_save(&self, subject: Subject, _: Phase) -> Result<Subject, RepositoryError> {
        let Subject::One(mut record) = subject else {
            return Ok(subject);
        };
        assert!(!record.contains_key("id"), "protected fields reach hooks stripped");
        record
            .entry("email")
            .or_insert_with(|| json!("noreply@example.com"));
        Ok(Subject::One(record))
    }
}

/// Drops the name before creates.
struct AnonymizingHooks;

#[async_trait]
impl SaveHooks for AnonymizingHooks {
    async fn before_save(&self, subject: Subject, _: Phase) -> Result<Subject, RepositoryError> {
        let Subject::One(mut record) = subject else {
            return Ok(subject);
        };
        record.remove("name");
        Ok(Subject::One(record))
    }
}

#[tokio::test]
async fn test_hook_output_is_what_gets_validated() {
    let (model, users) = repository(RecordingModel::default());
    let users = users
        .with_validator(user_schema)
        .with_hooks(DefaultEmailHooks)
        .with_auto_validation(true);

    users
        .create(payload(json!({"name": "Ann", "id": "forged"})), CreateOptions::new())
        .await
        .unwrap();

    assert_eq!(
        model.writes(),
        vec![Call::Create(
            payload(json!({"name": "Ann", "email": "noreply@example.com"})),
            None
        )]
    );
}

#[tokio::test]
async fn test_hook_that_drops_required_field_is_rejected() {
    let (model, users) = repository(RecordingModel::default());
    let users = users
        .with_validator(user_schema)
        .with_hooks(AnonymizingHooks)
        .with_auto_validation(true);

    let err = users
        .create(
            payload(json!({"name": "Ann", "email": "ann@example.com"})),
            CreateOptions::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(err.to_string(), "[User] \"name\" is required");
    assert!(model.writes().is_empty());
}

#[tokio::test]
async fn test_bulk_create_rejects_whole_batch_on_first_invalid_element() {
    let (model, users) = repository(RecordingModel::default());
    let users = users.with_validator(user_schema).with_auto_validation(true);

    let err = users
        .bulk_create(
            vec![
                payload(json!({"name": "Ann", "email": "ann@example.com"})),
                payload(json!({"name": "Bob"})),
                payload(json!({"email": 3})),
            ],
            CreateOptions::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(err.to_string(), "[User] \"email\" is required");
    assert!(model.writes().is_empty());
}

#[tokio::test]
async fn test_bulk_create_validates_every_element() {
    let (model, users) = repository(RecordingModel::default());
    let users = users.with_validator(user_schema).with_auto_validation(true);

    users
        .bulk_create(
            vec![
                payload(json!({"name": "Ann", "email": "ann@example.com"})),
                payload(json!({"name": "Bob", "email": "bob@example.com", "age": 40})),
            ],
            CreateOptions::new(),
        )
        .await
        .unwrap();

    assert!(matches!(&model.writes()[..], [Call::BulkCreate(rows, None)] if rows.len() == 2));
}

#[tokio::test]
async fn test_validator_without_auto_validation_does_not_gate() {
    let (model, users) = repository(RecordingModel::default());
    let users = users.with_validator(user_schema);

    users
        .create(payload(json!({"age": "n/a"})), CreateOptions::new())
        .await
        .unwrap();
    assert_eq!(model.writes().len(), 1);

    let validation = users.validate(&payload(json!({"age": "n/a"})), true);
    assert!(!validation.is_ok());
}

// =============================================================================
// Registry
// =============================================================================

struct Members;

impl RepositoryDefinition for Members {
    fn build(models: &ModelRegistry) -> Result<Repository, RepositoryError> {
        Ok(Repository::new(models, "User")?
            .named("members")
            .with_auto_validation(true))
    }
}

#[tokio::test]
async fn test_registry_serves_defined_repositories() {
    let model = Arc::new(RecordingModel::with_records(vec![ann()]));
    let mut models = ModelRegistry::new();
    models.insert(model.clone());

    let mut registry = RepositoryRegistry::new();
    registry.push(Repository::new(&models, "User").unwrap());
    let members = registry.push_definition::<Members>(&models).unwrap();

    let found = registry.require("members").unwrap();
    assert!(Arc::ptr_eq(&found, &members));
    assert!(found.auto_validation());
    assert_eq!(found.model_name(), "User");

    let rows = registry.require("User").unwrap().all(None).await.unwrap();
    assert_eq!(rows, vec![ann()]);

    let err = registry.require("admins").unwrap_err();
    assert_eq!(err.code(), "UNKNOWN_REPOSITORY");
}
