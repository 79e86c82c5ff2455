//! The generic repository orchestrator.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::backend::{BackendError, ModelHandle, ModelRegistry};
use crate::config::RepositoryConfig;
use crate::criteria::{compile, Criteria, IdentityCriteria, Pagination, DEFAULT_PAGE_SIZE};
use crate::error::{ErrorDetail, RepositoryError, RepositoryException};
use crate::models::{CreateOptions, Page, Payload, Record, TransactionHandle};
use crate::repository::hooks::{Phase, SaveHooks, Subject, TracingHooks};
use crate::repository::validation::{Schema, Validation, Validator};

/// System-managed fields that client payloads can never set.
pub const PROTECTED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Removes every [protected field](PROTECTED_FIELDS) from a payload.
pub fn remove_protected_fields(data: &mut Payload) {
    for field in PROTECTED_FIELDS {
        data.remove(field);
    }
}

fn pick_keys(data: &Payload, schema: &Schema) -> Payload {
    schema
        .keys()
        .filter_map(|key| data.get(key).map(|value| (key.to_string(), value.clone())))
        .collect()
}

/// CRUD orchestrator for one model.
///
/// Reads compile their criteria and delegate to the model's backend handle.
/// Writes run, in order: protected-field stripping, the before-hook,
/// validation (when auto-validation is on), the backend mutation, and the
/// after-hook. Backend failures come back as [`RepositoryError::Backend`]
/// labelled with the model name.
///
/// `update_by_criteria` and `delete_by_criteria` locate the record and then
/// mutate it without locking in between. Concurrent mutations of the same
/// record are only isolated when the caller supplies a transaction through
/// the criteria.
///
/// # Example
///
/// ```ignore
/// let users = Repository::new(&models, "User")?
///     .with_hooks(AuditHooks::default())
///     .with_auto_validation(true);
///
/// let ann = users.create(payload, CreateOptions::new()).await?;
/// let page = users.all_paginated(Some(&criteria), Some(2), None).await?;
/// ```
#[derive(Clone)]
pub struct Repository {
    name: String,
    model_name: String,
    model: Arc<dyn ModelHandle>,
    validator: Option<Arc<dyn Validator>>,
    hooks: Arc<dyn SaveHooks>,
    auto_validation: bool,
    default_page_size: u64,
}

impl Repository {
    /// Creates a repository for `model`, resolving its backend handle.
    ///
    /// The repository's name defaults to the model name.
    pub fn new(models: &ModelRegistry, model: &str) -> Result<Self, RepositoryError> {
        let handle = models.resolve(model)?;
        Ok(Self {
            name: model.to_string(),
            model_name: model.to_string(),
            model: handle,
            validator: None,
            hooks: Arc::new(TracingHooks),
            auto_validation: false,
            default_page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Sets the name the repository is registered under.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_hooks(mut self, hooks: impl SaveHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Shares hooks with other repositories.
    pub fn with_shared_hooks(mut self, hooks: Arc<dyn SaveHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_auto_validation(mut self, enabled: bool) -> Self {
        self.auto_validation = enabled;
        self
    }

    pub fn with_default_page_size(mut self, page_size: u64) -> Self {
        self.default_page_size = page_size.max(1);
        self
    }

    /// Applies repository settings from configuration.
    pub fn with_config(self, config: &RepositoryConfig) -> Self {
        self.with_auto_validation(config.auto_validation)
            .with_default_page_size(config.default_page_size)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn auto_validation(&self) -> bool {
        self.auto_validation
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns every record matching the criteria.
    pub async fn all(&self, criteria: Option<&dyn Criteria>) -> Result<Vec<Record>, RepositoryError> {
        let query = compile(criteria);
        tracing::debug!(model = %self.model_name, ?query, "Finding all");

        self.model
            .find_all(&query)
            .await
            .map_err(|e| self.backend_failure(e))
    }

    /// Returns one page of matching records with the total match count.
    ///
    /// `page` is 1-based. Missing or zero values fall back to page 1 and the
    /// repository's default page size.
    pub async fn all_paginated(
        &self,
        criteria: Option<&dyn Criteria>,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<Page, RepositoryError> {
        let pagination = Pagination::with_default_size(page, page_size, self.default_page_size);
        let query = compile(criteria).paginate(pagination);
        tracing::debug!(model = %self.model_name, ?query, "Finding page");

        self.model
            .find_and_count_all(&query)
            .await
            .map_err(|e| self.backend_failure(e))
    }

    /// Returns the first matching record, if any.
    pub async fn one(&self, criteria: Option<&dyn Criteria>) -> Result<Option<Record>, RepositoryError> {
        let query = compile(criteria);
        tracing::debug!(model = %self.model_name, ?query, "Finding one");

        self.model
            .find_one(&query)
            .await
            .map_err(|e| self.backend_failure(e))
    }

    /// Returns the record with the given id, if any.
    pub async fn one_by_id(&self, id: impl Into<JsonValue>) -> Result<Option<Record>, RepositoryError> {
        let criteria = IdentityCriteria::new(id);
        self.one(Some(&criteria)).await
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Restricts a payload to the keys of the active schema.
    ///
    /// Without a validator the payload is returned whole.
    pub fn pick_data(&self, data: &Payload, create_mode: bool) -> Payload {
        match &self.validator {
            Some(validator) => pick_keys(data, &validator.schema(create_mode)),
            None => data.clone(),
        }
    }

    /// Validates a payload against the active schema.
    ///
    /// Without a validator every payload is valid.
    pub fn validate(&self, data: &Payload, create_mode: bool) -> Validation {
        match &self.validator {
            Some(validator) => validator.validate(data, &validator.schema(create_mode)),
            None => Validation::ok(data.clone()),
        }
    }

    /// Validates `original ∪ data` restricted to the schema's keys.
    fn auto_validate(
        &self,
        data: &Payload,
        create_mode: bool,
        original: Option<&Record>,
    ) -> Result<(), RepositoryError> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };
        let schema = validator.schema(create_mode);

        let mut merged = original.cloned().unwrap_or_default();
        merged.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));

        let picked = pick_keys(&merged, &schema);
        match validator.validate(&picked, &schema).error {
            None => Ok(()),
            Some(failure) => {
                tracing::debug!(model = %self.model_name, error = %failure.message, "Validation failed");
                Err(RepositoryError::Validation(RepositoryException::with_details(
                    failure.message.clone(),
                    self.model_name.clone(),
                    vec![ErrorDetail {
                        message: Some(failure.message),
                        errors: failure.errors,
                    }],
                )))
            }
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a record.
    ///
    /// `options` (includes, transaction) are forwarded to the backend as-is.
    pub async fn create(&self, mut data: Payload, options: CreateOptions) -> Result<Record, RepositoryError> {
        remove_protected_fields(&mut data);
        let data = self
            .hooks
            .before_save(Subject::One(data), Phase::Create)
            .await?
            .into_one(Phase::Create)?;

        if self.auto_validation {
            self.auto_validate(&data, true, None)?;
        }

        tracing::debug!(model = %self.model_name, "Creating record");
        let record = self
            .model
            .create(data.clone(), &options)
            .await
            .map_err(|e| self.backend_failure(e))?;

        self.hooks
            .after_save(Subject::One(record), Phase::Create, Some(&Subject::One(data)))
            .await?
            .into_one(Phase::Create)
    }

    /// Creates several records in one backend call.
    pub async fn bulk_create(
        &self,
        mut data: Vec<Payload>,
        options: CreateOptions,
    ) -> Result<Vec<Record>, RepositoryError> {
        data.iter_mut().for_each(remove_protected_fields);
        let data = self
            .hooks
            .before_save(Subject::Many(data), Phase::BulkCreate)
            .await?
            .into_many(Phase::BulkCreate)?;

        if self.auto_validation {
            for element in &data {
                self.auto_validate(element, true, None)?;
            }
        }

        tracing::debug!(model = %self.model_name, count = data.len(), "Creating records");
        let records = self
            .model
            .bulk_create(data.clone(), &options)
            .await
            .map_err(|e| self.backend_failure(e))?;

        self.hooks
            .after_save(
                Subject::Many(records),
                Phase::BulkCreate,
                Some(&Subject::Many(data)),
            )
            .await?
            .into_many(Phase::BulkCreate)
    }

    /// Updates the record with the given id.
    pub async fn update(
        &self,
        id: impl Into<JsonValue>,
        data: Payload,
        transaction: Option<TransactionHandle>,
    ) -> Result<Record, RepositoryError> {
        let criteria = IdentityCriteria::with_transaction(id, transaction);
        self.update_by_criteria(&criteria, data).await
    }

    /// Merges `data` onto the first record matching the criteria and saves it.
    ///
    /// Fails with [`RepositoryError::NotFound`] when nothing matches. With
    /// auto-validation, the located record merged with `data` is validated,
    /// so partial updates are checked as complete records.
    pub async fn update_by_criteria(
        &self,
        criteria: &dyn Criteria,
        mut data: Payload,
    ) -> Result<Record, RepositoryError> {
        remove_protected_fields(&mut data);
        let data = self
            .hooks
            .before_save(Subject::One(data), Phase::Update)
            .await?
            .into_one(Phase::Update)?;

        let current = self.locate(criteria).await?;

        if self.auto_validation {
            self.auto_validate(&data, false, Some(&current))?;
        }

        let mut merged = current;
        merged.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));

        tracing::debug!(model = %self.model_name, "Saving record");
        let updated = self
            .model
            .save(merged, criteria.transaction())
            .await
            .map_err(|e| self.backend_failure(e))?;

        self.hooks
            .after_save(Subject::One(updated), Phase::Update, Some(&Subject::One(data)))
            .await?
            .into_one(Phase::Update)
    }

    /// Deletes the record with the given id.
    pub async fn delete(
        &self,
        id: impl Into<JsonValue>,
        transaction: Option<TransactionHandle>,
    ) -> Result<Record, RepositoryError> {
        let criteria = IdentityCriteria::with_transaction(id, transaction);
        self.delete_by_criteria(&criteria).await
    }

    /// Deletes the first record matching the criteria and returns it.
    ///
    /// The before-hook sees the located record; the record it returns is the
    /// one destroyed. Fails with [`RepositoryError::NotFound`] when nothing
    /// matches.
    pub async fn delete_by_criteria(&self, criteria: &dyn Criteria) -> Result<Record, RepositoryError> {
        let current = self.locate(criteria).await?;
        let record = self
            .hooks
            .before_save(Subject::One(current), Phase::Delete)
            .await?
            .into_one(Phase::Delete)?;

        tracing::debug!(model = %self.model_name, "Destroying record");
        self.model
            .destroy(&record, criteria.transaction())
            .await
            .map_err(|e| self.backend_failure(e))?;

        Ok(record)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn locate(&self, criteria: &dyn Criteria) -> Result<Record, RepositoryError> {
        self.one(Some(criteria))
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                model: self.model_name.clone(),
            })
    }

    fn backend_failure(&self, error: BackendError) -> RepositoryError {
        RepositoryError::backend(&self.model_name, &error)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("model_name", &self.model_name)
            .field("has_validator", &self.validator.is_some())
            .field("auto_validation", &self.auto_validation)
            .field("default_page_size", &self.default_page_size)
            .finish()
    }
}
