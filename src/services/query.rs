//! Query service: runs JSON criteria against registered repositories.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::context::Context;
use crate::criteria::{compile, Pagination, QueryCriteria, QueryDescriptor};
use crate::di::FromContext;
use crate::error::RepositoryError;
use crate::models::{Page, Record};
use crate::repository::{Repository, RepositoryRegistry};

/// Counters for queries run through one [`QueryService`].
#[derive(Debug, Default)]
pub struct QueryStats {
    executed: AtomicU64,
    failed: AtomicU64,
}

impl QueryStats {
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn record<T>(&self, result: &Result<T, RepositoryError>) {
        self.executed.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Read-side entry point for callers holding criteria as JSON text.
///
/// Criteria text uses the same shape as [`QueryCriteria`]:
/// `{"where": {...}, "attributes": [...], "order": [["name", "ASC"]], ...}`.
/// Unknown keys are rejected.
#[derive(FromContext, Clone)]
pub struct QueryService {
    repositories: Arc<RepositoryRegistry>,
    config: Arc<Config>,
    #[from_context(default)]
    stats: Arc<QueryStats>,
}

impl QueryService {
    /// Parses criteria text. `None` or blank text is the empty criteria.
    pub fn parse_criteria(criteria: Option<&str>) -> Result<QueryCriteria, RepositoryError> {
        match criteria.map(str::trim) {
            None | Some("") => Ok(QueryCriteria::new()),
            Some(text) => Ok(serde_json::from_str(text)?),
        }
    }

    /// All records of `repository` matching the criteria.
    pub async fn find(
        &self,
        repository: &str,
        criteria: Option<&str>,
    ) -> Result<Vec<Record>, RepositoryError> {
        let result = self.run_find(repository, criteria).await;
        self.stats.record(&result);
        result
    }

    /// One page of `repository` matching the criteria, with the total count.
    pub async fn find_page(
        &self,
        repository: &str,
        criteria: Option<&str>,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<Page, RepositoryError> {
        let result = self.run_find_page(repository, criteria, page, page_size).await;
        self.stats.record(&result);
        result
    }

    /// The first record of `repository` matching the criteria.
    pub async fn find_one(
        &self,
        repository: &str,
        criteria: Option<&str>,
    ) -> Result<Option<Record>, RepositoryError> {
        let result = self.run_find_one(repository, criteria).await;
        self.stats.record(&result);
        result
    }

    /// Compiles criteria text without running it.
    ///
    /// When a page or page size is given the descriptor is paginated, with
    /// the configured default page size filling in a missing size.
    pub fn compile(
        &self,
        criteria: Option<&str>,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<QueryDescriptor, RepositoryError> {
        let criteria = Self::parse_criteria(criteria)?;
        let query = compile(Some(&criteria));

        if page.is_none() && page_size.is_none() {
            return Ok(query);
        }
        let pagination = Pagination::with_default_size(
            page,
            page_size,
            self.config.repository.default_page_size,
        );
        Ok(query.paginate(pagination))
    }

    /// Names of the repositories queries can target.
    pub fn repositories(&self) -> Vec<String> {
        self.repositories.names().map(str::to_string).collect()
    }

    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    // =========================================================================
    // Private helpers
    // =========================================================================

    fn target(&self, repository: &str) -> Result<Arc<Repository>, RepositoryError> {
        self.repositories.require(repository)
    }

    async fn run_find(
        &self,
        repository: &str,
        criteria: Option<&str>,
    ) -> Result<Vec<Record>, RepositoryError> {
        let criteria = Self::parse_criteria(criteria)?;
        self.target(repository)?.all(Some(&criteria)).await
    }

    async fn run_find_page(
        &self,
        repository: &str,
        criteria: Option<&str>,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<Page, RepositoryError> {
        let criteria = Self::parse_criteria(criteria)?;
        self.target(repository)?
            .all_paginated(Some(&criteria), page, page_size)
            .await
    }

    async fn run_find_one(
        &self,
        repository: &str,
        criteria: Option<&str>,
    ) -> Result<Option<Record>, RepositoryError> {
        let criteria = Self::parse_criteria(criteria)?;
        self.target(repository)?.one(Some(&criteria)).await
    }
}
