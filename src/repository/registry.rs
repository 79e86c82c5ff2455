//! Name to repository mapping built during startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::ModelRegistry;
use crate::error::RepositoryError;
use crate::repository::Repository;

/// A repository type that knows how to build itself.
///
/// Lets wiring code register a repository by type instead of by instance:
///
/// ```ignore
/// struct Users;
///
/// impl RepositoryDefinition for Users {
///     fn build(models: &ModelRegistry) -> Result<Repository, RepositoryError> {
///         Ok(Repository::new(models, "User")?
///             .named("users")
///             .with_hooks(AuditHooks::default()))
///     }
/// }
///
/// registry.push_definition::<Users>(&models)?;
/// ```
pub trait RepositoryDefinition {
    fn build(models: &ModelRegistry) -> Result<Repository, RepositoryError>;
}

/// Repositories keyed by their declared name.
///
/// Populated once during startup (`push` takes `&mut self`), then frozen
/// behind an `Arc` and only read. Pushing a name twice keeps the last one.
#[derive(Debug, Default)]
pub struct RepositoryRegistry {
    repositories: BTreeMap<String, Arc<Repository>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a repository under its own name, replacing any previous entry.
    ///
    /// Returns the stored instance.
    pub fn push(&mut self, repository: impl Into<Arc<Repository>>) -> Arc<Repository> {
        let repository = repository.into();
        let name = repository.name().to_string();

        if self.repositories.contains_key(&name) {
            tracing::debug!(repository = %name, "Replacing registered repository");
        } else {
            tracing::debug!(
                repository = %name,
                model = %repository.model_name(),
                "Registering repository"
            );
        }

        self.repositories.insert(name, Arc::clone(&repository));
        repository
    }

    /// Builds a repository from its definition and stores it.
    pub fn push_definition<D: RepositoryDefinition>(
        &mut self,
        models: &ModelRegistry,
    ) -> Result<Arc<Repository>, RepositoryError> {
        let repository = D::build(models)?;
        Ok(self.push(repository))
    }

    /// Returns the repository registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Repository>> {
        self.repositories.get(name).cloned()
    }

    /// Like [`get`](Self::get), failing for unknown names.
    pub fn require(&self, name: &str) -> Result<Arc<Repository>, RepositoryError> {
        self.get(name)
            .ok_or_else(|| RepositoryError::UnknownRepository(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.repositories.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}
