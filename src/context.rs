//! Application context providing dependency injection root.

use std::path::Path;
use std::sync::Arc;

use crate::backend::memory::registry_from_fixtures;
use crate::backend::ModelRegistry;
use crate::config::Config;
use crate::di::Context as ContextDerive;
use crate::error::RepositoryError;
use crate::repository::{Repository, RepositoryRegistry};

/// Root application context for dependency injection.
///
/// Holds the shared, frozen wiring of the application. `#[derive(Context)]`
/// generates a `FromRef` implementation for each field so services can
/// resolve them by type.
#[derive(ContextDerive, Clone, Debug)]
pub struct Context {
    /// Backend handles by model name.
    pub models: Arc<ModelRegistry>,
    /// Repositories by name.
    pub repositories: Arc<RepositoryRegistry>,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl Context {
    /// Creates a context from already-built dependencies.
    pub fn new(models: ModelRegistry, repositories: RepositoryRegistry, config: Config) -> Self {
        Self {
            models: Arc::new(models),
            repositories: Arc::new(repositories),
            config: Arc::new(config),
        }
    }

    /// Builds the context described by the configuration.
    ///
    /// Models come from the `[store] fixtures` file when one is set, otherwise
    /// the store is empty. Every model gets a repository of the same name
    /// using the `[repository]` defaults.
    pub fn from_config(config: Config) -> Result<Self, RepositoryError> {
        let models = match &config.store.fixtures {
            Some(path) => load_fixtures(path)?,
            None => ModelRegistry::new(),
        };

        let repositories = default_repositories(&models, &config)?;
        tracing::info!(
            models = repositories.len(),
            "Registered repositories: {:?}",
            repositories.names().collect::<Vec<_>>()
        );

        Ok(Self::new(models, repositories, config))
    }
}

fn load_fixtures(path: &Path) -> Result<ModelRegistry, RepositoryError> {
    tracing::debug!(path = %path.display(), "Loading fixtures");

    let content = std::fs::read_to_string(path)
        .map_err(|e| RepositoryError::Store(format!("{}: {}", path.display(), e)))?;
    let fixtures: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| RepositoryError::Store(format!("{}: {}", path.display(), e)))?;

    registry_from_fixtures(&fixtures).map_err(|e| RepositoryError::Store(e.to_string()))
}

fn default_repositories(
    models: &ModelRegistry,
    config: &Config,
) -> Result<RepositoryRegistry, RepositoryError> {
    let mut repositories = RepositoryRegistry::new();
    for model in models.names() {
        repositories.push(Repository::new(models, model)?.with_config(&config.repository));
    }
    Ok(repositories)
}
