//! Application state wiring the pipeline to its concrete infrastructure.

use anyhow::Context;

use gleaner_core::extraction::evaluator::LessonEvaluator;
use gleaner_infra::config::{load_global_config, resolve_api_key, resolve_data_dir};
use gleaner_infra::llm::create_provider;
use gleaner_infra::sqlite::lesson::SqliteLessonRepository;
use gleaner_infra::sqlite::pool::{database_url, DatabasePool};
use gleaner_types::config::GlobalConfig;

/// The evaluator pinned to the SQLite lesson store.
pub type ConcreteEvaluator = LessonEvaluator<SqliteLessonRepository>;

/// Shared state for CLI commands.
pub struct AppState {
    pub config: GlobalConfig,
    pub lesson_repo: SqliteLessonRepository,
}

impl AppState {
    /// Load config and open the database.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        tracing::debug!(data_dir = %data_dir.display(), "opening lesson store");
        let config = load_global_config(&data_dir).await;

        let db_pool = DatabasePool::new(&database_url(&data_dir))
            .await
            .context("failed to open lesson database")?;

        Ok(Self {
            config,
            lesson_repo: SqliteLessonRepository::new(db_pool),
        })
    }

    /// Build an evaluator backed by the configured model provider.
    ///
    /// Only `evaluate` needs this; the other commands run without an API key.
    pub fn evaluator(&self) -> anyhow::Result<ConcreteEvaluator> {
        let api_key = resolve_api_key(&self.config.provider);
        let provider = create_provider(&self.config, api_key).with_context(|| {
            format!(
                "no usable API key; set {} to enable extraction",
                self.config.provider.api_key_env
            )
        })?;

        Ok(LessonEvaluator::new(
            provider,
            self.lesson_repo.clone(),
            self.config.extraction.clone(),
        ))
    }
}
