use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use freeflow_agent::llm::{HttpLlmClient, LlmClient, LlmError};
use freeflow_core::config::{AppConfig, ConfigError, LoadOptions};
use freeflow_db::{connect_with_settings, migrations, DbPool};

use crate::pdf::PdfGenerator;
use crate::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client construction failed: {0}")]
    Llm(#[source] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let llm: Arc<dyn LlmClient> =
        Arc::new(HttpLlmClient::from_config(&config.llm).map_err(BootstrapError::Llm)?);
    info!(
        event_name = "system.bootstrap.llm_ready",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "llm client constructed"
    );

    let pdf = match PdfGenerator::new("templates") {
        Ok(generator) => Arc::new(generator),
        Err(error) => {
            warn!(error = %error, "filesystem templates unavailable, using embedded templates");
            Arc::new(PdfGenerator::with_embedded_templates())
        }
    };

    let state = AppState::new(db_pool.clone(), llm, pdf);
    Ok(Application { config, db_pool, state })
}

#[cfg(test)]
mod tests {
    use freeflow_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn memory_options(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_connects_migrates_and_builds_state() {
        let app = bootstrap(memory_options("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed against in-memory sqlite");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('user', 'client', 'project', 'contract', 'invoice', 'agent_event')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected pipeline tables to be available after bootstrap");
        assert_eq!(table_count, 6, "bootstrap should expose the baseline pipeline tables");

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_database_url() {
        let result = bootstrap(memory_options("postgres://not-sqlite")).await;
        assert!(result.is_err(), "non-sqlite urls must be rejected by validation");
    }
}
