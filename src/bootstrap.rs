//! Wiring for hosting processes: storage backend, migrations, services

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    clock::{Clock, SystemClock},
    config::{AppConfig, StorageBackend},
    repository::Repository,
    services::Services,
};

/// State a transport shares across its handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<Services>,
}

impl AppState {
    /// Build the state on the wall clock
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        Self::build_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn build_with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let repository = build_repository(&config).await?;
        let services = Services::new(repository, config.lending.clone(), clock);

        Ok(Self {
            config: Arc::new(config),
            services: Arc::new(services),
        })
    }
}

/// Open the configured storage backend, migrating the database if needed
pub async fn build_repository(config: &AppConfig) -> anyhow::Result<Repository> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage");
            Ok(Repository::in_memory())
        }
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations completed");

            Ok(Repository::postgres(pool))
        }
    }
}

/// Load `.env` and the layered configuration
pub fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();
    AppConfig::load().context("Failed to load configuration")
}
