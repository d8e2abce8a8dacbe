//! Application state.

use buildstore_config::{StorageConfig, SystemConfig};
use buildstore_registry::{
    DbResult, MemoryBuildConfigRegistry, MemoryBuildRegistry, PgBuildConfigRegistry,
    PgBuildRegistry, create_pool, run_migrations,
};
use buildstore_storage::{BuildStorage, RestStorage};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub builds: Arc<dyn RestStorage>,
    /// How long a mutating request waits on its pending result.
    pub request_timeout: Duration,
    /// Present when the registries live in PostgreSQL.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(builds: Arc<dyn RestStorage>, request_timeout: Duration) -> Self {
        Self {
            builds,
            request_timeout,
            pool: None,
        }
    }

    /// Wire up the registries and storages described by `config`.
    pub async fn from_config(config: &SystemConfig) -> DbResult<Self> {
        let request_timeout = config.server.request_timeout;

        match &config.storage {
            StorageConfig::Memory => {
                info!(
                    templates = config.templates.len(),
                    "Using in-memory registries"
                );
                let storage = BuildStorage::new(
                    Arc::new(MemoryBuildRegistry::new()),
                    Arc::new(MemoryBuildConfigRegistry::new(config.templates.clone())),
                );
                Ok(Self::new(Arc::new(storage), request_timeout))
            }
            StorageConfig::Postgres {
                url,
                max_connections,
            } => {
                info!("Connecting to database...");
                let pool = create_pool(url, *max_connections).await?;
                run_migrations(&pool).await?;
                info!("Database connected");

                let templates = PgBuildConfigRegistry::new(pool.clone());
                for template in &config.templates {
                    templates.upsert(template).await?;
                }
                info!(templates = config.templates.len(), "Seeded build templates");

                let storage = BuildStorage::new(
                    Arc::new(PgBuildRegistry::new(pool.clone())),
                    Arc::new(templates),
                );
                Ok(Self {
                    builds: Arc::new(storage),
                    request_timeout,
                    pool: Some(pool),
                })
            }
        }
    }
}
