//! Build registry.

use async_trait::async_trait;
use buildstore_core::{Build, BuildList, BuildStatus, Result};
use sqlx::PgPool;

use crate::{DbError, DbResult};

/// Durable store of build records, keyed by id.
#[async_trait]
pub trait BuildRegistry: Send + Sync {
    async fn list_builds(&self) -> Result<BuildList>;
    async fn get_build(&self, id: &str) -> Result<Build>;
    async fn create_build(&self, build: &Build) -> Result<()>;
    async fn update_build(&self, build: &Build) -> Result<()>;
    async fn delete_build(&self, id: &str) -> Result<()>;
}

/// A build row in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BuildRecord {
    pub id: String,
    pub status: String,
    pub creation_timestamp: String,
    pub config: serde_json::Value,
}

impl BuildRecord {
    fn from_build(build: &Build) -> DbResult<Self> {
        let config = serde_json::to_value(&build.config)
            .map_err(|e| DbError::Corrupt(format!("build {}: {}", build.id, e)))?;
        Ok(Self {
            id: build.id.clone(),
            status: build.status.map(|s| s.to_string()).unwrap_or_default(),
            creation_timestamp: build.creation_timestamp.clone(),
            config,
        })
    }

    fn into_build(self) -> DbResult<Build> {
        let status = if self.status.is_empty() {
            None
        } else {
            Some(
                self.status
                    .parse::<BuildStatus>()
                    .map_err(|e| DbError::Corrupt(format!("build {}: {}", self.id, e)))?,
            )
        };
        let config = serde_json::from_value(self.config)
            .map_err(|e| DbError::Corrupt(format!("build {}: {}", self.id, e)))?;
        Ok(Build {
            id: self.id,
            status,
            creation_timestamp: self.creation_timestamp,
            config,
        })
    }
}

/// PostgreSQL implementation of BuildRegistry.
pub struct PgBuildRegistry {
    pool: PgPool,
}

impl PgBuildRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BuildRegistry for PgBuildRegistry {
    async fn list_builds(&self) -> Result<BuildList> {
        let records = sqlx::query_as::<_, BuildRecord>("SELECT * FROM builds ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;
        let items = records
            .into_iter()
            .map(BuildRecord::into_build)
            .collect::<DbResult<Vec<_>>>()?;
        Ok(BuildList { items })
    }

    async fn get_build(&self, id: &str) -> Result<Build> {
        let record = sqlx::query_as::<_, BuildRecord>("SELECT * FROM builds WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DbError::NotFound(format!("build {}", id)))?;
        Ok(record.into_build()?)
    }

    async fn create_build(&self, build: &Build) -> Result<()> {
        let record = BuildRecord::from_build(build)?;
        sqlx::query(
            r#"
            INSERT INTO builds (id, status, creation_timestamp, config)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.id)
        .bind(&record.status)
        .bind(&record.creation_timestamp)
        .bind(&record.config)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if duplicate {
                DbError::Duplicate(format!("build {}", record.id))
            } else {
                DbError::from(e)
            }
        })?;
        Ok(())
    }

    async fn update_build(&self, build: &Build) -> Result<()> {
        let record = BuildRecord::from_build(build)?;
        let result = sqlx::query(
            r#"
            UPDATE builds SET status = $2, creation_timestamp = $3, config = $4
            WHERE id = $1
            "#,
        )
        .bind(&record.id)
        .bind(&record.status)
        .bind(&record.creation_timestamp)
        .bind(&record.config)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("build {}", record.id)).into());
        }
        Ok(())
    }

    async fn delete_build(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM builds WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("build {}", id)).into());
        }
        Ok(())
    }
}
