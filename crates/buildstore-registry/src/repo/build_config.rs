//! Build-template registry.

use async_trait::async_trait;
use buildstore_core::{BuildConfig, BuildType, Result};
use sqlx::PgPool;

use crate::{DbError, DbResult};

/// Lookup of named build templates.
#[async_trait]
pub trait BuildConfigRegistry: Send + Sync {
    async fn get_build_config(&self, id: &str) -> Result<BuildConfig>;
}

/// A build template row in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BuildConfigRecord {
    pub id: String,
    pub build_type: String,
    pub source_uri: String,
    pub image_tag: String,
    pub builder_image: String,
    pub source_ref: String,
}

impl BuildConfigRecord {
    fn into_build_config(self) -> DbResult<BuildConfig> {
        let build_type = if self.build_type.is_empty() {
            None
        } else {
            Some(
                self.build_type
                    .parse::<BuildType>()
                    .map_err(|e| DbError::Corrupt(format!("build config {}: {}", self.id, e)))?,
            )
        };
        Ok(BuildConfig {
            id: self.id,
            build_type,
            source_uri: self.source_uri,
            image_tag: self.image_tag,
            builder_image: self.builder_image,
            source_ref: self.source_ref,
        })
    }
}

/// PostgreSQL implementation of BuildConfigRegistry.
pub struct PgBuildConfigRegistry {
    pool: PgPool,
}

impl PgBuildConfigRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a template, replacing any existing one with the same id.
    pub async fn upsert(&self, config: &BuildConfig) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO build_configs (id, build_type, source_uri, image_tag, builder_image, source_ref)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                build_type = EXCLUDED.build_type,
                source_uri = EXCLUDED.source_uri,
                image_tag = EXCLUDED.image_tag,
                builder_image = EXCLUDED.builder_image,
                source_ref = EXCLUDED.source_ref
            "#,
        )
        .bind(&config.id)
        .bind(config.build_type.map(|t| t.to_string()).unwrap_or_default())
        .bind(&config.source_uri)
        .bind(&config.image_tag)
        .bind(&config.builder_image)
        .bind(&config.source_ref)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl BuildConfigRegistry for PgBuildConfigRegistry {
    async fn get_build_config(&self, id: &str) -> Result<BuildConfig> {
        let record =
            sqlx::query_as::<_, BuildConfigRecord>("SELECT * FROM build_configs WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?
                .ok_or_else(|| DbError::NotFound(format!("build config {}", id)))?;
        Ok(record.into_build_config()?)
    }
}
