//! In-memory registries, for development and tests.

use async_trait::async_trait;
use buildstore_core::{Build, BuildConfig, BuildList, Error, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{BuildConfigRegistry, BuildRegistry};

/// BuildRegistry backed by a map. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryBuildRegistry {
    builds: RwLock<HashMap<String, Build>>,
}

impl MemoryBuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BuildRegistry for MemoryBuildRegistry {
    async fn list_builds(&self) -> Result<BuildList> {
        let builds = self.builds.read().await;
        let mut items: Vec<Build> = builds.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(BuildList { items })
    }

    async fn get_build(&self, id: &str) -> Result<Build> {
        self.builds
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("build {}", id)))
    }

    async fn create_build(&self, build: &Build) -> Result<()> {
        let mut builds = self.builds.write().await;
        if builds.contains_key(&build.id) {
            return Err(Error::AlreadyExists(format!("build {}", build.id)));
        }
        builds.insert(build.id.clone(), build.clone());
        Ok(())
    }

    async fn update_build(&self, build: &Build) -> Result<()> {
        let mut builds = self.builds.write().await;
        match builds.get_mut(&build.id) {
            Some(existing) => {
                *existing = build.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("build {}", build.id))),
        }
    }

    async fn delete_build(&self, id: &str) -> Result<()> {
        self.builds
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("build {}", id)))
    }
}

/// BuildConfigRegistry backed by a fixed set of templates.
#[derive(Default)]
pub struct MemoryBuildConfigRegistry {
    configs: HashMap<String, BuildConfig>,
}

impl MemoryBuildConfigRegistry {
    pub fn new(configs: impl IntoIterator<Item = BuildConfig>) -> Self {
        Self {
            configs: configs.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }
}

#[async_trait]
impl BuildConfigRegistry for MemoryBuildConfigRegistry {
    async fn get_build_config(&self, id: &str) -> Result<BuildConfig> {
        self.configs
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("build config {}", id)))
    }
}
