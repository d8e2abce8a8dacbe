//! REST storage for builds.

use async_trait::async_trait;
use buildstore_core::build::format_creation_timestamp;
use buildstore_core::{BuildStatus, Resource, ResourceId, Result, Selector, Status};
use buildstore_registry::{BuildConfigRegistry, BuildRegistry};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{AsyncResult, ParserRegistry, QueryParams, RestStorage, make_async};

/// Query parameter naming the parser plugin for the payload.
pub const PLUGIN_PARAM: &str = "plugin";

/// Query parameter naming the template a new build inherits its parameters from.
pub const BUILD_CONFIG_ID_PARAM: &str = "build_config_id";

/// Serves `Build` resources out of a [`BuildRegistry`].
pub struct BuildStorage {
    registry: Arc<dyn BuildRegistry>,
    build_config_registry: Arc<dyn BuildConfigRegistry>,
    parsers: ParserRegistry,
}

impl BuildStorage {
    pub fn new(
        registry: Arc<dyn BuildRegistry>,
        build_config_registry: Arc<dyn BuildConfigRegistry>,
    ) -> Self {
        Self::with_parsers(registry, build_config_registry, ParserRegistry::new())
    }

    /// Create a storage that also accepts payloads through the given parser plugins.
    pub fn with_parsers(
        registry: Arc<dyn BuildRegistry>,
        build_config_registry: Arc<dyn BuildConfigRegistry>,
        parsers: ParserRegistry,
    ) -> Self {
        let mut plugins: Vec<&str> = parsers.plugin_names().collect();
        if !plugins.is_empty() {
            plugins.sort_unstable();
            info!(?plugins, "Registered payload parser plugins");
        }
        Self {
            registry,
            build_config_registry,
            parsers,
        }
    }
}

#[async_trait]
impl RestStorage for BuildStorage {
    async fn list(&self, selector: &Selector) -> Result<Resource> {
        // Builds carry no labels, so the selector is not applied.
        if !selector.is_empty() {
            debug!(%selector, "Ignoring label selector for builds");
        }
        let builds = self.registry.list_builds().await?;
        Ok(builds.into())
    }

    async fn get(&self, id: &str) -> Result<Resource> {
        let build = self.registry.get_build(id).await?;
        Ok(build.into())
    }

    fn delete(&self, id: &str) -> Result<AsyncResult> {
        let registry = self.registry.clone();
        let id = id.to_string();

        Ok(make_async(async move {
            registry
                .delete_build(&id)
                .await
                .inspect_err(|e| warn!(build_id = %id, error = %e, "Failed to delete build"))?;
            info!(build_id = %id, "Deleted build");
            Ok(Status::success().into())
        }))
    }

    async fn extract(&self, body: &[u8], params: &QueryParams) -> Result<Resource> {
        let parser = self.parsers.get(params.first(PLUGIN_PARAM))?;
        let mut build = parser.parse(body)?.into_build()?;

        if let Some(build_config_id) = params.first(BUILD_CONFIG_ID_PARAM) {
            info!(%build_config_id, "Resolving build template");
            let template = self
                .build_config_registry
                .get_build_config(build_config_id)
                .await?;
            debug!(?template, "Resolved build template");
            build.config = template.parameters();
        }

        Ok(build.into())
    }

    fn create(&self, obj: Resource) -> Result<AsyncResult> {
        let mut build = obj.into_build()?;

        if build.id.is_empty() {
            build.id = ResourceId::new().to_string();
        }
        if build.status.is_none() {
            build.status = Some(BuildStatus::New);
        }
        if build.creation_timestamp.is_empty() {
            build.creation_timestamp = format_creation_timestamp(Utc::now());
        }

        let registry = self.registry.clone();
        Ok(make_async(async move {
            registry
                .create_build(&build)
                .await
                .inspect_err(|e| warn!(build_id = %build.id, error = %e, "Failed to create build"))?;
            info!(build_id = %build.id, "Created build");
            Ok(build.into())
        }))
    }

    fn update(&self, obj: Resource) -> Result<AsyncResult> {
        let build = obj.into_build()?;
        if build.id.is_empty() {
            return Err(buildstore_core::Error::InvalidInput(format!(
                "id should not be empty: {:?}",
                build
            )));
        }

        let registry = self.registry.clone();
        Ok(make_async(async move {
            registry
                .update_build(&build)
                .await
                .inspect_err(|e| warn!(build_id = %build.id, error = %e, "Failed to update build"))?;
            info!(build_id = %build.id, "Updated build");
            Ok(build.into())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PayloadParser;
    use buildstore_core::{
        Build, BuildConfig, BuildList, BuildParameters, BuildType, Error,
    };
    use buildstore_registry::{MemoryBuildConfigRegistry, MemoryBuildRegistry};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts registry calls and optionally fails every one of them.
    #[derive(Default)]
    struct MockRegistry {
        inner: MemoryBuildRegistry,
        calls: AtomicUsize,
        fail_with: Option<Error>,
    }

    impl MockRegistry {
        fn failing(err: Error) -> Self {
            Self {
                fail_with: Some(err),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl BuildRegistry for MockRegistry {
        async fn list_builds(&self) -> Result<BuildList> {
            self.record()?;
            self.inner.list_builds().await
        }

        async fn get_build(&self, id: &str) -> Result<Build> {
            self.record()?;
            self.inner.get_build(id).await
        }

        async fn create_build(&self, build: &Build) -> Result<()> {
            self.record()?;
            self.inner.create_build(build).await
        }

        async fn update_build(&self, build: &Build) -> Result<()> {
            self.record()?;
            self.inner.update_build(build).await
        }

        async fn delete_build(&self, id: &str) -> Result<()> {
            self.record()?;
            self.inner.delete_build(id).await
        }
    }

    fn tpl1() -> BuildConfig {
        BuildConfig {
            id: "tpl1".to_string(),
            build_type: Some(BuildType::Docker),
            source_uri: "https://y".to_string(),
            image_tag: "latest".to_string(),
            builder_image: "b1".to_string(),
            source_ref: "main".to_string(),
        }
    }

    fn storage_with(registry: Arc<MockRegistry>) -> BuildStorage {
        BuildStorage::new(registry, Arc::new(MemoryBuildConfigRegistry::new([tpl1()])))
    }

    fn storage() -> (BuildStorage, Arc<MockRegistry>) {
        let registry = Arc::new(MockRegistry::default());
        (storage_with(registry.clone()), registry)
    }

    fn build_with_id(id: &str) -> Build {
        Build {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_extract_decodes_payload_verbatim() {
        let (storage, _) = storage();
        let build = storage
            .extract(
                br#"{"config":{"type":"docker","sourceURI":"https://x"}}"#,
                &QueryParams::new(),
            )
            .await
            .unwrap()
            .into_build()
            .unwrap();

        assert_eq!(
            build,
            Build::new(BuildParameters {
                build_type: Some(BuildType::Docker),
                source_uri: "https://x".to_string(),
                ..Default::default()
            })
        );
        assert!(build.id.is_empty());
        assert!(build.status.is_none());
    }

    #[tokio::test]
    async fn test_extract_inherits_template_parameters() {
        let (storage, _) = storage();
        let params = QueryParams::new().with(BUILD_CONFIG_ID_PARAM, "tpl1");

        let build = storage
            .extract(b"{}", &params)
            .await
            .unwrap()
            .into_build()
            .unwrap();

        assert_eq!(build.config, tpl1().parameters());
    }

    #[tokio::test]
    async fn test_extract_template_overrides_payload() {
        let (storage, _) = storage();
        let params = QueryParams::new().with(BUILD_CONFIG_ID_PARAM, "tpl1");
        let payload = br#"{
            "id": "keep-me",
            "config": {
                "type": "sti",
                "sourceURI": "https://other",
                "imageTag": "v2",
                "builderImage": "b2",
                "sourceRef": "dev"
            }
        }"#;

        let build = storage
            .extract(payload, &params)
            .await
            .unwrap()
            .into_build()
            .unwrap();

        assert_eq!(build.id, "keep-me");
        assert_eq!(build.config, tpl1().parameters());
    }

    #[tokio::test]
    async fn test_extract_template_clears_fields_the_template_leaves_empty() {
        let sparse = BuildConfig {
            id: "sparse".to_string(),
            source_uri: "https://z".to_string(),
            ..Default::default()
        };
        let storage = BuildStorage::new(
            Arc::new(MockRegistry::default()),
            Arc::new(MemoryBuildConfigRegistry::new([sparse])),
        );
        let params = QueryParams::new().with(BUILD_CONFIG_ID_PARAM, "sparse");

        let build = storage
            .extract(br#"{"config":{"type":"docker","imageTag":"v1"}}"#, &params)
            .await
            .unwrap()
            .into_build()
            .unwrap();

        assert_eq!(build.config.build_type, None);
        assert_eq!(build.config.image_tag, "");
        assert_eq!(build.config.source_uri, "https://z");
    }

    #[tokio::test]
    async fn test_extract_unknown_template_fails() {
        let (storage, _) = storage();
        let params = QueryParams::new().with(BUILD_CONFIG_ID_PARAM, "missing");

        let err = storage.extract(b"{}", &params).await.unwrap_err();
        assert_eq!(err, Error::NotFound("build config missing".to_string()));
    }

    #[tokio::test]
    async fn test_extract_malformed_payload_fails() {
        let (storage, _) = storage();
        let params = QueryParams::new().with(BUILD_CONFIG_ID_PARAM, "tpl1");

        let err = storage.extract(b"{not json", &params).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_extract_unknown_plugin_fails() {
        let (storage, _) = storage();
        let params = QueryParams::new().with(PLUGIN_PARAM, "yaml");

        let err = storage.extract(b"{}", &params).await.unwrap_err();
        assert_eq!(err, Error::UnknownParser("yaml".to_string()));
    }

    struct SourceUriParser;

    impl PayloadParser for SourceUriParser {
        fn parse(&self, body: &[u8]) -> Result<Resource> {
            let uri = std::str::from_utf8(body)
                .map_err(|e| Error::Decode(e.to_string()))?
                .trim();
            Ok(Build::new(BuildParameters {
                source_uri: uri.to_string(),
                ..Default::default()
            })
            .into())
        }
    }

    #[tokio::test]
    async fn test_extract_through_plugin() {
        let storage = BuildStorage::with_parsers(
            Arc::new(MockRegistry::default()),
            Arc::new(MemoryBuildConfigRegistry::default()),
            ParserRegistry::new().with_parser("uri", Arc::new(SourceUriParser)),
        );
        let params = QueryParams::new().with(PLUGIN_PARAM, "uri");

        let build = storage
            .extract(b"https://plain.example/repo.git\n", &params)
            .await
            .unwrap()
            .into_build()
            .unwrap();

        assert_eq!(build.config.source_uri, "https://plain.example/repo.git");
    }

    #[tokio::test]
    async fn test_create_assigns_defaults() {
        let (storage, registry) = storage();

        let stored = storage
            .create(Build::default().into())
            .unwrap()
            .await
            .unwrap()
            .into_build()
            .unwrap();

        assert!(!stored.id.is_empty());
        assert_eq!(stored.status, Some(BuildStatus::New));
        assert!(!stored.creation_timestamp.is_empty());
        assert_eq!(registry.inner.get_build(&stored.id).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_create_assigns_unique_ids() {
        let (storage, _) = storage();
        let mut ids = HashSet::new();

        for _ in 0..100 {
            let stored = storage
                .create(Build::default().into())
                .unwrap()
                .await
                .unwrap()
                .into_build()
                .unwrap();
            assert!(ids.insert(stored.id));
        }
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_fields() {
        let (storage, _) = storage();
        let build = Build {
            id: "b1".to_string(),
            status: Some(BuildStatus::Running),
            creation_timestamp: "Mon Jan  2 15:04:05 UTC 2006".to_string(),
            config: BuildParameters::default(),
        };

        let stored = storage
            .create(build.clone().into())
            .unwrap()
            .await
            .unwrap()
            .into_build()
            .unwrap();

        assert_eq!(stored, build);
    }

    #[tokio::test]
    async fn test_create_rejects_other_kinds_synchronously() {
        let (storage, registry) = storage();

        let err = storage.create(Status::success().into()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = storage.create(BuildList::default().into()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        tokio::task::yield_now().await;
        assert_eq!(registry.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_registry_failure_resolves_handle() {
        let failure = Error::Storage("connection reset".to_string());
        let registry = Arc::new(MockRegistry::failing(failure.clone()));
        let storage = storage_with(registry.clone());

        let handle = storage.create(Build::default().into()).unwrap();
        assert_eq!(handle.await.unwrap_err(), failure);
        assert_eq!(registry.calls(), 1);
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let (storage, registry) = storage();

        let err = storage.update(Build::default().into()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("id should not be empty")));

        tokio::task::yield_now().await;
        assert_eq!(registry.calls(), 0);
    }

    #[tokio::test]
    async fn test_update_rejects_other_kinds_synchronously() {
        let (storage, registry) = storage();

        let err = storage.update(Status::success().into()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        tokio::task::yield_now().await;
        assert_eq!(registry.calls(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_stored_build() {
        let (storage, registry) = storage();
        registry.inner.create_build(&build_with_id("b1")).await.unwrap();

        let replacement = Build {
            id: "b1".to_string(),
            status: Some(BuildStatus::Complete),
            ..Default::default()
        };
        let resolved = storage
            .update(replacement.clone().into())
            .unwrap()
            .await
            .unwrap();

        assert_eq!(resolved, Resource::Build(replacement.clone()));
        assert_eq!(registry.inner.get_build("b1").await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_update_does_not_default_fields() {
        let (storage, registry) = storage();
        registry.inner.create_build(&build_with_id("b1")).await.unwrap();

        let resolved = storage
            .update(build_with_id("b1").into())
            .unwrap()
            .await
            .unwrap()
            .into_build()
            .unwrap();

        assert_eq!(resolved.status, None);
        assert!(resolved.creation_timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_build_resolves_registry_error() {
        let (storage, _) = storage();

        let err = storage
            .update(build_with_id("ghost").into())
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(err, Error::NotFound("build ghost".to_string()));
    }

    #[tokio::test]
    async fn test_delete_resolves_success_status() {
        let (storage, registry) = storage();
        registry.inner.create_build(&build_with_id("b1")).await.unwrap();

        let resolved = storage.delete("b1").unwrap().await.unwrap();
        assert_eq!(resolved, Resource::Status(Status::success()));
        assert!(registry.inner.get_build("b1").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_registry_failure_resolves_handle() {
        let (storage, _) = storage();

        let err = storage.delete("ghost").unwrap().await.unwrap_err();
        assert_eq!(err, Error::NotFound("build ghost".to_string()));
    }

    #[tokio::test]
    async fn test_get_returns_stored_build() {
        let (storage, registry) = storage();
        registry.inner.create_build(&build_with_id("b1")).await.unwrap();

        let resource = storage.get("b1").await.unwrap();
        assert_eq!(resource, Resource::Build(build_with_id("b1")));
    }

    #[tokio::test]
    async fn test_get_passes_registry_error_through() {
        let failure = Error::Storage("replica lagging".to_string());
        let storage = storage_with(Arc::new(MockRegistry::failing(failure.clone())));

        assert_eq!(storage.get("b1").await.unwrap_err(), failure);
    }

    #[tokio::test]
    async fn test_list_returns_every_build_regardless_of_selector() {
        let (storage, registry) = storage();
        for id in ["b1", "b2"] {
            registry.inner.create_build(&build_with_id(id)).await.unwrap();
        }

        let selector = Selector::parse("app=web").unwrap();
        let resource = storage.list(&selector).await.unwrap();
        assert_eq!(
            resource,
            Resource::BuildList(BuildList {
                items: vec![build_with_id("b1"), build_with_id("b2")],
            })
        );
    }

    #[tokio::test]
    async fn test_list_passes_registry_error_through() {
        let failure = Error::Storage("timeout".to_string());
        let storage = storage_with(Arc::new(MockRegistry::failing(failure.clone())));

        let err = storage.list(&Selector::everything()).await.unwrap_err();
        assert_eq!(err, failure);
    }

    #[tokio::test]
    async fn test_extract_then_create_round_trip() {
        let (storage, registry) = storage();
        let params = QueryParams::new().with(BUILD_CONFIG_ID_PARAM, "tpl1");

        let extracted = storage.extract(b"{}", &params).await.unwrap();
        let stored = storage
            .create(extracted)
            .unwrap()
            .await
            .unwrap()
            .into_build()
            .unwrap();

        assert_eq!(stored.config, tpl1().parameters());
        assert_eq!(stored.status, Some(BuildStatus::New));
        assert_eq!(registry.inner.get_build(&stored.id).await.unwrap(), stored);
    }
}
