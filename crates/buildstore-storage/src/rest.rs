//! The generic resource-storage capability set.

use async_trait::async_trait;
use buildstore_core::{Resource, Result, Selector};

use crate::{AsyncResult, QueryParams};

/// Operations a resource type implements to be served by the dispatch layer.
///
/// `create`, `update` and `delete` reject bad input synchronously and return
/// a handle for everything that involves the backing registry. They spawn
/// onto the current Tokio runtime.
#[async_trait]
pub trait RestStorage: Send + Sync {
    /// Objects matching `selector`.
    async fn list(&self, selector: &Selector) -> Result<Resource>;

    /// The object with the given id.
    async fn get(&self, id: &str) -> Result<Resource>;

    /// Remove the object with the given id.
    fn delete(&self, id: &str) -> Result<AsyncResult>;

    /// Decode a request payload into an object of this storage's kind.
    async fn extract(&self, body: &[u8], params: &QueryParams) -> Result<Resource>;

    /// Store a new object.
    fn create(&self, obj: Resource) -> Result<AsyncResult>;

    /// Replace an existing object.
    fn update(&self, obj: Resource) -> Result<AsyncResult>;
}
