//! REST storage adapter for the Build resource.
//!
//! Turns generic resource requests into registry calls. Mutating operations
//! validate and default synchronously, then hand back an [`AsyncResult`] that
//! resolves once the registry call has finished on its own task.

pub mod build;
pub mod handle;
pub mod params;
pub mod parser;
pub mod rest;

pub use build::{BUILD_CONFIG_ID_PARAM, BuildStorage, PLUGIN_PARAM};
pub use handle::{AsyncResult, make_async};
pub use params::QueryParams;
pub use parser::{JsonBuildParser, ParserRegistry, PayloadParser};
pub use rest::RestStorage;
