//! Registry traits and PostgreSQL implementations.

pub mod build;
pub mod build_config;

pub use build::{BuildRecord, BuildRegistry, PgBuildRegistry};
pub use build_config::{BuildConfigRecord, BuildConfigRegistry, PgBuildConfigRegistry};
