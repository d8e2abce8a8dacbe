//! KDL configuration parsing for buildstore.
//!
//! This crate handles parsing of the server's system configuration:
//! - HTTP listener and request timeout
//! - Registry backend (in-memory or PostgreSQL)
//! - Logging
//! - Build templates to seed the template registry with

pub mod error;
pub mod system;

pub use error::{ConfigError, ConfigResult};
pub use system::{
    LogFormat, LoggingConfig, ServerConfig, StorageConfig, SystemConfig, load_system_config,
    parse_system_config,
};
