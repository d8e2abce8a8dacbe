//! Core domain types for the buildstore Build resource.
//!
//! This crate contains:
//! - Resource identifiers and the shared error type
//! - The `Build` record and its embedded build parameters
//! - Build templates (`BuildConfig`)
//! - The `Resource` envelope handed between the dispatch layer and storage
//! - Label selectors

pub mod build;
pub mod error;
pub mod id;
pub mod resource;
pub mod selector;

pub use build::{Build, BuildConfig, BuildList, BuildParameters, BuildStatus, BuildType};
pub use error::{Error, Result};
pub use id::ResourceId;
pub use resource::{Resource, Status};
pub use selector::Selector;
