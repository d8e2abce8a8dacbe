//! HTTP server exposing buildstore resources.
//!
//! Provides the REST API that dispatches requests to resource storages.

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;
