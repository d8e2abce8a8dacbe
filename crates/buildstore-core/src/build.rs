//! Build records and build templates.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Layout of `creationTimestamp`, the Unix `date` format
/// (e.g. `Mon Jan  2 15:04:05 UTC 2006`).
pub const CREATION_TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Z %Y";

/// Render a point in time the way `creationTimestamp` stores it.
pub fn format_creation_timestamp(at: DateTime<Utc>) -> String {
    at.format(CREATION_TIMESTAMP_FORMAT).to_string()
}

/// A requested or completed build.
///
/// Empty strings and missing fields are both treated as "unset"; the storage
/// layer fills in `id`, `status` and `creation_timestamp` on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    /// Globally unique identifier. Immutable once assigned.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub id: String,
    /// Lifecycle state.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<BuildStatus>,
    /// When the build record was created, see [`CREATION_TIMESTAMP_FORMAT`].
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub creation_timestamp: String,
    /// What to build and how.
    #[serde(default)]
    pub config: BuildParameters,
}

impl Build {
    pub fn new(config: BuildParameters) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }
}

/// Build parameters embedded in a [`Build`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildParameters {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub build_type: Option<BuildType>,
    #[serde(rename = "sourceURI", default, skip_serializing_if = "String::is_empty")]
    pub source_uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub builder_image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_ref: String,
}

/// A named, reusable set of build parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    pub id: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub build_type: Option<BuildType>,
    #[serde(rename = "sourceURI", default)]
    pub source_uri: String,
    #[serde(default)]
    pub image_tag: String,
    #[serde(default)]
    pub builder_image: String,
    #[serde(default)]
    pub source_ref: String,
}

impl BuildConfig {
    /// The template's parameters, as they are copied onto a build.
    pub fn parameters(&self) -> BuildParameters {
        BuildParameters {
            build_type: self.build_type,
            source_uri: self.source_uri.clone(),
            image_tag: self.image_tag.clone(),
            builder_image: self.builder_image.clone(),
            source_ref: self.source_ref.clone(),
        }
    }
}

/// A collection of builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildList {
    pub items: Vec<Build>,
}

/// Lifecycle state of a build.
///
/// Only `New` is ever assigned here; the remaining states are driven by
/// whatever executes builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// Accepted, not yet scheduled.
    #[display("new")]
    New,
    /// Scheduled, waiting for resources.
    #[display("pending")]
    Pending,
    /// Currently executing.
    #[display("running")]
    Running,
    /// Completed successfully.
    #[display("complete")]
    Complete,
    /// The build itself failed.
    #[display("failed")]
    Failed,
    /// The build could not be run.
    #[display("error")]
    Error,
}

impl BuildStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BuildStatus::Complete | BuildStatus::Failed | BuildStatus::Error
        )
    }
}

impl FromStr for BuildStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(BuildStatus::New),
            "pending" => Ok(BuildStatus::Pending),
            "running" => Ok(BuildStatus::Running),
            "complete" => Ok(BuildStatus::Complete),
            "failed" => Ok(BuildStatus::Failed),
            "error" => Ok(BuildStatus::Error),
            other => Err(Error::InvalidInput(format!("unknown build status: {}", other))),
        }
    }
}

/// How a build produces its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// Plain `docker build` of the source.
    #[display("docker")]
    Docker,
    /// Source-to-image, using `builder_image`.
    #[display("sti")]
    Sti,
}

impl FromStr for BuildType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docker" => Ok(BuildType::Docker),
            "sti" => Ok(BuildType::Sti),
            other => Err(Error::InvalidInput(format!("unknown build type: {}", other))),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
