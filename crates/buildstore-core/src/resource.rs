//! The resource envelope exchanged with the dispatch layer.

use serde::{Deserialize, Serialize};

use crate::build::{Build, BuildList};
use crate::{Error, Result};

/// Outcome status returned by operations that have no object to hand back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub status: String,
}

impl Status {
    pub const SUCCESS: &'static str = "success";

    pub fn success() -> Self {
        Self {
            status: Self::SUCCESS.to_string(),
        }
    }
}

/// Any object the storage layer accepts or produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Resource {
    Build(Build),
    BuildList(BuildList),
    Status(Status),
}

impl Resource {
    /// Name of the concrete kind, as it appears in the `kind` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Build(_) => "Build",
            Resource::BuildList(_) => "BuildList",
            Resource::Status(_) => "Status",
        }
    }

    /// Unwrap a build, rejecting every other kind.
    pub fn into_build(self) -> Result<Build> {
        match self {
            Resource::Build(build) => Ok(build),
            other => Err(Error::InvalidInput(format!(
                "not a build: {}",
                other.kind()
            ))),
        }
    }
}

impl From<Build> for Resource {
    fn from(build: Build) -> Self {
        Resource::Build(build)
    }
}

impl From<BuildList> for Resource {
    fn from(list: BuildList) -> Self {
        Resource::BuildList(list)
    }
}

impl From<Status> for Resource {
    fn from(status: Status) -> Self {
        Resource::Status(status)
    }
}
