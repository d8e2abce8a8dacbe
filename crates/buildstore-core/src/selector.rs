//! Label selectors.

use std::collections::BTreeMap;
use std::fmt;

use crate::{Error, Result};

/// An equality-based label selector such as `app=web,tier=frontend`.
///
/// An empty selector selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: BTreeMap<String, String>,
}

impl Selector {
    /// A selector that matches every object.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Parse a comma separated list of `key=value` requirements.
    pub fn parse(s: &str) -> Result<Self> {
        let mut requirements = BTreeMap::new();

        for term in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (key, value) = term
                .split_once('=')
                .ok_or_else(|| Error::InvalidInput(format!("invalid selector term: {}", term)))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "selector term has no key: {}",
                    term
                )));
            }
            requirements.insert(key.to_string(), value.trim().to_string());
        }

        Ok(Self { requirements })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .requirements
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{}", terms.join(","))
    }
}
