//! Payload parsers selectable by name.

use buildstore_core::{Build, Error, Resource, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Turns a raw request payload into a resource.
pub trait PayloadParser: Send + Sync {
    fn parse(&self, body: &[u8]) -> Result<Resource>;
}

/// The standard decoder: a JSON-encoded [`Build`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBuildParser;

impl PayloadParser for JsonBuildParser {
    fn parse(&self, body: &[u8]) -> Result<Resource> {
        let build: Build = serde_json::from_slice(body)?;
        Ok(build.into())
    }
}

/// Named parser plugins plus the standard decoder.
pub struct ParserRegistry {
    standard: Arc<dyn PayloadParser>,
    plugins: HashMap<String, Arc<dyn PayloadParser>>,
}

impl ParserRegistry {
    /// A registry with only the standard JSON decoder and no plugins.
    pub fn new() -> Self {
        Self {
            standard: Arc::new(JsonBuildParser),
            plugins: HashMap::new(),
        }
    }

    /// Register `parser` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, parser: Arc<dyn PayloadParser>) {
        self.plugins.insert(name.into(), parser);
    }

    pub fn with_parser(mut self, name: impl Into<String>, parser: Arc<dyn PayloadParser>) -> Self {
        self.register(name, parser);
        self
    }

    /// Resolve a parser. No name, or an empty one, selects the standard decoder.
    pub fn get(&self, name: Option<&str>) -> Result<&dyn PayloadParser> {
        match name {
            None | Some("") => Ok(&*self.standard),
            Some(name) => self
                .plugins
                .get(name)
                .map(|p| &**p)
                .ok_or_else(|| Error::UnknownParser(name.to_string())),
        }
    }

    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
