//! System configuration parsing.

use crate::{ConfigError, ConfigResult};
use buildstore_core::{BuildConfig, BuildType};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

const DEFAULT_LISTEN: &str = "0.0.0.0:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// System-wide configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    /// Templates loaded into the template registry at startup.
    pub templates: Vec<BuildConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// How long a mutating request waits for its registry call.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Which registry backend to use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageConfig {
    #[default]
    Memory,
    Postgres {
        url: String,
        max_connections: u32,
    },
}

impl StorageConfig {
    /// PostgreSQL storage with the default pool size.
    pub fn postgres(url: impl Into<String>) -> Self {
        StorageConfig::Postgres {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Read and parse a system configuration file.
pub fn load_system_config(path: impl AsRef<Path>) -> ConfigResult<SystemConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_system_config(&text)
}

/// Parse system configuration from KDL text.
///
/// Every section is optional; anything left out keeps its default.
pub fn parse_system_config(kdl: &str) -> ConfigResult<SystemConfig> {
    let doc: KdlDocument = kdl.parse()?;
    let mut config = SystemConfig::default();
    let mut template_ids = HashSet::new();

    for node in doc.nodes() {
        match node.name().value() {
            "server" => {
                config.server = parse_server(node)?;
            }
            "storage" => {
                config.storage = parse_storage(node)?;
            }
            "logging" => {
                config.logging = parse_logging(node)?;
            }
            "template" => {
                let template = parse_template(node)?;
                if !template_ids.insert(template.id.clone()) {
                    return Err(ConfigError::Duplicate(format!("template '{}'", template.id)));
                }
                config.templates.push(template);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(config)
}

fn parse_server(node: &KdlNode) -> ConfigResult<ServerConfig> {
    let listen = get_string_prop(node, "listen").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let listen = listen.parse::<SocketAddr>().map_err(|_| ConfigError::InvalidValue {
        field: "server listen".to_string(),
        message: format!("not a socket address: {}", listen),
    })?;

    let timeout_secs = match get_int_prop(node, "request-timeout-secs") {
        Some(secs) => u64::try_from(secs)
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "server request-timeout-secs".to_string(),
                message: format!("must be a positive number of seconds, got {}", secs),
            })?,
        None => DEFAULT_REQUEST_TIMEOUT_SECS,
    };

    Ok(ServerConfig {
        listen,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn parse_storage(node: &KdlNode) -> ConfigResult<StorageConfig> {
    let backend = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("storage backend".to_string()))?;

    match backend.as_str() {
        "memory" => Ok(StorageConfig::Memory),
        "postgres" => {
            let url = get_string_prop(node, "url")
                .ok_or_else(|| ConfigError::MissingField("storage url".to_string()))?;
            let max_connections = match get_int_prop(node, "max-connections") {
                Some(n) => u32::try_from(n)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        field: "storage max-connections".to_string(),
                        message: format!("must be a positive integer, got {}", n),
                    })?,
                None => DEFAULT_MAX_CONNECTIONS,
            };
            Ok(StorageConfig::Postgres {
                url,
                max_connections,
            })
        }
        _ => Err(ConfigError::InvalidValue {
            field: "storage backend".to_string(),
            message: format!("unknown storage backend: {}", backend),
        }),
    }
}

fn parse_logging(node: &KdlNode) -> ConfigResult<LoggingConfig> {
    let defaults = LoggingConfig::default();
    let filter = get_string_prop(node, "filter").unwrap_or(defaults.filter);
    let format = match get_string_prop(node, "format").as_deref() {
        None | Some("pretty") => LogFormat::Pretty,
        Some("json") => LogFormat::Json,
        Some(other) => {
            return Err(ConfigError::InvalidValue {
                field: "logging format".to_string(),
                message: format!("unknown log format: {}", other),
            });
        }
    };
    Ok(LoggingConfig { filter, format })
}

fn parse_template(node: &KdlNode) -> ConfigResult<BuildConfig> {
    let id = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("template id".to_string()))?;

    let mut template = BuildConfig {
        id,
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let value = get_first_string_arg(child).unwrap_or_default();
            match child.name().value() {
                "type" if value.is_empty() => template.build_type = None,
                "type" => {
                    let build_type =
                        value
                            .parse::<BuildType>()
                            .map_err(|e| ConfigError::InvalidValue {
                                field: format!("type of template '{}'", template.id),
                                message: e.to_string(),
                            })?;
                    template.build_type = Some(build_type);
                }
                "source-uri" => template.source_uri = value,
                "image-tag" => template.image_tag = value,
                "builder-image" => template.builder_image = value,
                "source-ref" => template.source_ref = value,
                _ => {}
            }
        }
    }

    Ok(template)
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_int_prop(node: &KdlNode, name: &str) -> Option<i128> {
    node.get(name).and_then(|v| v.as_integer())
}
