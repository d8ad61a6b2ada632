//! # Configuration Module
//!
//! Registration options for one contract ([`PluginConfig`]) and the service
//! configuration file read by the CLI ([`ServiceConfig`]).
//!
//! ## Example Configuration
//!
//! ```yaml
//! addr: 0.0.0.0:8080
//! spec: demos/petstore.yaml
//! stack_size: 32768
//! openapi:
//!   coerce: true
//!   log_level: info
//! logging:
//!   level: info
//!   format: pretty
//! ```
//!
//! ## Environment Variables
//!
//! ### `SPECROUTE_STACK_SIZE`
//!
//! Coroutine stack size in bytes, decimal (`32768`) or hexadecimal (`0x8000`).
//! Wins over `stack_size` from the file. Default: `0x4000`.

use crate::logging::LogConfig;
use crate::router::RouteId;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_STACK_SIZE: usize = 0x4000;
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Severity used when logging validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::LogLevel(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("unknown log level {0:?}")]
    LogLevel(String),
}

/// Options for registering one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Convert string inputs to their schema types before validation
    pub coerce: bool,
    /// Level validation failures are logged at
    pub log_level: LogLevel,
    /// Existing scope to mount under; only settable in code
    #[serde(skip)]
    pub route: Option<RouteId>,
    /// Contract source: a file path or `file://` URL
    pub url: Option<String>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            coerce: true,
            log_level: LogLevel::default(),
            route: None,
            url: None,
        }
    }
}

impl PluginConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_route(mut self, route: RouteId) -> Self {
        self.route = Some(route);
        self
    }

    #[must_use]
    pub fn with_coerce(mut self, coerce: bool) -> Self {
        self.coerce = coerce;
        self
    }

    #[must_use]
    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }
}

/// Service configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub addr: String,
    /// Contract source, used when `openapi.url` is unset
    pub spec: Option<String>,
    pub openapi: PluginConfig,
    pub logging: LogConfig,
    pub stack_size: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            spec: None,
            openapi: PluginConfig::default(),
            logging: LogConfig::default(),
            stack_size: None,
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Contract source: `openapi.url`, else `spec`.
    #[must_use]
    pub fn contract_source(&self) -> Option<&str> {
        self.openapi.url.as_deref().or(self.spec.as_deref())
    }

    /// Effective coroutine stack size.
    #[must_use]
    pub fn stack_size(&self) -> usize {
        env::var("SPECROUTE_STACK_SIZE")
            .ok()
            .and_then(|v| parse_stack_size(&v))
            .or(self.stack_size)
            .unwrap_or(DEFAULT_STACK_SIZE)
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal size.
#[must_use]
pub fn parse_stack_size(value: &str) -> Option<usize> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}
