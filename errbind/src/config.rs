//! Daemon configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, the TOML
//! config file, `ERRBIND_*` environment variables, and CLI flags (applied by
//! `main`). Environment problems are collected so they can all be reported at
//! once.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "ERRBIND_";
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: expected {expected}, got '{value}'")]
    InvalidValue {
        key: String,
        expected: String,
        value: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Include the error message in responses for unregistered errors.
    pub expose_message: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            expose_message: true,
        }
    }
}

impl DaemonConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `ERRBIND_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Vec<ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`, returning every invalid value.
    ///
    /// Invalid values leave the current setting unchanged.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<ConfigError> {
        let mut env = EnvOverrides::new(lookup);
        if let Some(bind) = env.get_string("BIND") {
            self.server.bind = bind;
        }
        if let Some(level) = env.get_log_level("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = env.get_bool("LOG_JSON") {
            self.logging.json = json;
        }
        if let Some(expose) = env.get_bool("EXPOSE_MESSAGE") {
            self.fallback.expose_message = expose;
        }
        env.errors
    }

    /// Check values that serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if parse_log_level(&self.logging.level).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                expected: LOG_LEVELS.join("/"),
                value: self.logging.level.clone(),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "server.bind".to_string(),
                expected: "socket address (host:port)".to_string(),
                value: self.server.bind.clone(),
            })
    }
}

/// Reads prefixed variables and collects parse errors.
struct EnvOverrides<F> {
    lookup: F,
    errors: Vec<ConfigError>,
}

impl<F: Fn(&str) -> Option<String>> EnvOverrides<F> {
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            errors: Vec::new(),
        }
    }

    fn var_name(name: &str) -> String {
        format!("{ENV_PREFIX}{name}")
    }

    fn get_string(&self, name: &str) -> Option<String> {
        (self.lookup)(&Self::var_name(name)).filter(|v| !v.is_empty())
    }

    /// Accepts 1/true/yes/on and 0/false/no/off, case-insensitively.
    fn get_bool(&mut self, name: &str) -> Option<bool> {
        let var = Self::var_name(name);
        let value = (self.lookup)(&var)?;
        let parsed = parse_bool(&value);
        if parsed.is_none() {
            self.errors.push(ConfigError::InvalidValue {
                key: var,
                expected: "boolean (true/false/1/0/yes/no/on/off)".to_string(),
                value,
            });
        }
        parsed
    }

    fn get_log_level(&mut self, name: &str) -> Option<String> {
        let var = Self::var_name(name);
        let value = (self.lookup)(&var)?;
        let parsed = parse_log_level(&value);
        if parsed.is_none() {
            self.errors.push(ConfigError::InvalidValue {
                key: var,
                expected: LOG_LEVELS.join("/"),
                value,
            });
        }
        parsed
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_log_level(value: &str) -> Option<String> {
    let lower = value.trim().to_lowercase();
    LOG_LEVELS.contains(&lower.as_str()).then_some(lower)
}
