//! Configuration management for the relay.
//!
//! Settings are layered with `figment`, lowest precedence first: built-in
//! defaults, an optional TOML file, the process environment, and finally
//! command-line flags. The result is validated once and then shared
//! read-only for the lifetime of the process.

use crate::cli::Cli;
use crate::priority::PriorityRules;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::Uncased,
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

/// Environment variables that must be set for the relay to start.
pub const REQUIRED_ENV_VARS: [&str; 3] = ["NTFY_BASE_URL", "NTFY_TOPIC", "NTFY_TOKEN"];

/// Typed environment variables and the configuration keys they populate.
/// The `NTFY_*` variables are read separately, as verbatim strings.
const ENV_KEYS: &[(&str, &str)] = &[
    ("LISTEN_HOST", "server.listen_host"),
    ("LISTEN_PORT", "server.listen_port"),
    ("LOG_LEVEL", "log_level"),
    ("METRICS_ENABLED", "metrics.enabled"),
    ("METRICS_LISTEN_ADDRESS", "metrics.listen_address"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<&'static str>),

    #[error("NTFY_BASE_URL is not a valid URL ({url}): {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error(transparent)]
    Figment(#[from] figment::Error),
}

/// The validated application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The logging filter used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Where and how to publish notifications.
    pub ntfy: NtfyConfig,
    /// The inbound HTTP listener.
    pub server: ServerConfig,
    /// The Prometheus endpoint.
    pub metrics: MetricsConfig,
    /// Ordered keyword rules used to pick a notification's priority.
    pub priority_rules: PriorityRules,
}

/// Connection settings for the ntfy server.
#[derive(Clone)]
pub struct NtfyConfig {
    pub base_url: Url,
    pub topic: String,
    pub token: String,
}

impl fmt::Debug for NtfyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NtfyConfig")
            .field("base_url", &self.base_url.as_str())
            .field("topic", &self.topic)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Configuration for the inbound HTTP listener.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen_host: String,
    pub listen_port: u16,
}

impl ServerConfig {
    /// The `host:port` string handed to the TCP listener.
    pub fn bind_address(&self) -> String {
        if self.listen_host.contains(':') && !self.listen_host.starts_with('[') {
            format!("[{}]:{}", self.listen_host, self.listen_port)
        } else {
            format!("{}:{}", self.listen_host, self.listen_port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 8008,
        }
    }
}

/// Configuration for the Prometheus metrics endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether to expose `/metrics`.
    pub enabled: bool,
    /// The address the metrics listener binds to.
    pub listen_address: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: SocketAddr::from(([127, 0, 0, 1], 9090)),
        }
    }
}

/// The shape extracted from figment before validation. The ntfy settings
/// are optional here so that every missing variable can be reported at once.
#[derive(Debug, Deserialize, Serialize)]
struct RawConfig {
    log_level: String,
    #[serde(default)]
    ntfy: RawNtfyConfig,
    server: ServerConfig,
    metrics: MetricsConfig,
    priority_rules: PriorityRules,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawNtfyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

impl RawNtfyConfig {
    /// Reads the `NTFY_*` variables without value parsing, so a topic such
    /// as `007` or a token such as `[abc]` reaches ntfy unchanged.
    fn from_env() -> Self {
        Self {
            base_url: Env::var("NTFY_BASE_URL"),
            topic: Env::var("NTFY_TOPIC"),
            token: Env::var("NTFY_TOKEN"),
        }
    }
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            ntfy: RawNtfyConfig::default(),
            server: ServerConfig::default(),
            metrics: MetricsConfig::default(),
            priority_rules: PriorityRules::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from every source, honouring CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(cli))
    }

    /// Builds the layered figment without extracting it.
    pub fn figment(cli: &Cli) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(RawConfig::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Self::env_provider())
            .merge(Serialized::default("ntfy", RawNtfyConfig::from_env()))
            .merge(cli.clone())
    }

    /// Maps the relay's unprefixed listener, logging and metrics variables
    /// onto config keys.
    pub fn env_provider() -> Env {
        Env::raw().filter_map(|key| {
            ENV_KEYS
                .iter()
                .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                .map(|(_, path)| Uncased::from(*path))
        })
    }

    /// Extracts and validates a configuration from `figment`.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let raw: RawConfig = figment.extract()?;

        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        let missing: Vec<&'static str> = REQUIRED_ENV_VARS
            .iter()
            .zip([&raw.ntfy.base_url, &raw.ntfy.topic, &raw.ntfy.token])
            .filter(|(_, value)| !present(value))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing));
        }

        // Presence was checked above.
        let base_url = raw.ntfy.base_url.unwrap_or_default();
        let base_url = Url::parse(&base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Config {
            log_level: raw.log_level,
            ntfy: NtfyConfig {
                base_url,
                topic: raw.ntfy.topic.unwrap_or_default(),
                token: raw.ntfy.token.unwrap_or_default(),
            },
            server: raw.server,
            metrics: raw.metrics,
            priority_rules: raw.priority_rules,
        })
    }
}
