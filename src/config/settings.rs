//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every section is optional; missing sections fall back to defaults that
//! point at the public Pokémon TCG API and a locally running gateway.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default base URL of the upstream Pokémon TCG API.
pub const DEFAULT_API_URL: &str = "https://api.pokemontcg.io/v2";

/// Default URL the bridge uses to reach the gateway.
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:5000";

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Upstream data API settings (used by the gateway).
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Gateway HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.upstream.url()?;
        self.bridge.url()?;

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "upstream.timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.bridge.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "bridge.timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.gateway.default_page_size == 0 {
            return Err(ConfigError::ValidationError {
                message: "gateway.default_page_size must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses a base URL and rejects ones that cannot carry path segments.
fn parse_base_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::ValidationError {
        message: format!("{field} '{raw}' is not a valid URL: {e}"),
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError {
            message: format!("{field} '{raw}' must be an absolute http(s) URL"),
        });
    }
    Ok(url)
}

/// Upstream Pokémon TCG API configuration.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API.
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// API key sent as `X-Api-Key`. Optional; the public API is rate limited without one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    /// Returns the parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn url(&self) -> Result<Url, ConfigError> {
        parse_base_url("upstream.base_url", &self.base_url)
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Hand-written so the API key never reaches a log line.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Gateway HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Page size used when a list request has no `limit`.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_page_size: default_page_size(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5000
}

const fn default_page_size() -> u32 {
    10
}

/// Bridge configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Base URL of the gateway the bridge forwards tool calls to.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Timeout for a single gateway call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BridgeConfig {
    /// Returns the parsed gateway URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `gateway_url` is not an absolute http(s) URL.
    pub fn url(&self) -> Result<Url, ConfigError> {
        parse_base_url("bridge.gateway_url", &self.gateway_url)
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional log file. When unset, logs go to stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
