//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk, applying
//! environment overrides and validating the result.
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path given as the first CLI argument (must exist)
//! 2. Default location (used only if it exists):
//!    - **Linux/macOS:** `~/.pokemon-tcg-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.pokemon-tcg-mcp\config.json`
//!
//! Without either, built-in defaults are used.
//!
//! # Environment Overrides
//!
//! | Variable             | Setting               |
//! |----------------------|-----------------------|
//! | `POKEMONTCG_API_KEY` | `upstream.api_key`    |
//! | `POKEMONTCG_API_URL` | `upstream.base_url`   |
//! | `PORT`               | `gateway.port`        |
//! | `TCG_GATEWAY_URL`    | `bridge.gateway_url`  |

mod settings;

pub use settings::{
    BridgeConfig, Config, GatewayConfig, LoggingConfig, UpstreamConfig, DEFAULT_API_URL,
    DEFAULT_GATEWAY_URL,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable holding the upstream API key.
pub const ENV_API_KEY: &str = "POKEMONTCG_API_KEY";
/// Environment variable overriding the upstream API base URL.
pub const ENV_API_URL: &str = "POKEMONTCG_API_URL";
/// Environment variable overriding the gateway listening port.
pub const ENV_PORT: &str = "PORT";
/// Environment variable overriding the gateway URL used by the bridge.
pub const ENV_GATEWAY_URL: &str = "TCG_GATEWAY_URL";

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.pokemon-tcg-mcp/`
/// - **Windows:** `%USERPROFILE%\.pokemon-tcg-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".pokemon-tcg-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads the configuration, applies process environment overrides and validates it.
///
/// If `path` is `None`, the default location is used when it exists and
/// built-in defaults otherwise.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given file cannot be found or read
/// - The JSON is malformed
/// - An environment override is malformed
/// - Validation fails
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_config_with_env(path, |name| std::env::var(name).ok())
}

/// Like [`load_config`], but reads environment overrides through `lookup`.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_with_env(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => read_config_file(p)?,
        None => match default_config_path() {
            Some(default_path) if default_path.exists() => read_config_file(&default_path)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, lookup)?;

    // Validate the configuration
    config.validate()?;

    Ok(config)
}

fn read_config_file(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        return Err(ConfigError::NotFound {
            path: config_path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.to_path_buf(),
        source: e,
    })
}

/// Applies environment overrides on top of file settings.
///
/// Empty values are ignored.
///
/// # Errors
///
/// Returns an error if `PORT` is not a valid port number.
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = get(ENV_API_KEY) {
        config.upstream.api_key = Some(key);
    }
    if let Some(url) = get(ENV_API_URL) {
        config.upstream.base_url = url;
    }
    if let Some(url) = get(ENV_GATEWAY_URL) {
        config.bridge.gateway_url = url;
    }
    if let Some(port) = get(ENV_PORT) {
        config.gateway.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: ENV_PORT,
            reason: format!("'{port}' is not a port number"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn default_config_path_exists() {
        let path = default_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("config.json"));
    }

    #[test]
    fn env_overrides_applied() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (ENV_API_KEY, "abc123"),
                (ENV_PORT, "8081"),
                (ENV_GATEWAY_URL, "https://gw.example.com"),
                (ENV_API_URL, "https://api.example.com/v2"),
            ]),
        )
        .unwrap();

        assert_eq!(config.upstream.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.gateway.port, 8081);
        assert_eq!(config.bridge.gateway_url, "https://gw.example.com");
        assert_eq!(config.upstream.base_url, "https://api.example.com/v2");
    }

    #[test]
    fn empty_env_values_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[(ENV_API_KEY, "  ")])).unwrap();
        assert!(config.upstream.api_key.is_none());
    }

    #[test]
    fn invalid_port_rejected() {
        let mut config = Config::default();
        let err = apply_env_overrides(&mut config, env(&[(ENV_PORT, "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "PORT", .. }));
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load_config_with_env(Some(&missing), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn file_then_env_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "gateway": { "port": 7000 }, "bridge": { "gateway_url": "http://file.example.com" } }"#,
        )
        .unwrap();

        let config =
            load_config_with_env(Some(&path), env(&[(ENV_GATEWAY_URL, "http://env.example.com")]))
                .unwrap();
        assert_eq!(config.gateway.port, 7000);
        assert_eq!(config.bridge.gateway_url, "http://env.example.com");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_config_with_env(Some(&path), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
