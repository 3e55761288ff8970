//! Error types for pokemon-tcg-mcp.
//!
//! Errors specific to one layer live next to that layer
//! ([`crate::mcp::transport::FrameError`], [`crate::mcp::tools::ToolError`],
//! [`crate::gateway::GatewayError`]). This module holds the errors shared by
//! both binaries.
//!
//! # Security Note
//!
//! Error messages never include the upstream API key. Variants that could
//! carry it describe the failing setting instead of echoing its value.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// An environment variable override could not be applied.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidEnv {
        /// Name of the environment variable.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn invalid_env_display_names_variable() {
        let error = ConfigError::InvalidEnv {
            name: "PORT",
            reason: "not a port number".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("PORT"));
        assert!(msg.contains("not a port number"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }
}
