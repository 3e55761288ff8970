//! HTTP client the bridge uses to reach the data gateway.
//!
//! Every tool call becomes exactly one `GET`. The outcome is classified so
//! that logs and tests can tell the failure modes apart, even though the
//! protocol layer reports all of them with the same error code:
//!
//! - Timeout → [`UpstreamError::Timeout`]
//! - Connection and other transport failures → [`UpstreamError::Transport`]
//! - Non-2xx status → [`UpstreamError::Status`]
//! - 2xx without a JSON content type → [`UpstreamError::NotJson`]
//! - JSON content type with an unparseable body → [`UpstreamError::MalformedJson`]
//!
//! Requests are never retried.

use std::time::Duration;

use reqwest::{header, Client, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::BridgeConfig;
use crate::error::ConfigError;

/// Maximum number of body characters kept for diagnostics.
pub const EXCERPT_CHARS: usize = 200;

/// Failure of a single gateway call.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The gateway did not answer within the configured timeout.
    #[error("gateway request timed out after {}s", .timeout.as_secs_f32())]
    Timeout {
        /// The configured timeout.
        timeout: Duration,
    },

    /// The gateway could not be reached.
    #[error("could not connect to the gateway: {0}")]
    Transport(#[source] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("gateway returned an error: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        excerpt: String,
    },

    /// The gateway answered 2xx with a body that is not declared as JSON.
    #[error("gateway returned a non-JSON response ({content_type})")]
    NotJson {
        /// The declared content type, or `<none>`.
        content_type: String,
        /// Start of the response body.
        excerpt: String,
    },

    /// The body was declared as JSON but could not be parsed.
    #[error("gateway sent an invalid JSON response")]
    MalformedJson(#[source] serde_json::Error),

    /// The request URL could not be built.
    #[error("cannot build gateway URL from {0}")]
    InvalidUrl(String),
}

impl UpstreamError {
    /// Short machine-readable name of the failure, used in error `data`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::NotJson { .. } => "not_json",
            Self::MalformedJson(_) => "malformed_json",
            Self::InvalidUrl(_) => "invalid_url",
        }
    }

    /// HTTP status code, for [`UpstreamError::Status`].
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Returns `true` for `application/json` and `*/*+json` media types.
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type == "application/json" || media_type.ends_with("+json")
}

/// Returns at most [`EXCERPT_CHARS`] characters of `body`.
#[must_use]
pub fn excerpt(body: &str) -> String {
    body.chars().take(EXCERPT_CHARS).collect()
}

/// Client for the data gateway.
///
/// Built once at startup; holds no per-request state.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl GatewayClient {
    /// Creates a client for the gateway at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidUrl`] if `base_url` cannot carry path
    /// segments, or [`UpstreamError::Transport`] if the HTTP client cannot
    /// be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, UpstreamError> {
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pokemon-tcg-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(UpstreamError::Transport)?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Creates a client from the bridge configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway URL is invalid or the client cannot be built.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, ConfigError> {
        let url = config.url()?;
        Self::new(url, config.timeout()).map_err(|e| ConfigError::ValidationError {
            message: e.to_string(),
        })
    }

    /// Returns the gateway base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the URL for `segments` below the base URL.
    ///
    /// Each segment is percent-encoded, so ids containing `/` or `?` stay in
    /// their own segment.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidUrl`] if the base URL cannot carry segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issues one `GET` and returns the decoded JSON body.
    ///
    /// # Errors
    ///
    /// See [`UpstreamError`].
    pub async fn get_json(
        &self,
        segments: &[&str],
        query: &[(String, String)],
    ) -> Result<Value, UpstreamError> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, query = ?query, "Calling gateway");

        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| self.classify(e, &url))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| self.classify(e, &url))?;

        if !status.is_success() {
            warn!(
                url = %url,
                status = status.as_u16(),
                body = %excerpt(&body),
                "Gateway returned an error status"
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                excerpt: excerpt(&body),
            });
        }

        if !content_type.as_deref().is_some_and(is_json_content_type) {
            error!(
                url = %url,
                content_type = ?content_type,
                body = %excerpt(&body),
                "Gateway response was not JSON"
            );
            return Err(UpstreamError::NotJson {
                content_type: content_type.unwrap_or_else(|| "<none>".to_string()),
                excerpt: excerpt(&body),
            });
        }

        let value = serde_json::from_str(&body).map_err(|e| {
            error!(url = %url, error = %e, "Failed to decode gateway JSON");
            UpstreamError::MalformedJson(e)
        })?;

        debug!(url = %url, status = status.as_u16(), "Gateway call succeeded");
        Ok(value)
    }

    fn classify(&self, error: reqwest::Error, url: &Url) -> UpstreamError {
        if error.is_timeout() {
            warn!(
                url = %url,
                timeout_secs = self.timeout.as_secs(),
                "Gateway request timed out"
            );
            UpstreamError::Timeout {
                timeout: self.timeout,
            }
        } else {
            error!(url = %url, error = %error, "Gateway request failed");
            UpstreamError::Transport(error)
        }
    }
}
