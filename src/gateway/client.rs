//! Client for the public Pokémon TCG API.
//!
//! A 404 from the API is reported as `Ok(None)` so handlers can answer with a
//! `not_found` envelope; every other failure is an [`ApiError`].

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::models::{ApiItem, ApiPage, Card, CardSet};
use crate::config::UpstreamConfig;
use crate::error::ConfigError;
use crate::mcp::upstream::excerpt;

/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: u32 = 250;

/// Upper bound on pages fetched when walking the full set list.
const MAX_SET_PAGES: u32 = 20;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Failure of an upstream API call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No answer within the configured timeout.
    #[error("upstream request timed out after {}s", .timeout.as_secs_f32())]
    Timeout { timeout: Duration },

    /// Connection or protocol failure.
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Non-success status other than 404.
    #[error("upstream returned {status}: {excerpt}")]
    Status { status: u16, excerpt: String },

    /// The body did not match the expected shape.
    #[error("cannot decode upstream response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request URL could not be built.
    #[error("cannot build upstream URL from {0}")]
    InvalidUrl(String),
}

/// Name catalogs exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Types,
    Supertypes,
    Subtypes,
    Rarities,
}

impl Catalog {
    /// Path segment and response key.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Types => "types",
            Self::Supertypes => "supertypes",
            Self::Subtypes => "subtypes",
            Self::Rarities => "rarities",
        }
    }
}

/// Card search filters. Empty fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub name: Option<String>,
    pub set: Option<String>,
    pub card_type: Option<String>,
    pub rarity: Option<String>,
}

impl CardFilter {
    /// Builds the API's Lucene-style `q` parameter.
    ///
    /// Values are quoted so multi-word names match as phrases, with any
    /// double quotes in them removed. Returns `None` when no filter is set.
    #[must_use]
    pub fn to_query(&self) -> Option<String> {
        let clauses: Vec<String> = [
            ("name", &self.name),
            ("set.name", &self.set),
            ("types", &self.card_type),
            ("rarity", &self.rarity),
        ]
        .into_iter()
        .filter_map(|(field, value)| phrase(field, value.as_deref()?))
        .collect();

        (!clauses.is_empty()).then(|| clauses.join(" "))
    }
}

/// Client for the Pokémon TCG API.
#[derive(Debug, Clone)]
pub struct TcgApiClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl TcgApiClient {
    /// Creates a client from the upstream configuration.
    ///
    /// The API key, when present, is sent on every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or API key is invalid, or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        let base_url = config.url()?;

        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let mut value =
                HeaderValue::from_str(key).map_err(|_| ConfigError::ValidationError {
                    message: "upstream.api_key contains characters not allowed in a header"
                        .to_string(),
                })?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .user_agent(concat!("pokemon-tcg-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::ValidationError {
                message: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GETs `segments` and decodes the body. A 404 yields `Ok(None)`.
    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Option<T>, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, query = ?query, "Calling upstream API");

        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if status == StatusCode::NOT_FOUND {
            debug!(url = %url, "Upstream returned 404");
            return Ok(None);
        }
        if !status.is_success() {
            let text = excerpt(&String::from_utf8_lossy(&body));
            warn!(url = %url, status = status.as_u16(), body = %text, "Upstream API error");
            return Err(ApiError::Status {
                status: status.as_u16(),
                excerpt: text,
            });
        }

        serde_json::from_slice(&body).map(Some).map_err(|e| {
            warn!(url = %url, error = %e, "Cannot decode upstream response");
            ApiError::Decode(e)
        })
    }

    fn classify(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout {
                timeout: self.timeout,
            }
        } else {
            ApiError::Request(error)
        }
    }

    /// Searches cards. `page` is 1-based; `page_size` is clamped to `1..=250`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn search_cards(
        &self,
        filter: &CardFilter,
        page: u32,
        page_size: u32,
    ) -> Result<ApiPage<Card>, ApiError> {
        let mut query = vec![
            ("page", page.max(1).to_string()),
            ("pageSize", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(q) = filter.to_query() {
            query.push(("q", q));
        }
        Ok(self
            .get(&["cards"], &query)
            .await?
            .unwrap_or_else(empty_page))
    }

    /// Fetches one card by id.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn card(&self, id: &str) -> Result<Option<Card>, ApiError> {
        let item: Option<ApiItem<Card>> = self.get(&["cards", id], &[]).await?;
        Ok(item.map(|i| i.data))
    }

    /// Returns the first card whose name matches `name`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn first_card_named(&self, name: &str) -> Result<Option<Card>, ApiError> {
        let filter = CardFilter {
            name: Some(name.to_string()),
            ..CardFilter::default()
        };
        let page = self.search_cards(&filter, 1, 1).await?;
        Ok(page.data.into_iter().next())
    }

    /// Fetches every set, optionally filtered by name, walking upstream pages.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn sets(&self, name: Option<&str>) -> Result<Vec<CardSet>, ApiError> {
        let q = name.and_then(|n| phrase("name", n));

        let mut sets = Vec::new();
        for page in 1..=MAX_SET_PAGES {
            let mut query = vec![
                ("page", page.to_string()),
                ("pageSize", MAX_PAGE_SIZE.to_string()),
            ];
            if let Some(q) = &q {
                query.push(("q", q.clone()));
            }

            let batch: ApiPage<CardSet> = self
                .get(&["sets"], &query)
                .await?
                .unwrap_or_else(empty_page);
            let fetched = batch.data.len();
            sets.extend(batch.data);

            if fetched == 0 || sets.len() as u64 >= batch.total_count {
                break;
            }
        }
        debug!(count = sets.len(), "Fetched set list");
        Ok(sets)
    }

    /// Fetches one set by id.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn set(&self, id: &str) -> Result<Option<CardSet>, ApiError> {
        let item: Option<ApiItem<CardSet>> = self.get(&["sets", id], &[]).await?;
        Ok(item.map(|i| i.data))
    }

    /// Fetches a name catalog.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn names(&self, catalog: Catalog) -> Result<Vec<String>, ApiError> {
        let item: Option<ApiItem<Vec<String>>> = self.get(&[catalog.name()], &[]).await?;
        Ok(item.map(|i| i.data).unwrap_or_default())
    }
}

/// `field:"value"` with quotes removed from `value`; `None` if nothing is left.
fn phrase(field: &str, value: &str) -> Option<String> {
    let value = value.replace('"', "");
    let value = value.trim();
    (!value.is_empty()).then(|| format!("{field}:\"{value}\""))
}

const fn empty_page<T>() -> ApiPage<T> {
    ApiPage {
        data: Vec::new(),
        page: 1,
        page_size: 0,
        count: 0,
        total_count: 0,
    }
}
