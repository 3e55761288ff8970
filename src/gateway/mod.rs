//! The data gateway: an HTTP service in front of the Pokémon TCG API.
//!
//! The gateway is stateless per request. It translates simple query strings
//! into upstream API calls and wraps every answer in a `{status, ...}`
//! envelope the bridge can hand to clients verbatim.

pub mod client;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pagination;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ConfigError;

pub use client::{ApiError, CardFilter, Catalog, TcgApiClient};
pub use error::GatewayError;
pub use pagination::{paginate, Paginated, Pagination};

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Upstream API client.
    pub api: TcgApiClient,
    /// Page size used when a list request has no `limit`.
    pub default_page_size: u32,
}

impl AppState {
    /// Builds the state from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            api: TcgApiClient::from_config(&config.upstream)?,
            default_page_size: config.gateway.default_page_size,
        })
    }
}

/// Builds the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/cards", get(handlers::search_cards))
        .route("/cards/{id}", get(handlers::get_card))
        .route("/card_price", get(handlers::card_price))
        .route("/sets", get(handlers::list_sets))
        .route("/sets/{id}", get(handlers::get_set))
        .route("/types", get(handlers::list_types))
        .route("/supertypes", get(handlers::list_supertypes))
        .route("/subtypes", get(handlers::list_subtypes))
        .route("/rarities", get(handlers::list_rarities))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
