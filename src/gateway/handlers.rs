//! Route handlers.
//!
//! Each handler makes at most a bounded number of upstream calls and answers
//! with an [`Envelope`]. Query strings that fail to parse are turned into
//! `bad_request` envelopes instead of axum's plain-text rejection.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use super::client::{Catalog, CardFilter, MAX_PAGE_SIZE};
use super::error::GatewayError;
use super::models::{CardBody, Empty, Envelope, PriceBody, SetBody, Status};
use super::pagination::{paginate, Paginated, Pagination};
use super::AppState;

type Shared = State<Arc<AppState>>;

/// Query parameters of `GET /cards`.
#[derive(Debug, Default, Deserialize)]
pub struct CardSearchParams {
    pub name: Option<String>,
    pub set: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub rarity: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query parameters of `GET /sets`.
#[derive(Debug, Default, Deserialize)]
pub struct SetListParams {
    pub name: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query parameters of `GET /card_price`.
#[derive(Debug, Default, Deserialize)]
pub struct CardPriceParams {
    pub card_name: Option<String>,
}

fn query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, GatewayError> {
    result
        .map(|Query(params)| params)
        .map_err(|e| GatewayError::BadRequest(e.body_text()))
}

fn not_found(message: String) -> Response {
    debug!(%message, "Not found");
    Json(Envelope::with_message(Status::NotFound, Empty {}, message)).into_response()
}

/// `GET /`
pub async fn home() -> &'static str {
    "Pokémon TCG gateway is running"
}

/// `GET /cards`
pub async fn search_cards(
    State(state): Shared,
    params: Result<Query<CardSearchParams>, QueryRejection>,
) -> Result<Response, GatewayError> {
    let params = query(params)?;
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(state.default_page_size);
    let filter = CardFilter {
        name: params.name,
        set: params.set,
        card_type: params.card_type,
        rarity: params.rarity,
    };

    let result = state.api.search_cards(&filter, page, limit).await?;
    let (data, per_page) = if limit == 0 {
        (Vec::new(), 0)
    } else {
        (result.data, limit.min(MAX_PAGE_SIZE))
    };
    info!(
        query = ?filter.to_query(),
        page,
        returned = data.len(),
        total = result.total_count,
        "Card search"
    );

    let body = Paginated {
        data,
        pagination: Pagination::new(result.total_count, page, per_page),
    };
    Ok(Json(Envelope::success(body)).into_response())
}

/// `GET /cards/{id}`
pub async fn get_card(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Response, GatewayError> {
    Ok(match state.api.card(&id).await? {
        Some(card) => Json(Envelope::success(CardBody { card })).into_response(),
        None => not_found(format!("Card with ID '{id}' not found")),
    })
}

/// `GET /card_price?card_name=`
pub async fn card_price(
    State(state): Shared,
    params: Result<Query<CardPriceParams>, QueryRejection>,
) -> Result<Response, GatewayError> {
    let name = query(params)?
        .card_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| GatewayError::BadRequest("card_name is required".to_string()))?;

    let Some(card) = state.api.first_card_named(&name).await? else {
        return Ok(not_found(format!("No card found with name '{name}'")));
    };

    let prices = card.market_prices();
    if prices.is_empty() {
        let message = format!("No price data available for '{}'", card.name);
        let body = PriceBody {
            card,
            prices: BTreeMap::new(),
        };
        return Ok(Json(Envelope::with_message(Status::NoPriceData, body, message)).into_response());
    }

    Ok(Json(Envelope::success(PriceBody { card, prices })).into_response())
}

/// `GET /sets`
pub async fn list_sets(
    State(state): Shared,
    params: Result<Query<SetListParams>, QueryRejection>,
) -> Result<Response, GatewayError> {
    let params = query(params)?;
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(state.default_page_size);

    let sets = state.api.sets(params.name.as_deref()).await?;
    info!(total = sets.len(), page, limit, "Set list");
    Ok(Json(Envelope::success(paginate(sets, page, limit))).into_response())
}

/// `GET /sets/{id}`
pub async fn get_set(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Response, GatewayError> {
    Ok(match state.api.set(&id).await? {
        Some(set) => Json(Envelope::success(SetBody { set })).into_response(),
        None => not_found(format!("Set with ID '{id}' not found")),
    })
}

async fn names(state: &AppState, catalog: Catalog) -> Result<Response, GatewayError> {
    let names = state.api.names(catalog).await?;
    let body = BTreeMap::from([(catalog.name(), names)]);
    Ok(Json(Envelope::success(body)).into_response())
}

/// `GET /types`
pub async fn list_types(State(state): Shared) -> Result<Response, GatewayError> {
    names(&state, Catalog::Types).await
}

/// `GET /supertypes`
pub async fn list_supertypes(State(state): Shared) -> Result<Response, GatewayError> {
    names(&state, Catalog::Supertypes).await
}

/// `GET /subtypes`
pub async fn list_subtypes(State(state): Shared) -> Result<Response, GatewayError> {
    names(&state, Catalog::Subtypes).await
}

/// `GET /rarities`
pub async fn list_rarities(State(state): Shared) -> Result<Response, GatewayError> {
    names(&state, Catalog::Rarities).await
}
