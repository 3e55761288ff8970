//! Gateway routes against a mocked upstream API.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pokemon_tcg_mcp::config::UpstreamConfig;
use pokemon_tcg_mcp::gateway::{router, AppState, TcgApiClient};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Helpers
// =============================================================================

fn app(upstream: &MockServer) -> Router {
    app_with_key(upstream, None)
}

fn app_with_key(upstream: &MockServer, api_key: Option<&str>) -> Router {
    let api = TcgApiClient::from_config(&UpstreamConfig {
        base_url: format!("{}/v2", upstream.uri()),
        api_key: api_key.map(str::to_string),
        timeout_secs: 5,
    })
    .unwrap();
    router(AppState {
        api,
        default_page_size: 10,
    })
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn card(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name, "supertype": "Pokémon", "hp": "60"})
}

// =============================================================================
// Liveness
// =============================================================================

#[tokio::test]
async fn home_is_plain_text() {
    let upstream = MockServer::start().await;
    let response = app(&upstream)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("running"));
}

// =============================================================================
// Cards
// =============================================================================

#[tokio::test]
async fn card_search_builds_query_and_paginates() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cards"))
        .and(query_param("q", "name:\"Pikachu\" rarity:\"Common\""))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [card("a-1", "Pikachu"), card("a-2", "Pikachu"), card("a-3", "Pikachu")],
            "page": 2,
            "pageSize": 3,
            "count": 3,
            "totalCount": 10
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let (status, body) = get(
        app(&upstream),
        "/cards?name=Pikachu&rarity=Common&page=2&limit=3",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][0]["hp"], "60");
    assert_eq!(
        body["pagination"],
        json!({"total_items": 10, "total_pages": 4, "current_page": 2, "items_per_page": 3})
    );
}

#[tokio::test]
async fn card_search_defaults_to_first_page_of_ten() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cards"))
        .and(query_param("page", "1"))
        .and(query_param("pageSize", "10"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [], "totalCount": 0})),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let (status, body) = get(app(&upstream), "/cards?name=NoSuchCard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["pagination"]["total_items"], 0);
}

#[tokio::test]
async fn card_search_with_zero_limit_is_empty_single_page() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [card("a-1", "Pikachu")],
            "totalCount": 42
        })))
        .mount(&upstream)
        .await;

    let (_, body) = get(app(&upstream), "/cards?limit=0").await;
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert_eq!(body["pagination"]["items_per_page"], 0);
}

#[tokio::test]
async fn malformed_page_is_bad_request() {
    let upstream = MockServer::start().await;
    let (status, body) = get(app(&upstream), "/cards?page=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "bad_request");
}

#[tokio::test]
async fn card_by_id_passes_unknown_fields_through() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cards/base1-4"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": card("base1-4", "Charizard")})),
        )
        .mount(&upstream)
        .await;

    let (status, body) = get(app(&upstream), "/cards/base1-4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "card": card("base1-4", "Charizard")})
    );
}

#[tokio::test]
async fn unknown_card_is_not_found_with_200() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cards/zzz-999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;

    let (status, body) = get(app(&upstream), "/cards/zzz-999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_found");
    assert!(body["message"].as_str().unwrap().contains("zzz-999"));
}

#[tokio::test]
async fn upstream_failure_is_server_error_502() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&upstream)
        .await;

    let (status, body) = get(app(&upstream), "/cards/base1-4").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "server_error");
    assert!(body["message"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn api_key_is_forwarded() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/types"))
        .and(header("X-Api-Key", "k-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": ["Fire"]})))
        .expect(1)
        .mount(&upstream)
        .await;

    let (status, _) = get(app_with_key(&upstream, Some("k-123")), "/types").await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Prices
// =============================================================================

#[tokio::test]
async fn card_price_reports_market_prices() {
    let upstream = MockServer::start().await;
    let mut priced = card("base1-4", "Charizard");
    priced["tcgplayer"] = json!({
        "prices": {
            "holofoil": {"low": 200.0, "market": 350.5},
            "reverseHolofoil": {"averageSellPrice": 12.25}
        }
    });
    Mock::given(method("GET"))
        .and(path("/v2/cards"))
        .and(query_param("q", "name:\"Charizard\""))
        .and(query_param("pageSize", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [priced], "totalCount": 30})),
        )
        .mount(&upstream)
        .await;

    let (status, body) = get(app(&upstream), "/card_price?card_name=Charizard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["card"]["id"], "base1-4");
    assert_eq!(
        body["prices"],
        json!({"holofoil": 350.5, "reverseHolofoil": 12.25})
    );
}

#[tokio::test]
async fn card_without_prices_is_no_price_data() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [card("xy1-1", "Venusaur")],
            "totalCount": 1
        })))
        .mount(&upstream)
        .await;

    let (status, body) = get(app(&upstream), "/card_price?card_name=Venusaur").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_price_data");
    assert_eq!(body["card"]["name"], "Venusaur");
    assert!(body.get("prices").is_none());
}

#[tokio::test]
async fn unknown_card_name_is_not_found() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cards"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [], "totalCount": 0})),
        )
        .mount(&upstream)
        .await;

    let (status, body) = get(app(&upstream), "/card_price?card_name=Nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_found");
}

#[tokio::test]
async fn card_price_requires_name() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&upstream)
        .await;

    let (status, body) = get(app(&upstream), "/card_price").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "bad_request");

    let (status, _) = get(app(&upstream), "/card_price?card_name=%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Sets and catalogs
// =============================================================================

#[tokio::test]
async fn sets_are_paginated_locally() {
    let upstream = MockServer::start().await;
    let sets: Vec<_> = (1..=12)
        .map(|i| json!({"id": format!("sv{i}"), "name": format!("Scarlet {i}")}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/v2/sets"))
        .and(query_param("pageSize", "250"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": sets, "totalCount": 12})),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let (status, body) = get(app(&upstream), "/sets?page=3&limit=5").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["sv11", "sv12"]);
    assert_eq!(
        body["pagination"],
        json!({"total_items": 12, "total_pages": 3, "current_page": 3, "items_per_page": 5})
    );
}

#[tokio::test]
async fn set_name_filter_is_forwarded() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/sets"))
        .and(query_param("q", "name:\"Base\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "base1", "name": "Base"}],
            "totalCount": 1
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let (_, body) = get(app(&upstream), "/sets?name=Base").await;
    assert_eq!(body["data"][0]["id"], "base1");
}

#[tokio::test]
async fn set_by_id_and_missing_set() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/sets/base1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "base1", "name": "Base", "series": "Base", "total": 102}
        })))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/sets/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;

    let (_, body) = get(app(&upstream), "/sets/base1").await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["set"]["total"], 102);

    let (status, body) = get(app(&upstream), "/sets/nope").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_found");
}

#[tokio::test]
async fn catalogs_are_keyed_by_name() {
    let upstream = MockServer::start().await;
    for (name, values) in [
        ("types", json!(["Fire", "Water"])),
        ("supertypes", json!(["Energy", "Pokémon", "Trainer"])),
        ("subtypes", json!(["Basic", "Stage 1"])),
        ("rarities", json!(["Common"])),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/v2/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": values})))
            .mount(&upstream)
            .await;
    }

    for name in ["types", "supertypes", "subtypes", "rarities"] {
        let (status, body) = get(app(&upstream), &format!("/{name}")).await;
        assert_eq!(status, StatusCode::OK, "{name}");
        assert_eq!(body["status"], "success");
        assert!(body[name].is_array(), "{name}");
    }
}
