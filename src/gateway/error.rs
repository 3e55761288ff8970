//! Gateway error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use super::client::ApiError;
use super::models::{Empty, Envelope, Status};

/// A request that could not be answered with data.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The upstream API failed.
    #[error("upstream API error: {0}")]
    Upstream(#[from] ApiError),

    /// A required parameter was missing or malformed.
    #[error("{0}")]
    BadRequest(String),
}

impl GatewayError {
    const fn status(&self) -> (StatusCode, Status) {
        match self {
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, Status::UpstreamError),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, Status::BadRequest),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (code, status) = self.status();
        match &self {
            Self::Upstream(e) => error!(error = %e, "Upstream call failed"),
            Self::BadRequest(message) => warn!(%message, "Rejected request"),
        }
        let body = Envelope::with_message(status, Empty {}, self.to_string());
        (code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let response = GatewayError::BadRequest("card_name is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_maps_to_502() {
        let err = GatewayError::from(ApiError::Status {
            status: 500,
            excerpt: "boom".to_string(),
        });
        assert!(err.to_string().contains("500"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
