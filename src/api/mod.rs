//! REST API endpoints.
//!
//! Axum-based HTTP API serving civilization statistics through the
//! snapshot/live/fallback ladder.

pub mod routes;
pub mod state;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::resolve::ResolveError;
use crate::store::StoreError;
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // 4xx messages are safe to echo; 5xx detail (paths, parser
        // output) is logged and replaced with a fixed message.
        let (status, code, message) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string()),
            ApiError::Unavailable(detail) => {
                tracing::warn!(detail = %detail, "request failed as unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "UNAVAILABLE",
                    "Temporarily unavailable".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout(_) => ApiError::Unavailable(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health))
        .route("/api/civilizations", get(routes::civs::summary))
        .route("/api/civilizations/:name", get(routes::civs::detail))
        .route(
            "/api/civilizations/:name/best-against",
            get(routes::matchups::best_against),
        )
        .route(
            "/api/civilizations/:name/worst-against",
            get(routes::matchups::worst_against),
        )
        .route(
            "/api/civilizations/:name/maps",
            get(routes::maps::map_performance),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(resp: Response) -> Value {
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_internal_error_body_is_generic() {
        let resp =
            ApiError::Internal("io error: /var/data/snapshots.jsonl".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        let message = json["error"]["message"].as_str().unwrap();
        assert!(!message.contains("/var/data"));
        assert!(!message.contains("io error"));
    }

    #[tokio::test]
    async fn test_unavailable_body_is_generic() {
        let resp =
            ApiError::Unavailable("query exceeded its 3s budget".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "UNAVAILABLE");
        assert!(!json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("budget"));
    }

    #[tokio::test]
    async fn test_not_found_keeps_its_message() {
        let resp = ApiError::NotFound("unknown identifier: Atlanteans".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let json = body_json(resp).await;
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Atlanteans"));
    }
}
