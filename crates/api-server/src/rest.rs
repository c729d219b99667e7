//! Shared REST state, error mapping, and operational endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bulksms_core::BulkSmsError;
use bulksms_dispatch::DispatchEngine;
use bulksms_sources::RecipientSourceAdapter;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub sources: Arc<RecipientSourceAdapter>,
    pub engine: Arc<DispatchEngine>,
    /// Reject paired arrays of unequal length instead of truncating.
    pub strict_pairing: bool,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(sources: Arc<RecipientSourceAdapter>, engine: Arc<DispatchEngine>, strict_pairing: bool) -> Self {
        Self {
            sources,
            engine,
            strict_pairing,
            start_time: Instant::now(),
        }
    }
}

/// Every error leaves the API as `{"error": "..."}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error: a domain error plus the HTTP status it maps to.
#[derive(Debug)]
pub struct ApiError(pub BulkSmsError);

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self(BulkSmsError::InputValidation(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BulkSmsError::InputValidation(_)
            | BulkSmsError::InvalidColumn { .. }
            | BulkSmsError::InvalidField(_) => StatusCode::BAD_REQUEST,
            BulkSmsError::SourceNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BulkSmsError> for ApiError {
    fn from(e: BulkSmsError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, kind = self.0.kind(), "Request failed");
        } else {
            warn!(error = %self.0, kind = self.0.kind(), "Request rejected");
        }
        metrics::counter!("api.errors", "kind" => self.0.kind()).increment(1);

        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
    pub uptime_secs: u64,
}

/// GET /health: Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        provider: state.engine.provider().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready: Readiness probe.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses((status = 200, description = "Ready to accept traffic"))
)]
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live: Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
