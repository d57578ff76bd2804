//! Thin JSON adapter over [`RciService`] (spec section 6). Grounded on the
//! teacher's `server/transport/http.rs`: a `Router::new().route(...)`
//! wiring plus a single error enum whose `IntoResponse` impl maps variants
//! to status codes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::error::Error;
use crate::service::{RciService, SearchRequest, SyncRequest};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RciService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/rag/search", post(handle_search))
        .route("/rag/sync", post(handle_sync))
        .route("/rag/status", get(handle_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(Envelope { success: true, data })).into_response()
}

async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Response, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError(Error::invalid_argument("query must not be empty")));
    }
    if !(1..=50).contains(&request.top_k) {
        return Err(AppError(Error::invalid_argument("topK out of range")));
    }
    if !(0.0..=1.0).contains(&request.threshold) {
        return Err(AppError(Error::invalid_argument("threshold out of range")));
    }
    let response = state.service.search(request).await?;
    Ok(ok(response))
}

async fn handle_sync(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Response, AppError> {
    if request.source_path.trim().is_empty() {
        return Err(AppError(Error::invalid_argument("sourcePath must not be empty")));
    }
    let response = state.service.sync(request).await?;
    Ok(ok(response))
}

async fn handle_status(State(state): State<AppState>) -> Result<Response, AppError> {
    let response = state.service.status()?;
    Ok(ok(response))
}

/// Wraps [`Error`] so it can implement [`IntoResponse`] (orphan rule).
struct AppError(Error);

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        AppError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Error::AuthFailed => StatusCode::UNAUTHORIZED,
            Error::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            Error::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Embedding { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::VectorStore { .. }
            | Error::Search { .. }
            | Error::Cache { .. }
            | Error::Config { .. }
            | Error::Io { .. }
            | Error::Json { .. }
            | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "success": false,
            "error": self.0.to_string(),
            "code": self.0.code(),
        });
        (status, Json(body)).into_response()
    }
}
