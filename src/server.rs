//! HTTP API server.
//!
//! Exposes indexing and retrieval over JSON.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Status and total indexed units |
//! | `GET`  | `/stats` | Unit counts by tenant and document |
//! | `POST` | `/search` | Similarity search with synthesized answer |
//! | `POST` | `/text-search` | Expanded keyword search over the document tree |
//! | `POST` | `/build-doc` | Index one file from the documents directory |
//! | `POST` | `/clean-shop` | Delete every unit of a tenant |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400, also for undecodable bodies), `not_found` (404),
//! `backend_unavailable` (500), `configuration` (500), `internal` (500).
//! A partially indexed document is answered with `206 Partial Content` and
//! the persisted/total ratio in `error`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::context::AppContext;
use crate::error::Error;
use crate::ingest::{build_document, purge_tenant};
use crate::search::{keyword_search_and_summarize, search_and_summarize, SearchResponse, TextSearchResponse};
use crate::store::StoreStats;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    ctx: Arc<AppContext>,
}

/// Build the router. Exposed so tests can serve it on an ephemeral port.
pub fn router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/stats", get(handle_stats))
        .route("/search", post(handle_search))
        .route("/text-search", post(handle_text_search))
        .route("/build-doc", post(handle_build_doc))
        .route("/clean-shop", post(handle_clean_shop))
        .layer(cors)
        .with_state(AppState { ctx })
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(ctx: Arc<AppContext>) -> anyhow::Result<()> {
    let bind_addr = ctx.config.server.bind.clone();
    let app = router(ctx);

    tracing::info!(addr = %bind_addr, "server listening");
    println!("shop-rag server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::MalformedInput(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            Error::PartialIngestion { .. } => (StatusCode::PARTIAL_CONTENT, "partial_ingestion"),
            Error::BackendUnavailable { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "backend_unavailable")
            }
            Error::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: rejection.body_text(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    total_records: i64,
}

async fn handle_health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let total_records = state.ctx.store.count_units().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        total_records,
    }))
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<StoreStats>, AppError> {
    Ok(Json(state.ctx.store.stats().await?))
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(alias = "shopid")]
    tenant_id: String,
    #[serde(default)]
    limit: i64,
}

async fn handle_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(req) = payload?;
    tracing::info!(tenant_id = %req.tenant_id, limit = req.limit, "search request");
    let response = search_and_summarize(&state.ctx, &req.tenant_id, &req.query, req.limit).await?;
    Ok(Json(response))
}

// ============ POST /text-search ============

#[derive(Deserialize)]
struct TextSearchRequest {
    query: String,
}

async fn handle_text_search(
    State(state): State<AppState>,
    payload: Result<Json<TextSearchRequest>, JsonRejection>,
) -> Result<Json<TextSearchResponse>, AppError> {
    let Json(req) = payload?;
    let response = keyword_search_and_summarize(&state.ctx, &req.query).await?;
    Ok(Json(response))
}

// ============ POST /build-doc ============

#[derive(Deserialize)]
struct BuildDocRequest {
    #[serde(alias = "shopid")]
    tenant_id: String,
    filename: String,
    #[serde(default)]
    updated_by: Option<String>,
}

#[derive(Serialize)]
struct BuildDocResponse {
    tenant_id: String,
    filename: String,
    persisted: usize,
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn handle_build_doc(
    State(state): State<AppState>,
    payload: Result<Json<BuildDocRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let updated_by = req
        .updated_by
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(&state.ctx.config.indexing.updated_by);

    let report = build_document(&state.ctx, &req.tenant_id, &req.filename, updated_by).await?;

    let (status, error) = match report.into_result() {
        Ok(_) => (StatusCode::OK, None),
        Err(e) => (StatusCode::PARTIAL_CONTENT, Some(e.to_string())),
    };

    let body = BuildDocResponse {
        tenant_id: req.tenant_id,
        filename: req.filename,
        persisted: report.persisted,
        total: report.total,
        error,
    };
    Ok((status, Json(body)).into_response())
}

// ============ POST /clean-shop ============

#[derive(Deserialize)]
struct CleanShopRequest {
    #[serde(alias = "shopid")]
    tenant_id: String,
}

#[derive(Serialize)]
struct CleanShopResponse {
    tenant_id: String,
    deleted: u64,
}

async fn handle_clean_shop(
    State(state): State<AppState>,
    payload: Result<Json<CleanShopRequest>, JsonRejection>,
) -> Result<Json<CleanShopResponse>, AppError> {
    let Json(req) = payload?;
    let deleted = purge_tenant(&state.ctx, &req.tenant_id).await?;
    Ok(Json(CleanShopResponse {
        tenant_id: req.tenant_id,
        deleted,
    }))
}
