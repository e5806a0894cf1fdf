//! HTTP JSON API for dashboard and LMS integration.
//!
//! Exposes the record store, statistics, and report rendering over a
//! small JSON API. The upload/authentication layer lives in the web UI
//! in front of this service; the analyze endpoint therefore takes
//! already-extracted text, not file bytes.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns name + version) |
//! | `POST` | `/api/v1/analyze` | Run a critique and store the record |
//! | `GET`  | `/api/v1/history/{username}` | List a user's analyses (previews) |
//! | `GET`  | `/api/v1/history/{username}/{id}` | Full record |
//! | `DELETE` | `/api/v1/history/{username}/{id}` | Delete one record |
//! | `DELETE` | `/api/v1/history/{username}` | Delete a user's history |
//! | `GET`  | `/api/v1/statistics` | System-wide statistics |
//! | `GET`  | `/api/v1/statistics/{username}` | Per-user statistics |
//! | `GET`  | `/api/v1/report/{username}/{id}?format=docx\|pdf` | Report download |
//!
//! # Error Contract
//!
//! All error responses share one shape:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "analysis not found: alice #3" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `analyzer_disabled` (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the dashboard and
//! LMS plugins can call the API from the browser.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::analyzer;
use crate::config::Config;
use crate::db;
use crate::extract::{MIME_DOCX, MIME_PDF};
use crate::models::{AnalysisRecord, SystemStatistics, UserStatistics};
use crate::render;
use crate::store::HistoryStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: HistoryStore,
}

/// API failure mapped onto the error contract above.
enum ApiError {
    BadRequest(String),
    NotFound(String),
    AnalyzerDisabled(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            ApiError::AnalyzerDisabled(m) => {
                (StatusCode::BAD_REQUEST, "analyzer_disabled", m)
            }
            ApiError::Internal(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
            }
        };
        let body = serde_json::json!({ "error": { "code": code, "message": message } });
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    username: String,
    file_name: String,
    /// Extracted document text; the UI in front of the API owns upload
    /// handling and extraction for browser clients.
    text: String,
}

#[derive(Serialize)]
struct HistoryItem {
    id: i64,
    file_name: String,
    timestamp: String,
    file_size_chars: i64,
    /// First 200 characters of the critique for list views.
    preview: String,
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "grader-harness",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    }))
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisRecord>, ApiError> {
    if request.username.trim().is_empty() {
        return Err(ApiError::BadRequest("username must not be empty".into()));
    }
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".into()));
    }
    if !state.config.analyzer.is_enabled() {
        return Err(ApiError::AnalyzerDisabled(
            "no analyzer provider configured".into(),
        ));
    }

    let critique = analyzer::generate_critique(&state.config.analyzer, &request.text).await?;
    let record = state
        .store
        .save(&request.username, &request.file_name, &critique)
        .await?;

    Ok(Json(record))
}

async fn list_history(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let history = state.store.history(&username).await?;
    let items = history
        .into_iter()
        .map(|record| HistoryItem {
            id: record.id,
            file_name: record.file_name,
            timestamp: record.timestamp,
            file_size_chars: record.file_size_chars,
            preview: record.result.chars().take(200).collect(),
        })
        .collect();
    Ok(Json(items))
}

async fn get_record(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, i64)>,
) -> Result<Json<AnalysisRecord>, ApiError> {
    match state.store.get_by_id(&username, id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound(format!(
            "analysis not found: {} #{}",
            username, id
        ))),
    }
}

async fn delete_record(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, i64)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.store.delete(&username, id).await?;
    Ok(Json(DeleteResponse { deleted }))
}

async fn delete_history(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.store.delete_all(&username).await?;
    Ok(Json(DeleteResponse { deleted }))
}

async fn user_statistics(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserStatistics>, ApiError> {
    Ok(Json(state.store.user_statistics(&username).await?))
}

async fn system_statistics(
    State(state): State<AppState>,
) -> Result<Json<SystemStatistics>, ApiError> {
    Ok(Json(state.store.system_statistics().await?))
}

#[derive(Deserialize)]
struct ReportQuery {
    format: Option<String>,
}

async fn download_report(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, i64)>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let record = match state.store.get_by_id(&username, id).await? {
        Some(record) => record,
        None => {
            return Err(ApiError::NotFound(format!(
                "analysis not found: {} #{}",
                username, id
            )))
        }
    };

    let generated_at = Local::now().naive_local();
    let input = render::ReportInput {
        username: &record.username,
        file_name: &record.file_name,
        result: &record.result,
        timestamp: &record.timestamp,
        generated_at,
        system_name: &state.config.reports.system_name,
    };

    let format = query.format.as_deref().unwrap_or("docx");
    let (buffer, ext, content_type) = match format {
        "docx" => (render::docx::render_docx(&input)?, "docx", MIME_DOCX),
        "pdf" => (render::pdf::render_pdf(&input)?, "pdf", MIME_PDF),
        other => {
            return Err(ApiError::BadRequest(format!(
                "unknown report format: '{}'. Must be docx or pdf.",
                other
            )))
        }
    };

    let filename = render::suggested_filename(
        &state.config.reports.filename_prefix,
        &record.file_name,
        &record.username,
        generated_at,
        ext,
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        buffer,
    )
        .into_response())
}

/// Starts the API server.
///
/// Binds to the address configured in `[server].bind` and serves until
/// the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let state = AppState {
        config: Arc::new(config.clone()),
        store: HistoryStore::new(pool),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/analyze", post(analyze))
        .route(
            "/api/v1/history/{username}",
            get(list_history).delete(delete_history),
        )
        .route(
            "/api/v1/history/{username}/{id}",
            get(get_record).delete(delete_record),
        )
        .route("/api/v1/statistics", get(system_statistics))
        .route("/api/v1/statistics/{username}", get(user_statistics))
        .route("/api/v1/report/{username}/{id}", get(download_report))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("Grader API listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
