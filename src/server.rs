//! JSON HTTP server over a loaded corpus.
//!
//! Exposes keyword search (markers plus summary counts) and the
//! similar-article lookup so browser frontends can drive the map without
//! shelling out to the CLI.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/search?q=키워드` | Keyword search over the loaded records |
//! | `GET`  | `/related?q=키워드` | Similar-article web search |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "q must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `related_unavailable` (400),
//! `upstream_error` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a local map page can
//! call the API directly.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::geocode::LocationResolver;
use crate::models::{Marker, RecordSet};
use crate::progress::NoProgress;
use crate::query::run_query;
use crate::related::{RelatedArticle, SerperClient};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    records: Arc<RecordSet>,
    resolver: Arc<LocationResolver>,
    /// `None` when `SERPER_API_KEY` was not set at startup.
    related: Option<Arc<SerperClient>>,
}

/// Starts the HTTP server over an already-loaded record set.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated.
pub async fn run_server(
    config: &Config,
    records: Arc<RecordSet>,
    resolver: Arc<LocationResolver>,
) -> anyhow::Result<()> {
    let related = SerperClient::new(&config.related).ok().map(Arc::new);
    if related.is_none() {
        eprintln!("note: SERPER_API_KEY not set, /related disabled");
    }

    let state = AppState {
        records,
        resolver,
        related,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/search", get(handle_search))
        .route("/related", get(handle_related))
        .layer(cors)
        .with_state(state);

    println!("atlas server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
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
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream_error".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    q: String,
}

#[derive(Serialize)]
struct SearchResponse {
    markers: Vec<Marker>,
    matched_records: usize,
    distinct_locations: usize,
    resolved_locations: usize,
    center: Option<[f64; 2]>,
}

/// Handler for `GET /search?q=키워드`.
///
/// Runs the same keyword query as `atlas search`, resolving any locations
/// not already cached. Resolution respects the global geocoding rate gate,
/// so a query over many new places can take several seconds.
async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    if params.q.trim().is_empty() {
        return Err(bad_request("q must not be empty"));
    }

    let outcome = run_query(&state.records, &params.q, &state.resolver, &NoProgress).await;

    Ok(Json(SearchResponse {
        matched_records: outcome.matched_records,
        distinct_locations: outcome.distinct_locations,
        resolved_locations: outcome.resolved_locations,
        center: outcome
            .center
            .map(|c| [c.latitude, c.longitude]),
        markers: outcome.markers,
    }))
}

// ============ GET /related ============

#[derive(Serialize)]
struct RelatedResponse {
    articles: Vec<RelatedArticle>,
}

/// Handler for `GET /related?q=키워드`.
async fn handle_related(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<RelatedResponse>, AppError> {
    if params.q.trim().is_empty() {
        return Err(bad_request("q must not be empty"));
    }

    let Some(client) = &state.related else {
        return Err(AppError {
            status: StatusCode::BAD_REQUEST,
            code: "related_unavailable".to_string(),
            message: "SERPER_API_KEY not set".to_string(),
        });
    };

    let articles = client
        .search(&params.q)
        .await
        .map_err(|e| upstream_error(e.to_string()))?;

    Ok(Json(RelatedResponse { articles }))
}
