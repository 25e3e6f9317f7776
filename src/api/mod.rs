pub mod memory;
pub mod source;
pub mod sqlite;

pub use self::memory::MemoryDataSource;
pub use self::source::ApiDataSource;
pub use self::sqlite::SqliteDataSource;

use crate::config::Config;
use crate::guard::{GuardState, NavigationGuard};
use axum::{
    extract::{Json as AxumJson, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

struct ApiState {
    data_source: Arc<dyn ApiDataSource>,
    guard: Arc<NavigationGuard>,
    guard_state: GuardState,
    config: Config,
    refresh_sender: Sender<()>,
}

pub async fn start_api_server(
    data_source: Arc<dyn ApiDataSource>,
    guard: Arc<NavigationGuard>,
    guard_state: GuardState,
    config: Config,
    refresh_sender: Sender<()>,
    port: u16,
) {
    let state = Arc::new(ApiState {
        data_source,
        guard,
        guard_state,
        config,
        refresh_sender,
    });

    let app = Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/logs", get(get_logs))
        .route("/api/cache", get(get_cache))
        .route("/api/status", get(get_status))
        .route("/api/config", get(get_config))
        .route("/api/pause", post(pause_blocking))
        .route("/api/resume", post(resume_blocking))
        .route("/api/refresh", post(trigger_refresh))
        .route("/api/block", post(block_domain))
        .route("/api/allow", post(allow_domain))
        .with_state(state);

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("API server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn get_stats(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.data_source.get_stats().await)
}

#[derive(Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

async fn get_logs(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(100).min(1000);
    Json(state.data_source.get_logs(limit).await)
}

async fn get_cache(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.guard.cache().snapshot().await)
}

async fn get_config(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.config.clone())
}

async fn trigger_refresh(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let _ = state.refresh_sender.send(()).await;
    Json(serde_json::json!({ "status": "refresh_triggered" }))
}

#[derive(Deserialize)]
struct PauseRequest {
    duration_minutes: u64,
}

async fn pause_blocking(
    State(state): State<Arc<ApiState>>,
    AxumJson(payload): AxumJson<PauseRequest>,
) -> impl IntoResponse {
    let duration = std::time::Duration::from_secs(payload.duration_minutes * 60);
    state.guard_state.pause_blocking(duration);
    Json(serde_json::json!({ "status": "paused", "duration_min": payload.duration_minutes }))
}

async fn resume_blocking(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    state.guard_state.resume_blocking();
    Json(serde_json::json!({ "status": "resumed" }))
}

async fn get_status(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let active = state.guard_state.is_blocking_active();
    let remaining = state.guard_state.get_pause_remaining_secs();
    Json(serde_json::json!({
        "blocking_active": active,
        "pause_remaining_secs": remaining
    }))
}

#[derive(Deserialize)]
struct BlockRequest {
    /// Bare domain or full URL; either form resolves to one cache key.
    domain: Option<String>,
    url: Option<String>,
    /// If set, the tab showing the page is redirected to the block page.
    tab_id: Option<i64>,
}

async fn block_domain(
    State(state): State<Arc<ApiState>>,
    AxumJson(payload): AxumJson<BlockRequest>,
) -> impl IntoResponse {
    let Some(target) = payload.domain.or(payload.url) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "domain or url required" })),
        );
    };
    match state.guard.block_domain(&target, payload.tab_id).await {
        Some(domain) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "blocked", "domain": domain })),
        ),
        None => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "could not resolve domain" })),
        ),
    }
}

#[derive(Deserialize)]
struct AllowRequest {
    domain: Option<String>,
    url: Option<String>,
}

async fn allow_domain(
    State(state): State<Arc<ApiState>>,
    AxumJson(payload): AxumJson<AllowRequest>,
) -> impl IntoResponse {
    let Some(target) = payload.domain.or(payload.url) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "domain or url required" })),
        );
    };
    match state.guard.allow_domain(&target).await {
        Some(domain) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "allowed", "domain": domain })),
        ),
        None => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "could not resolve domain" })),
        ),
    }
}
