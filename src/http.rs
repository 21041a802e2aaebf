use crate::collectors::Collectors;
use crate::state::{now_rfc3339, OpenclawHealth, SystemReport};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct HttpAppState {
    pub collectors: Arc<Collectors>,
    pub started: Instant,
}

#[derive(Serialize)]
struct DashboardResponse {
    system: Arc<SystemReport>,
    openclaw: Arc<OpenclawHealth>,
    timestamp: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    time: String,
    uptime_seconds: u64,
}

/// API routes plus the static front end as fallback. Monitoring endpoints
/// always answer 200 with the best available data; staleness beats an error
/// page on a dashboard.
pub fn build_router(collectors: Arc<Collectors>, public_dir: &str) -> Router {
    Router::new()
        .route("/api/system", get(system_handler))
        .route("/api/openclaw", get(openclaw_handler))
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/health", get(health_handler))
        .with_state(HttpAppState {
            collectors,
            started: Instant::now(),
        })
        .fallback_service(ServeDir::new(public_dir))
        .layer(CorsLayer::permissive())
}

/// System metrics are cheap to resample, so this refreshes per request
/// instead of serving the background tick's cache.
async fn system_handler(State(state): State<HttpAppState>) -> impl IntoResponse {
    Json(state.collectors.refresh_system().await)
}

async fn openclaw_handler(State(state): State<HttpAppState>) -> impl IntoResponse {
    Json(state.collectors.refresh_openclaw().await)
}

async fn dashboard_handler(State(state): State<HttpAppState>) -> impl IntoResponse {
    let (system, openclaw) = tokio::join!(
        state.collectors.refresh_system(),
        state.collectors.refresh_openclaw(),
    );
    Json(DashboardResponse {
        system,
        openclaw,
        timestamp: now_rfc3339(),
    })
}

/// Liveness of the dashboard itself, independent of anything it monitors.
async fn health_handler(State(state): State<HttpAppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        time: now_rfc3339(),
        uptime_seconds: state.started.elapsed().as_secs(),
    })
}
