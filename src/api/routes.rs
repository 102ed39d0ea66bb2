use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::HealthState;
use crate::error::AppError;
use crate::state::DedupStore;

#[derive(Clone)]
pub struct ApiState {
    pub health: Arc<HealthState>,
    pub store: Arc<DedupStore>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/stats", get(get_stats))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub last_cycle_at_ns: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub notified_events: usize,
    /// Count read back from SQLite; differs from `notified_events` only if
    /// the table was edited under a running process.
    pub persisted_events: i64,
    pub notifications_sent: u64,
    pub send_failures: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let h = &state.health;
    // "starting" until the first cycle completes.
    let status = if h.last_cycle_at_ns() == 0 { "starting" } else { "ok" };
    Json(HealthResponse {
        status,
        cycles_completed: h.cycles_completed(),
        cycles_failed: h.cycles_failed(),
        last_cycle_at_ns: h.last_cycle_at_ns(),
    })
}

async fn get_stats(State(state): State<ApiState>) -> Result<Json<StatsResponse>, AppError> {
    let persisted_events = state.store.persisted_count().await?;
    Ok(Json(StatsResponse {
        notified_events: state.store.len(),
        persisted_events,
        notifications_sent: state.health.notifications_sent(),
        send_failures: state.health.send_failures(),
    }))
}
