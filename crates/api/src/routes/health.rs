//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/health — process status plus database connectivity.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(err) => {
            tracing::warn!(error = %err, "health check: database unreachable");
            "disconnected"
        }
    };
    Json(HealthResponse {
        success: true,
        status: "ok",
        database,
        timestamp: Utc::now(),
    })
}
