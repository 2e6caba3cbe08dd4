/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "success": true,
///   "message": "Service healthy",
///   "data": {
///     "status": "healthy",
///     "version": "0.1.0",
///     "database": "connected",
///     "pool": { "active_connections": 1, "idle_connections": 4, "total_connections": 5 }
///   }
/// }
/// ```
///
/// A lost database gives `"status": "degraded"` with a 200, so load balancers
/// can tell a sick instance from a dead one.

use crate::{app::AppState, response::ApiResponse};
use axum::extract::State;
use serde::Serialize;
use teamtask_shared::db::pool::{get_pool_stats, health_check as ping, PoolStats};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub pool: PoolStats,
}

impl HealthResponse {
    fn new(database_ok: bool, pool: PoolStats) -> Self {
        Self {
            status: if database_ok { "healthy" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            database: if database_ok { "connected" } else { "disconnected" },
            pool,
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    let database_ok = match ping(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            false
        }
    };

    let health = HealthResponse::new(database_ok, get_pool_stats(&state.db));
    let message = if database_ok {
        "Service healthy"
    } else {
        "Service degraded"
    };

    ApiResponse::ok(message, health)
}
