use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
    pub events: EventBusHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    pub healthy: bool,
    pub latency_ms: u64,
    pub pool_size: u32,
    pub idle_connections: usize,
}

#[derive(Serialize)]
pub struct EventBusHealth {
    pub subscribers: usize,
    pub published: u64,
}

/// GET /health
///
/// 200 when the database answers, 503 otherwise, so load balancers can
/// drain a node that lost its database.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let started = Instant::now();
    let healthy = match clinicops_db::health_check(&state.pool).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            false
        }
    };
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (code, status) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database: DatabaseHealth {
            healthy,
            latency_ms,
            pool_size: state.pool.size(),
            idle_connections: state.pool.num_idle(),
        },
        events: EventBusHealth {
            subscribers: state.event_bus.subscriber_count(),
            published: state.event_bus.published_total(),
        },
    };
    (code, Json(body))
}

/// Root-level routes (outside `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
