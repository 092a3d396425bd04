use std::sync::Arc;

use crate::cache::TtlCache;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: clinicops_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Event bus feeding the notification router.
    pub event_bus: Arc<clinicops_events::EventBus>,
    /// TTL cache for read-heavy lookups.
    pub cache: Arc<TtlCache>,
}

impl AppState {
    /// Publish a domain event. Never fails; a bus without subscribers drops it.
    pub fn publish(&self, event: clinicops_events::ClinicEvent) {
        self.event_bus.publish(event);
    }
}
