//! Persistence layer for the clinic operations backend.
//!
//! - [`models`]: `FromRow` row structs plus create/update DTOs.
//! - [`repositories`]: zero-sized `*Repo` structs whose methods take `&PgPool`
//!   (or an open transaction for multi-step writes).

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod models;
pub mod repositories;

/// Shared connection pool type.
pub type DbPool = PgPool;

/// Maximum pooled connections per process.
const MAX_CONNECTIONS: u32 = 20;

/// Open a connection pool against `database_url`.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify connectivity.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    let migrator = sqlx::migrate!("../../db/migrations");
    tracing::debug!(available = migrator.iter().count(), "Running migrations");
    migrator.run(pool).await
}
