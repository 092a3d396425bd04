use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinicops_api::app::build_app;
use clinicops_api::auth::bootstrap;
use clinicops_api::background::reminders;
use clinicops_api::cache::TtlCache;
use clinicops_api::config::ServerConfig;
use clinicops_api::notifications::NotificationRouter;
use clinicops_api::state::AppState;
use clinicops_events::EventBus;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinicops_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = clinicops_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    clinicops_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    clinicops_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    if let (Ok(email), Ok(password)) = (
        std::env::var("ADMIN_EMAIL"),
        std::env::var("ADMIN_PASSWORD"),
    ) {
        bootstrap::ensure_admin(&pool, &email, &password)
            .await
            .expect("Failed to create initial admin account");
    }

    // --- Background services ---
    let event_bus = Arc::new(EventBus::default());
    let router_handle =
        tokio::spawn(NotificationRouter::new(pool.clone()).run(event_bus.subscribe()));

    let reminder_cancel = CancellationToken::new();
    let reminder_handle = tokio::spawn(reminders::run(
        pool.clone(),
        Arc::clone(&event_bus),
        Duration::from_secs(config.reminder_interval_secs),
        config.reminder_lookahead_days,
        reminder_cancel.clone(),
    ));
    tracing::info!("Notification router and reminder job started");

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let cache = Arc::new(TtlCache::new(Duration::from_secs(config.cache_ttl_secs)));
    let app = build_app(AppState {
        pool,
        config: Arc::new(config),
        event_bus: Arc::clone(&event_bus),
        cache,
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Listener closed, draining background services");

    reminder_cancel.cancel();
    if tokio::time::timeout(shutdown_timeout, reminder_handle).await.is_err() {
        tracing::warn!("Reminder job did not stop in time");
    }

    // The app state held the other senders; this one is the last.
    drop(event_bus);
    if tokio::time::timeout(shutdown_timeout, router_handle).await.is_err() {
        tracing::warn!("Notification router did not drain in time");
    }

    tracing::info!("Shutdown complete");
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}
