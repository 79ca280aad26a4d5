//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::routes::AppState;
use catalog::InMemoryCatalog;
use metrics_exporter_prometheus::PrometheusHandle;
use reservations::{InMemoryReservationStore, PostgresReservationStore, ReservationStore};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn load_catalog(config: &Config) -> InMemoryCatalog {
    match &config.catalog_path {
        Some(path) => {
            InMemoryCatalog::from_json_file(path)
                .await
                .expect("failed to load catalog seed")
        }
        None => {
            tracing::warn!("CATALOG_PATH not set, starting with an empty catalog");
            InMemoryCatalog::new()
        }
    }
}

/// Serves the API over `state` until a shutdown signal, with the reclaim
/// scheduler running alongside.
async fn serve<S: ReservationStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    config: &Config,
) {
    // Reclaim whatever expired while the server was down.
    match state.scheduler.sweep_now().await {
        Ok(report) => tracing::info!(released = report.released_count, "startup sweep finished"),
        Err(e) => tracing::error!(error = %e, "startup sweep failed"),
    }
    let scheduler = state.scheduler.clone().spawn();

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    scheduler.shutdown().await;
    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Load the catalog seed
    let catalog = load_catalog(&config).await;

    // 4. Pick the reservation store and serve
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to Postgres");
            let store = PostgresReservationStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using Postgres reservation store");
            serve(api::create_state(store, catalog, &config), metrics_handle, &config).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory reservation store");
            let store = InMemoryReservationStore::new();
            serve(api::create_state(store, catalog, &config), metrics_handle, &config).await;
        }
    }
}
