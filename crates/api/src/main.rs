//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use doc_store::{BaseStore, InMemoryBaseStore, PostgresBaseStore};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::oneshot;
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

/// Runs the server over one base store until a shutdown signal arrives.
async fn serve<S: BaseStore + Clone + 'static>(
    store: S,
    backend: &'static str,
    config: &Config,
    metrics_handle: PrometheusHandle,
) {
    let state = api::create_default_state(store, config, backend);

    // Replay changes left behind by a previous run
    state
        .consumer
        .run_catch_up()
        .await
        .expect("catch-up failed");

    let (stop_consumer, consumer_stopped) = oneshot::channel::<()>();
    let consumer = tokio::spawn(Arc::clone(&state.consumer).run(state.queue.clone(), async move {
        let _ = consumer_stopped.await;
    }));

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, backend, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    let _ = stop_consumer.send(());
    if let Err(err) = consumer.await {
        tracing::warn!(error = %err, "change consumer did not stop cleanly");
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the base store and serve
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresBaseStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            serve(store, "postgres", &config, metrics_handle).await;
        }
        None => serve(InMemoryBaseStore::new(), "memory", &config, metrics_handle).await,
    }

    tracing::info!("server shut down gracefully");
}
