//! HTTP API server for the document store and its map views.
//!
//! Exposes document CRUD, view reads and the change queue over REST, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use doc_store::{BaseStore, DocumentStore, InMemoryChangeQueue};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use views::{ChangeConsumer, ViewEngine, ViewReader};

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: BaseStore> {
    pub documents: Arc<DocumentStore<S, InMemoryChangeQueue>>,
    pub reader: ViewReader<S>,
    pub consumer: Arc<ChangeConsumer<S, InMemoryChangeQueue>>,
    pub queue: InMemoryChangeQueue,
    /// Name of the base store backend, reported by `/health`.
    pub backend: &'static str,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: BaseStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{documents, health, metrics, queue, view};

    let metrics_router = Router::new()
        .route("/metrics", get(metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(health::check::<S>))
        .route("/{db}", post(documents::create::<S>))
        .route("/{db}/_all_docs", get(documents::all_docs::<S>))
        .route(
            "/{db}/_queue",
            get(queue::pending::<S>).post(queue::process::<S>),
        )
        .route(
            "/{db}/_design/{name}",
            get(documents::get_design::<S>)
                .put(documents::put_design::<S>)
                .delete(documents::delete_design::<S>),
        )
        .route("/{db}/_design/{name}/_view/{view}", get(view::get::<S>))
        .route(
            "/{db}/{id}",
            get(documents::get::<S>)
                .put(documents::put::<S>)
                .delete(documents::delete::<S>)
                .post(documents::post_with_id),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the document store, view engine, reader and change consumer over
/// one base store.
pub fn create_default_state<S: BaseStore + Clone + 'static>(
    store: S,
    config: &Config,
    backend: &'static str,
) -> Arc<AppState<S>> {
    let queue = InMemoryChangeQueue::new();
    let documents = Arc::new(DocumentStore::new(store.clone(), queue.clone()));
    let engine = Arc::new(ViewEngine::new(store.clone(), config.engine()));
    let consumer = Arc::new(ChangeConsumer::new(
        Arc::clone(&documents),
        engine,
        config.consumer(),
    ));

    Arc::new(AppState {
        documents,
        reader: ViewReader::new(store),
        consumer,
        queue,
        backend,
    })
}
