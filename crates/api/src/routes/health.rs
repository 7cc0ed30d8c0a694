//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use doc_store::BaseStore;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// GET /health: reports liveness and the active base store.
pub async fn check<S: BaseStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: state.backend,
    })
}
