//! Change queue endpoints.
//!
//! `POST` hands one change to the consumer and waits for it to be
//! processed, which lets an external scheduler drive propagation. `GET`
//! lists the changes that have not been acknowledged yet.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use common::DbName;
use doc_store::{BaseStore, Change, DocStoreError};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct PendingResponse {
    pub total_rows: usize,
    pub rows: Vec<Change>,
}

/// GET /{db}/_queue
#[tracing::instrument(skip(state))]
pub async fn pending<S: BaseStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(db): Path<String>,
) -> Result<Json<PendingResponse>, ApiError> {
    let db = DbName::parse(db)?;
    let rows = state.documents.pending_changes(Some(&db)).await?;
    Ok(Json(PendingResponse {
        total_rows: rows.len(),
        rows,
    }))
}

/// POST /{db}/_queue: process one change and return it.
#[tracing::instrument(skip(state, body))]
pub async fn process<S: BaseStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(db): Path<String>,
    body: Bytes,
) -> Result<Json<Change>, ApiError> {
    let db = DbName::parse(db)?;
    let change: Change = serde_json::from_slice(&body)?;
    if change.database != db {
        return Err(DocStoreError::InvalidDbName(format!(
            "change belongs to database '{}'",
            change.database
        ))
        .into());
    }

    state.consumer.deliver(&change).await?;
    Ok(Json(change))
}
