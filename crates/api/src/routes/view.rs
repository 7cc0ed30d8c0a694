//! View read endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::{DbName, DocId};
use doc_store::BaseStore;
use views::{ViewQuery, ViewResult};

use crate::AppState;
use crate::error::ApiError;

/// GET /{db}/_design/{name}/_view/{view}?startkey=..&endkey=..
#[tracing::instrument(skip(state))]
pub async fn get<S: BaseStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((db, name, view)): Path<(String, String, String)>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<ViewResult>, ApiError> {
    let db = DbName::parse(db)?;
    let design = DocId::design(&name)?;
    let result = state.reader.get_view(&db, &design, &view, &query).await?;
    Ok(Json(result))
}
