//! Document and design document endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::{DbName, DocId};
use doc_store::{BaseStore, DocStoreError, Document};
use serde::Serialize;
use serde_json::Value;

use crate::AppState;
use crate::error::ApiError;

type Shared<S> = State<Arc<AppState<S>>>;

#[derive(Serialize)]
pub struct WriteResponse {
    pub ok: bool,
    pub id: String,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct AllDocsResponse {
    pub total_rows: usize,
    pub offset: usize,
    pub rows: Vec<Value>,
}

fn document_response(doc: Document) -> Response {
    let etag = format!("\"{}\"", doc.version);
    ([(header::ETAG, etag)], Json(doc.body)).into_response()
}

fn written(id: &DocId) -> (StatusCode, Json<WriteResponse>) {
    (
        StatusCode::CREATED,
        Json(WriteResponse {
            ok: true,
            id: id.to_string(),
        }),
    )
}

async fn read<S: BaseStore + Clone + 'static>(
    state: &AppState<S>,
    db: String,
    id: DocId,
) -> Result<Response, ApiError> {
    let db = DbName::parse(db)?;
    let doc = state.documents.get(&db, &id).await?;
    Ok(document_response(doc))
}

async fn write<S: BaseStore + Clone + 'static>(
    state: &AppState<S>,
    db: String,
    id: DocId,
    body: &[u8],
) -> Result<(StatusCode, Json<WriteResponse>), ApiError> {
    let db = DbName::parse(db)?;
    let body: Value = serde_json::from_slice(body)?;
    let mutation = state.documents.put(&db, &id, body).await?;
    Ok(written(&mutation.id))
}

async fn remove<S: BaseStore + Clone + 'static>(
    state: &AppState<S>,
    db: String,
    id: DocId,
) -> Result<Json<DeleteResponse>, ApiError> {
    let db = DbName::parse(db)?;
    state.documents.delete(&db, &id).await?;
    Ok(Json(DeleteResponse { ok: true }))
}

/// GET /{db}/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: BaseStore + Clone + 'static>(
    State(state): Shared<S>,
    Path((db, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    read(&state, db, DocId::parse(id)?).await
}

/// PUT /{db}/{id}: create or replace a document.
#[tracing::instrument(skip(state, body))]
pub async fn put<S: BaseStore + Clone + 'static>(
    State(state): Shared<S>,
    Path((db, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<WriteResponse>), ApiError> {
    write(&state, db, DocId::parse(id)?, &body).await
}

/// DELETE /{db}/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: BaseStore + Clone + 'static>(
    State(state): Shared<S>,
    Path((db, id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    remove(&state, db, DocId::parse(id)?).await
}

/// POST /{db}/{id}: ids are assigned by `POST /{db}`, never by the client.
pub async fn post_with_id() -> ApiError {
    ApiError::Store(DocStoreError::InvalidId("id not allowed".to_string()))
}

/// GET /{db}/_design/{name}
#[tracing::instrument(skip(state))]
pub async fn get_design<S: BaseStore + Clone + 'static>(
    State(state): Shared<S>,
    Path((db, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    read(&state, db, DocId::design(&name)?).await
}

/// PUT /{db}/_design/{name}
#[tracing::instrument(skip(state, body))]
pub async fn put_design<S: BaseStore + Clone + 'static>(
    State(state): Shared<S>,
    Path((db, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<WriteResponse>), ApiError> {
    write(&state, db, DocId::design(&name)?, &body).await
}

/// DELETE /{db}/_design/{name}
#[tracing::instrument(skip(state))]
pub async fn delete_design<S: BaseStore + Clone + 'static>(
    State(state): Shared<S>,
    Path((db, name)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    remove(&state, db, DocId::design(&name)?).await
}

/// POST /{db}: create a document under a generated id.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: BaseStore + Clone + 'static>(
    State(state): Shared<S>,
    Path(db): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<WriteResponse>), ApiError> {
    let db = DbName::parse(db)?;
    let body: Value = serde_json::from_slice(&body)?;
    let mutation = state.documents.create(&db, body).await?;
    Ok(written(&mutation.id))
}

/// GET /{db}/_all_docs: every document body of the database, ordered by id.
#[tracing::instrument(skip(state))]
pub async fn all_docs<S: BaseStore + Clone + 'static>(
    State(state): Shared<S>,
    Path(db): Path<String>,
) -> Result<Json<AllDocsResponse>, ApiError> {
    let db = DbName::parse(db)?;
    let rows: Vec<Value> = state
        .documents
        .all_docs(&db)
        .await?
        .into_iter()
        .map(|doc| doc.body)
        .collect();

    Ok(Json(AllDocsResponse {
        total_rows: rows.len(),
        offset: 0,
        rows,
    }))
}
