//! Persisted record shapes: documents, change records and view outputs.

use chrono::{DateTime, Utc};
use common::{ChangeId, DbName, DocId, Etag};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{DocStoreError, Result};

/// A value that can be persisted in a [`BaseStore`](crate::BaseStore).
///
/// Records of one kind share a keyspace; `key` must be unique within it.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Name of the keyspace the record lives in.
    const KIND: &'static str;

    /// Returns the storage key of this record.
    fn key(&self) -> String;
}

/// A stored JSON document and the version token of this snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Version token, regenerated on every write.
    pub version: Etag,

    /// The database the document belongs to.
    pub database: DbName,

    /// The document id. Also present in the body as `_id`.
    pub id: DocId,

    /// The JSON body. Always an object.
    pub body: Value,

    /// True if the id starts with `_design/`.
    pub is_design: bool,
}

impl Document {
    /// Creates a new snapshot of a document with a fresh version token.
    ///
    /// The `_id` field of the body is overwritten with `id`.
    pub fn new(database: DbName, id: DocId, mut body: Map<String, Value>) -> Self {
        body.insert("_id".to_string(), Value::String(id.to_string()));
        Self {
            version: Etag::generate(),
            is_design: id.is_design(),
            database,
            id,
            body: Value::Object(body),
        }
    }

    /// Builds the storage key of a document.
    pub fn create_key(database: &DbName, id: &DocId) -> String {
        format!("{database}/{id}")
    }

    /// Decodes the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

impl Record for Document {
    const KIND: &'static str = "document";

    fn key(&self) -> String {
        Self::create_key(&self.database, &self.id)
    }
}

/// Splits a JSON body into an object map, rejecting non-objects.
pub fn into_object(body: Value) -> Result<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(DocStoreError::InvalidDocument(format!(
            "document body must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The before/after version transition produced by one mutation.
///
/// `version_before` is absent for a create, `version_after` for a delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub key: ChangeId,
    pub database: DbName,
    pub id: DocId,
    pub version_before: Option<Etag>,
    pub version_after: Option<Etag>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Change {
    /// Creates a change record with a fresh key.
    pub fn new(
        database: DbName,
        id: DocId,
        version_before: Option<Etag>,
        version_after: Option<Etag>,
    ) -> Self {
        Self {
            key: ChangeId::new(),
            database,
            id,
            version_before,
            version_after,
            created_at: Utc::now(),
        }
    }

    /// Returns true if the change describes a newly created document.
    pub fn is_create(&self) -> bool {
        self.version_before.is_none() && self.version_after.is_some()
    }

    /// Returns true if the change describes a deleted document.
    pub fn is_delete(&self) -> bool {
        self.version_before.is_some() && self.version_after.is_none()
    }
}

impl Record for Change {
    const KIND: &'static str = "change";

    fn key(&self) -> String {
        self.key.to_string()
    }
}

/// The exact design and document snapshots a map run was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    pub database: DbName,
    pub design_id: DocId,
    pub design_version: Etag,
    pub doc_id: DocId,
    pub doc_version: Etag,
}

impl RunStamp {
    /// Stamps a run of `design` over `doc`.
    pub fn of(design: &Document, doc: &Document) -> Self {
        Self {
            database: doc.database.clone(),
            design_id: design.id.clone(),
            design_version: design.version,
            doc_id: doc.id.clone(),
            doc_version: doc.version,
        }
    }
}

/// One emitted `(key, value)` pair of one map run.
///
/// The key embeds both the design and the document version, so re-running a
/// map over the same snapshots overwrites the same rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    pub key: String,
    pub database: DbName,
    pub design_id: DocId,
    pub design_version: Etag,
    pub view: String,
    pub doc_id: DocId,
    pub doc_version: Etag,
    pub emit_index: u32,
    /// The emitted row: `{id, key, value}`.
    pub result: Value,
}

impl Output {
    /// Creates the output row for emit number `emit_index` of `view`.
    pub fn new(stamp: &RunStamp, view: &str, emit_index: u32, key: Value, value: Value) -> Self {
        let result = serde_json::json!({
            "id": stamp.doc_id.as_str(),
            "key": key,
            "value": value,
        });
        Self {
            key: Self::create_key(
                &stamp.database,
                &stamp.design_version,
                view,
                &stamp.doc_version,
                emit_index,
            ),
            database: stamp.database.clone(),
            design_id: stamp.design_id.clone(),
            design_version: stamp.design_version,
            view: view.to_string(),
            doc_id: stamp.doc_id.clone(),
            doc_version: stamp.doc_version,
            emit_index,
            result,
        }
    }

    /// Builds the composite storage key of an output row.
    pub fn create_key(
        database: &DbName,
        design_version: &Etag,
        view: &str,
        doc_version: &Etag,
        emit_index: u32,
    ) -> String {
        format!("{database}/{design_version}/{view}/{doc_version}/{emit_index}")
    }
}

impl Record for Output {
    const KIND: &'static str = "output";

    fn key(&self) -> String {
        self.key.clone()
    }
}
