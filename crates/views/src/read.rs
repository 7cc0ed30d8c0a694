//! Read access to view rows.

use doc_store::{
    BaseStore, BaseStoreExt, DbName, DocId, DocStoreError, Document, Output, ScanFilter,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Query parameters of a view read.
///
/// Range bounds are accepted for API compatibility but not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ViewQuery {
    #[serde(rename = "startkey")]
    pub start_key: Option<String>,
    #[serde(rename = "endkey")]
    pub end_key: Option<String>,
}

/// Rows of one view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResult {
    pub total_rows: usize,
    /// Emitted rows, each `{id, key, value}`.
    pub rows: Vec<Value>,
}

/// Serves the rows the view engine has stored.
#[derive(Clone)]
pub struct ViewReader<S: BaseStore> {
    store: S,
}

impl<S: BaseStore> ViewReader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reads every row of `view` in `design_id`, ordered by document id and
    /// emit position.
    #[tracing::instrument(skip(self, query), fields(%database, %design_id))]
    pub async fn get_view(
        &self,
        database: &DbName,
        design_id: &DocId,
        view: &str,
        query: &ViewQuery,
    ) -> Result<ViewResult> {
        let key = Document::create_key(database, design_id);
        if self.store.load::<Document>(&key).await?.is_none() {
            return Err(DocStoreError::NotFound {
                database: database.clone(),
                id: design_id.clone(),
            }
            .into());
        }
        if query.start_key.is_some() || query.end_key.is_some() {
            tracing::debug!(?query, "key range ignored");
        }

        let mut outputs: Vec<Output> = self
            .store
            .find(&ScanFilter::view_outputs(database, design_id, view))
            .await?;
        outputs.sort_by(|a, b| {
            (&a.doc_id, a.emit_index, &a.key).cmp(&(&b.doc_id, b.emit_index, &b.key))
        });

        let rows: Vec<Value> = outputs.into_iter().map(|o| o.result).collect();
        Ok(ViewResult {
            total_rows: rows.len(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, ViewEngine, ViewError};
    use doc_store::{DocumentStore, InMemoryBaseStore, InMemoryChangeQueue};
    use serde_json::json;

    fn db() -> DbName {
        DbName::parse("mydb").unwrap()
    }

    fn id(s: &str) -> DocId {
        DocId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn missing_design_is_not_found() {
        let reader = ViewReader::new(InMemoryBaseStore::new());
        let result = reader
            .get_view(&db(), &id("_design/nope"), "v", &ViewQuery::default())
            .await;
        assert!(matches!(
            result,
            Err(ViewError::Store(DocStoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn rows_are_ordered_by_document_then_emit_index() {
        let store = InMemoryBaseStore::new();
        let docs = DocumentStore::new(store.clone(), InMemoryChangeQueue::new());
        let engine = ViewEngine::new(store.clone(), EngineConfig::default());
        let reader = ViewReader::new(store);

        docs.put(
            &db(),
            &id("_design/d1"),
            json!({"views": {"tags": {"map": "function(doc){ if (doc.tags) for (const t of doc.tags) emit(t, null) }"}}}),
        )
        .await
        .unwrap();
        for (doc_id, tags) in [("b", json!(["z", "y"])), ("a", json!(["x"]))] {
            let change = docs
                .put(&db(), &id(doc_id), json!({ "tags": tags }))
                .await
                .unwrap()
                .change;
            engine.process(&change).await.unwrap();
        }

        let query = ViewQuery {
            start_key: Some("\"y\"".to_string()),
            end_key: None,
        };
        let result = reader
            .get_view(&db(), &id("_design/d1"), "tags", &query)
            .await
            .unwrap();

        assert_eq!(result.total_rows, 3);
        assert_eq!(
            result.rows,
            vec![
                json!({"id": "a", "key": "x", "value": null}),
                json!({"id": "b", "key": "z", "value": null}),
                json!({"id": "b", "key": "y", "value": null}),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_view_is_empty() {
        let store = InMemoryBaseStore::new();
        let docs = DocumentStore::new(store.clone(), InMemoryChangeQueue::new());
        docs.put(&db(), &id("_design/d1"), json!({"views": {}}))
            .await
            .unwrap();

        let result = ViewReader::new(store)
            .get_view(&db(), &id("_design/d1"), "nothing", &ViewQuery::default())
            .await
            .unwrap();
        assert_eq!(result.total_rows, 0);
    }
}
