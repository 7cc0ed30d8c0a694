//! Document CRUD with change emission.

use common::{DbName, DocId, Etag};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::queue::ChangeQueue;
use crate::record::into_object;
use crate::store::{BaseStore, BaseStoreExt};
use crate::{Change, DocStoreError, Document, Record, Result, ScanFilter};

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Id of the written document.
    pub id: DocId,
    /// Version of the new snapshot, or None for a delete.
    pub version: Option<Etag>,
    /// The change record emitted for this write.
    pub change: Change,
}

/// Service owning document bodies and version assignment.
///
/// Every write stores the new snapshot, then persists a [`Change`] and hands
/// it to the queue. These are separate single-key writes: a crash between
/// them leaves a document without a change record. Writes are
/// last-writer-wins; there is no optimistic locking.
pub struct DocumentStore<S: BaseStore, Q: ChangeQueue> {
    store: S,
    queue: Q,
}

impl<S: BaseStore, Q: ChangeQueue> DocumentStore<S, Q> {
    /// Creates a new document store over a base store and a change queue.
    pub fn new(store: S, queue: Q) -> Self {
        Self { store, queue }
    }

    /// Returns the change queue.
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Loads the current snapshot of a document.
    #[tracing::instrument(skip_all, fields(%database, %id))]
    pub async fn get(&self, database: &DbName, id: &DocId) -> Result<Document> {
        self.store
            .load::<Document>(&Document::create_key(database, id))
            .await?
            .ok_or_else(|| DocStoreError::NotFound {
                database: database.clone(),
                id: id.clone(),
            })
    }

    /// Loads a document and decodes its body into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, database: &DbName, id: &DocId) -> Result<T> {
        self.get(database, id).await?.decode()
    }

    /// Lists every document of a database, ordered by id.
    #[tracing::instrument(skip_all, fields(%database))]
    pub async fn all_docs(&self, database: &DbName) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .store
            .find(&ScanFilter::documents_in(database))
            .await?;
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    /// Creates a document under a freshly generated id.
    #[tracing::instrument(skip_all, fields(%database))]
    pub async fn create(&self, database: &DbName, body: Value) -> Result<Mutation> {
        let body = into_object(body)?;
        if body.contains_key("_id") {
            return Err(DocStoreError::CreateFailed(
                "document already has an id".to_string(),
            ));
        }

        let doc = Document::new(database.clone(), DocId::generate(), body);
        self.store.store(&doc).await?;

        let change = Change::new(database.clone(), doc.id.clone(), None, Some(doc.version));
        let change = self.schedule(change).await?;
        metrics::counter!("docstore_writes", "op" => "create").increment(1);

        Ok(Mutation {
            id: doc.id,
            version: Some(doc.version),
            change,
        })
    }

    /// Creates or replaces the document stored under `id`.
    #[tracing::instrument(skip_all, fields(%database, %id))]
    pub async fn put(&self, database: &DbName, id: &DocId, body: Value) -> Result<Mutation> {
        let body = into_object(body)?;
        if let Some(body_id) = body.get("_id")
            && body_id.as_str() != Some(id.as_str())
        {
            return Err(DocStoreError::InvalidId(
                "id does not match id in document".to_string(),
            ));
        }

        let key = Document::create_key(database, id);
        let version_before = self.store.load::<Document>(&key).await?.map(|d| d.version);

        let doc = Document::new(database.clone(), id.clone(), body);
        self.store.store(&doc).await?;

        let change = Change::new(
            database.clone(),
            id.clone(),
            version_before,
            Some(doc.version),
        );
        let change = self.schedule(change).await?;
        metrics::counter!("docstore_writes", "op" => "put").increment(1);

        Ok(Mutation {
            id: doc.id,
            version: Some(doc.version),
            change,
        })
    }

    /// Deletes a document.
    #[tracing::instrument(skip_all, fields(%database, %id))]
    pub async fn delete(&self, database: &DbName, id: &DocId) -> Result<Mutation> {
        let doc = self.get(database, id).await?;
        self.store.remove::<Document>(&doc.key()).await?;

        let change = Change::new(database.clone(), id.clone(), Some(doc.version), None);
        let change = self.schedule(change).await?;
        metrics::counter!("docstore_writes", "op" => "delete").increment(1);

        Ok(Mutation {
            id: id.clone(),
            version: None,
            change,
        })
    }

    /// Lists change records that have not been acknowledged yet, oldest
    /// first. With no database, lists the pending changes of every database.
    pub async fn pending_changes(&self, database: Option<&DbName>) -> Result<Vec<Change>> {
        let filter = database.map(ScanFilter::changes_in).unwrap_or_default();
        let mut changes: Vec<Change> = self.store.find(&filter).await?;
        changes.sort_by_key(|c| c.created_at);
        Ok(changes)
    }

    /// Removes a change record once it has been handed off for processing.
    ///
    /// Returns false if the record was already gone (duplicate delivery).
    pub async fn acknowledge(&self, change: &Change) -> Result<bool> {
        self.store.remove::<Change>(&change.key.to_string()).await
    }

    async fn schedule(&self, change: Change) -> Result<Change> {
        self.store.store(&change).await?;
        self.queue.enqueue(&change).await?;
        tracing::info!(
            change = %change.key,
            before = ?change.version_before,
            after = ?change.version_after,
            "scheduled change"
        );
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryBaseStore, InMemoryChangeQueue};
    use serde_json::json;

    fn setup() -> DocumentStore<InMemoryBaseStore, InMemoryChangeQueue> {
        DocumentStore::new(InMemoryBaseStore::new(), InMemoryChangeQueue::new())
    }

    fn db() -> DbName {
        DbName::parse("mydb").unwrap()
    }

    fn id(s: &str) -> DocId {
        DocId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let docs = setup();
        let created = docs.create(&db(), json!({"type": "a", "n": 1})).await.unwrap();

        let doc = docs.get(&db(), &created.id).await.unwrap();
        assert_eq!(doc.body["type"], "a");
        assert_eq!(doc.body["n"], 1);
        assert_eq!(doc.body["_id"], created.id.as_str());
        assert_eq!(Some(doc.version), created.version);
        assert!(created.change.is_create());
    }

    #[tokio::test]
    async fn create_rejects_preassigned_id() {
        let docs = setup();
        let result = docs.create(&db(), json!({"_id": "x"})).await;
        assert!(matches!(result, Err(DocStoreError::CreateFailed(_))));
    }

    #[tokio::test]
    async fn create_rejects_non_object_body() {
        let docs = setup();
        let result = docs.create(&db(), json!("text")).await;
        assert!(matches!(result, Err(DocStoreError::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn put_creates_then_updates_with_new_version() {
        let docs = setup();
        let first = docs
            .put(&db(), &id("doc1"), json!({"_id": "doc1", "v": 1}))
            .await
            .unwrap();
        assert_eq!(first.change.version_before, None);

        let second = docs
            .put(&db(), &id("doc1"), json!({"v": 2}))
            .await
            .unwrap();
        assert_eq!(second.change.version_before, first.version);
        assert_ne!(second.version, first.version);

        let doc = docs.get(&db(), &id("doc1")).await.unwrap();
        assert_eq!(doc.body["v"], 2);
        assert_eq!(Some(doc.version), second.version);
    }

    #[tokio::test]
    async fn put_rejects_mismatched_id() {
        let docs = setup();
        let result = docs
            .put(&db(), &id("doc1"), json!({"_id": "doc2"}))
            .await;
        assert!(matches!(result, Err(DocStoreError::InvalidId(_))));
    }

    #[tokio::test]
    async fn delete_emits_change_with_last_version() {
        let docs = setup();
        let put = docs.put(&db(), &id("doc1"), json!({})).await.unwrap();
        let deleted = docs.delete(&db(), &id("doc1")).await.unwrap();

        assert!(deleted.change.is_delete());
        assert_eq!(deleted.change.version_before, put.version);
        assert!(matches!(
            docs.get(&db(), &id("doc1")).await,
            Err(DocStoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let docs = setup();
        let result = docs.delete(&db(), &id("nope")).await;
        assert!(matches!(result, Err(DocStoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn all_docs_is_scoped_to_database() {
        let docs = setup();
        let other = DbName::parse("other").unwrap();
        docs.put(&db(), &id("b"), json!({})).await.unwrap();
        docs.put(&db(), &id("a"), json!({})).await.unwrap();
        docs.put(&other, &id("c"), json!({})).await.unwrap();

        let all = docs.all_docs(&db()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let empty = docs
            .all_docs(&DbName::parse("empty").unwrap())
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn every_write_is_persisted_and_enqueued() {
        let docs = setup();
        docs.put(&db(), &id("doc1"), json!({})).await.unwrap();
        docs.put(&db(), &id("doc1"), json!({})).await.unwrap();
        docs.delete(&db(), &id("doc1")).await.unwrap();

        let pending = docs.pending_changes(Some(&db())).await.unwrap();
        assert_eq!(pending.len(), 3);

        let delivered = docs.queue().drain().await;
        assert_eq!(delivered.len(), 3);
    }

    #[tokio::test]
    async fn acknowledge_removes_change_record() {
        let docs = setup();
        let put = docs.put(&db(), &id("doc1"), json!({})).await.unwrap();

        assert!(docs.acknowledge(&put.change).await.unwrap());
        assert!(!docs.acknowledge(&put.change).await.unwrap());
        assert!(docs.pending_changes(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_as_decodes_typed_body() {
        #[derive(serde::Deserialize)]
        struct Item {
            name: String,
        }

        let docs = setup();
        docs.put(&db(), &id("doc1"), json!({"name": "widget"}))
            .await
            .unwrap();
        let item: Item = docs.get_as(&db(), &id("doc1")).await.unwrap();
        assert_eq!(item.name, "widget");
    }
}
