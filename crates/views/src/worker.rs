//! Queue consumer feeding delivered changes to the view engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use doc_store::{BaseStore, Change, ChangeQueue, Delivery, DocumentStore, InMemoryChangeQueue};

use crate::{Result, ViewEngine};

/// Redelivery policy for failed changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Attempts per change, the first delivery included.
    pub max_deliveries: u32,
    /// Pause before a failed change is delivered again.
    pub retry_delay: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_deliveries: 5,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Receives changes and applies them to the views.
///
/// A change record is acknowledged (deleted) only after it was processed
/// successfully. Changes that keep failing stay in the base store and are
/// picked up again by the next catch-up.
pub struct ChangeConsumer<S: BaseStore, Q: ChangeQueue> {
    documents: Arc<DocumentStore<S, Q>>,
    engine: Arc<ViewEngine<S>>,
    config: ConsumerConfig,
}

impl<S, Q> ChangeConsumer<S, Q>
where
    S: BaseStore + 'static,
    Q: ChangeQueue + 'static,
{
    pub fn new(
        documents: Arc<DocumentStore<S, Q>>,
        engine: Arc<ViewEngine<S>>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            documents,
            engine,
            config,
        }
    }

    /// Processes one change, then acknowledges it.
    pub async fn deliver(&self, change: &Change) -> Result<()> {
        self.engine.process(change).await?;
        if !self.documents.acknowledge(change).await? {
            tracing::debug!(change = %change.key, "change was already acknowledged");
        }
        Ok(())
    }

    /// Processes every change record still present in the base store and
    /// returns how many succeeded.
    ///
    /// Closes the gap left by a crash between persisting a change and
    /// handing it to the queue. A change that fails is logged and left in
    /// place for the next catch-up.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<usize> {
        let pending = self.documents.pending_changes(None).await?;
        let mut processed = 0;
        for change in &pending {
            match self.deliver(change).await {
                Ok(()) => processed += 1,
                Err(err) => {
                    tracing::error!(
                        change = %change.key,
                        error = %err,
                        "catch-up could not process change, skipping"
                    );
                    metrics::counter!("queue_catch_up_failures").increment(1);
                }
            }
        }
        tracing::info!(
            changes_processed = processed,
            changes_failed = pending.len() - processed,
            "catch-up complete"
        );
        Ok(processed)
    }

    /// Consumes deliveries until `shutdown` resolves.
    ///
    /// Each delivery is handled on its own task, so deliveries are processed
    /// concurrently and in no particular order.
    pub async fn run(
        self: Arc<Self>,
        queue: InMemoryChangeQueue,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);
        tracing::info!("change consumer started");
        loop {
            let delivery = tokio::select! {
                _ = &mut shutdown => break,
                next = queue.recv() => match next {
                    Some(delivery) => delivery,
                    None => break,
                },
            };
            let consumer = Arc::clone(&self);
            let queue = queue.clone();
            tokio::spawn(async move { consumer.handle(delivery, &queue).await });
        }
        tracing::info!("change consumer stopped");
    }

    async fn handle(&self, delivery: Delivery, queue: &InMemoryChangeQueue) {
        let Err(err) = self.deliver(&delivery.change).await else {
            return;
        };

        if delivery.attempt < self.config.max_deliveries {
            tracing::warn!(
                change = %delivery.change.key,
                attempt = delivery.attempt,
                error = %err,
                "change processing failed, scheduling redelivery"
            );
            metrics::counter!("queue_redeliveries").increment(1);
            queue.redeliver(delivery, self.config.retry_delay);
        } else {
            tracing::error!(
                change = %delivery.change.key,
                attempts = delivery.attempt,
                error = %err,
                "change processing failed, giving up"
            );
            metrics::counter!("queue_dead_letters").increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, ViewQuery, ViewReader};
    use async_trait::async_trait;
    use doc_store::{
        BaseStoreExt, DbName, DocId, DocStoreError, InMemoryBaseStore, RecordStream, ScanFilter,
    };
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn db() -> DbName {
        DbName::parse("mydb").unwrap()
    }

    fn id(s: &str) -> DocId {
        DocId::parse(s).unwrap()
    }

    type Consumer<S> = ChangeConsumer<S, InMemoryChangeQueue>;

    fn consumer<S: BaseStore + Clone + 'static>(
        store: S,
        queue: InMemoryChangeQueue,
        config: ConsumerConfig,
    ) -> Arc<Consumer<S>> {
        Arc::new(ChangeConsumer::new(
            Arc::new(DocumentStore::new(store.clone(), queue)),
            Arc::new(ViewEngine::new(store, EngineConfig::default())),
            config,
        ))
    }

    #[tokio::test]
    async fn deliver_processes_and_acknowledges() {
        let store = InMemoryBaseStore::new();
        let queue = InMemoryChangeQueue::new();
        let consumer = consumer(store.clone(), queue.clone(), ConsumerConfig::default());
        let docs = DocumentStore::new(store.clone(), queue.clone());

        docs.put(
            &db(),
            &id("_design/d1"),
            json!({"views": {"byType": {"map": "function(doc){ emit(doc.type, doc._id) }"}}}),
        )
        .await
        .unwrap();
        docs.put(&db(), &id("doc1"), json!({"type": "a"}))
            .await
            .unwrap();

        for delivery in queue.drain().await {
            consumer.deliver(&delivery.change).await.unwrap();
        }

        assert!(docs.pending_changes(None).await.unwrap().is_empty());
        let result = ViewReader::new(store)
            .get_view(&db(), &id("_design/d1"), "byType", &ViewQuery::default())
            .await
            .unwrap();
        assert!(
            result
                .rows
                .contains(&json!({"id": "doc1", "key": "a", "value": "doc1"}))
        );
    }

    #[tokio::test]
    async fn catch_up_replays_pending_changes() {
        let store = InMemoryBaseStore::new();
        let queue = InMemoryChangeQueue::new();
        let docs = DocumentStore::new(store.clone(), queue.clone());
        docs.put(&db(), &id("doc1"), json!({})).await.unwrap();
        docs.put(&db(), &id("doc2"), json!({})).await.unwrap();
        // Simulate the deliveries being lost.
        queue.drain().await;

        let consumer = consumer(store, queue, ConsumerConfig::default());
        assert_eq!(consumer.run_catch_up().await.unwrap(), 2);
        assert_eq!(consumer.run_catch_up().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn run_consumes_until_shutdown() {
        let store = InMemoryBaseStore::new();
        let queue = InMemoryChangeQueue::new();
        let consumer = consumer(store.clone(), queue.clone(), ConsumerConfig::default());
        let docs = DocumentStore::new(store.clone(), queue.clone());

        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(Arc::clone(&consumer).run(queue.clone(), async move {
            let _ = stopped.await;
        }));

        docs.put(&db(), &id("doc1"), json!({})).await.unwrap();
        for _ in 0..100 {
            if docs.pending_changes(None).await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(docs.pending_changes(None).await.unwrap().is_empty());

        stop.send(()).unwrap();
        task.await.unwrap();
    }

    /// Base store whose output writes fail a fixed number of times.
    #[derive(Clone)]
    struct FlakyStore {
        inner: InMemoryBaseStore,
        failures_left: Arc<AtomicU32>,
        /// Output writes for this document always fail.
        poisoned: Option<&'static str>,
    }

    #[async_trait]
    impl BaseStore for FlakyStore {
        async fn put(&self, kind: &str, key: &str, record: Value) -> doc_store::Result<()> {
            let poisoned = self.poisoned.is_some_and(|doc_id| record["docId"] == doc_id);
            if kind == "output"
                && (poisoned
                    || self
                        .failures_left
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok())
            {
                return Err(DocStoreError::Queue("injected failure".to_string()));
            }
            self.inner.put(kind, key, record).await
        }

        async fn get(&self, kind: &str, key: &str) -> doc_store::Result<Option<Value>> {
            self.inner.get(kind, key).await
        }

        async fn delete(&self, kind: &str, key: &str) -> doc_store::Result<bool> {
            self.inner.delete(kind, key).await
        }

        async fn scan(&self, kind: &str, filter: &ScanFilter) -> doc_store::Result<RecordStream> {
            self.inner.scan(kind, filter).await
        }
    }

    async fn run_flaky(failures: u32, max_deliveries: u32) -> (InMemoryBaseStore, usize) {
        let inner = InMemoryBaseStore::new();
        let store = FlakyStore {
            inner: inner.clone(),
            failures_left: Arc::new(AtomicU32::new(failures)),
            poisoned: None,
        };
        let queue = InMemoryChangeQueue::new();
        let docs = DocumentStore::new(store.clone(), queue.clone());
        docs.put(
            &db(),
            &id("_design/d1"),
            json!({"views": {"all": {"map": "function(doc){ emit(doc._id, null) }"}}}),
        )
        .await
        .unwrap();
        // Only the document change goes through the consumer.
        queue.drain().await;
        docs.put(&db(), &id("doc1"), json!({})).await.unwrap();

        let consumer = consumer(
            store,
            queue.clone(),
            ConsumerConfig {
                max_deliveries,
                retry_delay: Duration::from_millis(5),
            },
        );
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(Arc::clone(&consumer).run(queue, async move {
            let _ = stopped.await;
        }));
        tokio::time::sleep(Duration::from_millis(200)).await;
        stop.send(()).unwrap();
        task.await.unwrap();

        let outputs: Vec<doc_store::Output> = inner.find(&ScanFilter::new()).await.unwrap();
        (inner, outputs.len())
    }

    #[tokio::test]
    async fn failed_change_is_redelivered() {
        let (store, outputs) = run_flaky(2, 5).await;
        assert_eq!(outputs, 1);
        let pending: Vec<Change> = store.find(&ScanFilter::new()).await.unwrap();
        // only the design change, which never went through the consumer
        assert_eq!(pending.len(), 1);
        assert!(pending[0].id.is_design());
    }

    #[tokio::test]
    async fn change_is_kept_after_last_delivery() {
        let (store, outputs) = run_flaky(10, 2).await;
        assert_eq!(outputs, 0);
        let pending: Vec<Change> = store.find(&ScanFilter::new()).await.unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn catch_up_skips_changes_that_keep_failing() {
        let inner = InMemoryBaseStore::new();
        let store = FlakyStore {
            inner: inner.clone(),
            failures_left: Arc::new(AtomicU32::new(0)),
            poisoned: Some("bad"),
        };
        let queue = InMemoryChangeQueue::new();
        let docs = DocumentStore::new(store.clone(), queue.clone());
        let consumer = consumer(store, queue.clone(), ConsumerConfig::default());

        docs.put(
            &db(),
            &id("_design/d1"),
            json!({"views": {"all": {"map": "function(doc){ emit(doc._id, null) }"}}}),
        )
        .await
        .unwrap();
        assert_eq!(consumer.run_catch_up().await.unwrap(), 1);

        for doc in ["good1", "bad", "good2"] {
            docs.put(&db(), &id(doc), json!({})).await.unwrap();
        }
        queue.drain().await;

        assert_eq!(consumer.run_catch_up().await.unwrap(), 2);
        let pending: Vec<Change> = inner.find(&ScanFilter::new()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id("bad"));

        let outputs: Vec<doc_store::Output> = inner.find(&ScanFilter::new()).await.unwrap();
        // the design itself plus the two good documents
        assert_eq!(outputs.len(), 3);
    }
}
