use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    Result, ScanFilter,
    store::{BaseStore, RecordStream},
};

type Keyspace = HashMap<String, Value>;

/// In-memory base store.
///
/// Records are kept per kind in hash maps guarded by a single lock, so every
/// single-key operation and every scan observes a consistent snapshot.
#[derive(Clone, Default)]
pub struct InMemoryBaseStore {
    records: Arc<RwLock<HashMap<String, Keyspace>>>,
}

impl InMemoryBaseStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records of a kind.
    pub async fn count(&self, kind: &str) -> usize {
        self.records
            .read()
            .await
            .get(kind)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl BaseStore for InMemoryBaseStore {
    async fn put(&self, kind: &str, key: &str, record: Value) -> Result<()> {
        self.records
            .write()
            .await
            .entry(kind.to_string())
            .or_default()
            .insert(key.to_string(), record);
        Ok(())
    }

    async fn get(&self, kind: &str, key: &str) -> Result<Option<Value>> {
        let records = self.records.read().await;
        Ok(records.get(kind).and_then(|keyspace| keyspace.get(key)).cloned())
    }

    async fn delete(&self, kind: &str, key: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(records
            .get_mut(kind)
            .is_some_and(|keyspace| keyspace.remove(key).is_some()))
    }

    async fn scan(&self, kind: &str, filter: &ScanFilter) -> Result<RecordStream> {
        use futures_util::stream;

        let records = self.records.read().await;
        let matching: Vec<Value> = records
            .get(kind)
            .map(|keyspace| {
                keyspace
                    .values()
                    .filter(|record| filter.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let stream = stream::iter(matching.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}
