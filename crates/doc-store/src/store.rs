use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::TryStreamExt;
use serde_json::Value;

use crate::{Record, Result, ScanFilter};

/// A stream of raw records.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

/// Key-addressed persistence boundary.
///
/// Implementations provide atomic single-key put/get/delete and atomic
/// equality-filtered scans. Nothing spans more than one key: callers must
/// not assume that two writes become visible together.
#[async_trait]
pub trait BaseStore: Send + Sync {
    /// Inserts or replaces the record stored under `(kind, key)`.
    async fn put(&self, kind: &str, key: &str, record: Value) -> Result<()>;

    /// Retrieves the record stored under `(kind, key)`.
    ///
    /// Returns None if no record exists.
    async fn get(&self, kind: &str, key: &str) -> Result<Option<Value>>;

    /// Deletes the record stored under `(kind, key)`.
    ///
    /// Returns true if a record was removed.
    async fn delete(&self, kind: &str, key: &str) -> Result<bool>;

    /// Streams every record of `kind` matching `filter`.
    async fn scan(&self, kind: &str, filter: &ScanFilter) -> Result<RecordStream>;
}

/// Typed access to a base store for any [`Record`].
#[async_trait]
pub trait BaseStoreExt: BaseStore {
    /// Persists a record under its own key.
    async fn store<R: Record>(&self, record: &R) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.put(R::KIND, &record.key(), value).await
    }

    /// Loads a record by key.
    async fn load<R: Record>(&self, key: &str) -> Result<Option<R>> {
        match self.get(R::KIND, key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Removes a record by key.
    async fn remove<R: Record>(&self, key: &str) -> Result<bool> {
        self.delete(R::KIND, key).await
    }

    /// Collects every record matching `filter`.
    async fn find<R: Record>(&self, filter: &ScanFilter) -> Result<Vec<R>> {
        let values: Vec<Value> = self.scan(R::KIND, filter).await?.try_collect().await?;
        values
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(Into::into))
            .collect()
    }
}

// Blanket implementation for all BaseStore implementations
impl<T: BaseStore + ?Sized> BaseStoreExt for T {}
