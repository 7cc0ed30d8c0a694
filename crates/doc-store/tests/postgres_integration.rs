//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p doc-store --test postgres_integration
//! ```

use std::sync::Arc;

use doc_store::{
    BaseStore, BaseStoreExt, Change, DbName, DocId, DocStoreError, Document, DocumentStore,
    InMemoryChangeQueue, PostgresBaseStore, ScanFilter,
};
use serde_json::json;
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_records_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresBaseStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE records")
        .execute(&pool)
        .await
        .unwrap();

    PostgresBaseStore::new(pool)
}

fn db() -> DbName {
    DbName::parse("mydb").unwrap()
}

#[tokio::test]
#[serial]
async fn put_get_delete_roundtrip() {
    let store = get_test_store().await;

    store
        .put("thing", "a", json!({"n": 1}))
        .await
        .unwrap();
    assert_eq!(
        store.get("thing", "a").await.unwrap(),
        Some(json!({"n": 1}))
    );

    store
        .put("thing", "a", json!({"n": 2}))
        .await
        .unwrap();
    assert_eq!(
        store.get("thing", "a").await.unwrap(),
        Some(json!({"n": 2}))
    );

    assert!(store.delete("thing", "a").await.unwrap());
    assert!(!store.delete("thing", "a").await.unwrap());
    assert_eq!(store.get("thing", "a").await.unwrap(), None);
}

#[tokio::test]
#[serial]
async fn scan_uses_equality_containment() {
    let store = get_test_store().await;

    store
        .put("thing", "a", json!({"db": "x", "flag": true, "n": 1}))
        .await
        .unwrap();
    store
        .put("thing", "b", json!({"db": "x", "flag": false, "n": 2}))
        .await
        .unwrap();
    store
        .put("other", "c", json!({"db": "x", "flag": true}))
        .await
        .unwrap();

    let filter = ScanFilter::new().eq("db", "x").eq("flag", true);
    let found: Vec<serde_json::Value> = {
        use futures_util::TryStreamExt;
        store
            .scan("thing", &filter)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap()
    };
    assert_eq!(found, vec![json!({"db": "x", "flag": true, "n": 1})]);
}

#[tokio::test]
#[serial]
async fn document_store_over_postgres() {
    let store = get_test_store().await;
    let docs = DocumentStore::new(store.clone(), InMemoryChangeQueue::new());
    let id = DocId::parse("doc1").unwrap();

    let first = docs.put(&db(), &id, json!({"type": "a"})).await.unwrap();
    let second = docs.put(&db(), &id, json!({"type": "b"})).await.unwrap();
    assert_eq!(second.change.version_before, first.version);

    let doc = docs.get(&db(), &id).await.unwrap();
    assert_eq!(doc.body["type"], "b");

    let designs: Vec<Document> = store.find(&ScanFilter::designs_in(&db())).await.unwrap();
    assert!(designs.is_empty());

    let pending: Vec<Change> = docs.pending_changes(Some(&db())).await.unwrap();
    assert_eq!(pending.len(), 2);

    docs.delete(&db(), &id).await.unwrap();
    assert!(matches!(
        docs.get(&db(), &id).await,
        Err(DocStoreError::NotFound { .. })
    ));
}
