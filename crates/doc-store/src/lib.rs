//! Versioned JSON document store.
//!
//! - [`DocumentStore`]: CRUD over JSON documents; every write assigns a new
//!   [`Etag`] and emits a [`Change`]
//! - [`BaseStore`]: key-addressed persistence boundary, with in-memory and
//!   PostgreSQL implementations
//! - [`ChangeQueue`]: at-least-once, unordered handoff of changes to the
//!   view engine

pub mod documents;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod queue;
pub mod record;
pub mod store;

pub use common::{ChangeId, DbName, DocId, Etag};
pub use documents::{DocumentStore, Mutation};
pub use error::{DocStoreError, Result};
pub use memory::InMemoryBaseStore;
pub use postgres::PostgresBaseStore;
pub use query::ScanFilter;
pub use queue::{ChangeQueue, Delivery, InMemoryChangeQueue};
pub use record::{Change, Document, Output, Record, RunStamp};
pub use store::{BaseStore, BaseStoreExt, RecordStream};
