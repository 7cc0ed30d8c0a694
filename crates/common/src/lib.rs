//! Identifier types shared by the document store, view engine and API.

pub mod types;

pub use types::{ChangeId, DESIGN_PREFIX, DbName, DocId, Etag, IdError};
