use common::{DbName, DocId, IdError};
use thiserror::Error;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum DocStoreError {
    /// The document does not exist.
    #[error("Document not found: {database}/{id}")]
    NotFound { database: DbName, id: DocId },

    /// The id in the path and the id in the body disagree, or an id was
    /// supplied where none is allowed.
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// A create request already carried an id.
    #[error("Create failed: {0}")]
    CreateFailed(String),

    /// No database was selected for the operation.
    #[error("Database not initialized")]
    UninitializedDb,

    /// The database name contains illegal characters.
    #[error("Illegal database name: {0}")]
    InvalidDbName(String),

    /// The document body is not a JSON object.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The change could not be handed to the queue.
    #[error("Queue error: {0}")]
    Queue(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<IdError> for DocStoreError {
    fn from(err: IdError) -> Self {
        match err {
            IdError::EmptyDatabase => DocStoreError::UninitializedDb,
            IdError::IllegalDatabase(name) => DocStoreError::InvalidDbName(name),
            IdError::InvalidDocId(id) => DocStoreError::InvalidId(format!("'{id}' is not a valid id")),
        }
    }
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, DocStoreError>;
