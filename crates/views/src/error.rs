use doc_store::DocStoreError;
use thiserror::Error;

use crate::script::ScriptError;

/// Errors that can occur while maintaining or reading views.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The document store or base store failed.
    #[error(transparent)]
    Store(#[from] DocStoreError),

    /// A map function failed to compile or run.
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// A blocking map worker panicked or was cancelled.
    #[error("Map worker failed: {0}")]
    Worker(String),
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;
