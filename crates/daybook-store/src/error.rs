//! Error types for workspace persistence.

use thiserror::Error;

/// Errors that can occur during `WorkspaceStore` operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No file exists for the named workspace.
    #[error("workspace not found: {0}")]
    NotFound(String),

    /// The workspace file could not be encoded or decoded.
    #[error("workspace codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
