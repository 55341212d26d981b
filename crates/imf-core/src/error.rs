//! Centralized error types for the engine.

use thiserror::Error;

use crate::relations::DanglingReference;
use crate::remote::RemoteFailure;
use crate::validate::Violation;

/// Main error type for engine operations.
#[derive(Error, Debug)]
pub enum ImfError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Node already exists: {0}")]
    DuplicateNode(String),

    #[error("Edge already exists: {0}")]
    DuplicateEdge(String),

    #[error("Invalid document: {0}")]
    Validation(#[from] Violation),

    #[error("Dangling reference: {0}")]
    Dangling(DanglingReference),

    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteFailure),

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    #[error("Import rejected: {0}")]
    Import(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type ImfResult<T> = Result<T, ImfError>;

impl ImfError {
    /// Create an import-surface rejection.
    pub fn import(msg: impl Into<String>) -> Self {
        Self::Import(msg.into())
    }

    /// Create an invalid patch error.
    pub fn invalid_patch(msg: impl Into<String>) -> Self {
        Self::InvalidPatch(msg.into())
    }
}
