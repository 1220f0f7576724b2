//! Error types for data access operations.

use thiserror::Error;

/// Data access error type.
#[derive(Error, Debug)]
pub enum DalError {
    /// The caller broke a precondition. Raised before any transport call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine did not accept a search or mutation.
    #[error("query failed (status: {status})")]
    QueryFailure {
        /// Status code reported by the transport.
        status: u16,
    },

    /// A single-document lookup matched nothing.
    #[error("document not found")]
    DocumentNotFound,

    /// Programmer error, such as reading the id of an unindexed document.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An accepted bulk request reported failures for some items.
    #[error("bulk operation failed: {succeeded} succeeded, {failed} failed")]
    BulkFailure {
        /// Number of successful items.
        succeeded: usize,
        /// Number of failed items.
        failed: usize,
        /// Reasons reported for the failed items.
        errors: Vec<String>,
    },

    /// A scroll kept returning hits past the configured batch cap.
    #[error("scroll did not drain after {batches} batches")]
    ScrollLimit {
        /// Batches fetched before giving up.
        batches: usize,
    },

    /// An exhaustive search ran past its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The transport could not be built.
    #[error("connection error: {0}")]
    Connection(String),

    /// Document data could not be converted.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Client error from the opensearch crate.
    #[error("client error: {0}")]
    Client(#[from] opensearch::Error),
}

impl DalError {
    /// Status code carried by a [`DalError::QueryFailure`].
    pub fn status(&self) -> Option<u16> {
        match self {
            DalError::QueryFailure { status } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for data access operations.
pub type Result<T> = std::result::Result<T, DalError>;
