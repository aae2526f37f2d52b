//! Error types shared across the netinv daemons.

use thiserror::Error;

/// Errors raised by an [`crate::store::InventoryStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced object does not exist.
    #[error("object not found: {id} [{class}]")]
    ObjectNotFound { class: String, id: String },

    /// The referenced class is not declared in the schema.
    #[error("class not found: {0}")]
    ClassNotFound(String),

    /// The operation is not legal for the given objects
    /// (e.g. creating a child under a class that does not allow it).
    #[error("operation not permitted: {0}")]
    OperationNotPermitted(String),

    /// The arguments passed to the store were malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend itself failed (connection, transaction, ...).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Fatal setup errors for a reconciliation run.
///
/// These propagate before any mutation is issued; everything that happens
/// after setup is reported per node through `Finding`s instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The discovery payload carried no usable rows.
    #[error("discovery payload is empty or carries no usable rows")]
    EmptyPayload,

    /// No chassis row was found, so the device root cannot be identified.
    #[error("no identifiable device root in the discovery payload: {0}")]
    NoRoot(String),

    /// The persisted device object could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for a reconciliation run.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
