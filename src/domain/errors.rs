//! Error types for store access and reconciliation

use thiserror::Error;

use crate::domain::entities::EntityKind;

/// Failure reported by an [`EntityIdSource`](crate::domain::repositories::EntityIdSource)
/// or [`RewriteStore`](crate::domain::repositories::RewriteStore)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to encode id list: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("reconcile batch size must be greater than 0")]
    InvalidBatchSize,

    #[error("no reconciler configured for entity kind '{0}'")]
    UnknownKind(EntityKind),

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl ReconcileError {
    /// Whether re-running the whole operation may succeed.
    ///
    /// Reconciliation is idempotent, so any store failure can be retried from
    /// the start; configuration mistakes cannot.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::StoreUnavailable(_) => true,
            Self::InvalidBatchSize | Self::UnknownKind(_) => false,
        }
    }
}
