//! Catalog URL rewrite reconciliation
//!
//! Removes generated URL rewrites whose category or product no longer exists.
//! Reconciliation runs per entity kind in full, list or row mode and deletes
//! orphaned rewrites in bounded batches.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_utils;

pub use application::{
    ChangelogAction, DEFAULT_BATCH_SIZE, IndexerAction, UrlRewriteIndexer, UrlRewriteReconciler,
};
pub use domain::{
    EntityId, EntityKind, EntityKindDescriptor, ReconcileError, ReconcileMode, ReconcileReport,
    ReconciliationRequest, RewriteId, StoreError,
};
pub use infrastructure::{AppConfig, DatabaseConnection, sqlite_indexer};
