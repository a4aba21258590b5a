//! Application layer - reconciliation use cases and indexer entry points

pub mod indexer;
pub mod reconciler;

pub use indexer::{ChangelogAction, IndexerAction, UrlRewriteIndexer};
pub use reconciler::{DEFAULT_BATCH_SIZE, UrlRewriteReconciler};
