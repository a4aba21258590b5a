//! Infrastructure layer for database connections, storage adapters,
//! configuration and logging

pub mod config;
pub mod database_connection;
pub mod logging;
pub mod memory_store;
pub mod repositories;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::application::{UrlRewriteIndexer, UrlRewriteReconciler};
use crate::domain::errors::ReconcileError;

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, DatabaseConfig, LoggingConfig, ReconcileConfig};
pub use database_connection::DatabaseConnection;
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use memory_store::InMemoryCatalogStore;
pub use repositories::{SqliteEntityIdSource, SqliteRewriteStore};

/// Build an indexer over SQLite with one reconciler per configured kind
///
/// All reconcilers share the same id source and rewrite store.
pub fn sqlite_indexer(
    pool: SqlitePool,
    config: &ReconcileConfig,
) -> Result<UrlRewriteIndexer, ReconcileError> {
    let id_source = Arc::new(SqliteEntityIdSource::new(pool.clone()));
    let rewrite_store = Arc::new(SqliteRewriteStore::new(pool, config.rewrite_table.clone()));

    let reconcilers = config
        .kinds
        .iter()
        .map(|descriptor| {
            UrlRewriteReconciler::new(
                descriptor.clone(),
                id_source.clone(),
                rewrite_store.clone(),
                config.batch_size,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(UrlRewriteIndexer::new(reconcilers))
}
