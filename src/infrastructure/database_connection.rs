// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true);

        if !in_memory {
            // Create database file directory if it doesn't exist
            let db_path = database_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let db_path = db_path.split('?').next().unwrap_or(db_path);
            if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
            }
        }

        // Every connection to `sqlite::memory:` opens its own empty database,
        // so in-memory pools keep exactly one connection alive forever.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to {database_url}"))?;

        debug!(database_url, in_memory, "database pool ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS catalog_category_entity (
                entity_id INTEGER PRIMARY KEY,
                row_id INTEGER UNIQUE,
                parent_id INTEGER NOT NULL DEFAULT 0,
                path TEXT NOT NULL DEFAULT '',
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS catalog_product_entity (
                entity_id INTEGER PRIMARY KEY,
                row_id INTEGER UNIQUE,
                sku TEXT,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS url_rewrite (
                url_rewrite_id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_type TEXT NOT NULL,
                entity_id INTEGER NOT NULL,
                request_path TEXT NOT NULL,
                target_path TEXT NOT NULL,
                redirect_type INTEGER NOT NULL DEFAULT 0,
                store_id INTEGER NOT NULL DEFAULT 0
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_url_rewrite_entity ON url_rewrite (entity_type, entity_id)",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_url_rewrite_request_path ON url_rewrite (request_path, store_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply schema")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_database_connection() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("nested").join("test.db");
        let database_url = format!("sqlite:{}", db_path.to_string_lossy());

        let db = DatabaseConnection::new(&database_url, 4).await?;

        assert!(!db.pool().is_closed());
        assert!(db_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_database_migration() -> Result<()> {
        let db = DatabaseConnection::new("sqlite::memory:", 10).await?;

        db.migrate().await?;
        // Applying twice must be harmless.
        db.migrate().await?;

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('url_rewrite', 'catalog_category_entity', 'catalog_product_entity') ORDER BY name",
        )
        .fetch_all(db.pool())
        .await?;

        assert_eq!(
            tables,
            vec!["catalog_category_entity", "catalog_product_entity", "url_rewrite"]
        );
        Ok(())
    }
}
