//! Test utilities
//!
//! Provides common testing infrastructure so unit tests get an isolated,
//! migrated database and consistent seeding helpers.

use anyhow::Result;

use crate::domain::entities::{EntityKind, RewriteRecord};
use crate::infrastructure::DatabaseConnection;

/// Test database configuration
pub struct TestDatabase {
    pub connection: DatabaseConnection,
}

impl TestDatabase {
    /// Create a new in-memory test database
    ///
    /// Each test gets a fresh, clean database state.
    pub async fn new() -> Result<Self> {
        let db = DatabaseConnection::new("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(Self { connection: db })
    }

    /// Get the database pool for use in repositories
    pub fn pool(&self) -> sqlx::Pool<sqlx::Sqlite> {
        self.connection.pool().clone()
    }

    pub async fn insert_entities(&self, kind: EntityKind, ids: &[i64]) -> Result<()> {
        let sql = format!("INSERT INTO {} (entity_id) VALUES (?1)", kind.default_entity_table());
        let mut tx = self.connection.pool().begin().await?;
        for id in ids {
            sqlx::query(&sql).bind(*id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_rewrites(&self, records: &[RewriteRecord]) -> Result<()> {
        let mut tx = self.connection.pool().begin().await?;
        for record in records {
            sqlx::query(
                "INSERT INTO url_rewrite (url_rewrite_id, entity_type, entity_id, request_path, target_path) VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(record.rewrite_id.get())
            .bind(record.entity_kind.discriminator())
            .bind(record.entity_id.get())
            .bind(&record.request_path)
            .bind(&record.target_path)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Entity ids referenced by the kind's rewrites, ascending
    pub async fn rewrite_entity_ids(&self, kind: EntityKind) -> Result<Vec<i64>> {
        Ok(sqlx::query_scalar(
            "SELECT entity_id FROM url_rewrite WHERE entity_type = ?1 ORDER BY entity_id",
        )
        .bind(kind.discriminator())
        .fetch_all(self.connection.pool())
        .await?)
    }
}
