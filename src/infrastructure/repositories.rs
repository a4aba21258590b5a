//! SQLite implementations of the reconciliation repositories
//!
//! Id sets cross into SQL as a single JSON array parameter expanded with
//! `json_each`, so neither lookups nor deletes are bound by SQLite's host
//! parameter limit. Batch size only bounds the size of one delete statement.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;

use crate::domain::entities::{
    EntityId, EntityKind, EntityKindDescriptor, RewriteId, SqlIdentifier,
};
use crate::domain::errors::StoreResult;
use crate::domain::repositories::{EntityIdSource, RewriteStore};

pub const DEFAULT_REWRITE_TABLE: &str = "url_rewrite";

fn encode_ids<T: Serialize + ?Sized>(ids: &T) -> StoreResult<String> {
    Ok(serde_json::to_string(ids)?)
}

// ============================================================================
// EntityIdSource Implementation
// ============================================================================

pub struct SqliteEntityIdSource {
    pool: SqlitePool,
}

impl SqliteEntityIdSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityIdSource for SqliteEntityIdSource {
    async fn list_entity_ids(
        &self,
        descriptor: &EntityKindDescriptor,
        filter: Option<&BTreeSet<EntityId>>,
    ) -> StoreResult<BTreeSet<EntityId>> {
        let link = &descriptor.link_field;
        let mut sql = format!(
            r#"SELECT "{link}" FROM "{table}" WHERE "{link}" IS NOT NULL"#,
            table = descriptor.entity_table
        );

        let ids: Vec<i64> = match filter {
            None => sqlx::query_scalar(&sql).fetch_all(&self.pool).await?,
            Some(candidates) => {
                sql.push_str(&format!(
                    r#" AND "{link}" IN (SELECT value FROM json_each(?1))"#
                ));
                sqlx::query_scalar(&sql)
                    .bind(encode_ids(candidates)?)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(ids.into_iter().map(EntityId::new).collect::<BTreeSet<_>>())
    }
}

// ============================================================================
// RewriteStore Implementation
// ============================================================================

pub struct SqliteRewriteStore {
    pool: SqlitePool,
    table: SqlIdentifier,
}

impl SqliteRewriteStore {
    pub fn new(pool: SqlitePool, table: SqlIdentifier) -> Self {
        Self { pool, table }
    }

    /// Store over the default `url_rewrite` table
    pub fn with_default_table(pool: SqlitePool) -> Self {
        Self {
            pool,
            table: SqlIdentifier::trusted(DEFAULT_REWRITE_TABLE),
        }
    }

    pub fn table(&self) -> &SqlIdentifier {
        &self.table
    }
}

#[async_trait]
impl RewriteStore for SqliteRewriteStore {
    async fn find_rewrite_ids_excluding(
        &self,
        kind: EntityKind,
        live_ids: &BTreeSet<EntityId>,
    ) -> StoreResult<BTreeSet<RewriteId>> {
        let sql = format!(
            r#"
            SELECT url_rewrite_id FROM "{}"
            WHERE entity_type = ?1
              AND entity_id NOT IN (SELECT value FROM json_each(?2))
            ORDER BY url_rewrite_id
            "#,
            self.table
        );

        let ids: Vec<i64> = sqlx::query_scalar(&sql)
            .bind(kind.discriminator())
            .bind(encode_ids(live_ids)?)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(RewriteId::new).collect::<BTreeSet<_>>())
    }

    async fn delete_by_ids(&self, ids: &[RewriteId]) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            r#"DELETE FROM "{}" WHERE url_rewrite_id IN (SELECT value FROM json_each(?1))"#,
            self.table
        );

        let result = sqlx::query(&sql)
            .bind(encode_ids(ids)?)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
