//! End-to-end reconciliation against a file-backed SQLite database
use anyhow::Result;
use tempfile::TempDir;

use catalog_url_rewrite::domain::{
    EntityId, EntityKind, EntityKindDescriptor, ReconcileMode, ReconciliationRequest,
};
use catalog_url_rewrite::infrastructure::{DatabaseConnection, ReconcileConfig, sqlite_indexer};
use catalog_url_rewrite::{ChangelogAction, IndexerAction};

async fn setup() -> Result<(TempDir, DatabaseConnection)> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite:{}", dir.path().join("data").join("catalog.db").display());
    let db = DatabaseConnection::new(&url, 4).await?;
    db.migrate().await?;
    Ok((dir, db))
}

async fn seed_entities(db: &DatabaseConnection, kind: EntityKind, ids: &[i64]) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} (entity_id, row_id) VALUES (?1, ?2)",
        kind.default_entity_table()
    );
    for id in ids {
        sqlx::query(&sql).bind(*id).bind(*id + 1000).execute(db.pool()).await?;
    }
    Ok(())
}

async fn seed_rewrites(db: &DatabaseConnection, kind: EntityKind, entity_ids: &[i64]) -> Result<()> {
    for id in entity_ids {
        sqlx::query(
            "INSERT INTO url_rewrite (entity_type, entity_id, request_path, target_path) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(kind.discriminator())
        .bind(*id)
        .bind(format!("{kind}/{id}.html"))
        .bind(format!("catalog/{kind}/view/id/{id}"))
        .execute(db.pool())
        .await?;
    }
    Ok(())
}

async fn rewrite_entity_ids(db: &DatabaseConnection, kind: EntityKind) -> Result<Vec<i64>> {
    Ok(sqlx::query_scalar(
        "SELECT entity_id FROM url_rewrite WHERE entity_type = ?1 ORDER BY entity_id",
    )
    .bind(kind.discriminator())
    .fetch_all(db.pool())
    .await?)
}

#[tokio::test]
async fn full_reindex_removes_only_orphans_of_each_kind() -> Result<()> {
    let (_dir, db) = setup().await?;
    seed_entities(&db, EntityKind::Category, &[1, 2, 3]).await?;
    seed_entities(&db, EntityKind::Product, &[4]).await?;
    seed_rewrites(&db, EntityKind::Category, &[1, 2, 3, 4]).await?;
    seed_rewrites(&db, EntityKind::Product, &[1, 4, 9]).await?;

    let indexer = sqlite_indexer(db.pool().clone(), &ReconcileConfig::default())?;
    let reports = indexer.reindex_all().await?;

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.mode == ReconcileMode::Full));
    assert_eq!(rewrite_entity_ids(&db, EntityKind::Category).await?, vec![1, 2, 3]);
    assert_eq!(rewrite_entity_ids(&db, EntityKind::Product).await?, vec![4]);

    // Second pass has nothing left to do
    let again = indexer.reindex_all().await?;
    assert!(again.iter().all(|r| r.is_noop()));
    Ok(())
}

#[tokio::test]
async fn small_batches_delete_every_orphan() -> Result<()> {
    let (_dir, db) = setup().await?;
    seed_entities(&db, EntityKind::Product, &[1]).await?;
    let orphans: Vec<i64> = (100..125).collect();
    seed_rewrites(&db, EntityKind::Product, &orphans).await?;
    seed_rewrites(&db, EntityKind::Product, &[1]).await?;

    let config = ReconcileConfig {
        batch_size: 10,
        ..ReconcileConfig::default()
    };
    let indexer = sqlite_indexer(db.pool().clone(), &config)?;
    let report = indexer.reconciler(EntityKind::Product)?.execute_full().await?;

    assert_eq!(report.orphaned, 25);
    assert_eq!(report.deleted, 25);
    assert_eq!(report.batches, 3);
    assert_eq!(rewrite_entity_ids(&db, EntityKind::Product).await?, vec![1]);
    Ok(())
}

#[tokio::test]
async fn changelog_run_scopes_live_ids_to_changed_entities() -> Result<()> {
    let (_dir, db) = setup().await?;
    seed_entities(&db, EntityKind::Category, &[5, 7, 8]).await?;
    seed_rewrites(&db, EntityKind::Category, &[5, 7, 8]).await?;

    let indexer = sqlite_indexer(db.pool().clone(), &ReconcileConfig::default())?;
    let reconciler = indexer.reconciler(EntityKind::Category)?;
    let report = reconciler
        .execute(&[EntityId::new(5), EntityId::new(7)])
        .await?;

    // 8 is live but outside the changed set, so its rewrite is not kept
    assert_eq!(report.mode, ReconcileMode::Scoped);
    assert_eq!(report.live_ids, 2);
    assert_eq!(rewrite_entity_ids(&db, EntityKind::Category).await?, vec![5, 7]);
    Ok(())
}

#[tokio::test]
async fn raw_ids_are_coerced_before_scoping() -> Result<()> {
    let (_dir, db) = setup().await?;
    seed_entities(&db, EntityKind::Product, &[12]).await?;
    seed_rewrites(&db, EntityKind::Product, &[12]).await?;

    let indexer = sqlite_indexer(db.pool().clone(), &ReconcileConfig::default())?;
    let request = ReconciliationRequest::from_raw(["12abc", "12", " 12"]);
    let report = indexer
        .reconciler(EntityKind::Product)?
        .reconcile(&request)
        .await?;

    assert_eq!(report.candidate_ids, 1);
    assert!(report.is_noop());
    assert_eq!(rewrite_entity_ids(&db, EntityKind::Product).await?, vec![12]);
    Ok(())
}

#[tokio::test]
async fn configured_link_field_is_used_for_live_ids() -> Result<()> {
    let (_dir, db) = setup().await?;
    // row_id = entity_id + 1000
    seed_entities(&db, EntityKind::Product, &[1, 2]).await?;
    seed_rewrites(&db, EntityKind::Product, &[1001, 2]).await?;

    let config = ReconcileConfig {
        kinds: vec![EntityKindDescriptor::new(
            EntityKind::Product,
            "catalog_product_entity",
            "row_id",
        )?],
        ..ReconcileConfig::default()
    };
    let indexer = sqlite_indexer(db.pool().clone(), &config)?;
    assert_eq!(indexer.kinds(), vec![EntityKind::Product]);

    indexer.reindex_all().await?;

    assert_eq!(rewrite_entity_ids(&db, EntityKind::Product).await?, vec![1001]);
    Ok(())
}
