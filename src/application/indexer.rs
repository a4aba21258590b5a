//! Indexer entry points for URL rewrite reconciliation
//!
//! The indexing framework drives reconcilers in two ways: explicit
//! full/list/row runs and changelog subscriptions that hand over the ids that
//! changed since the last run.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::info;

use crate::application::reconciler::UrlRewriteReconciler;
use crate::domain::entities::{EntityId, EntityKind, ReconcileReport};
use crate::domain::errors::ReconcileError;

#[async_trait]
pub trait IndexerAction: Send + Sync {
    async fn execute_full(&self) -> Result<ReconcileReport, ReconcileError>;
    async fn execute_list(&self, ids: &[EntityId]) -> Result<ReconcileReport, ReconcileError>;
    async fn execute_row(&self, id: EntityId) -> Result<ReconcileReport, ReconcileError>;
}

/// Changelog-driven action.
///
/// May be invoked more than once for the same ids and concurrently with other
/// runs of the same kind.
#[async_trait]
pub trait ChangelogAction: Send + Sync {
    async fn execute(&self, changed_ids: &[EntityId]) -> Result<ReconcileReport, ReconcileError>;
}

#[async_trait]
impl IndexerAction for UrlRewriteReconciler {
    async fn execute_full(&self) -> Result<ReconcileReport, ReconcileError> {
        self.reconcile_full().await
    }

    async fn execute_list(&self, ids: &[EntityId]) -> Result<ReconcileReport, ReconcileError> {
        self.reconcile_list(ids).await
    }

    async fn execute_row(&self, id: EntityId) -> Result<ReconcileReport, ReconcileError> {
        self.reconcile_row(id).await
    }
}

#[async_trait]
impl ChangelogAction for UrlRewriteReconciler {
    async fn execute(&self, changed_ids: &[EntityId]) -> Result<ReconcileReport, ReconcileError> {
        self.reconcile_list(changed_ids).await
    }
}

/// One reconciler per configured entity kind
pub struct UrlRewriteIndexer {
    reconcilers: Vec<Arc<UrlRewriteReconciler>>,
}

impl UrlRewriteIndexer {
    #[must_use]
    pub fn new(reconcilers: Vec<UrlRewriteReconciler>) -> Self {
        Self {
            reconcilers: reconcilers.into_iter().map(Arc::new).collect(),
        }
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<EntityKind> {
        self.reconcilers.iter().map(|r| r.kind()).collect()
    }

    pub fn reconciler(&self, kind: EntityKind) -> Result<Arc<UrlRewriteReconciler>, ReconcileError> {
        self.reconcilers
            .iter()
            .find(|r| r.kind() == kind)
            .cloned()
            .ok_or(ReconcileError::UnknownKind(kind))
    }

    /// Full reconciliation of every kind.
    ///
    /// Kinds own disjoint discriminator partitions of the rewrite table, so
    /// they run concurrently. The first failure is returned.
    pub async fn reindex_all(&self) -> Result<Vec<ReconcileReport>, ReconcileError> {
        let reports = try_join_all(self.reconcilers.iter().map(|r| r.reconcile_full())).await?;

        let deleted: u64 = reports.iter().map(|report| report.deleted).sum();
        info!(kinds = reports.len(), deleted, "full url rewrite reindex finished");
        Ok(reports)
    }
}
