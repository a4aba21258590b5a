//! Orphaned URL rewrite reconciliation
//!
//! One generic reconciler per entity kind. It computes the rewrite rows whose
//! entity no longer exists and deletes them in bounded batches.

use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::entities::{
    EntityId, EntityKind, EntityKindDescriptor, ReconcileReport, ReconciliationRequest, RewriteId,
};
use crate::domain::errors::ReconcileError;
use crate::domain::repositories::{EntityIdSource, RewriteStore};

/// Upper bound on ids per delete statement unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

pub struct UrlRewriteReconciler {
    descriptor: EntityKindDescriptor,
    id_source: Arc<dyn EntityIdSource>,
    rewrite_store: Arc<dyn RewriteStore>,
    batch_size: NonZeroUsize,
}

impl UrlRewriteReconciler {
    pub fn new(
        descriptor: EntityKindDescriptor,
        id_source: Arc<dyn EntityIdSource>,
        rewrite_store: Arc<dyn RewriteStore>,
        batch_size: usize,
    ) -> Result<Self, ReconcileError> {
        let batch_size = NonZeroUsize::new(batch_size).ok_or(ReconcileError::InvalidBatchSize)?;
        Ok(Self {
            descriptor,
            id_source,
            rewrite_store,
            batch_size,
        })
    }

    /// Reconciler for `kind` with its default descriptor and batch size
    #[must_use]
    pub fn with_defaults(
        kind: EntityKind,
        id_source: Arc<dyn EntityIdSource>,
        rewrite_store: Arc<dyn RewriteStore>,
    ) -> Self {
        Self {
            descriptor: EntityKindDescriptor::default_for(kind),
            id_source,
            rewrite_store,
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.descriptor.kind
    }

    #[must_use]
    pub const fn descriptor(&self) -> &EntityKindDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    pub async fn reconcile_full(&self) -> Result<ReconcileReport, ReconcileError> {
        self.reconcile(&ReconciliationRequest::Full).await
    }

    pub async fn reconcile_list(&self, ids: &[EntityId]) -> Result<ReconcileReport, ReconcileError> {
        self.reconcile(&ReconciliationRequest::list(ids.iter().copied()))
            .await
    }

    pub async fn reconcile_row(&self, id: EntityId) -> Result<ReconcileReport, ReconcileError> {
        self.reconcile(&ReconciliationRequest::row(id)).await
    }

    /// Delete every rewrite of this kind whose entity is not live.
    ///
    /// Live ids are taken from one snapshot; rows created while the run is in
    /// progress may survive it. A store error stops the remaining batches and
    /// is returned as is; batches already issued stay applied.
    pub async fn reconcile(
        &self,
        request: &ReconciliationRequest,
    ) -> Result<ReconcileReport, ReconcileError> {
        let kind = self.kind();
        let filter = request.filter();

        let live_ids = self
            .id_source
            .list_entity_ids(&self.descriptor, filter)
            .await?;

        // Differenced against the scoped live set: in scoped mode rewrites of
        // entities outside the candidates are excluded from `live_ids` too.
        let orphaned: Vec<RewriteId> = self
            .rewrite_store
            .find_rewrite_ids_excluding(kind, &live_ids)
            .await?
            .into_iter()
            .collect();

        let mut report = ReconcileReport {
            kind,
            mode: request.mode(),
            candidate_ids: filter.map_or(0, |ids| ids.len()),
            live_ids: live_ids.len(),
            orphaned: orphaned.len(),
            deleted: 0,
            batches: 0,
        };

        if orphaned.is_empty() {
            debug!(%kind, mode = %report.mode, live_ids = report.live_ids, "no orphaned url rewrites");
            return Ok(report);
        }

        let total_batches = orphaned.len().div_ceil(self.batch_size.get());
        for batch in orphaned.chunks(self.batch_size.get()) {
            let deleted = self.rewrite_store.delete_by_ids(batch).await?;
            report.deleted += deleted;
            report.batches += 1;
            debug!(
                %kind,
                batch = report.batches,
                total_batches,
                ids = batch.len(),
                deleted,
                "deleted url rewrite batch"
            );
        }

        info!(
            %kind,
            mode = %report.mode,
            orphaned = report.orphaned,
            deleted = report.deleted,
            batches = report.batches,
            "removed orphaned url rewrites"
        );

        Ok(report)
    }
}
