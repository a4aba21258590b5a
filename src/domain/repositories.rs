//! Repository interfaces the reconciler depends on
//!
//! Both collaborators are injected explicitly; the reconciler never reaches for
//! a shared connection on its own.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::domain::entities::{EntityId, EntityKind, EntityKindDescriptor, RewriteId};
use crate::domain::errors::StoreResult;

/// Source of truth for which catalog entities currently exist
#[async_trait]
pub trait EntityIdSource: Send + Sync {
    /// Live ids of the descriptor's entity table, restricted to `filter` when given
    async fn list_entity_ids(
        &self,
        descriptor: &EntityKindDescriptor,
        filter: Option<&BTreeSet<EntityId>>,
    ) -> StoreResult<BTreeSet<EntityId>>;
}

/// Storage of generated URL rewrite rows
#[async_trait]
pub trait RewriteStore: Send + Sync {
    /// Ids of rewrites tagged with `kind` whose entity id is not in `live_ids`
    async fn find_rewrite_ids_excluding(
        &self,
        kind: EntityKind,
        live_ids: &BTreeSet<EntityId>,
    ) -> StoreResult<BTreeSet<RewriteId>>;

    /// Delete rewrites by id and return the number of rows removed.
    ///
    /// Callers keep `ids` bounded; absent ids are ignored.
    async fn delete_by_ids(&self, ids: &[RewriteId]) -> StoreResult<u64>;
}
