//! In-process catalog and rewrite store
//!
//! Implements both repository traits over shared state. Every successful
//! delete call is recorded, and failures can be injected to exercise the
//! reconciler's abort behaviour.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

use crate::domain::entities::{
    EntityId, EntityKind, EntityKindDescriptor, RewriteId, RewriteRecord,
};
use crate::domain::errors::{StoreError, StoreResult};
use crate::domain::repositories::{EntityIdSource, RewriteStore};

#[derive(Debug, Default)]
struct StoreState {
    entities: HashMap<EntityKind, BTreeSet<EntityId>>,
    rewrites: BTreeMap<RewriteId, RewriteRecord>,
    next_rewrite_id: i64,
    delete_calls: Vec<Vec<RewriteId>>,
    delete_attempts: usize,
    fail_on_delete_attempt: Option<usize>,
    unavailable: bool,
}

impl StoreState {
    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable {
            Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<StoreState>,
}

impl InMemoryCatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_entity(&self, kind: EntityKind, id: EntityId) {
        self.state
            .write()
            .await
            .entities
            .entry(kind)
            .or_default()
            .insert(id);
    }

    pub async fn remove_entity(&self, kind: EntityKind, id: EntityId) -> bool {
        self.state
            .write()
            .await
            .entities
            .get_mut(&kind)
            .is_some_and(|ids| ids.remove(&id))
    }

    /// Insert a rewrite row, replacing any row with the same id
    pub async fn add_rewrite(&self, record: RewriteRecord) {
        let mut state = self.state.write().await;
        state.next_rewrite_id = state.next_rewrite_id.max(record.rewrite_id.get());
        state.rewrites.insert(record.rewrite_id, record);
    }

    /// Insert a rewrite row with the next free id
    pub async fn add_rewrite_for(&self, kind: EntityKind, entity_id: EntityId) -> RewriteId {
        let mut state = self.state.write().await;
        state.next_rewrite_id += 1;
        let record = RewriteRecord::for_entity(state.next_rewrite_id, kind, entity_id.get());
        let rewrite_id = record.rewrite_id;
        state.rewrites.insert(rewrite_id, record);
        rewrite_id
    }

    /// Rewrite rows of `kind` in ascending id order
    pub async fn rewrites_for(&self, kind: EntityKind) -> Vec<RewriteRecord> {
        self.state
            .read()
            .await
            .rewrites
            .values()
            .filter(|record| record.entity_kind == kind)
            .cloned()
            .collect()
    }

    /// Id lists of every delete call that succeeded, in call order
    pub async fn delete_calls(&self) -> Vec<Vec<RewriteId>> {
        self.state.read().await.delete_calls.clone()
    }

    /// Make the `attempt`-th delete call (1-based) fail
    pub async fn fail_delete_call(&self, attempt: usize) {
        self.state.write().await.fail_on_delete_attempt = Some(attempt);
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }
}

#[async_trait]
impl EntityIdSource for InMemoryCatalogStore {
    async fn list_entity_ids(
        &self,
        descriptor: &EntityKindDescriptor,
        filter: Option<&BTreeSet<EntityId>>,
    ) -> StoreResult<BTreeSet<EntityId>> {
        let state = self.state.read().await;
        state.check_available()?;

        let Some(live) = state.entities.get(&descriptor.kind) else {
            return Ok(BTreeSet::new());
        };

        Ok(match filter {
            Some(candidates) => live.intersection(candidates).copied().collect(),
            None => live.clone(),
        })
    }
}

#[async_trait]
impl RewriteStore for InMemoryCatalogStore {
    async fn find_rewrite_ids_excluding(
        &self,
        kind: EntityKind,
        live_ids: &BTreeSet<EntityId>,
    ) -> StoreResult<BTreeSet<RewriteId>> {
        let state = self.state.read().await;
        state.check_available()?;

        Ok(state
            .rewrites
            .values()
            .filter(|record| record.entity_kind == kind && !live_ids.contains(&record.entity_id))
            .map(|record| record.rewrite_id)
            .collect())
    }

    async fn delete_by_ids(&self, ids: &[RewriteId]) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        state.check_available()?;

        state.delete_attempts += 1;
        if state.fail_on_delete_attempt == Some(state.delete_attempts) {
            return Err(StoreError::Unavailable(format!(
                "delete call {} rejected",
                state.delete_attempts
            )));
        }

        let mut deleted = 0;
        for id in ids {
            if state.rewrites.remove(id).is_some() {
                deleted += 1;
            }
        }
        state.delete_calls.push(ids.to_vec());
        Ok(deleted)
    }
}
