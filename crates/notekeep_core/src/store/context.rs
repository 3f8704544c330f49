//! Unit of work over one store.
//!
//! # Responsibility
//! - Stage creates, edits and deletes invisibly to everyone else.
//! - Commit them atomically in `save` and publish one change-set.
//!
//! # Invariants
//! - A failed `save` leaves every staged edit in place.
//! - A successful `save` with no effective change publishes nothing.
//! - `fetch` reads committed state only.

use super::commit::{CommitPlan, Staged};
use super::error::{StoreError, StoreResult};
use super::query::FetchRequest;
use super::StoreShared;
use crate::model::{Entity, EntityId, EntityKind, EntityRef, Record};
use crate::repo::SqliteRecordRepository;
use log::{debug, error, info};
use rusqlite::TransactionBehavior;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

pub struct Context {
    shared: Rc<StoreShared>,
    staged: HashMap<EntityRef, Staged>,
    order: Vec<EntityRef>,
}

impl Context {
    pub(crate) fn new(shared: Rc<StoreShared>) -> Self {
        Self {
            shared,
            staged: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Allocates an empty entity of `kind`, visible only to this context.
    pub fn create(&mut self, kind: EntityKind) -> EntityRef {
        let record = Record::empty(kind, Uuid::new_v4(), self.shared.clock.now_ms());
        let entity = record.entity_ref();
        self.stage(entity, Staged::Inserted(record));
        entity
    }

    /// Typed `create` returning the staged entity for field setup.
    pub fn create_as<E: Entity>(&mut self) -> StoreResult<&mut E> {
        let entity = self.create(E::KIND);
        self.edit::<E>(entity.id)
    }

    /// Reads `id` through this context's view: staged state over committed.
    pub fn get<E: Entity>(&self, id: EntityId) -> StoreResult<Option<E>> {
        let entity = EntityRef::new(E::KIND, id);
        match self.staged.get(&entity) {
            Some(Staged::Inserted(record) | Staged::Updated { record, .. }) => {
                Ok(E::from_record(record).cloned())
            }
            Some(Staged::Deleted) => Ok(None),
            None => Ok(self.load_committed(entity)?.and_then(E::try_from_record)),
        }
    }

    /// Stages `id` for mutation and returns it.
    ///
    /// # Errors
    /// - `NotFound` when the entity is absent from this context's view.
    pub fn edit<E: Entity>(&mut self, id: EntityId) -> StoreResult<&mut E> {
        let entity = EntityRef::new(E::KIND, id);
        if !self.staged.contains_key(&entity) {
            let record = self
                .load_committed(entity)?
                .ok_or(StoreError::NotFound(entity))?;
            self.stage(
                entity,
                Staged::Updated {
                    base: record.clone(),
                    record,
                },
            );
        }

        match self.staged.get_mut(&entity) {
            Some(Staged::Inserted(record) | Staged::Updated { record, .. }) => {
                E::from_record_mut(record).ok_or(StoreError::NotFound(entity))
            }
            _ => Err(StoreError::NotFound(entity)),
        }
    }

    /// Marks `entity` for removal at the next `save`.
    ///
    /// # Errors
    /// - `NotFound` when the entity is absent from this context's view,
    ///   including a second delete of the same entity.
    pub fn delete(&mut self, entity: EntityRef) -> StoreResult<()> {
        match self.staged.get(&entity) {
            Some(Staged::Inserted(_)) => {
                self.staged.remove(&entity);
                self.order.retain(|staged| *staged != entity);
                Ok(())
            }
            Some(Staged::Updated { .. }) => {
                self.staged.insert(entity, Staged::Deleted);
                Ok(())
            }
            Some(Staged::Deleted) => Err(StoreError::NotFound(entity)),
            None => {
                if self.load_committed(entity)?.is_none() {
                    return Err(StoreError::NotFound(entity));
                }
                self.stage(entity, Staged::Deleted);
                Ok(())
            }
        }
    }

    /// Point-in-time snapshot of committed entities matching `request`.
    pub fn fetch<E: Entity>(&self, request: &FetchRequest<E>) -> StoreResult<Vec<E>> {
        self.shared.fetch(request)
    }

    /// `fetch`, reduced to identities.
    pub fn fetch_refs<E: Entity>(&self, request: &FetchRequest<E>) -> StoreResult<Vec<EntityRef>> {
        Ok(self
            .fetch(request)?
            .iter()
            .map(Entity::entity_ref)
            .collect())
    }

    pub fn has_changes(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Staged identities in staging order.
    pub fn pending_refs(&self) -> Vec<EntityRef> {
        self.order.clone()
    }

    /// Discards every staged edit.
    pub fn rollback(&mut self) {
        self.staged.clear();
        self.order.clear();
    }

    /// Validates and commits every staged edit as one atomic write, then
    /// delivers the change-set to all subscribers before returning.
    ///
    /// # Errors
    /// - `ValidationFailed` when a written entity fails a field check.
    /// - `NotFound` when an edited or deleted entity vanished meanwhile.
    /// - `SaveFailed` on write failure or when called during dispatch.
    pub fn save(&mut self) -> StoreResult<()> {
        if self.staged.is_empty() {
            debug!("event=store_save module=store status=skipped reason=no_changes");
            return Ok(());
        }
        if self.shared.dispatching.get() {
            error!("event=store_save module=store status=error reason=reentrant");
            return Err(StoreError::SaveFailed(
                "save called while change-set dispatch is in progress".to_string(),
            ));
        }

        let started_at = Instant::now();
        let plan = match self.commit() {
            Ok(plan) => plan,
            Err(err) => {
                error!(
                    "event=store_save module=store status=error pending={} error={}",
                    self.order.len(),
                    err
                );
                return Err(err);
            }
        };
        self.rollback();

        if plan.is_empty() {
            info!("event=store_save module=store status=skipped reason=no_effective_changes");
            return Ok(());
        }

        let commit = self.shared.commits.get() + 1;
        self.shared.commits.set(commit);
        let change = plan.into_change_set(commit);
        info!(
            "event=store_save module=store status=ok commit={} inserted={} updated={} deleted={} duration_ms={}",
            commit,
            change.inserted().len(),
            change.updated().len(),
            change.deleted().len(),
            started_at.elapsed().as_millis()
        );
        self.shared.dispatch(&change);
        Ok(())
    }

    fn commit(&self) -> StoreResult<CommitPlan> {
        let now_ms = self.shared.clock.now_ms();
        let mut conn = self
            .shared
            .conn
            .try_borrow_mut()
            .map_err(|_| StoreError::SaveFailed("store connection is busy".to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| StoreError::SaveFailed(err.to_string()))?;

        let staged = self
            .order
            .iter()
            .filter_map(|entity| self.staged.get(entity).map(|edit| (*entity, edit)));
        let plan = CommitPlan::build(&tx, staged, now_ms)?;
        plan.write(&tx)?;
        tx.commit()
            .map_err(|err| StoreError::SaveFailed(err.to_string()))?;
        Ok(plan)
    }

    fn stage(&mut self, entity: EntityRef, edit: Staged) {
        if self.staged.insert(entity, edit).is_none() {
            self.order.push(entity);
        }
    }

    fn load_committed(&self, entity: EntityRef) -> StoreResult<Option<Record>> {
        let conn = self.shared.conn.borrow();
        Ok(SqliteRecordRepository::new(&conn).get(entity)?)
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("pending", &self.order)
            .finish_non_exhaustive()
    }
}
