//! Change-sets published after each commit.
//!
//! # Invariants
//! - `inserted`, `updated` and `deleted` are disjoint.
//! - Every inserted or updated ref has a post-commit snapshot.
//! - `commit` increases by one per successful, non-empty save.

use crate::model::{Entity, EntityId, EntityKind, EntityRef, Record};
use std::collections::HashMap;

/// Identity partition produced by one commit, plus post-commit snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    commit: u64,
    inserted: Vec<EntityRef>,
    updated: Vec<EntityRef>,
    deleted: Vec<EntityRef>,
    snapshots: HashMap<EntityRef, Record>,
}

impl ChangeSet {
    pub(crate) fn new(commit: u64) -> Self {
        Self {
            commit,
            ..Self::default()
        }
    }

    pub(crate) fn push_inserted(&mut self, record: Record) {
        let entity = record.entity_ref();
        self.inserted.push(entity);
        self.snapshots.insert(entity, record);
    }

    pub(crate) fn push_updated(&mut self, record: Record) {
        let entity = record.entity_ref();
        self.updated.push(entity);
        self.snapshots.insert(entity, record);
    }

    pub(crate) fn push_deleted(&mut self, entity: EntityRef) {
        self.deleted.push(entity);
    }

    /// Per-store commit number this change-set was produced by.
    pub fn commit(&self) -> u64 {
        self.commit
    }

    pub fn inserted(&self) -> &[EntityRef] {
        &self.inserted
    }

    pub fn updated(&self) -> &[EntityRef] {
        &self.updated
    }

    pub fn deleted(&self) -> &[EntityRef] {
        &self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserted.len() + self.updated.len() + self.deleted.len()
    }

    /// Whether any entity of `kind` changed in this commit.
    pub fn touches(&self, kind: EntityKind) -> bool {
        self.inserted
            .iter()
            .chain(&self.updated)
            .chain(&self.deleted)
            .any(|entity| entity.kind == kind)
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.inserted.contains(&entity)
            || self.updated.contains(&entity)
            || self.deleted.contains(&entity)
    }

    /// Post-commit state of an inserted or updated entity.
    pub fn snapshot(&self, entity: EntityRef) -> Option<&Record> {
        self.snapshots.get(&entity)
    }

    pub fn snapshot_of<E: Entity>(&self, id: EntityId) -> Option<&E> {
        self.snapshots
            .get(&EntityRef::new(E::KIND, id))
            .and_then(E::from_record)
    }

    pub fn inserted_of<E: Entity>(&self) -> impl Iterator<Item = &E> + '_ {
        self.inserted
            .iter()
            .filter(|entity| entity.kind == E::KIND)
            .filter_map(|entity| self.snapshots.get(entity).and_then(E::from_record))
    }

    pub fn updated_of<E: Entity>(&self) -> impl Iterator<Item = &E> + '_ {
        self.updated
            .iter()
            .filter(|entity| entity.kind == E::KIND)
            .filter_map(|entity| self.snapshots.get(entity).and_then(E::from_record))
    }

    pub fn deleted_ids(&self, kind: EntityKind) -> impl Iterator<Item = EntityId> + '_ {
        self.deleted
            .iter()
            .filter(move |entity| entity.kind == kind)
            .map(|entity| entity.id)
    }
}
