//! Turns a context's staged edits into one atomic write.
//!
//! # Responsibility
//! - Resolve staged edits against committed rows inside the write
//!   transaction.
//! - Propagate deletes: clear note references to deleted categories and
//!   tags, reporting those notes as updated.
//! - Validate every row that will be written.
//!
//! # Invariants
//! - Building a plan never mutates the staged edits it reads.
//! - No note written by a plan references a deleted or missing entity.
//! - A reference carried over unchanged from the loaded row is cleared when
//!   its target is gone; one the caller set is rejected instead.
//! - Only user edits refresh `updated_at`; reference clearing does not.

use super::change::ChangeSet;
use super::error::{StoreError, StoreResult};
use crate::model::{Entity, EntityId, EntityKind, EntityRef, Record};
use crate::repo::{RepoError, SqliteNoteRepository, SqliteRecordRepository};
use rusqlite::Connection;
use std::collections::HashSet;

/// One staged edit held by a context.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Staged {
    Inserted(Record),
    /// `base` is the committed row as the context loaded it.
    Updated { base: Record, record: Record },
    Deleted,
}

#[derive(Debug, Default)]
pub(crate) struct CommitPlan {
    inserts: Vec<Record>,
    updates: Vec<Record>,
    deletes: Vec<EntityRef>,
}

impl CommitPlan {
    pub(crate) fn build<'a>(
        conn: &Connection,
        staged: impl Iterator<Item = (EntityRef, &'a Staged)> + Clone,
        now_ms: i64,
    ) -> StoreResult<Self> {
        let repo = SqliteRecordRepository::new(conn);
        let mut plan = Self::default();

        let mut deleted_categories = HashSet::new();
        let mut deleted_tags = HashSet::new();
        let mut staged_notes = HashSet::new();
        for (entity, edit) in staged.clone() {
            if entity.kind == EntityKind::Note {
                staged_notes.insert(entity.id);
            }
            if !matches!(edit, Staged::Deleted) {
                continue;
            }
            if !repo.exists(entity).map_err(save_failed)? {
                return Err(StoreError::NotFound(entity));
            }
            match entity.kind {
                EntityKind::Category => {
                    deleted_categories.insert(entity.id);
                }
                EntityKind::Tag => {
                    deleted_tags.insert(entity.id);
                }
                EntityKind::Note => {}
            }
            plan.deletes.push(entity);
        }

        let mut next_seq = repo.max_seq().map_err(save_failed)? + 1;
        for (entity, edit) in staged {
            match edit {
                Staged::Inserted(record) => {
                    let mut record = record.clone();
                    detach(&mut record, &deleted_categories, &deleted_tags);
                    record.set_seq(next_seq);
                    next_seq += 1;
                    plan.inserts.push(record);
                }
                Staged::Updated { base, record } => {
                    let committed = repo
                        .get(entity)
                        .map_err(save_failed)?
                        .ok_or(StoreError::NotFound(entity))?;
                    let mut record = record.clone();
                    detach_stale(&mut record, base, &repo)?;
                    let user_edited = record != committed;
                    detach(&mut record, &deleted_categories, &deleted_tags);
                    if record == committed {
                        continue;
                    }
                    if user_edited {
                        if let Record::Note(note) = &mut record {
                            note.touch(now_ms);
                        }
                    }
                    plan.updates.push(record);
                }
                Staged::Deleted => {}
            }
        }

        plan.propagate_deletes(conn, &staged_notes, &deleted_categories, &deleted_tags)?;
        plan.validate(&repo)?;
        Ok(plan)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    fn propagate_deletes(
        &mut self,
        conn: &Connection,
        staged_notes: &HashSet<EntityId>,
        deleted_categories: &HashSet<EntityId>,
        deleted_tags: &HashSet<EntityId>,
    ) -> StoreResult<()> {
        let notes = SqliteNoteRepository::new(conn);
        let mut dependents = Vec::new();
        for category_id in deleted_categories {
            dependents.extend(notes.list_by_category(*category_id).map_err(save_failed)?);
        }
        for tag_id in deleted_tags {
            dependents.extend(notes.list_by_tag(*tag_id).map_err(save_failed)?);
        }

        let mut seen = HashSet::new();
        for note in dependents {
            if staged_notes.contains(&note.id()) || !seen.insert(note.id()) {
                continue;
            }
            let mut record = Record::Note(note);
            detach(&mut record, deleted_categories, deleted_tags);
            self.updates.push(record);
        }
        Ok(())
    }

    fn validate(&self, repo: &SqliteRecordRepository<'_>) -> StoreResult<()> {
        let inserted: HashSet<EntityRef> = self.inserts.iter().map(Record::entity_ref).collect();
        let exists = |entity: EntityRef| -> StoreResult<bool> {
            Ok(inserted.contains(&entity) || repo.exists(entity).map_err(save_failed)?)
        };

        for record in self.inserts.iter().chain(&self.updates) {
            record.validate()?;
            let Record::Note(note) = record else {
                continue;
            };
            if let Some(category_id) = note.category {
                if !exists(EntityRef::category(category_id))? {
                    return Err(crate::model::ValidationError::UnknownCategory(category_id).into());
                }
            }
            for tag_id in &note.tags {
                if !exists(EntityRef::tag(*tag_id))? {
                    return Err(crate::model::ValidationError::UnknownTag(*tag_id).into());
                }
            }
        }
        Ok(())
    }

    /// Writes parents before children and children before deletes.
    pub(crate) fn write(&self, conn: &Connection) -> StoreResult<()> {
        let repo = SqliteRecordRepository::new(conn);

        let (note_inserts, other_inserts): (Vec<&Record>, Vec<&Record>) = self
            .inserts
            .iter()
            .partition(|record| record.kind() == EntityKind::Note);
        for record in other_inserts.into_iter().chain(note_inserts) {
            repo.insert(record).map_err(save_failed)?;
        }

        for record in &self.updates {
            if !repo.update(record).map_err(save_failed)? {
                return Err(StoreError::NotFound(record.entity_ref()));
            }
        }

        let mut deletes = self.deletes.clone();
        deletes.sort_by_key(|entity| delete_rank(entity.kind));
        for entity in deletes {
            if !repo.delete(entity).map_err(save_failed)? {
                return Err(StoreError::NotFound(entity));
            }
        }
        Ok(())
    }

    pub(crate) fn into_change_set(self, commit: u64) -> ChangeSet {
        let mut change = ChangeSet::new(commit);
        for record in self.inserts {
            change.push_inserted(record);
        }
        for record in self.updates {
            change.push_updated(record);
        }
        for entity in self.deletes {
            change.push_deleted(entity);
        }
        change
    }
}

fn detach(
    record: &mut Record,
    deleted_categories: &HashSet<EntityId>,
    deleted_tags: &HashSet<EntityId>,
) {
    if let Record::Note(note) = record {
        if note
            .category
            .is_some_and(|id| deleted_categories.contains(&id))
        {
            note.category = None;
        }
        note.tags.retain(|id| !deleted_tags.contains(id));
    }
}

/// Clears references inherited from `base` whose targets were deleted
/// after the row was loaded.
fn detach_stale(
    record: &mut Record,
    base: &Record,
    repo: &SqliteRecordRepository<'_>,
) -> StoreResult<()> {
    let (Record::Note(note), Record::Note(base)) = (record, base) else {
        return Ok(());
    };
    if let Some(category_id) = note.category {
        if base.category == Some(category_id)
            && !repo
                .exists(EntityRef::category(category_id))
                .map_err(save_failed)?
        {
            note.category = None;
        }
    }
    let mut gone = Vec::new();
    for tag_id in note.tags.intersection(&base.tags) {
        if !repo.exists(EntityRef::tag(*tag_id)).map_err(save_failed)? {
            gone.push(*tag_id);
        }
    }
    for tag_id in gone {
        note.tags.remove(&tag_id);
    }
    Ok(())
}

fn delete_rank(kind: EntityKind) -> u8 {
    match kind {
        EntityKind::Note => 0,
        EntityKind::Tag => 1,
        EntityKind::Category => 2,
    }
}

fn save_failed(err: RepoError) -> StoreError {
    StoreError::SaveFailed(err.to_string())
}
