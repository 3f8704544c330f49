//! Note entity.
//!
//! # Invariants
//! - `created_at` is set once at allocation and never changes.
//! - `created_at <= updated_at` for every persisted note.
//! - `category` is a weak reference: it never owns the category.

use super::entity::{impl_record_conversions, Entity, EntityId, EntityKind, Record};
use super::{compare_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Attributes notes can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSortKey {
    Title,
    CreatedAt,
    UpdatedAt,
}

/// A titled note with optional body, category and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    id: EntityId,
    pub(crate) seq: i64,
    /// Required; must be non-blank at commit time.
    pub title: String,
    pub contents: Option<String>,
    /// Unix epoch milliseconds.
    created_at: i64,
    /// Unix epoch milliseconds, refreshed by the store on every edit commit.
    pub(crate) updated_at: i64,
    /// Owning category, if any.
    pub category: Option<EntityId>,
    /// Unordered tag set.
    pub tags: BTreeSet<EntityId>,
}

impl Note {
    pub(crate) fn new(id: EntityId, now_ms: i64) -> Self {
        Self {
            id,
            seq: 0,
            title: String::new(),
            contents: None,
            created_at: now_ms,
            updated_at: now_ms,
            category: None,
            tags: BTreeSet::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: EntityId,
        seq: i64,
        title: String,
        contents: Option<String>,
        created_at: i64,
        updated_at: i64,
        category: Option<EntityId>,
        tags: BTreeSet<EntityId>,
    ) -> Self {
        Self {
            id,
            seq,
            title,
            contents,
            created_at,
            updated_at,
            category,
            tags,
        }
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    pub fn has_tag(&self, tag_id: EntityId) -> bool {
        self.tags.contains(&tag_id)
    }

    /// Returns `false` when the tag was already attached.
    pub fn add_tag(&mut self, tag_id: EntityId) -> bool {
        self.tags.insert(tag_id)
    }

    /// Returns `false` when the tag was not attached.
    pub fn remove_tag(&mut self, tag_id: EntityId) -> bool {
        self.tags.remove(&tag_id)
    }

    /// Flips tag membership and returns whether the tag is now attached.
    pub fn toggle_tag(&mut self, tag_id: EntityId) -> bool {
        if self.tags.remove(&tag_id) {
            false
        } else {
            self.tags.insert(tag_id);
            true
        }
    }

    /// Moves `updated_at` to `now_ms`, never before `created_at`.
    pub(crate) fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms.max(self.created_at);
    }
}

impl Entity for Note {
    const KIND: EntityKind = EntityKind::Note;
    type SortKey = NoteSortKey;

    fn id(&self) -> EntityId {
        self.id
    }

    fn seq(&self) -> i64 {
        self.seq
    }

    fn compare_by(&self, other: &Self, key: NoteSortKey) -> Ordering {
        match key {
            NoteSortKey::Title => compare_text(&self.title, &other.title),
            NoteSortKey::CreatedAt => self.created_at.cmp(&other.created_at),
            NoteSortKey::UpdatedAt => self.updated_at.cmp(&other.updated_at),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.updated_at < self.created_at {
            return Err(ValidationError::TimestampOrder {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    impl_record_conversions!(Note);
}

#[cfg(test)]
mod tests {
    use super::{Note, NoteSortKey};
    use crate::model::{Entity, ValidationError};
    use std::cmp::Ordering;
    use uuid::Uuid;

    #[test]
    fn new_note_starts_untitled_with_equal_timestamps() {
        let note = Note::new(Uuid::new_v4(), 1_000);
        assert_eq!(note.created_at(), 1_000);
        assert_eq!(note.updated_at(), 1_000);
        assert_eq!(note.validate(), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut note = Note::new(Uuid::new_v4(), 1_000);
        note.title = "   ".to_string();
        assert_eq!(note.validate(), Err(ValidationError::EmptyTitle));
        note.title = "Groceries".to_string();
        assert_eq!(note.validate(), Ok(()));
    }

    #[test]
    fn touch_never_moves_before_creation() {
        let mut note = Note::new(Uuid::new_v4(), 5_000);
        note.touch(4_000);
        assert_eq!(note.updated_at(), 5_000);
        note.touch(9_000);
        assert_eq!(note.updated_at(), 9_000);
    }

    #[test]
    fn toggle_tag_flips_membership() {
        let mut note = Note::new(Uuid::new_v4(), 0);
        let tag = Uuid::new_v4();
        assert!(note.toggle_tag(tag));
        assert!(note.has_tag(tag));
        assert!(!note.toggle_tag(tag));
        assert!(!note.has_tag(tag));
    }

    #[test]
    fn compare_by_updated_at_uses_timestamps() {
        let older = Note::new(Uuid::new_v4(), 1);
        let newer = Note::new(Uuid::new_v4(), 2);
        assert_eq!(
            older.compare_by(&newer, NoteSortKey::UpdatedAt),
            Ordering::Less
        );
    }
}
