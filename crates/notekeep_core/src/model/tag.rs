//! Tag entity.

use super::compare_text;
use super::entity::{impl_record_conversions, Entity, EntityId, EntityKind, Record};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Attributes tags can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSortKey {
    Name,
}

/// Free-form label attached to notes (many-to-many).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    id: EntityId,
    pub(crate) seq: i64,
    pub name: String,
}

impl Tag {
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            seq: 0,
            name: String::new(),
        }
    }

    pub(crate) fn from_parts(id: EntityId, seq: i64, name: String) -> Self {
        Self { id, seq, name }
    }
}

impl Entity for Tag {
    const KIND: EntityKind = EntityKind::Tag;
    type SortKey = TagSortKey;

    fn id(&self) -> EntityId {
        self.id
    }

    fn seq(&self) -> i64 {
        self.seq
    }

    fn compare_by(&self, other: &Self, key: TagSortKey) -> Ordering {
        match key {
            TagSortKey::Name => compare_text(&self.name, &other.name),
        }
    }

    impl_record_conversions!(Tag);
}
