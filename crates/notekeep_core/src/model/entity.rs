//! Entity identity and the type-erased record shared by the store.
//!
//! # Responsibility
//! - Name the three entity kinds and their stable identity (`EntityRef`).
//! - Provide `Record`, the sum type staged by contexts and carried in
//!   change-sets.
//! - Define the `Entity` trait that typed fetches and live queries use.

use super::{Category, Note, Tag, ValidationError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every persisted entity.
pub type EntityId = Uuid;

/// Persisted entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Note,
    Category,
    Tag,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-qualified entity identity, as published in change-sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }

    pub fn note(id: EntityId) -> Self {
        Self::new(EntityKind::Note, id)
    }

    pub fn category(id: EntityId) -> Self {
        Self::new(EntityKind::Category, id)
    }

    pub fn tag(id: EntityId) -> Self {
        Self::new(EntityKind::Tag, id)
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// One entity of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Note(Note),
    Category(Category),
    Tag(Tag),
}

impl Record {
    /// Allocates an empty record of `kind`, stamped with `now_ms`.
    pub(crate) fn empty(kind: EntityKind, id: EntityId, now_ms: i64) -> Self {
        match kind {
            EntityKind::Note => Self::Note(Note::new(id, now_ms)),
            EntityKind::Category => Self::Category(Category::new(id)),
            EntityKind::Tag => Self::Tag(Tag::new(id)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Note(_) => EntityKind::Note,
            Self::Category(_) => EntityKind::Category,
            Self::Tag(_) => EntityKind::Tag,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Self::Note(note) => note.id(),
            Self::Category(category) => category.id(),
            Self::Tag(tag) => tag.id(),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.id())
    }

    pub fn seq(&self) -> i64 {
        match self {
            Self::Note(note) => note.seq(),
            Self::Category(category) => category.seq(),
            Self::Tag(tag) => tag.seq(),
        }
    }

    pub(crate) fn set_seq(&mut self, seq: i64) {
        match self {
            Self::Note(note) => note.seq = seq,
            Self::Category(category) => category.seq = seq,
            Self::Tag(tag) => tag.seq = seq,
        }
    }

    /// Runs field-level validation for the wrapped entity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Note(note) => note.validate(),
            Self::Category(category) => category.validate(),
            Self::Tag(tag) => tag.validate(),
        }
    }
}

/// Typed view over one entity kind.
///
/// Implemented by `Note`, `Category` and `Tag`; lets fetches and live
/// queries work on concrete types while the store stages `Record`s.
pub trait Entity: Clone + Debug + PartialEq + 'static {
    const KIND: EntityKind;
    /// Attribute a fetch may be ordered by.
    type SortKey: Copy + Debug + PartialEq + Eq;

    fn id(&self) -> EntityId;

    /// Store-wide insertion ordinal; zero before first commit.
    fn seq(&self) -> i64;

    /// Compares two entities on `key` only (no tie-break).
    fn compare_by(&self, other: &Self, key: Self::SortKey) -> Ordering;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn from_record(record: &Record) -> Option<&Self>;
    fn from_record_mut(record: &mut Record) -> Option<&mut Self>;
    fn try_from_record(record: Record) -> Option<Self>;
    fn into_record(self) -> Record;

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(Self::KIND, self.id())
    }
}

macro_rules! impl_record_conversions {
    ($ty:ident) => {
        fn from_record(record: &Record) -> Option<&Self> {
            match record {
                Record::$ty(value) => Some(value),
                _ => None,
            }
        }

        fn from_record_mut(record: &mut Record) -> Option<&mut Self> {
            match record {
                Record::$ty(value) => Some(value),
                _ => None,
            }
        }

        fn try_from_record(record: Record) -> Option<Self> {
            match record {
                Record::$ty(value) => Some(value),
                _ => None,
            }
        }

        fn into_record(self) -> Record {
            Record::$ty(self)
        }
    };
}

pub(crate) use impl_record_conversions;
