//! Persisted entity model for notes, categories and tags.
//!
//! # Responsibility
//! - Define the three record types and their relationships.
//! - Provide field-level validation and sort comparisons shared by
//!   point-in-time fetches and live queries.
//!
//! # Invariants
//! - Every entity is identified by a stable `EntityId`.
//! - Relationships are stored as ids, never as pointers.
//! - `seq` is zero until the entity is first committed.

pub mod category;
pub mod entity;
pub mod note;
pub mod tag;

use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use category::{Category, CategorySortKey, Rgb};
pub use entity::{Entity, EntityId, EntityKind, EntityRef, Record};
pub use note::{Note, NoteSortKey};
pub use tag::{Tag, TagSortKey};

/// Field-level validation failure detected before commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Note title is empty or whitespace only.
    EmptyTitle,
    /// `updated_at` is earlier than `created_at`.
    TimestampOrder { created_at: i64, updated_at: i64 },
    /// `color_hex` does not encode an RGB color.
    InvalidColorHex(String),
    /// Note points at a category that does not exist.
    UnknownCategory(EntityId),
    /// Note carries a tag that does not exist.
    UnknownTag(EntityId),
}

impl ValidationError {
    /// Stable name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "title",
            Self::TimestampOrder { .. } => "updated_at",
            Self::InvalidColorHex(_) => "color_hex",
            Self::UnknownCategory(_) => "category",
            Self::UnknownTag(_) => "tags",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "note title must not be empty"),
            Self::TimestampOrder {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at {updated_at} is earlier than created_at {created_at}"
            ),
            Self::InvalidColorHex(value) => write!(f, "invalid color hex `{value}`"),
            Self::UnknownCategory(id) => write!(f, "category does not exist: {id}"),
            Self::UnknownTag(id) => write!(f, "tag does not exist: {id}"),
        }
    }
}

impl Error for ValidationError {}

/// Case-insensitive text ordering with an exact-match fallback.
pub(crate) fn compare_text(left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}
