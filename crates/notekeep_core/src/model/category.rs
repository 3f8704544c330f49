//! Category entity and its display color.
//!
//! # Invariants
//! - `color_hex`, when set, parses as `Rgb`.
//! - Names are user-editable, may be empty and are not unique.

use super::entity::{impl_record_conversions, Entity, EntityId, EntityKind, Record};
use super::{compare_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#?([0-9A-Fa-f]{2})([0-9A-Fa-f]{2})([0-9A-Fa-f]{2})([0-9A-Fa-f]{2})?$")
        .expect("valid hex color regex")
});

/// 8-bit RGB color stored on categories as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Accent used when a category has no color of its own.
    pub const DEFAULT_ACCENT: Rgb = Rgb::new(0xFE, 0x6F, 0x5E);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` or `RRGGBB`; a trailing alpha pair is accepted and ignored.
    pub fn from_hex(value: &str) -> Option<Self> {
        let caps = HEX_COLOR_RE.captures(value.trim())?;
        let channel = |idx: usize| {
            caps.get(idx)
                .and_then(|m| u8::from_str_radix(m.as_str(), 16).ok())
        };
        Some(Self::new(channel(1)?, channel(2)?, channel(3)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Display for Rgb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Attributes categories can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySortKey {
    Name,
}

/// Named, colored grouping for notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: EntityId,
    pub(crate) seq: i64,
    pub name: String,
    pub color_hex: Option<String>,
}

impl Category {
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            seq: 0,
            name: String::new(),
            color_hex: None,
        }
    }

    pub(crate) fn from_parts(
        id: EntityId,
        seq: i64,
        name: String,
        color_hex: Option<String>,
    ) -> Self {
        Self {
            id,
            seq,
            name,
            color_hex,
        }
    }

    /// Decoded color, or `None` when unset or unparseable.
    pub fn color(&self) -> Option<Rgb> {
        self.color_hex.as_deref().and_then(Rgb::from_hex)
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.color_hex = Some(color.to_hex());
    }

    pub fn clear_color(&mut self) {
        self.color_hex = None;
    }

    pub fn display_color(&self) -> Rgb {
        self.color().unwrap_or(Rgb::DEFAULT_ACCENT)
    }
}

impl Entity for Category {
    const KIND: EntityKind = EntityKind::Category;
    type SortKey = CategorySortKey;

    fn id(&self) -> EntityId {
        self.id
    }

    fn seq(&self) -> i64 {
        self.seq
    }

    fn compare_by(&self, other: &Self, key: CategorySortKey) -> Ordering {
        match key {
            CategorySortKey::Name => compare_text(&self.name, &other.name),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self.color_hex.as_deref() {
            Some(value) if Rgb::from_hex(value).is_none() => {
                Err(ValidationError::InvalidColorHex(value.to_string()))
            }
            _ => Ok(()),
        }
    }

    impl_record_conversions!(Category);
}
