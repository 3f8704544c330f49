//! Fetch requests: sort order plus optional predicate.
//!
//! # Invariants
//! - Ordering is total: the sort key decides first (reversed when
//!   descending), then insertion ordinal ascending.
//! - The same comparator orders point-in-time fetches and live queries.

use crate::model::{Entity, EntityId, Note};
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Predicate applied to committed entities.
pub struct Filter<E> {
    predicate: Rc<dyn Fn(&E) -> bool>,
    label: &'static str,
}

impl<E> Filter<E> {
    pub fn new<F>(label: &'static str, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + 'static,
    {
        Self {
            predicate: Rc::new(predicate),
            label,
        }
    }

    pub fn matches(&self, entity: &E) -> bool {
        (self.predicate)(entity)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl<E> Clone for Filter<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: Rc::clone(&self.predicate),
            label: self.label,
        }
    }
}

impl<E> Debug for Filter<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Filter").field(&self.label).finish()
    }
}

impl Filter<Note> {
    pub fn in_category(category_id: EntityId) -> Self {
        Self::new("in_category", move |note: &Note| {
            note.category == Some(category_id)
        })
    }

    pub fn without_category() -> Self {
        Self::new("without_category", |note: &Note| note.category.is_none())
    }

    pub fn tagged_with(tag_id: EntityId) -> Self {
        Self::new("tagged_with", move |note: &Note| note.has_tag(tag_id))
    }

    /// Case-insensitive substring match on the title.
    pub fn title_contains(needle: &str) -> Self {
        let needle = needle.to_lowercase();
        Self::new("title_contains", move |note: &Note| {
            note.title.to_lowercase().contains(&needle)
        })
    }
}

/// Sorted, optionally filtered selection of one entity kind.
pub struct FetchRequest<E: Entity> {
    pub sort_key: E::SortKey,
    pub ascending: bool,
    filter: Option<Filter<E>>,
}

impl<E: Entity> FetchRequest<E> {
    pub fn new(sort_key: E::SortKey, ascending: bool) -> Self {
        Self {
            sort_key,
            ascending,
            filter: None,
        }
    }

    pub fn ascending(sort_key: E::SortKey) -> Self {
        Self::new(sort_key, true)
    }

    pub fn descending(sort_key: E::SortKey) -> Self {
        Self::new(sort_key, false)
    }

    pub fn with_filter(mut self, filter: Filter<E>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn filter(&self) -> Option<&Filter<E>> {
        self.filter.as_ref()
    }

    pub fn matches(&self, entity: &E) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter.matches(entity))
    }

    pub fn compare(&self, left: &E, right: &E) -> Ordering {
        let by_key = left.compare_by(right, self.sort_key);
        let by_key = if self.ascending {
            by_key
        } else {
            by_key.reverse()
        };
        by_key.then_with(|| left.seq().cmp(&right.seq()))
    }

    /// Drops non-matching entities and sorts the rest.
    pub(crate) fn select(&self, entities: impl IntoIterator<Item = E>) -> Vec<E> {
        let mut selected: Vec<E> = entities
            .into_iter()
            .filter(|entity| self.matches(entity))
            .collect();
        selected.sort_by(|left, right| self.compare(left, right));
        selected
    }
}

impl<E: Entity> Clone for FetchRequest<E> {
    fn clone(&self) -> Self {
        Self {
            sort_key: self.sort_key,
            ascending: self.ascending,
            filter: self.filter.clone(),
        }
    }
}

impl<E: Entity> Debug for FetchRequest<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRequest")
            .field("kind", &E::KIND)
            .field("sort_key", &self.sort_key)
            .field("ascending", &self.ascending)
            .field("filter", &self.filter)
            .finish()
    }
}
