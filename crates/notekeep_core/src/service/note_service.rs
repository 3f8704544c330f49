//! Note editing flows.
//!
//! # Invariants
//! - New notes always carry a non-blank title.
//! - An update with a blank title keeps the previous title.
//! - Category and tag references are checked against the context view.

use crate::model::{
    compare_text, Category, Entity, EntityId, EntityRef, Note, Tag, ValidationError,
};
use crate::store::{Context, StoreError, StoreResult};

/// Label shown for a note without tags.
pub const NO_TAGS_LABEL: &str = "No Tags";
/// Label shown for a note without a category.
pub const NO_CATEGORY_LABEL: &str = "No category yet";

/// Note use-cases bound to one context.
pub struct NoteService<'ctx> {
    context: &'ctx mut Context,
}

impl<'ctx> NoteService<'ctx> {
    pub fn new(context: &'ctx mut Context) -> Self {
        Self { context }
    }

    /// Stages a new note.
    ///
    /// # Errors
    /// - `ValidationFailed(EmptyTitle)` when `title` is blank.
    pub fn create_note(&mut self, title: &str, contents: Option<&str>) -> StoreResult<EntityId> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        let note = self.context.create_as::<Note>()?;
        note.title = title.to_string();
        note.contents = normalize_contents(contents);
        Ok(note.id())
    }

    /// Stages new title and contents; a blank title is ignored.
    pub fn update_note(
        &mut self,
        note_id: EntityId,
        title: &str,
        contents: Option<&str>,
    ) -> StoreResult<()> {
        let note = self.context.edit::<Note>(note_id)?;
        let title = title.trim();
        if !title.is_empty() {
            note.title = title.to_string();
        }
        note.contents = normalize_contents(contents);
        Ok(())
    }

    pub fn get_note(&self, note_id: EntityId) -> StoreResult<Note> {
        self.context
            .get::<Note>(note_id)?
            .ok_or(StoreError::NotFound(EntityRef::note(note_id)))
    }

    /// Sets or clears the note's category.
    pub fn assign_category(
        &mut self,
        note_id: EntityId,
        category_id: Option<EntityId>,
    ) -> StoreResult<()> {
        if let Some(category_id) = category_id {
            if self.context.get::<Category>(category_id)?.is_none() {
                return Err(StoreError::NotFound(EntityRef::category(category_id)));
            }
        }
        self.context.edit::<Note>(note_id)?.category = category_id;
        Ok(())
    }

    /// Flips tag membership; returns whether the tag is now attached.
    pub fn toggle_tag(&mut self, note_id: EntityId, tag_id: EntityId) -> StoreResult<bool> {
        if self.context.get::<Tag>(tag_id)?.is_none() {
            return Err(StoreError::NotFound(EntityRef::tag(tag_id)));
        }
        Ok(self.context.edit::<Note>(note_id)?.toggle_tag(tag_id))
    }

    /// Tag names sorted alphabetically and joined by `, `.
    pub fn tags_label(&self, note_id: EntityId) -> StoreResult<String> {
        let note = self.get_note(note_id)?;
        let mut names = Vec::with_capacity(note.tags.len());
        for tag_id in &note.tags {
            if let Some(tag) = self.context.get::<Tag>(*tag_id)? {
                names.push(tag.name);
            }
        }
        if names.is_empty() {
            return Ok(NO_TAGS_LABEL.to_string());
        }
        names.sort_by(|left, right| compare_text(left, right));
        Ok(names.join(", "))
    }

    pub fn category_label(&self, note_id: EntityId) -> StoreResult<String> {
        let note = self.get_note(note_id)?;
        let category = match note.category {
            Some(category_id) => self.context.get::<Category>(category_id)?,
            None => None,
        };
        Ok(category.map_or_else(|| NO_CATEGORY_LABEL.to_string(), |category| category.name))
    }

    pub fn delete_note(&mut self, note_id: EntityId) -> StoreResult<()> {
        self.context.delete(EntityRef::note(note_id))
    }
}

fn normalize_contents(contents: Option<&str>) -> Option<String> {
    contents
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}
