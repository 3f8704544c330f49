//! Category and tag management flows.
//!
//! # Invariants
//! - Renaming to a blank name is ignored.
//! - Names are not unique; duplicates are kept as distinct entities.

use crate::model::{Category, Entity, EntityId, EntityRef, Note, NoteSortKey, Rgb, Tag};
use crate::store::{Context, FetchRequest, Filter, StoreResult};

pub struct LabelService<'ctx> {
    context: &'ctx mut Context,
}

impl<'ctx> LabelService<'ctx> {
    pub fn new(context: &'ctx mut Context) -> Self {
        Self { context }
    }

    pub fn create_category(&mut self, name: &str, color: Option<Rgb>) -> StoreResult<EntityId> {
        let category = self.context.create_as::<Category>()?;
        category.name = name.trim().to_string();
        if let Some(color) = color {
            category.set_color(color);
        }
        Ok(category.id())
    }

    /// Returns `false` when `name` is blank and nothing was staged.
    pub fn rename_category(&mut self, category_id: EntityId, name: &str) -> StoreResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        self.context.edit::<Category>(category_id)?.name = name.to_string();
        Ok(true)
    }

    /// Sets the color, or clears it back to the default accent.
    pub fn set_category_color(
        &mut self,
        category_id: EntityId,
        color: Option<Rgb>,
    ) -> StoreResult<()> {
        let category = self.context.edit::<Category>(category_id)?;
        match color {
            Some(color) => category.set_color(color),
            None => category.clear_color(),
        }
        Ok(())
    }

    pub fn create_tag(&mut self, name: &str) -> StoreResult<EntityId> {
        let tag = self.context.create_as::<Tag>()?;
        tag.name = name.trim().to_string();
        Ok(tag.id())
    }

    pub fn rename_tag(&mut self, tag_id: EntityId, name: &str) -> StoreResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        self.context.edit::<Tag>(tag_id)?.name = name.to_string();
        Ok(true)
    }

    /// Stages the delete; notes lose the reference when it commits.
    pub fn delete_category(&mut self, category_id: EntityId) -> StoreResult<()> {
        self.context.delete(EntityRef::category(category_id))
    }

    pub fn delete_tag(&mut self, tag_id: EntityId) -> StoreResult<()> {
        self.context.delete(EntityRef::tag(tag_id))
    }

    /// Committed notes in the category, newest edit first.
    pub fn notes_in_category(&self, category_id: EntityId) -> StoreResult<Vec<Note>> {
        let request = FetchRequest::descending(NoteSortKey::UpdatedAt)
            .with_filter(Filter::in_category(category_id));
        self.context.fetch(&request)
    }
}
