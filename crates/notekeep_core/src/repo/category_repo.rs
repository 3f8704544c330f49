//! Category rows.

use super::{parse_id, RepoResult};
use crate::model::{Category, Entity, EntityId};
use rusqlite::{params, Connection, Row};

const CATEGORY_SELECT_SQL: &str = "SELECT id, seq, name, color_hex FROM categories";

/// SQLite-backed category rows.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn get(&self, id: EntityId) -> RepoResult<Option<Category>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_category_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn list(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CATEGORY_SELECT_SQL} ORDER BY seq ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    pub fn insert(&self, category: &Category) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO categories (id, seq, name, color_hex) VALUES (?1, ?2, ?3, ?4);",
            params![
                category.id().to_string(),
                category.seq,
                category.name.as_str(),
                category.color_hex.as_deref(),
            ],
        )?;
        Ok(())
    }

    pub fn update(&self, category: &Category) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE categories SET name = ?2, color_hex = ?3 WHERE id = ?1;",
            params![
                category.id().to_string(),
                category.name.as_str(),
                category.color_hex.as_deref(),
            ],
        )?;
        Ok(changed > 0)
    }
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    let id_text: String = row.get("id")?;
    Ok(Category::from_parts(
        parse_id(&id_text, "categories.id")?,
        row.get("seq")?,
        row.get("name")?,
        row.get("color_hex")?,
    ))
}
