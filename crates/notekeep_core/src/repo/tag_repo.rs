//! Tag rows.

use super::{parse_id, RepoResult};
use crate::model::{Entity, EntityId, Tag};
use rusqlite::{params, Connection, Row};

const TAG_SELECT_SQL: &str = "SELECT id, seq, name FROM tags";

/// SQLite-backed tag rows.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn get(&self, id: EntityId) -> RepoResult<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TAG_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_tag_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn list(&self) -> RepoResult<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TAG_SELECT_SQL} ORDER BY seq ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    pub fn insert(&self, tag: &Tag) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO tags (id, seq, name) VALUES (?1, ?2, ?3);",
            params![tag.id().to_string(), tag.seq, tag.name.as_str()],
        )?;
        Ok(())
    }

    pub fn update(&self, tag: &Tag) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE tags SET name = ?2 WHERE id = ?1;",
            params![tag.id().to_string(), tag.name.as_str()],
        )?;
        Ok(changed > 0)
    }
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    let id_text: String = row.get("id")?;
    Ok(Tag::from_parts(
        parse_id(&id_text, "tags.id")?,
        row.get("seq")?,
        row.get("name")?,
    ))
}
