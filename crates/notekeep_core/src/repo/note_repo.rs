//! Note rows and the `note_tags` link table.
//!
//! # Invariants
//! - A note's tag set is always written as a full replacement.
//! - `category_id` is stored as text and decoded back to `EntityId`.

use super::{parse_id, RepoResult};
use crate::model::{Entity, EntityId, Note};
use rusqlite::{params, Connection, Row};
use std::collections::{BTreeSet, HashMap};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    seq,
    title,
    contents,
    created_at,
    updated_at,
    category_id
FROM notes";

/// SQLite-backed note rows.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn get(&self, id: EntityId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let tags = self.load_tags(id)?;
            return Ok(Some(parse_note_row(row, tags)?));
        }
        Ok(None)
    }

    /// Lists every note in insertion order.
    pub fn list(&self) -> RepoResult<Vec<Note>> {
        let mut tags_by_note = self.load_all_tags()?;
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} ORDER BY seq ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let id = parse_id(&id_text, "notes.id")?;
            let tags = tags_by_note.remove(&id).unwrap_or_default();
            notes.push(parse_note_row(row, tags)?);
        }
        Ok(notes)
    }

    /// Lists notes whose `category_id` equals `category_id`.
    pub fn list_by_category(&self, category_id: EntityId) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL} WHERE category_id = ?1 ORDER BY seq ASC;"
        ))?;
        let mut rows = stmt.query([category_id.to_string()])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let tags = self.load_tags(parse_id(&id_text, "notes.id")?)?;
            notes.push(parse_note_row(row, tags)?);
        }
        Ok(notes)
    }

    /// Lists notes carrying `tag_id`.
    pub fn list_by_tag(&self, tag_id: EntityId) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE EXISTS (
                SELECT 1 FROM note_tags nt
                WHERE nt.note_id = notes.id AND nt.tag_id = ?1
             )
             ORDER BY seq ASC;"
        ))?;
        let mut rows = stmt.query([tag_id.to_string()])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let tags = self.load_tags(parse_id(&id_text, "notes.id")?)?;
            notes.push(parse_note_row(row, tags)?);
        }
        Ok(notes)
    }

    pub fn insert(&self, note: &Note) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO notes (
                id,
                seq,
                title,
                contents,
                created_at,
                updated_at,
                category_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                note.id().to_string(),
                note.seq,
                note.title.as_str(),
                note.contents.as_deref(),
                note.created_at(),
                note.updated_at(),
                note.category.map(|id| id.to_string()),
            ],
        )?;
        self.replace_tags(note)
    }

    /// Returns `false` when the note row no longer exists.
    pub fn update(&self, note: &Note) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?2,
                contents = ?3,
                updated_at = ?4,
                category_id = ?5
             WHERE id = ?1;",
            params![
                note.id().to_string(),
                note.title.as_str(),
                note.contents.as_deref(),
                note.updated_at(),
                note.category.map(|id| id.to_string()),
            ],
        )?;
        if changed == 0 {
            return Ok(false);
        }
        self.replace_tags(note)?;
        Ok(true)
    }

    fn replace_tags(&self, note: &Note) -> RepoResult<()> {
        let note_id = note.id().to_string();
        self.conn
            .execute("DELETE FROM note_tags WHERE note_id = ?1;", [&note_id])?;
        let mut stmt = self
            .conn
            .prepare("INSERT INTO note_tags (note_id, tag_id) VALUES (?1, ?2);")?;
        for tag_id in &note.tags {
            stmt.execute(params![note_id, tag_id.to_string()])?;
        }
        Ok(())
    }

    fn load_tags(&self, note_id: EntityId) -> RepoResult<BTreeSet<EntityId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag_id FROM note_tags WHERE note_id = ?1;")?;
        let mut rows = stmt.query([note_id.to_string()])?;
        let mut tags = BTreeSet::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            tags.insert(parse_id(&value, "note_tags.tag_id")?);
        }
        Ok(tags)
    }

    fn load_all_tags(&self) -> RepoResult<HashMap<EntityId, BTreeSet<EntityId>>> {
        let mut stmt = self.conn.prepare("SELECT note_id, tag_id FROM note_tags;")?;
        let mut rows = stmt.query([])?;
        let mut tags: HashMap<EntityId, BTreeSet<EntityId>> = HashMap::new();
        while let Some(row) = rows.next()? {
            let note_text: String = row.get(0)?;
            let tag_text: String = row.get(1)?;
            tags.entry(parse_id(&note_text, "note_tags.note_id")?)
                .or_default()
                .insert(parse_id(&tag_text, "note_tags.tag_id")?);
        }
        Ok(tags)
    }
}

fn parse_note_row(row: &Row<'_>, tags: BTreeSet<EntityId>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    let category = match row.get::<_, Option<String>>("category_id")? {
        Some(value) => Some(parse_id(&value, "notes.category_id")?),
        None => None,
    };
    Ok(Note::from_parts(
        parse_id(&id_text, "notes.id")?,
        row.get("seq")?,
        row.get("title")?,
        row.get("contents")?,
        row.get("created_at")?,
        row.get("updated_at")?,
        category,
        tags,
    ))
}
