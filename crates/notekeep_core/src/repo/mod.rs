//! Row-level persistence for notes, categories and tags.
//!
//! # Responsibility
//! - Encode/decode entities to and from their SQLite tables.
//! - Keep SQL details inside the persistence boundary; the store layer
//!   only talks in `Record`s and `EntityRef`s.
//!
//! # Invariants
//! - Read paths reject malformed persisted ids instead of masking them.
//! - Writes never commit on their own; callers own the transaction.

pub mod category_repo;
pub mod note_repo;
pub mod tag_repo;

use crate::db::DbError;
use crate::model::{EntityId, EntityKind, EntityRef, Record};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub use category_repo::SqliteCategoryRepository;
pub use note_repo::SqliteNoteRepository;
pub use tag_repo::SqliteTagRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error raised while reading or writing entity rows.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Kind-dispatching facade over the per-entity repositories.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn get(&self, entity: EntityRef) -> RepoResult<Option<Record>> {
        let record = match entity.kind {
            EntityKind::Note => SqliteNoteRepository::new(self.conn)
                .get(entity.id)?
                .map(Record::Note),
            EntityKind::Category => SqliteCategoryRepository::new(self.conn)
                .get(entity.id)?
                .map(Record::Category),
            EntityKind::Tag => SqliteTagRepository::new(self.conn)
                .get(entity.id)?
                .map(Record::Tag),
        };
        Ok(record)
    }

    pub fn list(&self, kind: EntityKind) -> RepoResult<Vec<Record>> {
        let records = match kind {
            EntityKind::Note => SqliteNoteRepository::new(self.conn)
                .list()?
                .into_iter()
                .map(Record::Note)
                .collect(),
            EntityKind::Category => SqliteCategoryRepository::new(self.conn)
                .list()?
                .into_iter()
                .map(Record::Category)
                .collect(),
            EntityKind::Tag => SqliteTagRepository::new(self.conn)
                .list()?
                .into_iter()
                .map(Record::Tag)
                .collect(),
        };
        Ok(records)
    }

    pub fn exists(&self, entity: EntityRef) -> RepoResult<bool> {
        let table = table_for(entity.kind);
        let exists: i64 = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
            [entity.id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    pub fn insert(&self, record: &Record) -> RepoResult<()> {
        match record {
            Record::Note(note) => SqliteNoteRepository::new(self.conn).insert(note),
            Record::Category(category) => {
                SqliteCategoryRepository::new(self.conn).insert(category)
            }
            Record::Tag(tag) => SqliteTagRepository::new(self.conn).insert(tag),
        }
    }

    /// Returns `false` when no row with the record's id exists.
    pub fn update(&self, record: &Record) -> RepoResult<bool> {
        match record {
            Record::Note(note) => SqliteNoteRepository::new(self.conn).update(note),
            Record::Category(category) => {
                SqliteCategoryRepository::new(self.conn).update(category)
            }
            Record::Tag(tag) => SqliteTagRepository::new(self.conn).update(tag),
        }
    }

    /// Returns `false` when no row with the given id exists.
    pub fn delete(&self, entity: EntityRef) -> RepoResult<bool> {
        let table = table_for(entity.kind);
        let changed = self.conn.execute(
            &format!("DELETE FROM {table} WHERE id = ?1;"),
            [entity.id.to_string()],
        )?;
        Ok(changed > 0)
    }

    /// Highest insertion ordinal in use across all entity tables.
    pub fn max_seq(&self) -> RepoResult<i64> {
        let seq: i64 = self.conn.query_row(
            "SELECT MAX(
                (SELECT COALESCE(MAX(seq), 0) FROM notes),
                (SELECT COALESCE(MAX(seq), 0) FROM categories),
                (SELECT COALESCE(MAX(seq), 0) FROM tags)
            );",
            [],
            |row| row.get(0),
        )?;
        Ok(seq)
    }
}

fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Note => "notes",
        EntityKind::Category => "categories",
        EntityKind::Tag => "tags",
    }
}

pub(crate) fn parse_id(value: &str, column: &str) -> RepoResult<EntityId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
