//! Schema history for the notes store.
//!
//! Each step is a numbered SQL file bundled into the binary. The database
//! records the last applied step in `PRAGMA user_version`; opening a file
//! runs every later step inside one transaction, so a store is either at
//! its previous version or fully upgraded.
//!
//! - `0001_init.sql`: `categories`, `tags`, `notes` and the `note_tags`
//!   join table, with `seq` columns for insertion-order tie-breaks.
//! - `0002_indexes.sql`: lookups used by delete propagation and the
//!   default newest-first listing.
//!
//! A file whose version is ahead of this build is refused rather than
//! read with a schema it may not match.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "indexes",
        sql: include_str!("0002_indexes.sql"),
    },
];

/// Highest schema version this build can write.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Schema version stamped on the open database.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

fn pending_steps(from: u32) -> impl Iterator<Item = &'static SchemaStep> {
    SCHEMA_STEPS.iter().filter(move |step| step.version > from)
}

/// Brings `conn` up to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is newer than this build.
/// - `Sqlite` when a step fails; nothing is applied in that case.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = current_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }
    if from == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending_steps(from) {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=schema_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{pending_steps, SCHEMA_STEPS};

    #[test]
    fn steps_are_numbered_consecutively_from_one() {
        for (index, step) in SCHEMA_STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step `{}`", step.name);
        }
    }

    #[test]
    fn pending_steps_skip_applied_versions() {
        let pending: Vec<u32> = pending_steps(1).map(|step| step.version).collect();
        assert_eq!(pending, vec![2]);
        assert_eq!(pending_steps(2).count(), 0);
    }
}
