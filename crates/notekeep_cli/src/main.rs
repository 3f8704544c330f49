//! CLI smoke entry point.
//!
//! Prints the core and schema versions, then runs one create/save/fetch
//! round trip against an in-memory store.

use notekeep_core::{FetchRequest, Note, NoteService, NoteSortKey, Store, StoreResult};
use std::process::ExitCode;

fn round_trip() -> StoreResult<usize> {
    let store = Store::open_in_memory()?;
    let mut context = store.new_context();
    NoteService::new(&mut context).create_note("Smoke probe", Some("round trip"))?;
    context.save()?;
    let notes = store.fetch(&FetchRequest::<Note>::descending(NoteSortKey::UpdatedAt))?;
    Ok(notes.len())
}

fn main() -> ExitCode {
    println!("notekeep_core version={}", notekeep_core::core_version());
    println!("notekeep_core schema={}", notekeep_core::schema_version());
    match round_trip() {
        Ok(count) => {
            println!("notekeep_core notes={count}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("notekeep_core round_trip_error={err}");
            ExitCode::FAILURE
        }
    }
}
