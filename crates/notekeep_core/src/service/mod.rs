//! Use-case services over a context.
//!
//! # Responsibility
//! - Express the app's editing flows as small staged operations.
//! - Derive display labels from entity state.
//!
//! # Invariants
//! - Services stage edits only; the caller decides when to `save`.

pub mod label_service;
pub mod note_service;

pub use label_service::LabelService;
pub use note_service::{NoteService, NO_CATEGORY_LABEL, NO_TAGS_LABEL};
