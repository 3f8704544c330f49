//! Local persistence and change notification for notes, categories and tags.
//!
//! A `Store` owns one SQLite file. Edits are staged in a `Context` and
//! committed atomically by `save`, which publishes a `ChangeSet` to every
//! subscriber before returning. `ObservedCollection` keeps an ordered,
//! filtered result list current from those change-sets.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{StoreLocation, StoreOptions, DEFAULT_MODEL_NAME};
pub use db::DbError;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    Category, CategorySortKey, Entity, EntityId, EntityKind, EntityRef, Note, NoteSortKey,
    Record, Rgb, Tag, TagSortKey, ValidationError,
};
pub use service::{LabelService, NoteService};
pub use store::{
    ChangeSet, CollectionChange, CollectionObserver, CollectionState, Context, FetchRequest,
    Filter, MoveReporting, ObservedCollection, Store, StoreError, StoreResult, Subscription,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Schema version this build writes and accepts at most.
pub fn schema_version() -> u32 {
    db::migrations::latest_version()
}
