//! Persistent store, unit of work, change bus and live queries.
//!
//! # Responsibility
//! - Own the single database connection of one store file.
//! - Hand out contexts that stage and commit edits.
//! - Publish one change-set per commit and keep live queries current.
//!
//! # Invariants
//! - Every operation runs on the thread that opened the store; `Store` is
//!   neither `Send` nor `Sync`.
//! - A commit's change-set is fully delivered before `save` returns.
//! - Lifecycle flushes never panic or return errors.

mod bus;
mod change;
mod commit;
mod context;
mod diff;
mod error;
mod live;
mod query;

pub use bus::{ChangeBus, Subscription, SubscriptionId};
pub use change::ChangeSet;
pub use context::Context;
pub use error::{StoreError, StoreResult};
pub use live::{
    CollectionChange, CollectionObserver, CollectionState, MoveReporting, ObservedCollection,
};
pub use query::{FetchRequest, Filter};

use crate::clock::Clock;
use crate::config::{StoreLocation, StoreOptions};
use crate::db::{open_db, open_db_in_memory};
use crate::model::Entity;
use crate::repo::SqliteRecordRepository;
use log::{error, info, warn};
use rusqlite::Connection;
use std::cell::{Cell, RefCell, RefMut};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// State shared by a store, its contexts and its live queries.
pub(crate) struct StoreShared {
    conn: RefCell<Connection>,
    bus: Rc<ChangeBus>,
    clock: Rc<dyn Clock>,
    commits: Cell<u64>,
    dispatching: Cell<bool>,
}

impl StoreShared {
    pub(crate) fn fetch<E: Entity>(&self, request: &FetchRequest<E>) -> StoreResult<Vec<E>> {
        let conn = self.conn.borrow();
        let records = SqliteRecordRepository::new(&conn).list(E::KIND)?;
        Ok(request.select(records.into_iter().filter_map(E::try_from_record)))
    }

    pub(crate) fn dispatch(&self, change: &ChangeSet) {
        self.dispatching.set(true);
        let _reset = DispatchGuard(&self.dispatching);
        let delivered = self.bus.publish(change);
        info!(
            "event=change_dispatch module=store status=ok commit={} subscribers={}",
            change.commit(),
            delivered
        );
    }
}

struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// One open store file plus its default context.
pub struct Store {
    shared: Rc<StoreShared>,
    path: Option<PathBuf>,
    default_context: RefCell<Context>,
}

impl Store {
    /// Opens (creating when absent) the store file at `path`.
    ///
    /// # Errors
    /// - `Unavailable` when the file cannot be opened, is not a store, or
    ///   was written by a newer schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = open_db(path, options.busy_timeout).map_err(|err| {
            error!(
                "event=store_open module=store status=error mode=file error={}",
                err
            );
            StoreError::Unavailable(err)
        })?;
        info!("event=store_open module=store status=ok mode=file");
        Ok(Self::from_connection(conn, Some(path.to_path_buf()), options))
    }

    /// Opens the well-known store file of `location`.
    pub fn open_at(location: &StoreLocation, options: StoreOptions) -> StoreResult<Self> {
        Self::open_with(location.store_path(), options)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open_in_memory_with(StoreOptions::default())
    }

    pub fn open_in_memory_with(options: StoreOptions) -> StoreResult<Self> {
        let conn = open_db_in_memory().map_err(|err| {
            error!(
                "event=store_open module=store status=error mode=memory error={}",
                err
            );
            StoreError::Unavailable(err)
        })?;
        info!("event=store_open module=store status=ok mode=memory");
        Ok(Self::from_connection(conn, None, options))
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>, options: StoreOptions) -> Self {
        let shared = Rc::new(StoreShared {
            conn: RefCell::new(conn),
            bus: ChangeBus::new(),
            clock: options.clock,
            commits: Cell::new(0),
            dispatching: Cell::new(false),
        });
        Self {
            default_context: RefCell::new(Context::new(Rc::clone(&shared))),
            shared,
            path,
        }
    }

    /// Backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn new_context(&self) -> Context {
        Context::new(Rc::clone(&self.shared))
    }

    /// The context flushed by the lifecycle hooks.
    ///
    /// # Panics
    /// - When the default context is already borrowed.
    pub fn default_context(&self) -> RefMut<'_, Context> {
        self.default_context.borrow_mut()
    }

    /// Point-in-time snapshot of committed entities.
    pub fn fetch<E: Entity>(&self, request: &FetchRequest<E>) -> StoreResult<Vec<E>> {
        self.shared.fetch(request)
    }

    /// Live query seeded with an initial fetch.
    pub fn observe<E: Entity>(&self, request: FetchRequest<E>) -> StoreResult<ObservedCollection<E>> {
        let mut collection = self.collection(request);
        collection.perform_fetch()?;
        Ok(collection)
    }

    /// Live query left `Unfetched` until `perform_fetch`.
    pub fn collection<E: Entity>(&self, request: FetchRequest<E>) -> ObservedCollection<E> {
        ObservedCollection::new(Rc::clone(&self.shared), request)
    }

    /// Registers `callback` for every change-set committed to this store.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&ChangeSet) + 'static,
    {
        self.shared.bus.subscribe(callback)
    }

    pub fn bus(&self) -> Rc<ChangeBus> {
        Rc::clone(&self.shared.bus)
    }

    /// Number of non-empty commits so far.
    pub fn commit_count(&self) -> u64 {
        self.shared.commits.get()
    }

    /// Best-effort save of the default context when the host backgrounds.
    ///
    /// Returns whether a save ran and succeeded.
    pub fn flush_on_background(&self) -> bool {
        self.flush("background")
    }

    /// Best-effort save of the default context before the host exits.
    pub fn flush_on_terminate(&self) -> bool {
        self.flush("terminate")
    }

    fn flush(&self, trigger: &str) -> bool {
        let Ok(mut context) = self.default_context.try_borrow_mut() else {
            warn!(
                "event=store_flush module=store status=skipped trigger={} reason=context_busy",
                trigger
            );
            return false;
        };
        if !context.has_changes() {
            info!(
                "event=store_flush module=store status=skipped trigger={} reason=no_changes",
                trigger
            );
            return false;
        }
        match context.save() {
            Ok(()) => {
                info!(
                    "event=store_flush module=store status=ok trigger={}",
                    trigger
                );
                true
            }
            Err(err) => {
                error!(
                    "event=store_flush module=store status=error trigger={} error={}",
                    trigger, err
                );
                false
            }
        }
    }
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("commits", &self.shared.commits.get())
            .finish_non_exhaustive()
    }
}
