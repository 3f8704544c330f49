//! Live queries: cached ordered results kept current from the change bus.
//!
//! # Responsibility
//! - Seed a cached list with a fetch, then translate each relevant
//!   change-set into positional operations for one observer.
//!
//! # Invariants
//! - `Unfetched -> Live` on the first successful fetch; `Live -> Disposed`
//!   on `dispose` or drop. Nothing fires once disposed.
//! - Per change-set the observer sees `will_change_content`, zero or more
//!   `did_change`, then `did_change_content`, in that order.
//! - After a notification the cached list equals a fresh fetch.

use super::bus::Subscription;
use super::change::ChangeSet;
use super::diff::{diff, DiffOutcome};
use super::error::StoreResult;
use super::query::FetchRequest;
use super::StoreShared;
use crate::model::{Entity, EntityId};
use log::{debug, info, warn};
use std::cell::{Ref, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Unfetched,
    Live,
    Disposed,
}

/// How a reorder of a surviving entity is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveReporting {
    /// `Removed` at the old index followed by `Inserted` at the new one.
    #[default]
    DeleteThenInsert,
    /// One `Moved`; `to` is the index after the removal.
    Atomic,
}

/// One positional edit against the cached list.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionChange<E> {
    Inserted { index: usize, item: E },
    Removed { index: usize, item: E },
    Moved { from: usize, to: usize, item: E },
    UpdatedInPlace { index: usize, item: E },
}

impl<E: Clone> CollectionChange<E> {
    pub fn item(&self) -> &E {
        match self {
            Self::Inserted { item, .. }
            | Self::Removed { item, .. }
            | Self::Moved { item, .. }
            | Self::UpdatedInPlace { item, .. } => item,
        }
    }

    /// Applies this edit to `items`.
    ///
    /// # Panics
    /// - When an index is out of range for `items`, like the `Vec` calls it
    ///   maps to.
    pub fn apply_to(&self, items: &mut Vec<E>) {
        match self {
            Self::Inserted { index, item } => items.insert(*index, item.clone()),
            Self::Removed { index, .. } => {
                items.remove(*index);
            }
            Self::Moved { from, to, item } => {
                items.remove(*from);
                items.insert(*to, item.clone());
            }
            Self::UpdatedInPlace { index, item } => items[*index] = item.clone(),
        }
    }
}

/// Receiver of one collection's notifications.
pub trait CollectionObserver<E> {
    fn will_change_content(&mut self) {}
    fn did_change(&mut self, change: &CollectionChange<E>);
    fn did_change_content(&mut self) {}
}

struct FnObserver<F>(F);

impl<E, F> CollectionObserver<E> for FnObserver<F>
where
    F: FnMut(&CollectionChange<E>),
{
    fn did_change(&mut self, change: &CollectionChange<E>) {
        (self.0)(change)
    }
}

struct Inner<E: Entity> {
    state: CollectionState,
    request: FetchRequest<E>,
    moves: MoveReporting,
    items: Vec<E>,
    observer: Option<Box<dyn CollectionObserver<E>>>,
    generation: u64,
}

impl<E: Entity> Inner<E> {
    fn on_change_set(cell: &Rc<RefCell<Self>>, change: &ChangeSet) {
        let (changes, mut observer) = {
            let Ok(mut inner) = cell.try_borrow_mut() else {
                warn!(
                    "event=live_query_apply module=live status=skipped reason=reentrant kind={}",
                    E::KIND
                );
                return;
            };
            if inner.state != CollectionState::Live || !change.touches(E::KIND) {
                return;
            }
            let DiffOutcome { changes, items } =
                diff(&inner.items, change, &inner.request, inner.moves);
            inner.items = items;
            inner.generation += 1;
            debug!(
                "event=live_query_apply module=live status=ok kind={} commit={} ops={} len={}",
                E::KIND,
                change.commit(),
                changes.len(),
                inner.items.len()
            );
            (changes, inner.observer.take())
        };

        let Some(observer_ref) = observer.as_mut() else {
            return;
        };
        observer_ref.will_change_content();
        for change in &changes {
            observer_ref.did_change(change);
        }
        observer_ref.did_change_content();

        if let Ok(mut inner) = cell.try_borrow_mut() {
            if inner.state == CollectionState::Live && inner.observer.is_none() {
                inner.observer = observer;
            }
        }
    }
}

/// Ordered, filtered view over one entity kind that tracks commits.
///
/// Dropping the collection unsubscribes it from the store.
pub struct ObservedCollection<E: Entity> {
    shared: Rc<StoreShared>,
    inner: Rc<RefCell<Inner<E>>>,
    subscription: Option<Subscription>,
}

impl<E: Entity> ObservedCollection<E> {
    pub(crate) fn new(shared: Rc<StoreShared>, request: FetchRequest<E>) -> Self {
        let inner = Rc::new(RefCell::new(Inner {
            state: CollectionState::Unfetched,
            request,
            moves: MoveReporting::default(),
            items: Vec::new(),
            observer: None,
            generation: 0,
        }));
        let weak: Weak<RefCell<Inner<E>>> = Rc::downgrade(&inner);
        let subscription = shared.bus.subscribe(move |change: &ChangeSet| {
            if let Some(inner) = weak.upgrade() {
                Inner::on_change_set(&inner, change);
            }
        });
        Self {
            shared,
            inner,
            subscription: Some(subscription),
        }
    }

    /// Loads the current committed result set and goes live.
    ///
    /// A disposed collection stays disposed; the call is a no-op.
    pub fn perform_fetch(&mut self) -> StoreResult<()> {
        if self.state() == CollectionState::Disposed {
            debug!(
                "event=live_query_fetch module=live status=skipped reason=disposed kind={}",
                E::KIND
            );
            return Ok(());
        }

        let request = self.inner.borrow().request.clone();
        let items = self.shared.fetch(&request)?;
        let mut inner = self.inner.borrow_mut();
        info!(
            "event=live_query_fetch module=live status=ok kind={} filter={} len={}",
            E::KIND,
            request.filter().map_or("none", |filter| filter.label()),
            items.len()
        );
        inner.items = items;
        inner.state = CollectionState::Live;
        Ok(())
    }

    pub fn with_move_reporting(self, moves: MoveReporting) -> Self {
        self.set_move_reporting(moves);
        self
    }

    pub fn set_move_reporting(&self, moves: MoveReporting) {
        self.inner.borrow_mut().moves = moves;
    }

    pub fn set_observer(&self, observer: impl CollectionObserver<E> + 'static) {
        let mut inner = self.inner.borrow_mut();
        if inner.state != CollectionState::Disposed {
            inner.observer = Some(Box::new(observer));
        }
    }

    /// Registers a closure that receives each operation.
    pub fn on_change<F>(&self, callback: F)
    where
        F: FnMut(&CollectionChange<E>) + 'static,
    {
        self.set_observer(FnObserver(callback));
    }

    pub fn clear_observer(&self) {
        self.inner.borrow_mut().observer = None;
    }

    pub fn state(&self) -> CollectionState {
        self.inner.borrow().state
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    pub fn items(&self) -> Ref<'_, [E]> {
        Ref::map(self.inner.borrow(), |inner| inner.items.as_slice())
    }

    pub fn get(&self, index: usize) -> Option<E> {
        self.inner.borrow().items.get(index).cloned()
    }

    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.inner
            .borrow()
            .items
            .iter()
            .position(|item| item.id() == id)
    }

    pub fn request(&self) -> FetchRequest<E> {
        self.inner.borrow().request.clone()
    }

    /// Number of change-sets applied since the collection went live.
    pub fn generation(&self) -> u64 {
        self.inner.borrow().generation
    }

    /// Unsubscribes and discards the cached list.
    pub fn dispose(&mut self) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.state = CollectionState::Disposed;
            inner.items.clear();
            inner.observer = None;
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        debug!(
            "event=live_query_dispose module=live status=ok kind={}",
            E::KIND
        );
    }
}

impl<E: Entity> Debug for ObservedCollection<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservedCollection")
            .field("kind", &E::KIND)
            .field("state", &inner.state)
            .field("len", &inner.items.len())
            .field("generation", &inner.generation)
            .finish()
    }
}
