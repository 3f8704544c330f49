//! Store-scoped change notification bus.
//!
//! # Responsibility
//! - Deliver each committed change-set to every registered subscriber,
//!   synchronously, before `save()` returns.
//!
//! # Invariants
//! - One delivery per subscriber per commit; no coalescing.
//! - A subscriber removed during dispatch receives nothing further, even
//!   within the dispatch that removed it.
//! - Subscribers added during dispatch start with the next commit.
//! - Dispatch never fails.

use super::change::ChangeSet;
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

pub type SubscriptionId = u64;

type Callback = Rc<RefCell<dyn FnMut(&ChangeSet)>>;

/// Explicit publish/subscribe channel owned by one store.
#[derive(Default)]
pub struct ChangeBus {
    next_id: Cell<SubscriptionId>,
    subscribers: RefCell<BTreeMap<SubscriptionId, Callback>>,
}

impl ChangeBus {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Registers `callback`; it stays registered until the returned
    /// handle is dropped or unsubscribed.
    pub fn subscribe<F>(self: &Rc<Self>, callback: F) -> Subscription
    where
        F: FnMut(&ChangeSet) + 'static,
    {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let callback: Callback = Rc::new(RefCell::new(callback));
        self.subscribers.borrow_mut().insert(id, callback);
        debug!("event=bus_subscribe module=bus status=ok subscription={id}");
        Subscription {
            id,
            bus: Rc::downgrade(self),
            active: true,
        }
    }

    /// Returns `false` when `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscribers.borrow_mut().remove(&id).is_some();
        if removed {
            debug!("event=bus_unsubscribe module=bus status=ok subscription={id}");
        }
        removed
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.borrow().contains_key(&id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Delivers `change` to current subscribers and returns how many ran.
    pub(crate) fn publish(&self, change: &ChangeSet) -> usize {
        let snapshot: Vec<(SubscriptionId, Callback)> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(id, callback)| (*id, Rc::clone(callback)))
            .collect();

        let mut delivered = 0;
        for (id, callback) in snapshot {
            if !self.is_subscribed(id) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut callback) => {
                    (&mut *callback)(change);
                    delivered += 1;
                }
                Err(_) => warn!(
                    "event=change_dispatch module=bus status=skipped subscription={id} reason=callback_reentered"
                ),
            }
        }
        delivered
    }
}

impl Debug for ChangeBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Registration handle; unsubscribes when dropped.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    bus: Weak<ChangeBus>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
            && self
                .bus
                .upgrade()
                .is_some_and(|bus| bus.is_subscribed(self.id))
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeBus;
    use crate::store::change::ChangeSet;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn every_subscriber_gets_one_delivery_per_publish() {
        let bus = ChangeBus::new();
        let hits = Rc::new(RefCell::new(Vec::new()));

        let first_hits = Rc::clone(&hits);
        let _first = bus.subscribe(move |change| first_hits.borrow_mut().push(("a", change.commit())));
        let second_hits = Rc::clone(&hits);
        let _second = bus.subscribe(move |change| second_hits.borrow_mut().push(("b", change.commit())));

        assert_eq!(bus.publish(&ChangeSet::new(1)), 2);
        assert_eq!(bus.publish(&ChangeSet::new(2)), 2);
        assert_eq!(
            *hits.borrow(),
            vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]
        );
    }

    #[test]
    fn dropping_handle_unsubscribes() {
        let bus = ChangeBus::new();
        let subscription = bus.subscribe(|_| {});
        assert_eq!(bus.subscriber_count(), 1);
        assert!(subscription.is_active());
        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(&ChangeSet::new(1)), 0);
    }

    #[test]
    fn unsubscribing_self_during_dispatch_is_safe() {
        let bus = ChangeBus::new();
        let calls = Rc::new(RefCell::new(0));
        let slot: Rc<RefCell<Option<super::Subscription>>> = Rc::new(RefCell::new(None));

        let slot_in_callback = Rc::clone(&slot);
        let calls_in_callback = Rc::clone(&calls);
        let subscription = bus.subscribe(move |_| {
            *calls_in_callback.borrow_mut() += 1;
            if let Some(handle) = slot_in_callback.borrow_mut().take() {
                handle.unsubscribe();
            }
        });
        *slot.borrow_mut() = Some(subscription);

        bus.publish(&ChangeSet::new(1));
        bus.publish(&ChangeSet::new(2));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_removed_by_earlier_subscriber_is_skipped() {
        let bus = ChangeBus::new();
        let late_calls = Rc::new(RefCell::new(0));
        let victim: Rc<RefCell<Option<super::Subscription>>> = Rc::new(RefCell::new(None));

        let victim_slot = Rc::clone(&victim);
        let _killer = bus.subscribe(move |_| {
            victim_slot.borrow_mut().take();
        });
        let late_calls_in_callback = Rc::clone(&late_calls);
        *victim.borrow_mut() = Some(bus.subscribe(move |_| {
            *late_calls_in_callback.borrow_mut() += 1;
        }));

        assert_eq!(bus.publish(&ChangeSet::new(1)), 1);
        assert_eq!(*late_calls.borrow(), 0);
    }
}
