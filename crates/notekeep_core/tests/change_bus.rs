use notekeep_core::{ChangeSet, EntityKind, EntityRef, Note, NoteService, Store};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<ChangeSet>>>;

fn subscriber(store: &Store) -> (Log, notekeep_core::Subscription) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let subscription = store.subscribe(move |change| sink.borrow_mut().push(change.clone()));
    (log, subscription)
}

#[test]
fn every_subscriber_gets_each_commit_before_save_returns() {
    let store = Store::open_in_memory().unwrap();
    let (first, _first_subscription) = subscriber(&store);
    let (second, _second_subscription) = subscriber(&store);
    let mut context = store.new_context();

    let note_id = NoteService::new(&mut context)
        .create_note("Delivered", None)
        .unwrap();
    context.save().unwrap();
    assert_eq!(first.borrow().len(), 1);
    assert_eq!(second.borrow().len(), 1);

    context.edit::<Note>(note_id).unwrap().title = "Delivered twice".to_string();
    context.save().unwrap();
    assert_eq!(first.borrow().len(), 2);
    assert_eq!(second.borrow().len(), 2);

    let commits: Vec<u64> = first.borrow().iter().map(ChangeSet::commit).collect();
    assert_eq!(commits, vec![1, 2]);
    assert_eq!(*first.borrow(), *second.borrow());
}

#[test]
fn change_set_partitions_identities_and_carries_snapshots() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();
    let (kept, doomed) = {
        let mut notes = NoteService::new(&mut context);
        (
            notes.create_note("Kept", None).unwrap(),
            notes.create_note("Doomed", None).unwrap(),
        )
    };
    context.save().unwrap();

    let (log, _subscription) = subscriber(&store);
    let fresh = NoteService::new(&mut context)
        .create_note("Fresh", None)
        .unwrap();
    context.edit::<Note>(kept).unwrap().contents = Some("more".to_string());
    context.delete(EntityRef::note(doomed)).unwrap();
    context.save().unwrap();

    let log = log.borrow();
    let change = &log[0];
    assert_eq!(change.inserted(), &[EntityRef::note(fresh)]);
    assert_eq!(change.updated(), &[EntityRef::note(kept)]);
    assert_eq!(change.deleted(), &[EntityRef::note(doomed)]);
    assert_eq!(change.len(), 3);
    assert!(change.touches(EntityKind::Note));
    assert!(!change.touches(EntityKind::Tag));
    assert_eq!(
        change
            .snapshot_of::<Note>(kept)
            .and_then(|note| note.contents.clone()),
        Some("more".to_string())
    );
    assert!(change.snapshot(EntityRef::note(doomed)).is_none());
}

#[test]
fn unsubscribed_observer_receives_nothing_further() {
    let store = Store::open_in_memory().unwrap();
    let (stays, _stays_subscription) = subscriber(&store);
    let (leaves, leaves_subscription) = subscriber(&store);
    let mut context = store.new_context();

    NoteService::new(&mut context)
        .create_note("Before", None)
        .unwrap();
    context.save().unwrap();

    leaves_subscription.unsubscribe();
    NoteService::new(&mut context)
        .create_note("After", None)
        .unwrap();
    context.save().unwrap();

    assert_eq!(leaves.borrow().len(), 1);
    assert_eq!(stays.borrow().len(), 2);
    assert_eq!(store.bus().subscriber_count(), 1);
}

#[test]
fn dropping_subscription_unsubscribes() {
    let store = Store::open_in_memory().unwrap();
    let (log, subscription) = subscriber(&store);
    drop(subscription);

    let mut context = store.new_context();
    NoteService::new(&mut context)
        .create_note("Unheard", None)
        .unwrap();
    context.save().unwrap();

    assert!(log.borrow().is_empty());
    assert_eq!(store.bus().subscriber_count(), 0);
}

#[test]
fn subscriber_may_read_committed_state_during_dispatch() {
    let store = Store::open_in_memory().unwrap();
    let titles = Rc::new(RefCell::new(Vec::new()));

    let reader = store.new_context();
    let sink = Rc::clone(&titles);
    let _subscription = store.subscribe(move |change| {
        for entity in change.inserted() {
            if let Some(note) = reader.get::<Note>(entity.id).unwrap() {
                sink.borrow_mut().push(note.title);
            }
        }
    });

    let mut context = store.new_context();
    NoteService::new(&mut context)
        .create_note("Visible", None)
        .unwrap();
    context.save().unwrap();

    assert_eq!(*titles.borrow(), vec!["Visible".to_string()]);
}
