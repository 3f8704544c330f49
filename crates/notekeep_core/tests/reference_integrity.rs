use notekeep_core::{
    ChangeSet, EntityRef, FetchRequest, LabelService, ManualClock, Note, NoteService,
    NoteSortKey, Store, StoreError, StoreOptions, Tag, TagSortKey, ValidationError,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

fn record_changes(store: &Store) -> (Rc<RefCell<Vec<ChangeSet>>>, notekeep_core::Subscription) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let subscription = store.subscribe(move |change| sink.borrow_mut().push(change.clone()));
    (seen, subscription)
}

#[test]
fn deleting_category_clears_note_reference() {
    let clock = Rc::new(ManualClock::new(1_000));
    let store =
        Store::open_in_memory_with(StoreOptions::default().with_clock(clock.clone())).unwrap();
    let mut context = store.new_context();

    let work = LabelService::new(&mut context)
        .create_category("Work", None)
        .unwrap();
    let note_id = {
        let mut notes = NoteService::new(&mut context);
        let note_id = notes.create_note("Quarterly plan", None).unwrap();
        notes.assign_category(note_id, Some(work)).unwrap();
        note_id
    };
    context.save().unwrap();

    let (seen, _subscription) = record_changes(&store);
    clock.set(8_000);
    LabelService::new(&mut context).delete_category(work).unwrap();
    context.save().unwrap();

    let note = context.get::<Note>(note_id).unwrap().unwrap();
    assert_eq!(note.category, None);
    assert_eq!(note.updated_at(), 1_000, "propagation is not a user edit");

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].deleted(), &[EntityRef::category(work)]);
    assert_eq!(seen[0].updated(), &[EntityRef::note(note_id)]);
    assert_eq!(
        seen[0].snapshot_of::<Note>(note_id).map(|note| note.category),
        Some(None)
    );
}

#[test]
fn deleting_tag_removes_it_from_every_note() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();

    let (urgent, later) = {
        let mut labels = LabelService::new(&mut context);
        (
            labels.create_tag("urgent").unwrap(),
            labels.create_tag("later").unwrap(),
        )
    };
    let mut tagged = Vec::new();
    for title in ["One", "Two", "Three"] {
        let mut notes = NoteService::new(&mut context);
        let note_id = notes.create_note(title, None).unwrap();
        notes.toggle_tag(note_id, urgent).unwrap();
        notes.toggle_tag(note_id, later).unwrap();
        tagged.push(note_id);
    }
    context.save().unwrap();

    LabelService::new(&mut context).delete_tag(urgent).unwrap();
    context.save().unwrap();

    let notes = store
        .fetch(&FetchRequest::<Note>::ascending(NoteSortKey::Title))
        .unwrap();
    assert_eq!(notes.len(), 3);
    for note in &notes {
        assert!(!note.has_tag(urgent));
        assert!(note.has_tag(later));
    }
    let tags = store
        .fetch(&FetchRequest::<Tag>::ascending(TagSortKey::Name))
        .unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "later");
}

#[test]
fn note_staged_against_deleted_category_is_detached() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();
    let home = LabelService::new(&mut context)
        .create_category("Home", None)
        .unwrap();
    context.save().unwrap();

    let note_id = {
        let mut notes = NoteService::new(&mut context);
        let note_id = notes.create_note("Paint fence", None).unwrap();
        notes.assign_category(note_id, Some(home)).unwrap();
        note_id
    };
    LabelService::new(&mut context).delete_category(home).unwrap();
    context.save().unwrap();

    let note = context.get::<Note>(note_id).unwrap().unwrap();
    assert_eq!(note.category, None);
}

#[test]
fn no_note_ever_points_at_a_missing_entity() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();

    let mut categories = Vec::new();
    let mut tags = Vec::new();
    {
        let mut labels = LabelService::new(&mut context);
        for index in 0..3 {
            categories.push(labels.create_category(&format!("c{index}"), None).unwrap());
            tags.push(labels.create_tag(&format!("t{index}")).unwrap());
        }
    }
    for index in 0..9 {
        let mut notes = NoteService::new(&mut context);
        let note_id = notes.create_note(&format!("note {index}"), None).unwrap();
        notes
            .assign_category(note_id, Some(categories[index % 3]))
            .unwrap();
        notes.toggle_tag(note_id, tags[index % 3]).unwrap();
        notes.toggle_tag(note_id, tags[(index + 1) % 3]).unwrap();
    }
    context.save().unwrap();

    {
        let mut labels = LabelService::new(&mut context);
        labels.delete_category(categories[0]).unwrap();
        labels.delete_tag(tags[1]).unwrap();
    }
    context.save().unwrap();
    LabelService::new(&mut context).delete_category(categories[2]).unwrap();
    context.save().unwrap();

    let live_categories: HashSet<_> = [categories[1]].into_iter().collect();
    let live_tags: HashSet<_> = [tags[0], tags[2]].into_iter().collect();
    for note in store
        .fetch(&FetchRequest::<Note>::ascending(NoteSortKey::Title))
        .unwrap()
    {
        if let Some(category) = note.category {
            assert!(live_categories.contains(&category));
        }
        assert!(note.tags.iter().all(|tag| live_tags.contains(tag)));
    }
}

#[test]
fn pending_edit_survives_label_deleted_by_another_context() {
    let store = Store::open_in_memory().unwrap();
    let mut setup = store.new_context();
    let (work, urgent, later) = {
        let mut labels = LabelService::new(&mut setup);
        (
            labels.create_category("Work", None).unwrap(),
            labels.create_tag("urgent").unwrap(),
            labels.create_tag("later").unwrap(),
        )
    };
    let note_id = {
        let mut notes = NoteService::new(&mut setup);
        let note_id = notes.create_note("Draft", None).unwrap();
        notes.assign_category(note_id, Some(work)).unwrap();
        notes.toggle_tag(note_id, urgent).unwrap();
        notes.toggle_tag(note_id, later).unwrap();
        note_id
    };
    setup.save().unwrap();

    store.default_context().edit::<Note>(note_id).unwrap().title = "Final".to_string();

    let mut other = store.new_context();
    {
        let mut labels = LabelService::new(&mut other);
        labels.delete_category(work).unwrap();
        labels.delete_tag(urgent).unwrap();
    }
    other.save().unwrap();

    assert!(store.flush_on_terminate());
    assert!(!store.default_context().has_changes());

    let note = store.new_context().get::<Note>(note_id).unwrap().unwrap();
    assert_eq!(note.title, "Final");
    assert_eq!(note.category, None);
    assert!(!note.has_tag(urgent));
    assert!(note.has_tag(later));
}

#[test]
fn label_assigned_in_context_and_deleted_elsewhere_is_rejected() {
    let store = Store::open_in_memory().unwrap();
    let mut setup = store.new_context();
    let home = LabelService::new(&mut setup)
        .create_category("Home", None)
        .unwrap();
    let note_id = NoteService::new(&mut setup)
        .create_note("Paint fence", None)
        .unwrap();
    setup.save().unwrap();

    let mut editor = store.new_context();
    NoteService::new(&mut editor)
        .assign_category(note_id, Some(home))
        .unwrap();

    let mut other = store.new_context();
    LabelService::new(&mut other).delete_category(home).unwrap();
    other.save().unwrap();

    let err = editor.save().unwrap_err();
    assert!(matches!(
        err,
        StoreError::ValidationFailed(ValidationError::UnknownCategory(id)) if id == home
    ));
    assert!(editor.has_changes());
}
