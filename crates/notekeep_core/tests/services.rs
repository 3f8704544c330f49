use notekeep_core::service::{NO_CATEGORY_LABEL, NO_TAGS_LABEL};
use notekeep_core::{
    Category, EntityRef, LabelService, Note, NoteService, Record, Rgb, Store, StoreError,
    ValidationError,
};

#[test]
fn create_note_requires_a_title() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();
    let mut notes = NoteService::new(&mut context);

    let err = notes.create_note("   ", Some("body")).unwrap_err();
    assert!(matches!(
        err,
        StoreError::ValidationFailed(ValidationError::EmptyTitle)
    ));

    let note_id = notes.create_note("  Trimmed  ", Some("")).unwrap();
    let note = notes.get_note(note_id).unwrap();
    assert_eq!(note.title, "Trimmed");
    assert_eq!(note.contents, None);
    assert!(context.has_changes());
}

#[test]
fn update_with_blank_title_keeps_previous_title() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();
    let note_id = NoteService::new(&mut context)
        .create_note("Keep me", Some("v1"))
        .unwrap();
    context.save().unwrap();

    NoteService::new(&mut context)
        .update_note(note_id, "", Some("v2"))
        .unwrap();
    context.save().unwrap();

    let note = context.get::<Note>(note_id).unwrap().unwrap();
    assert_eq!(note.title, "Keep me");
    assert_eq!(note.contents.as_deref(), Some("v2"));
}

#[test]
fn labels_describe_tags_and_category() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();
    let (errands, beta, alpha) = {
        let mut labels = LabelService::new(&mut context);
        (
            labels.create_category("Errands", None).unwrap(),
            labels.create_tag("beta").unwrap(),
            labels.create_tag("Alpha").unwrap(),
        )
    };

    let mut notes = NoteService::new(&mut context);
    let note_id = notes.create_note("Shopping", None).unwrap();
    assert_eq!(notes.tags_label(note_id).unwrap(), NO_TAGS_LABEL);
    assert_eq!(notes.category_label(note_id).unwrap(), NO_CATEGORY_LABEL);

    assert!(notes.toggle_tag(note_id, beta).unwrap());
    assert!(notes.toggle_tag(note_id, alpha).unwrap());
    notes.assign_category(note_id, Some(errands)).unwrap();
    assert_eq!(notes.tags_label(note_id).unwrap(), "Alpha, beta");
    assert_eq!(notes.category_label(note_id).unwrap(), "Errands");

    assert!(!notes.toggle_tag(note_id, beta).unwrap());
    assert_eq!(notes.tags_label(note_id).unwrap(), "Alpha");
    context.save().unwrap();
}

#[test]
fn references_to_unknown_labels_are_not_found() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();
    let mut notes = NoteService::new(&mut context);
    let note_id = notes.create_note("Lonely", None).unwrap();
    let missing = uuid::Uuid::new_v4();

    assert!(matches!(
        notes.toggle_tag(note_id, missing),
        Err(StoreError::NotFound(entity)) if entity == EntityRef::tag(missing)
    ));
    assert!(matches!(
        notes.assign_category(note_id, Some(missing)),
        Err(StoreError::NotFound(entity)) if entity == EntityRef::category(missing)
    ));
}

#[test]
fn categories_can_be_renamed_and_recolored() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();
    let mut labels = LabelService::new(&mut context);
    let category_id = labels
        .create_category("Personal", Some(Rgb::new(0x12, 0x34, 0x56)))
        .unwrap();

    assert!(!labels.rename_category(category_id, "  ").unwrap());
    assert!(labels.rename_category(category_id, "Private").unwrap());
    context.save().unwrap();

    let category = context.get::<Category>(category_id).unwrap().unwrap();
    assert_eq!(category.name, "Private");
    assert_eq!(category.color_hex.as_deref(), Some("#123456"));

    LabelService::new(&mut context)
        .set_category_color(category_id, None)
        .unwrap();
    context.save().unwrap();
    let category = context.get::<Category>(category_id).unwrap().unwrap();
    assert_eq!(category.color(), None);
    assert_eq!(category.display_color(), Rgb::DEFAULT_ACCENT);
}

#[test]
fn duplicate_names_are_distinct_entities() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();
    let mut labels = LabelService::new(&mut context);
    let first = labels.create_tag("todo").unwrap();
    let second = labels.create_tag("todo").unwrap();
    context.save().unwrap();

    assert_ne!(first, second);
    assert!(context.get::<notekeep_core::Tag>(first).unwrap().is_some());
    assert!(context.get::<notekeep_core::Tag>(second).unwrap().is_some());
}

#[test]
fn notes_in_category_lists_committed_members() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();
    let travel = LabelService::new(&mut context)
        .create_category("Travel", None)
        .unwrap();
    {
        let mut notes = NoteService::new(&mut context);
        let packing = notes.create_note("Packing list", None).unwrap();
        notes.assign_category(packing, Some(travel)).unwrap();
        notes.create_note("Unfiled", None).unwrap();
    }
    assert!(LabelService::new(&mut context)
        .notes_in_category(travel)
        .unwrap()
        .is_empty());

    context.save().unwrap();
    let members = LabelService::new(&mut context)
        .notes_in_category(travel)
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].title, "Packing list");
}

#[test]
fn deleted_note_disappears_and_records_serialize_with_kind() {
    let store = Store::open_in_memory().unwrap();
    let mut context = store.new_context();
    let note_id = NoteService::new(&mut context)
        .create_note("Serialized", Some("body"))
        .unwrap();
    context.save().unwrap();

    let note = context.get::<Note>(note_id).unwrap().unwrap();
    let value = serde_json::to_value(Record::Note(note.clone())).unwrap();
    assert_eq!(value["kind"], "note");
    assert_eq!(value["title"], "Serialized");
    let decoded: Record = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, Record::Note(note));

    NoteService::new(&mut context).delete_note(note_id).unwrap();
    context.save().unwrap();
    assert!(context.get::<Note>(note_id).unwrap().is_none());
}
