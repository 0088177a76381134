//! Tests for Repository
//!
//! These tests verify:
//! - The create/find/delete scenario with monotonic ids
//! - One live handle per (type, id) across find, find_one_by and find_all
//! - Create versus update on persist
//! - Rejection of writes that break a unique constraint or exhaust the id space
//! - Lifecycle hooks and timestamps
//! - Typed values surviving a reopen, including empty strings and absence
//! - Session isolation

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use xmlstore::metadata::{Declaration, Entity, EntityId, PropertyDescriptor};
use xmlstore::{entity_ref, EntityRef, EntityState, ErrorKind, Repository, Session, StoreError};

use common::{read_file, setup_data_dir, test_config, widget_document, write_file, Color, Gadget, Widget};

// =============================================================================
// Helper Functions
// =============================================================================

fn open<E: Entity>(data_dir: &std::path::Path, session: &mut Session) -> Repository<E> {
    Repository::<E>::open(&test_config(data_dir), session).unwrap()
}

fn persist_widget(
    repo: &mut Repository<Widget>,
    session: &mut Session,
    name: &str,
    age: Option<i64>,
) -> EntityRef<Widget> {
    let widget = entity_ref(Widget::new(name, age));
    repo.persist(session, &widget).unwrap();
    widget
}

fn persist_error<E: Entity>(repo: &mut Repository<E>, session: &mut Session, entity: &EntityRef<E>) -> StoreError {
    match repo.persist(session, entity) {
        Ok(_) => panic!("persist should fail"),
        Err(e) => e,
    }
}

// =============================================================================
// End-to-End Tests
// =============================================================================

#[test]
fn test_create_find_delete_scenario() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);

    let a = persist_widget(&mut widgets, &mut session, "A", None);
    assert_eq!(a.read().id(), Some(1));
    assert_eq!(widgets.count(), 1);
    assert!(read_file(temp_dir.path(), "widget.xml").contains(r#"<age xsi:nil="true"/>"#));

    let found = widgets.find(&mut session, 1).unwrap().unwrap();
    assert_eq!(found.read().age, None);
    assert_eq!(found.read().name, "A");

    assert!(widgets.delete(&mut session, &found).unwrap());
    assert!(widgets.find(&mut session, 1).unwrap().is_none());

    let b = persist_widget(&mut widgets, &mut session, "B", None);
    assert_eq!(b.read().id(), Some(2));
}

#[test]
fn test_ids_continue_from_existing_rows() {
    let temp_dir = setup_data_dir();
    {
        let mut session = Session::new();
        let mut widgets = open::<Widget>(temp_dir.path(), &mut session);
        for name in ["A", "B", "C"] {
            persist_widget(&mut widgets, &mut session, name, None);
        }
    }

    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);
    let d = persist_widget(&mut widgets, &mut session, "D", None);
    assert_eq!(d.read().id(), Some(4));
}

// =============================================================================
// Identity Tests
// =============================================================================

#[test]
fn test_find_returns_persisted_handle() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);

    let a = persist_widget(&mut widgets, &mut session, "A", Some(3));
    let found = widgets.find(&mut session, 1).unwrap().unwrap();

    assert!(Arc::ptr_eq(&a, &found));
}

#[test]
fn test_identity_uniqueness_across_lookups() {
    let temp_dir = setup_data_dir();
    {
        let mut session = Session::new();
        let mut widgets = open::<Widget>(temp_dir.path(), &mut session);
        persist_widget(&mut widgets, &mut session, "A", None);
        persist_widget(&mut widgets, &mut session, "B", Some(2));
    }

    let mut session = Session::new();
    let widgets = open::<Widget>(temp_dir.path(), &mut session);

    let by_id = widgets.find(&mut session, 2).unwrap().unwrap();
    let again = widgets.find(&mut session, 2).unwrap().unwrap();
    let by_name = widgets.find_one_by(&mut session, &[("name", "B")]).unwrap().unwrap();
    let all = widgets.find_all(&mut session).unwrap();

    assert!(Arc::ptr_eq(&by_id, &again));
    assert!(Arc::ptr_eq(&by_id, &by_name));
    assert_eq!(all.len(), 2);
    assert!(Arc::ptr_eq(&by_id, &all[1]));
    assert_eq!(all[0].read().name, "A");

    assert_eq!(session.identity().state(&by_id), Some(EntityState::Persisted));
    assert_eq!(session.identity().attached_count::<Widget>(), 2);
}

#[test]
fn test_lookups_without_match() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);
    persist_widget(&mut widgets, &mut session, "A", None);

    assert!(widgets.find(&mut session, 42).unwrap().is_none());
    assert!(widgets.find_one_by(&mut session, &[("name", "Z")]).unwrap().is_none());
}

#[test]
fn test_second_instance_with_attached_id_rejected() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);
    persist_widget(&mut widgets, &mut session, "A", None);

    let mut impostor = Widget::new("impostor", None);
    impostor.id.assign("Widget", 1).unwrap();
    let impostor = entity_ref(impostor);

    let err = persist_error(&mut widgets, &mut session, &impostor);
    assert!(matches!(err, StoreError::EntityAlreadyAttached { id: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::Identity);
    assert_eq!(widgets.find(&mut session, 1).unwrap().unwrap().read().name, "A");
}

#[test]
fn test_sessions_are_isolated() {
    let temp_dir = setup_data_dir();
    let mut first = Session::new();
    let mut second = Session::new();

    let mut widgets = open::<Widget>(temp_dir.path(), &mut first);
    let a = persist_widget(&mut widgets, &mut first, "A", None);

    let other = open::<Widget>(temp_dir.path(), &mut second);
    let found = other.find(&mut second, 1).unwrap().unwrap();

    assert!(!Arc::ptr_eq(&a, &found));
    assert!(second.identity().get_by_id::<Widget>(1).is_some());
    assert!(first.introspector().is_cached::<Widget>());
}

#[test]
fn test_session_clear_drops_identity_map() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);
    let a = persist_widget(&mut widgets, &mut session, "A", None);

    session.clear();

    let found = widgets.find(&mut session, 1).unwrap().unwrap();
    assert!(!Arc::ptr_eq(&a, &found));
    assert!(session.introspector().is_cached::<Widget>());
}

// =============================================================================
// Persist Tests
// =============================================================================

#[test]
fn test_persist_existing_entity_updates_row() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);

    let a = persist_widget(&mut widgets, &mut session, "A", None);
    a.write().name = "Renamed".to_string();
    a.write().age = Some(40);
    let returned = widgets.persist(&mut session, &a).unwrap();

    assert!(Arc::ptr_eq(&a, &returned));
    assert_eq!(widgets.count(), 1);
    assert_eq!(a.read().id(), Some(1));

    let mut fresh = Session::new();
    let reopened = open::<Widget>(temp_dir.path(), &mut fresh);
    let found = reopened.find(&mut fresh, 1).unwrap().unwrap();
    assert_eq!(found.read().name, "Renamed");
    assert_eq!(found.read().age, Some(40));
}

#[test]
fn test_persist_loaded_entity_updates_row() {
    let temp_dir = setup_data_dir();
    {
        let mut session = Session::new();
        let mut widgets = open::<Widget>(temp_dir.path(), &mut session);
        persist_widget(&mut widgets, &mut session, "A", None);
    }

    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);
    let found = widgets.find(&mut session, 1).unwrap().unwrap();
    found.write().age = Some(7);
    widgets.persist(&mut session, &found).unwrap();

    assert_eq!(widgets.count(), 1);
    assert_eq!(widgets.store().find_by_id(1).unwrap().value("age"), Some("7"));
}

#[test]
fn test_persist_marks_entity_persisted() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);

    let a = persist_widget(&mut widgets, &mut session, "A", None);
    assert!(session.identity().is_persisted(&a));
}

#[test]
fn test_persist_nullability_mismatch() {
    #[derive(Default)]
    struct Misdeclared {
        id: EntityId,
        name: String,
    }

    impl Entity for Misdeclared {
        const NAME: &'static str = "Misdeclared";

        fn declare(decl: &mut Declaration<Self>) {
            decl.property("name")
                .descriptor(PropertyDescriptor::string().nullable())
                .field(|e| &e.name, |e| &mut e.name);
        }

        fn entity_id(&self) -> &EntityId {
            &self.id
        }

        fn entity_id_mut(&mut self) -> &mut EntityId {
            &mut self.id
        }
    }

    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut repo = open::<Misdeclared>(temp_dir.path(), &mut session);

    let entity = entity_ref(Misdeclared::default());
    let err = persist_error(&mut repo, &mut session, &entity);

    assert!(matches!(err, StoreError::NullabilityMismatch { declared: true, runtime: false }));
    assert_eq!(repo.count(), 0);
}

#[test]
fn test_persist_duplicate_unique_value_rejected() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut gadgets = open::<Gadget>(temp_dir.path(), &mut session);

    gadgets.persist(&mut session, &entity_ref(Gadget::new("same"))).unwrap();
    let before = read_file(temp_dir.path(), "gadget.xml");

    let duplicate = entity_ref(Gadget::new("same"));
    let err = persist_error(&mut gadgets, &mut session, &duplicate);

    assert_eq!(err.kind(), ErrorKind::Validation);
    match err {
        StoreError::InvalidDocument { document, violations } => {
            assert_eq!(document, "gadget.xml");
            assert_eq!(violations.len(), 1);
            assert!(violations[0].contains("unique_label"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(gadgets.count(), 1);
    assert_eq!(read_file(temp_dir.path(), "gadget.xml"), before);

    let mut reopened = Session::new();
    let gadgets = open::<Gadget>(temp_dir.path(), &mut reopened);
    assert_eq!(gadgets.count(), 1);
}

#[test]
fn test_update_to_duplicate_unique_value_rejected() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut gadgets = open::<Gadget>(temp_dir.path(), &mut session);

    gadgets.persist(&mut session, &entity_ref(Gadget::new("one"))).unwrap();
    let two = entity_ref(Gadget::new("two"));
    gadgets.persist(&mut session, &two).unwrap();

    two.write().label = "one".to_string();
    let err = persist_error(&mut gadgets, &mut session, &two);

    assert!(matches!(err, StoreError::InvalidDocument { .. }));
    assert_eq!(gadgets.store().find_by_id(2).unwrap().value("label"), Some("two"));
    assert!(read_file(temp_dir.path(), "gadget.xml").contains("<label>two</label>"));

    two.write().label = "three".to_string();
    gadgets.persist(&mut session, &two).unwrap();
    assert_eq!(gadgets.store().find_by_id(2).unwrap().value("label"), Some("three"));
}

#[test]
fn test_persist_with_exhausted_id_space() {
    let temp_dir = setup_data_dir();
    write_file(temp_dir.path(), "widget.xml", &widget_document(&[(i64::MAX, "A", None)]));

    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);

    let widget = entity_ref(Widget::new("B", None));
    let err = persist_error(&mut widgets, &mut session, &widget);

    assert!(matches!(err, StoreError::IdSpaceExhausted { .. }));
    assert_eq!(err.kind(), ErrorKind::Identity);
    assert_eq!(widget.read().id(), None);
    assert_eq!(widgets.count(), 1);
}

// =============================================================================
// Hook and Timestamp Tests
// =============================================================================

#[test]
fn test_persist_runs_before_persist_hooks() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut gadgets = open::<Gadget>(temp_dir.path(), &mut session);

    let gadget = entity_ref(Gadget::new("g"));
    gadgets.persist(&mut session, &gadget).unwrap();

    let guard = gadget.read();
    assert_eq!(guard.hook_log, vec!["recordPersist:beforePersist", "recordAny:beforePersist"]);
    let updated = guard.timestamps.updated_at.unwrap();
    assert!(updated >= guard.timestamps.created_at);
}

#[test]
fn test_delete_runs_before_delete_hooks() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut gadgets = open::<Gadget>(temp_dir.path(), &mut session);

    let gadget = entity_ref(Gadget::new("g"));
    gadgets.persist(&mut session, &gadget).unwrap();
    gadget.write().hook_log.clear();

    assert!(gadgets.delete(&mut session, &gadget).unwrap());
    assert_eq!(
        gadget.read().hook_log,
        vec!["recordDelete:beforeDelete", "recordAny:beforeDelete"]
    );
    assert_eq!(session.identity().state(&gadget), Some(EntityState::Detached));
    assert_eq!(gadgets.count(), 0);
}

#[test]
fn test_delete_unsaved_entity() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut gadgets = open::<Gadget>(temp_dir.path(), &mut session);

    let gadget = entity_ref(Gadget::new("never stored"));

    assert!(!gadgets.delete(&mut session, &gadget).unwrap());
    assert_eq!(gadget.read().hook_log.len(), 2);
    assert_eq!(gadget.read().id(), None);
}

#[test]
fn test_delete_twice() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);
    let a = persist_widget(&mut widgets, &mut session, "A", None);

    assert!(widgets.delete(&mut session, &a).unwrap());
    assert!(!widgets.delete(&mut session, &a).unwrap());
}

// =============================================================================
// Typed Value Tests
// =============================================================================

#[test]
fn test_typed_values_survive_reopen() {
    let temp_dir = setup_data_dir();
    let released = Utc.with_ymd_and_hms(2023, 11, 2, 8, 30, 15).unwrap();

    let (created_at, updated_at) = {
        let mut session = Session::new();
        let mut gadgets = open::<Gadget>(temp_dir.path(), &mut session);

        let mut gadget = Gadget::new("lamp");
        gadget.active = true;
        gadget.color = Color::Blue;
        gadget.released = Some(released);
        gadget.note = Some("a < b & c".to_string());
        let gadget = entity_ref(gadget);
        gadgets.persist(&mut session, &gadget).unwrap();

        let guard = gadget.read();
        (guard.timestamps.created_at, guard.timestamps.updated_at)
    };

    let mut session = Session::new();
    let gadgets = open::<Gadget>(temp_dir.path(), &mut session);
    let found = gadgets.find_one_by(&mut session, &[("label", "lamp")]).unwrap().unwrap();
    let found = found.read();

    assert_eq!(found.id(), Some(1));
    assert!(found.active);
    assert_eq!(found.color, Color::Blue);
    assert_eq!(found.released, Some(released));
    assert_eq!(found.note.as_deref(), Some("a < b & c"));
    assert_eq!(found.timestamps.created_at, created_at);
    assert_eq!(found.timestamps.updated_at, updated_at);
    assert!(found.hook_log.is_empty());
}

#[test]
fn test_empty_string_and_absence_stay_distinct() {
    let temp_dir = setup_data_dir();
    {
        let mut session = Session::new();
        let mut gadgets = open::<Gadget>(temp_dir.path(), &mut session);

        let mut empty = Gadget::new("empty");
        empty.note = Some(String::new());
        gadgets.persist(&mut session, &entity_ref(empty)).unwrap();

        let absent = Gadget::new("absent");
        gadgets.persist(&mut session, &entity_ref(absent)).unwrap();
    }

    let mut session = Session::new();
    let gadgets = open::<Gadget>(temp_dir.path(), &mut session);

    let empty = gadgets.find(&mut session, 1).unwrap().unwrap();
    let absent = gadgets.find(&mut session, 2).unwrap().unwrap();
    assert_eq!(empty.read().note, Some(String::new()));
    assert_eq!(absent.read().note, None);
    assert_eq!(absent.read().released, None);
}

#[test]
fn test_find_by_enum_and_boolean_text() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut gadgets = open::<Gadget>(temp_dir.path(), &mut session);

    let mut off = Gadget::new("off");
    off.color = Color::Red;
    gadgets.persist(&mut session, &entity_ref(off)).unwrap();

    let mut on = Gadget::new("on");
    on.active = true;
    on.color = Color::Blue;
    let on = entity_ref(on);
    gadgets.persist(&mut session, &on).unwrap();

    let found = gadgets
        .find_one_by(&mut session, &[("active", "true"), ("color", "blue")])
        .unwrap()
        .unwrap();
    assert!(Arc::ptr_eq(&found, &on));
}

#[test]
fn test_find_all_in_document_order() {
    let temp_dir = setup_data_dir();
    let mut session = Session::new();
    let mut widgets = open::<Widget>(temp_dir.path(), &mut session);

    for (name, age) in [("A", Some(1)), ("B", None), ("C", Some(3))] {
        persist_widget(&mut widgets, &mut session, name, age);
    }

    let mut fresh = Session::new();
    let reopened = open::<Widget>(temp_dir.path(), &mut fresh);
    let all = reopened.find_all(&mut fresh).unwrap();

    let names: Vec<String> = all.iter().map(|w| w.read().name.clone()).collect();
    let ages: Vec<Option<i64>> = all.iter().map(|w| w.read().age).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(ages, vec![Some(1), None, Some(3)]);
}
