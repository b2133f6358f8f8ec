use serde_json::json;
use std::cell::Cell;
use tripplan_core::db::open_db_in_memory;
use tripplan_core::{
    AppliedChange, ChangeSet, EditService, PlaceColumn, PlaceFilter, PlaceRecord, PlaceStore,
    ReconcileError, SqlitePlaceStore, StoreResult, Weekday,
};

fn seeded_store(conn: &rusqlite::Connection) -> SqlitePlaceStore<'_> {
    let store = SqlitePlaceStore::try_new(conn).unwrap();
    let places: Vec<PlaceRecord> = ["a", "b", "c"]
        .into_iter()
        .map(|id| {
            let mut record = PlaceRecord::new(id, format!("place {id}"));
            record.is_active = true;
            record
        })
        .collect();
    store.replace_all(&places).unwrap();
    store
}

struct CountingStore<S> {
    inner: S,
    reads: Cell<usize>,
    writes: Cell<usize>,
}

impl<S: PlaceStore> PlaceStore for CountingStore<S> {
    fn load_all(&self) -> StoreResult<Vec<PlaceRecord>> {
        self.reads.set(self.reads.get() + 1);
        self.inner.load_all()
    }

    fn replace_all(&self, records: &[PlaceRecord]) -> StoreResult<()> {
        self.writes.set(self.writes.get() + 1);
        self.inner.replace_all(records)
    }

    fn select_where(&self, filter: &PlaceFilter) -> StoreResult<Vec<PlaceRecord>> {
        self.reads.set(self.reads.get() + 1);
        self.inner.select_where(filter)
    }
}

#[test]
fn single_field_edit_is_persisted() {
    let conn = open_db_in_memory().unwrap();
    let store = seeded_store(&conn);
    let before = store.load_all().unwrap();

    let outcome = EditService::new(&store)
        .reconcile(&ChangeSet::default().edit(1, "day", json!("Tuesday")))
        .unwrap();

    assert_eq!(
        outcome.applied,
        Some(AppliedChange::Edited {
            row: 1,
            place_id: "b".to_string(),
            column: PlaceColumn::Day,
            value: json!("Tuesday"),
        })
    );
    assert!(outcome.remaining.is_empty());

    let after = store.load_all().unwrap();
    assert_eq!(after[1].day, Some(Weekday::Tuesday));
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
}

#[test]
fn only_lowest_row_first_column_is_applied_per_cycle() {
    let conn = open_db_in_memory().unwrap();
    let store = seeded_store(&conn);
    let service = EditService::new(&store);

    let changes: ChangeSet = serde_json::from_value(json!({
        "edited_rows": {
            "2": {"category": "hotel"},
            "0": {"trip_order": 5, "day": "Friday"}
        },
        "deleted_rows": []
    }))
    .unwrap();

    let first = service.reconcile(&changes).unwrap();
    let places = store.load_all().unwrap();
    assert_eq!(places[0].trip_order, 5);
    assert_eq!(places[0].day, None);
    assert_eq!(places[2].category, "");

    let second = service.reconcile(&first.remaining).unwrap();
    let places = store.load_all().unwrap();
    assert_eq!(places[0].day, Some(Weekday::Friday));
    assert_eq!(places[2].category, "");

    let third = service.reconcile(&second.remaining).unwrap();
    let places = store.load_all().unwrap();
    assert_eq!(places[2].category, "hotel");
    assert!(third.remaining.is_empty());
}

#[test]
fn deleting_row_removes_exactly_that_record() {
    let conn = open_db_in_memory().unwrap();
    let store = seeded_store(&conn);
    let before = store.load_all().unwrap();

    let outcome = EditService::new(&store)
        .reconcile(&ChangeSet::default().delete(1))
        .unwrap();

    assert_eq!(
        outcome.applied,
        Some(AppliedChange::Deleted {
            row: 1,
            place_id: "b".to_string(),
        })
    );
    assert_eq!(store.load_all().unwrap(), vec![before[0].clone(), before[2].clone()]);
}

#[test]
fn edits_take_precedence_over_deletions() {
    let conn = open_db_in_memory().unwrap();
    let store = seeded_store(&conn);
    let service = EditService::new(&store);
    let changes = ChangeSet::default()
        .delete(0)
        .edit(2, "is_active", json!(false));

    let first = service.reconcile(&changes).unwrap();
    assert!(matches!(first.applied, Some(AppliedChange::Edited { row: 2, .. })));
    assert_eq!(store.load_all().unwrap().len(), 3);

    let second = service.reconcile(&first.remaining).unwrap();
    assert!(matches!(second.applied, Some(AppliedChange::Deleted { row: 0, .. })));
    let places = store.load_all().unwrap();
    assert_eq!(places.len(), 2);
    assert_eq!(places[1].place_id, "c");
    assert!(!places[1].is_active);
}

#[test]
fn out_of_range_row_is_rejected_without_mutation() {
    let conn = open_db_in_memory().unwrap();
    let store = seeded_store(&conn);
    let before = store.load_all().unwrap();
    let service = EditService::new(&store);

    let err = service
        .reconcile(&ChangeSet::default().edit(3, "day", json!("Monday")))
        .unwrap_err();
    assert!(matches!(err, ReconcileError::RowOutOfRange { row: 3, len: 3 }));

    let err = service
        .reconcile(&ChangeSet::default().delete(9))
        .unwrap_err();
    assert!(matches!(err, ReconcileError::RowOutOfRange { row: 9, len: 3 }));

    assert_eq!(store.load_all().unwrap(), before);
}

#[test]
fn invalid_value_is_rejected_without_mutation() {
    let conn = open_db_in_memory().unwrap();
    let store = seeded_store(&conn);
    let before = store.load_all().unwrap();

    let err = EditService::new(&store)
        .reconcile(&ChangeSet::default().edit(0, "is_active", json!("yes")))
        .unwrap_err();

    match err {
        ReconcileError::InvalidChange { row, column, .. } => {
            assert_eq!(row, 0);
            assert_eq!(column, "is_active");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.load_all().unwrap(), before);
}

#[test]
fn empty_change_set_leaves_store_untouched() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore {
        inner: seeded_store(&conn),
        reads: Cell::new(0),
        writes: Cell::new(0),
    };

    let empty: ChangeSet = serde_json::from_value(json!({
        "edited_rows": {"1": {}},
        "deleted_rows": []
    }))
    .unwrap();
    let outcome = EditService::new(&store).reconcile(&empty).unwrap();

    assert_eq!(outcome.applied, None);
    assert_eq!(store.reads.get(), 0);
    assert_eq!(store.writes.get(), 0);
}

#[test]
fn reconcile_all_commits_one_change_per_cycle() {
    let conn = open_db_in_memory().unwrap();
    let store = CountingStore {
        inner: seeded_store(&conn),
        reads: Cell::new(0),
        writes: Cell::new(0),
    };

    let changes = ChangeSet::default()
        .edit(0, "day", json!("Monday"))
        .edit(0, "category", json!("restaurant"))
        .edit(2, "trip_order", json!(2))
        .delete(1);
    let applied = EditService::new(&store).reconcile_all(&changes).unwrap();

    assert_eq!(applied.len(), 4);
    assert_eq!(store.writes.get(), 4);

    let places = store.inner.load_all().unwrap();
    assert_eq!(places.len(), 2);
    assert_eq!(places[0].day, Some(Weekday::Monday));
    assert_eq!(places[0].category, "restaurant");
    assert_eq!(places[1].place_id, "c");
    assert_eq!(places[1].trip_order, 2);
}

#[test]
fn clearing_day_and_category_with_null_unschedules() {
    let conn = open_db_in_memory().unwrap();
    let store = seeded_store(&conn);
    let service = EditService::new(&store);

    service
        .reconcile_all(
            &ChangeSet::default()
                .edit(0, "day", json!("Sunday"))
                .edit(0, "category", json!("bakery")),
        )
        .unwrap();
    let places = store.load_all().unwrap();
    assert_eq!(places[0].day, Some(Weekday::Sunday));
    assert_eq!(places[0].category, "bakery");

    service
        .reconcile_all(
            &ChangeSet::default()
                .edit(0, "day", json!(null))
                .edit(0, "category", json!(null)),
        )
        .unwrap();
    let places = store.load_all().unwrap();
    assert_eq!(places[0].day, None);
    assert_eq!(places[0].category, "");
}
