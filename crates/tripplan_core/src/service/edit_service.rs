//! Edit reconciler for table-style change sets.
//!
//! # Responsibility
//! - Apply one pending user change (cell edit or row deletion) per cycle to
//!   the current ordered record view.
//! - Write the resulting snapshot back through `replace_all`.
//! - Hand back the still-pending changes re-aligned to the new row order.
//!
//! # Invariants
//! - Per cycle: the lowest edited row's first column wins; deletions are
//!   taken only when no edit is pending, first listed row first.
//! - Invalid changes and store failures leave the store unchanged.
//! - `place_id`, `name`, `address`, `lat` and `lon` are read-only.

use crate::model::place::{PlaceId, PlaceRecord, Weekday};
use crate::repo::place_repo::{PlaceStore, StoreError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Columns of the editable place table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceColumn {
    Name,
    Address,
    IsActive,
    Day,
    TripOrder,
    Category,
    PlaceId,
    Lat,
    Lon,
}

impl PlaceColumn {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "address" => Some(Self::Address),
            "is_active" => Some(Self::IsActive),
            "day" => Some(Self::Day),
            "trip_order" => Some(Self::TripOrder),
            "category" => Some(Self::Category),
            "place_id" => Some(Self::PlaceId),
            "lat" => Some(Self::Lat),
            "lon" => Some(Self::Lon),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::IsActive => "is_active",
            Self::Day => "day",
            Self::TripOrder => "trip_order",
            Self::Category => "category",
            Self::PlaceId => "place_id",
            Self::Lat => "lat",
            Self::Lon => "lon",
        }
    }
}

/// Sparse description of pending table edits, keyed by row position.
///
/// Deserializes from the editor payload shape
/// `{"edited_rows": {"0": {"day": "Monday"}}, "deleted_rows": [2]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub edited_rows: BTreeMap<usize, Map<String, Value>>,
    #[serde(default)]
    pub deleted_rows: Vec<usize>,
}

impl ChangeSet {
    pub fn edit(mut self, row: usize, column: &str, value: Value) -> Self {
        self.edited_rows
            .entry(row)
            .or_default()
            .insert(column.to_string(), value);
        self
    }

    pub fn delete(mut self, row: usize) -> Self {
        self.deleted_rows.push(row);
        self
    }

    /// Returns whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.deleted_rows.is_empty() && self.edited_rows.values().all(Map::is_empty)
    }

    fn next_edit(&self) -> Option<(usize, &str, &Value)> {
        self.edited_rows.iter().find_map(|(row, columns)| {
            columns
                .iter()
                .next()
                .map(|(column, value)| (*row, column.as_str(), value))
        })
    }

    fn without_edit(&self, row: usize) -> Self {
        let mut remaining = self.clone();
        if let Some(columns) = remaining.edited_rows.remove(&row) {
            let rest: Map<String, Value> = columns.into_iter().skip(1).collect();
            if !rest.is_empty() {
                remaining.edited_rows.insert(row, rest);
            }
        }
        remaining
    }

    fn after_deletion(&self, removed: usize) -> Self {
        let shift = |row: usize| if row > removed { row - 1 } else { row };
        Self {
            edited_rows: self
                .edited_rows
                .iter()
                .filter(|(row, _)| **row != removed)
                .map(|(row, columns)| (shift(*row), columns.clone()))
                .collect(),
            deleted_rows: self
                .deleted_rows
                .iter()
                .skip(1)
                .filter(|row| **row != removed)
                .map(|row| shift(*row))
                .collect(),
        }
    }
}

/// The single change committed by one reconciliation cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AppliedChange {
    Edited {
        row: usize,
        place_id: PlaceId,
        column: PlaceColumn,
        value: Value,
    },
    Deleted {
        row: usize,
        place_id: PlaceId,
    },
}

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconcileOutcome {
    /// `None` when the change set was empty.
    pub applied: Option<AppliedChange>,
    /// Changes still pending, aligned to the post-change row order.
    pub remaining: ChangeSet,
}

#[derive(Debug)]
pub enum ReconcileError {
    RowOutOfRange {
        row: usize,
        len: usize,
    },
    InvalidChange {
        row: usize,
        column: String,
        message: String,
    },
    Store(StoreError),
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RowOutOfRange { row, len } => {
                write!(f, "row {row} is out of range for {len} places")
            }
            Self::InvalidChange {
                row,
                column,
                message,
            } => write!(f, "invalid change at row {row} column `{column}`: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ReconcileError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Applies the next pending change in `changes` to `records`.
///
/// `records` is only mutated when the change is valid.
pub fn apply_next_change(
    records: &mut Vec<PlaceRecord>,
    changes: &ChangeSet,
) -> Result<ReconcileOutcome, ReconcileError> {
    if let Some((row, column, value)) = changes.next_edit() {
        let current = records.get(row).ok_or(ReconcileError::RowOutOfRange {
            row,
            len: records.len(),
        })?;
        let mut updated = current.clone();
        let column = apply_cell(&mut updated, row, column, value)?;
        let place_id = updated.place_id.clone();
        records[row] = updated;

        return Ok(ReconcileOutcome {
            applied: Some(AppliedChange::Edited {
                row,
                place_id,
                column,
                value: value.clone(),
            }),
            remaining: changes.without_edit(row),
        });
    }

    if let Some(&row) = changes.deleted_rows.first() {
        if row >= records.len() {
            return Err(ReconcileError::RowOutOfRange {
                row,
                len: records.len(),
            });
        }
        let removed = records.remove(row);

        return Ok(ReconcileOutcome {
            applied: Some(AppliedChange::Deleted {
                row,
                place_id: removed.place_id,
            }),
            remaining: changes.after_deletion(row),
        });
    }

    Ok(ReconcileOutcome::default())
}

fn apply_cell(
    record: &mut PlaceRecord,
    row: usize,
    column_name: &str,
    value: &Value,
) -> Result<PlaceColumn, ReconcileError> {
    let invalid = |message: String| ReconcileError::InvalidChange {
        row,
        column: column_name.to_string(),
        message,
    };

    let column = PlaceColumn::parse(column_name)
        .ok_or_else(|| invalid("unknown column".to_string()))?;

    match column {
        PlaceColumn::IsActive => {
            record.is_active = value
                .as_bool()
                .ok_or_else(|| invalid(format!("expected boolean, got {value}")))?;
        }
        PlaceColumn::Day => {
            record.day = match value {
                Value::Null => None,
                Value::String(text) if text.is_empty() => None,
                Value::String(text) => Some(
                    Weekday::parse(text)
                        .ok_or_else(|| invalid(format!("unknown day `{text}`")))?,
                ),
                other => return Err(invalid(format!("expected day name, got {other}"))),
            };
        }
        PlaceColumn::TripOrder => {
            record.trip_order = as_integer(value)
                .ok_or_else(|| invalid(format!("expected integer, got {value}")))?;
        }
        PlaceColumn::Category => {
            record.category = match value {
                Value::Null => String::new(),
                Value::String(text) => text.clone(),
                other => return Err(invalid(format!("expected category text, got {other}"))),
            };
        }
        PlaceColumn::Name
        | PlaceColumn::Address
        | PlaceColumn::PlaceId
        | PlaceColumn::Lat
        | PlaceColumn::Lon => return Err(invalid("column is read-only".to_string())),
    }

    Ok(column)
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(number) = value.as_i64() {
        return Some(number);
    }
    value
        .as_f64()
        .filter(|number| number.fract() == 0.0 && number.abs() < i64::MAX as f64)
        .map(|number| number as i64)
}

/// Use-case service that reconciles change sets with the store.
pub struct EditService<S: PlaceStore> {
    store: S,
}

impl<S: PlaceStore> EditService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Runs one reconciliation cycle against the current stored snapshot.
    ///
    /// # Contract
    /// - Empty change sets neither read nor write the store.
    /// - Exactly one change is committed per successful non-empty call.
    pub fn reconcile(&self, changes: &ChangeSet) -> Result<ReconcileOutcome, ReconcileError> {
        if changes.is_empty() {
            return Ok(ReconcileOutcome::default());
        }

        let mut records = self.store.load_all()?;
        let outcome = match apply_next_change(&mut records, changes) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("event=reconcile module=service status=rejected error={err}");
                return Err(err);
            }
        };

        self.store.replace_all(&records)?;
        match &outcome.applied {
            Some(AppliedChange::Edited {
                row,
                place_id,
                column,
                ..
            }) => info!(
                "event=reconcile module=service status=ok kind=edit row={row} place_id={place_id} column={}",
                column.as_str()
            ),
            Some(AppliedChange::Deleted { row, place_id }) => info!(
                "event=reconcile module=service status=ok kind=delete row={row} place_id={place_id}"
            ),
            None => {}
        }

        Ok(outcome)
    }

    /// Runs cycles until nothing is pending, persisting after each one.
    ///
    /// Stops at the first failing cycle; earlier cycles stay committed.
    pub fn reconcile_all(&self, changes: &ChangeSet) -> Result<Vec<AppliedChange>, ReconcileError> {
        let mut pending = changes.clone();
        let mut applied = Vec::new();
        while !pending.is_empty() {
            let outcome = self.reconcile(&pending)?;
            match outcome.applied {
                Some(change) => applied.push(change),
                None => break,
            }
            pending = outcome.remaining;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<PlaceRecord> {
        ["a", "b", "c"]
            .into_iter()
            .map(|id| PlaceRecord::new(id, format!("place {id}")))
            .collect()
    }

    #[test]
    fn change_set_parses_editor_payload_in_column_order() {
        let changes: ChangeSet = serde_json::from_value(json!({
            "edited_rows": {"2": {"trip_order": 3, "day": "Monday"}},
            "added_rows": [],
            "deleted_rows": [0]
        }))
        .unwrap();

        assert_eq!(changes.next_edit(), Some((2, "trip_order", &json!(3))));
        assert_eq!(changes.deleted_rows, vec![0]);
    }

    #[test]
    fn read_only_and_unknown_columns_are_rejected() {
        let mut places = records();
        for column in ["name", "place_id", "lat", "colour"] {
            let changes = ChangeSet::default().edit(0, column, json!("x"));
            let err = apply_next_change(&mut places, &changes).unwrap_err();
            assert!(matches!(err, ReconcileError::InvalidChange { row: 0, .. }));
        }
        assert_eq!(places, records());
    }

    #[test]
    fn non_canonical_day_is_rejected() {
        let mut places = records();
        let changes = ChangeSet::default().edit(1, "day", json!("Funday"));
        assert!(apply_next_change(&mut places, &changes).is_err());
        assert_eq!(places[1].day, None);
    }

    #[test]
    fn integral_float_trip_order_is_accepted() {
        let mut places = records();
        let changes = ChangeSet::default().edit(0, "trip_order", json!(4.0));
        apply_next_change(&mut places, &changes).unwrap();
        assert_eq!(places[0].trip_order, 4);

        let changes = ChangeSet::default().edit(0, "trip_order", json!(1.5));
        assert!(apply_next_change(&mut places, &changes).is_err());
    }

    #[test]
    fn trip_order_at_two_to_the_63_is_rejected_not_clamped() {
        let mut places = records();
        let before = places.clone();
        let changes =
            ChangeSet::default().edit(0, "trip_order", json!(9_223_372_036_854_775_808.0));

        let err = apply_next_change(&mut places, &changes).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidChange { row: 0, .. }));
        assert_eq!(places, before);
    }

    #[test]
    fn deletion_realigns_pending_positions() {
        let changes = ChangeSet::default()
            .edit(0, "day", json!("Monday"))
            .edit(1, "day", json!("Tuesday"))
            .edit(2, "day", json!("Sunday"))
            .delete(1)
            .delete(2);

        let remaining = changes.after_deletion(1);
        assert_eq!(remaining.deleted_rows, vec![1]);
        let rows: Vec<usize> = remaining.edited_rows.keys().copied().collect();
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(remaining.edited_rows[&1]["day"], json!("Sunday"));
    }
}
