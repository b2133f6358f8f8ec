//! Place store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide `load_all`, `replace_all` and `select_where` over `t_places`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `load_all`/`select_where` return rows in storage (`rowid`) order.
//! - `replace_all` is all-or-nothing and rejects duplicate `place_id`s.
//! - The store never creates or drops `t_places`.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::place::{PlaceId, PlaceRecord, Weekday};
use log::{error, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const PLACE_SELECT_SQL: &str = "SELECT
    place_id,
    name,
    address,
    lat,
    lon,
    is_active,
    day,
    trip_order,
    category
FROM t_places";

pub type StoreResult<T> = Result<T, StoreError>;

/// Store failure for place persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Connection has not been through the schema setup step.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Snapshot handed to `replace_all` repeats an identifier.
    DuplicatePlaceId(PlaceId),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "place store requires schema version {expected_version}, found {actual_version}"
            ),
            Self::DuplicatePlaceId(id) => write!(f, "duplicate place_id in snapshot: `{id}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted place data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter options for `select_where`. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct PlaceFilter {
    pub place_id: Option<PlaceId>,
    pub active_only: bool,
    pub day: Option<Weekday>,
}

impl PlaceFilter {
    pub fn by_place_id(place_id: impl Into<PlaceId>) -> Self {
        Self {
            place_id: Some(place_id.into()),
            ..Self::default()
        }
    }

    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }
}

/// Snapshot-oriented store over place records.
pub trait PlaceStore {
    fn load_all(&self) -> StoreResult<Vec<PlaceRecord>>;
    fn replace_all(&self, records: &[PlaceRecord]) -> StoreResult<()>;
    fn select_where(&self, filter: &PlaceFilter) -> StoreResult<Vec<PlaceRecord>>;
}

impl<S: PlaceStore + ?Sized> PlaceStore for &S {
    fn load_all(&self) -> StoreResult<Vec<PlaceRecord>> {
        (**self).load_all()
    }

    fn replace_all(&self, records: &[PlaceRecord]) -> StoreResult<()> {
        (**self).replace_all(records)
    }

    fn select_where(&self, filter: &PlaceFilter) -> StoreResult<Vec<PlaceRecord>> {
        (**self).select_where(filter)
    }
}

/// SQLite-backed place store.
///
/// Borrowing one `Connection` serializes store calls within the process;
/// `replace_all` takes an immediate write lock on the database file.
pub struct SqlitePlaceStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlaceStore<'conn> {
    /// Wraps a connection that has completed the schema setup step.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `PRAGMA user_version` does not match
    ///   the latest known schema.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let actual_version = current_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn query_places(&self, sql: &str, bind_values: Vec<Value>) -> StoreResult<Vec<PlaceRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut places = Vec::new();

        while let Some(row) = rows.next()? {
            places.push(parse_place_row(row)?);
        }

        Ok(places)
    }
}

impl PlaceStore for SqlitePlaceStore<'_> {
    fn load_all(&self) -> StoreResult<Vec<PlaceRecord>> {
        self.query_places(&format!("{PLACE_SELECT_SQL} ORDER BY rowid ASC;"), Vec::new())
    }

    fn replace_all(&self, records: &[PlaceRecord]) -> StoreResult<()> {
        let started_at = Instant::now();
        ensure_unique_ids(records)?;

        let result = (|| -> StoreResult<()> {
            let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM t_places;", [])?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO t_places (
                        place_id,
                        name,
                        address,
                        lat,
                        lon,
                        is_active,
                        day,
                        trip_order,
                        category
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                )?;
                for record in records {
                    insert.execute(params![
                        record.place_id.as_str(),
                        record.name.as_str(),
                        record.address.as_str(),
                        record.lat,
                        record.lon,
                        bool_to_int(record.is_active),
                        day_to_db(record.day),
                        record.trip_order,
                        record.category.as_str(),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })();

        match &result {
            Ok(()) => info!(
                "event=store_replace module=repo status=ok rows={} duration_ms={}",
                records.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_replace module=repo status=error rows={} duration_ms={} error={}",
                records.len(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn select_where(&self, filter: &PlaceFilter) -> StoreResult<Vec<PlaceRecord>> {
        let mut sql = format!("{PLACE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(place_id) = &filter.place_id {
            sql.push_str(" AND place_id = ?");
            bind_values.push(Value::Text(place_id.clone()));
        }

        if filter.active_only {
            sql.push_str(" AND is_active = 1");
        }

        if let Some(day) = filter.day {
            sql.push_str(" AND day = ?");
            bind_values.push(Value::Text(day.as_str().to_string()));
        }

        sql.push_str(" ORDER BY rowid ASC;");
        self.query_places(&sql, bind_values)
    }
}

fn ensure_unique_ids(records: &[PlaceRecord]) -> StoreResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.place_id.as_str()) {
            return Err(StoreError::DuplicatePlaceId(record.place_id.clone()));
        }
    }
    Ok(())
}

fn parse_place_row(row: &Row<'_>) -> StoreResult<PlaceRecord> {
    let place_id: String = row.get("place_id")?;

    let day = match row.get::<_, String>("day")?.as_str() {
        "" => None,
        value => Some(Weekday::parse(value).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid day `{value}` in t_places.day for place `{place_id}`"
            ))
        })?),
    };

    let is_active = match row.get::<_, i64>("is_active")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_active value `{other}` in t_places.is_active for place `{place_id}`"
            )));
        }
    };

    Ok(PlaceRecord {
        name: row.get("name")?,
        address: row.get("address")?,
        lat: row.get("lat")?,
        lon: row.get("lon")?,
        is_active,
        day,
        trip_order: row.get("trip_order")?,
        category: row.get("category")?,
        place_id,
    })
}

fn day_to_db(day: Option<Weekday>) -> &'static str {
    day.map_or("", Weekday::as_str)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
