//! Aggregator: read-models derived from the active place set.
//!
//! # Responsibility
//! - Derive the map centre, map markers and per-day ordered schedules.
//! - Enrich a day's schedule with station and photo panels from providers.
//!
//! # Invariants
//! - Derivations are pure functions of the records they are given.
//! - Only active places with finite coordinates contribute.
//! - Provider failures are contained to the place they belong to.

use crate::model::place::{Coordinate, PlaceId, PlaceRecord, Weekday, TOKYO_CENTER};
use crate::provider::{NearestStation, PhotoProvider, ProviderError, ProviderResult, StationProvider};
use crate::repo::place_repo::{PlaceFilter, PlaceStore, StoreResult};
use log::{debug, warn};
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::collections::HashSet;

/// Bounding size requested for schedule photos.
pub const PHOTO_MAX_WIDTH: u32 = 300;
pub const PHOTO_MAX_HEIGHT: u32 = 300;

/// One place in a day's ordered schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub name: String,
    pub place_id: PlaceId,
    pub lat: f64,
    pub lon: f64,
    pub trip_order: i64,
}

impl ScheduleEntry {
    fn from_record(record: &PlaceRecord) -> Self {
        Self {
            name: record.name.clone(),
            place_id: record.place_id.clone(),
            lat: record.lat,
            lon: record.lon,
            trip_order: record.trip_order,
        }
    }
}

/// Schedule for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DaySchedule {
    /// Nothing is planned for the day yet.
    NoSchedule,
    Places(Vec<ScheduleEntry>),
}

impl DaySchedule {
    pub fn entries(&self) -> &[ScheduleEntry] {
        match self {
            Self::NoSchedule => &[],
            Self::Places(entries) => entries,
        }
    }
}

/// Map marker for one active place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub name: String,
    pub coordinate: Coordinate,
    pub day: Option<Weekday>,
    pub color: &'static str,
    pub icon: &'static str,
}

/// How a photo is chosen among a place's references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhotoPick {
    /// Any reference, for visual variety between renders.
    #[default]
    Random,
    /// The first reference, for reproducible output.
    First,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub reference: String,
    pub bytes: Vec<u8>,
}

/// A schedule entry with its provider-backed panels.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCard {
    pub entry: ScheduleEntry,
    pub station: ProviderResult<NearestStation>,
    pub photo: ProviderResult<Photo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DayView {
    NoSchedule,
    Places(Vec<PlaceCard>),
}

fn displayable(records: &[PlaceRecord]) -> impl Iterator<Item = &PlaceRecord> {
    records.iter().filter(|record| record.is_displayable())
}

/// Map centre: Tokyo with no active places, the place itself with one, and
/// the unweighted mean of latitudes and longitudes otherwise.
pub fn map_center(records: &[PlaceRecord]) -> Coordinate {
    let active: Vec<Coordinate> = displayable(records).map(PlaceRecord::coordinate).collect();

    match active.as_slice() {
        [] => TOKYO_CENTER,
        [single] => *single,
        many => {
            let count = many.len() as f64;
            let (lat_sum, lon_sum) = many
                .iter()
                .fold((0.0, 0.0), |(lat, lon), point| (lat + point.lat, lon + point.lon));
            Coordinate::new(lat_sum / count, lon_sum / count)
        }
    }
}

/// Ordered schedule for `day`, sorted by `trip_order` with ties kept in
/// storage order.
pub fn day_schedule(records: &[PlaceRecord], day: Weekday) -> DaySchedule {
    let mut places: Vec<&PlaceRecord> = displayable(records)
        .filter(|record| record.day == Some(day))
        .collect();

    if places.is_empty() {
        return DaySchedule::NoSchedule;
    }

    places.sort_by_key(|record| record.trip_order);
    DaySchedule::Places(places.into_iter().map(ScheduleEntry::from_record).collect())
}

/// Schedules for every day, Monday first.
pub fn weekly_schedule(records: &[PlaceRecord]) -> Vec<(Weekday, DaySchedule)> {
    Weekday::ALL
        .into_iter()
        .map(|day| (day, day_schedule(records, day)))
        .collect()
}

/// One marker per distinct active place, coloured by day and iconed by category.
pub fn map_markers(records: &[PlaceRecord]) -> Vec<MapMarker> {
    let mut seen = HashSet::new();
    displayable(records)
        .filter(|record| {
            seen.insert((
                record.name.as_str(),
                record.lat.to_bits(),
                record.lon.to_bits(),
                record.day,
                record.category.as_str(),
            ))
        })
        .map(|record| MapMarker {
            name: record.name.clone(),
            coordinate: record.coordinate(),
            day: record.day,
            color: record.marker_color(),
            icon: record.marker_icon(),
        })
        .collect()
}

/// Builds the day view, fetching station and photo panels per place.
pub fn render_day<T, P>(
    records: &[PlaceRecord],
    day: Weekday,
    stations: &T,
    photos: &P,
    pick: PhotoPick,
) -> DayView
where
    T: StationProvider + ?Sized,
    P: PhotoProvider + ?Sized,
{
    let entries = match day_schedule(records, day) {
        DaySchedule::NoSchedule => return DayView::NoSchedule,
        DaySchedule::Places(entries) => entries,
    };

    let cards = entries
        .into_iter()
        .map(|entry| {
            let station = stations.nearest_station(entry.lat, entry.lon);
            if let Err(err) = &station {
                warn!(
                    "event=render_day module=service panel=station status=degraded day={day} place_id={} error={err}",
                    entry.place_id
                );
            }
            let photo = pick_photo(photos, &entry.place_id, pick);
            if let Err(err) = &photo {
                warn!(
                    "event=render_day module=service panel=photo status=degraded day={day} place_id={} error={err}",
                    entry.place_id
                );
            }
            PlaceCard {
                entry,
                station,
                photo,
            }
        })
        .collect::<Vec<_>>();

    debug!("event=render_day module=service status=ok day={day} places={}", cards.len());
    DayView::Places(cards)
}

fn pick_photo<P>(photos: &P, place_id: &str, pick: PhotoPick) -> ProviderResult<Photo>
where
    P: PhotoProvider + ?Sized,
{
    let references = photos.photo_references(place_id)?;
    let chosen = match pick {
        PhotoPick::Random => references.choose(&mut rand::rng()),
        PhotoPick::First => references.first(),
    }
    .ok_or_else(|| ProviderError::NotFound {
        operation: "photo_references",
        key: place_id.to_string(),
    })?;

    let bytes = photos.fetch(chosen, PHOTO_MAX_WIDTH, PHOTO_MAX_HEIGHT)?;
    Ok(Photo {
        reference: chosen.clone(),
        bytes,
    })
}

/// Read-model service over the place store.
pub struct ItineraryService<S: PlaceStore> {
    store: S,
}

impl<S: PlaceStore> ItineraryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn active_records(&self) -> StoreResult<Vec<PlaceRecord>> {
        self.store.select_where(&PlaceFilter::active())
    }

    pub fn map_center(&self) -> StoreResult<Coordinate> {
        Ok(map_center(&self.active_records()?))
    }

    pub fn map_markers(&self) -> StoreResult<Vec<MapMarker>> {
        Ok(map_markers(&self.active_records()?))
    }

    pub fn day_schedule(&self, day: Weekday) -> StoreResult<DaySchedule> {
        Ok(day_schedule(&self.active_records()?, day))
    }

    pub fn weekly_schedule(&self) -> StoreResult<Vec<(Weekday, DaySchedule)>> {
        Ok(weekly_schedule(&self.active_records()?))
    }

    /// Renders one day; only store failures abort the render.
    pub fn render_day<T, P>(
        &self,
        day: Weekday,
        stations: &T,
        photos: &P,
        pick: PhotoPick,
    ) -> StoreResult<DayView>
    where
        T: StationProvider + ?Sized,
        P: PhotoProvider + ?Sized,
    {
        Ok(render_day(&self.active_records()?, day, stations, photos, pick))
    }
}
