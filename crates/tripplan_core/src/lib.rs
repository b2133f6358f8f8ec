//! Core itinerary engine for the trip planner.
//! This crate is the single source of truth for itinerary invariants:
//! place storage, merge of accepted suggestions, reconciliation of table
//! edits and the derived map/schedule read-models.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod provider;
pub mod repo;
pub mod service;

pub use config::{ConfigError, PlannerConfig};
pub use logging::{build_mode, default_log_level, field_value, init_logging, logging_status};
pub use model::place::{
    Candidate, Category, Coordinate, PlaceId, PlaceRecord, PlaceValidationError, Weekday,
    TOKYO_CENTER,
};
pub use provider::{
    suggest, NearestStation, PhotoProvider, ProviderError, ProviderResult, StationProvider,
    Suggestion, SuggestionProvider,
};
pub use repo::place_repo::{PlaceFilter, PlaceStore, SqlitePlaceStore, StoreError, StoreResult};
pub use service::edit_service::{
    AppliedChange, ChangeSet, EditService, PlaceColumn, ReconcileError, ReconcileOutcome,
};
pub use service::itinerary_service::{
    DaySchedule, DayView, ItineraryService, MapMarker, Photo, PhotoPick, PlaceCard, ScheduleEntry,
};
pub use service::merge_service::{merge_candidate, MergeError, MergeOutcome, MergeService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
