//! Itinerary domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by the itinerary engine.
//! - Keep storage-facing and read-model shapes in one place.
//!
//! # Invariants
//! - Every stored place is identified by its externally issued `place_id`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod place;
