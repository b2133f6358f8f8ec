//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into merge, edit and read-model use cases.
//! - Keep presentation layers decoupled from storage details.

pub mod edit_service;
pub mod itinerary_service;
pub mod merge_service;
