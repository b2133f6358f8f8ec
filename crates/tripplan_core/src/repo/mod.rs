//! Store layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the snapshot-oriented contract over `t_places`.
//! - Isolate SQLite query details from merge/edit/aggregation services.
//!
//! # Invariants
//! - Writes are whole-snapshot replacements; a failed write leaves the
//!   previous snapshot authoritative.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod place_repo;
