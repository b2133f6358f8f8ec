//! Merge engine for accepted search suggestions.
//!
//! # Responsibility
//! - Reconcile a newly selected candidate with the stored place set.
//! - Persist the merged snapshot through the store contract.
//!
//! # Invariants
//! - Merging is idempotent per `place_id`; an existing row is never altered.
//! - Invalid candidates are rejected before the store is read or written.

use crate::model::place::{Candidate, PlaceId, PlaceRecord, PlaceValidationError};
use crate::provider::Suggestion;
use crate::repo::place_repo::{PlaceStore, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result of merging one candidate into a record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new record was appended.
    Inserted(PlaceId),
    /// A record with the same id already existed; nothing changed.
    AlreadyPresent(PlaceId),
}

impl MergeOutcome {
    pub fn place_id(&self) -> &str {
        match self {
            Self::Inserted(id) | Self::AlreadyPresent(id) => id,
        }
    }
}

#[derive(Debug)]
pub enum MergeError {
    InvalidCandidate(PlaceValidationError),
    Store(StoreError),
}

impl Display for MergeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCandidate(err) => write!(f, "invalid candidate: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MergeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidCandidate(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<PlaceValidationError> for MergeError {
    fn from(value: PlaceValidationError) -> Self {
        Self::InvalidCandidate(value)
    }
}

impl From<StoreError> for MergeError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Merges `candidate` into `records` in place.
///
/// Appends a record built by [`PlaceRecord::from_candidate`] unless one with
/// the same `place_id` exists.
pub fn merge_candidate(
    records: &mut Vec<PlaceRecord>,
    candidate: &Candidate,
) -> Result<MergeOutcome, MergeError> {
    candidate.validate()?;

    if records
        .iter()
        .any(|record| record.place_id == candidate.place_id)
    {
        return Ok(MergeOutcome::AlreadyPresent(candidate.place_id.clone()));
    }

    records.push(PlaceRecord::from_candidate(candidate));
    Ok(MergeOutcome::Inserted(candidate.place_id.clone()))
}

/// Use-case service that merges candidates into the persisted store.
pub struct MergeService<S: PlaceStore> {
    store: S,
}

impl<S: PlaceStore> MergeService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads the current snapshot, merges the candidate and persists it.
    ///
    /// # Contract
    /// - Duplicate ids return `AlreadyPresent` without writing.
    /// - Validation and store failures leave the store unchanged.
    pub fn merge(&self, candidate: &Candidate) -> Result<MergeOutcome, MergeError> {
        if let Err(err) = candidate.validate() {
            warn!(
                "event=merge_candidate module=service status=rejected place_id={:?} error={}",
                candidate.place_id, err
            );
            return Err(err.into());
        }

        let mut records = self.store.load_all()?;
        let outcome = merge_candidate(&mut records, candidate)?;

        match &outcome {
            MergeOutcome::Inserted(id) => {
                self.store.replace_all(&records)?;
                info!(
                    "event=merge_candidate module=service status=inserted place_id={id} rows={}",
                    records.len()
                );
            }
            MergeOutcome::AlreadyPresent(id) => {
                info!("event=merge_candidate module=service status=duplicate place_id={id}");
            }
        }

        Ok(outcome)
    }

    /// Accepts a search suggestion as a candidate and merges it.
    pub fn accept_suggestion(&self, suggestion: Suggestion) -> Result<MergeOutcome, MergeError> {
        self.merge(&suggestion.into_candidate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::place::Weekday;

    fn candidate(id: &str) -> Candidate {
        Candidate {
            place_id: id.to_string(),
            name: format!("place {id}"),
            address: "Tokyo".to_string(),
            lat: 35.0,
            lon: 139.0,
        }
    }

    #[test]
    fn duplicate_candidate_keeps_existing_fields() {
        let mut existing = PlaceRecord::from_candidate(&candidate("a"));
        existing.day = Some(Weekday::Friday);
        existing.category = "hotel".to_string();
        let mut records = vec![existing.clone()];

        let outcome = merge_candidate(&mut records, &candidate("a")).unwrap();
        assert_eq!(outcome, MergeOutcome::AlreadyPresent("a".to_string()));
        assert_eq!(records, vec![existing]);
    }

    #[test]
    fn blank_id_is_rejected_without_mutation() {
        let mut records = vec![PlaceRecord::new("", "Tokyo Center")];
        let err = merge_candidate(&mut records, &candidate("")).unwrap_err();
        assert!(matches!(
            err,
            MergeError::InvalidCandidate(PlaceValidationError::MissingPlaceId)
        ));
        assert_eq!(records.len(), 1);
    }
}
