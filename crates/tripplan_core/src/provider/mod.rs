//! Ports for the external place, transit and photo providers.
//!
//! # Responsibility
//! - Define the blocking interfaces the engine consumes.
//! - Carry provider failures with operation and key context.
//!
//! # Invariants
//! - Provider failures are per-call; callers decide whether to degrade.
//! - No concrete network client lives in core.

use crate::model::place::{Candidate, PlaceId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Address used when a provider returns a suggestion without secondary text.
pub const ADDRESS_NOT_FOUND: &str = "Address not found";

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure reported by an external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider could not be reached or answered with an error.
    Unavailable {
        operation: &'static str,
        key: String,
        message: String,
    },
    /// Provider answered but had nothing for the key.
    NotFound {
        operation: &'static str,
        key: String,
    },
}

impl ProviderError {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Unavailable { operation, .. } | Self::NotFound { operation, .. } => operation,
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable {
                operation,
                key,
                message,
            } => write!(f, "{operation} failed for `{key}`: {message}"),
            Self::NotFound { operation, key } => {
                write!(f, "{operation} returned no result for `{key}`")
            }
        }
    }
}

impl Error for ProviderError {}

/// One autocomplete hit, already geocoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub place_id: PlaceId,
    pub lat: f64,
    pub lon: f64,
    pub place_name: String,
    /// Secondary text; providers fall back to [`ADDRESS_NOT_FOUND`].
    pub address: String,
}

impl Suggestion {
    /// Converts an accepted suggestion into a merge candidate.
    pub fn into_candidate(self) -> Candidate {
        Candidate {
            place_id: self.place_id,
            name: self.place_name,
            address: self.address,
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Nearest transit station with walking directions from a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearestStation {
    pub station_name: String,
    pub address: String,
    pub walking_distance_text: String,
    pub walking_time_text: String,
}

/// Keyword to geocoded suggestions.
pub trait SuggestionProvider {
    fn search(&self, keyword: &str) -> ProviderResult<Vec<Suggestion>>;
}

/// Nearest train station lookup.
pub trait StationProvider {
    /// Fails with `NotFound` when no station is nearby.
    fn nearest_station(&self, lat: f64, lon: f64) -> ProviderResult<NearestStation>;
}

/// Place photo lookup and download.
pub trait PhotoProvider {
    fn photo_references(&self, place_id: &str) -> ProviderResult<Vec<String>>;
    fn fetch(&self, reference: &str, max_width: u32, max_height: u32) -> ProviderResult<Vec<u8>>;
}

/// Runs a keyword search, skipping the provider for blank input.
pub fn suggest<P>(provider: &P, keyword: &str) -> ProviderResult<Vec<Suggestion>>
where
    P: SuggestionProvider + ?Sized,
{
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(Vec::new());
    }
    provider.search(keyword)
}
