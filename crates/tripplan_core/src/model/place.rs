//! Place domain model.
//!
//! # Responsibility
//! - Define the canonical `t_places` row and its enumerated fields.
//! - Provide the candidate shape produced by accepting a search suggestion.
//!
//! # Invariants
//! - `place_id` is unique across the store; `""` is the only placeholder id.
//! - `day`, when set, is one of the seven canonical weekday names.
//! - `category` is stored raw; unrecognized values render generically.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier issued by the place-search provider.
pub type PlaceId = String;

/// Geographic centroid of Tokyo, used as the default map centre and the
/// default coordinate of new rows.
pub const TOKYO_CENTER: Coordinate = Coordinate {
    lat: 35.6814834559876,
    lon: 139.7677621491435,
};

/// Marker colour for places without a scheduled day.
pub const UNSCHEDULED_COLOR: &str = "black";

/// Marker icon for places with an empty or unrecognized category.
pub const GENERIC_ICON: &str = "cloud";

/// WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns whether both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Canonical day names a place can be scheduled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All days in schedule tab order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Parses an exact canonical day name (`"Monday"`, ...).
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|day| day.as_str() == value)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }

    /// Map marker colour for places scheduled on this day.
    pub fn marker_color(self) -> &'static str {
        match self {
            Self::Monday => "darkred",
            Self::Tuesday => "pink",
            Self::Wednesday => "beige",
            Self::Thursday => "darkblue",
            Self::Friday => "darkgreen",
            Self::Saturday => "orange",
            Self::Sunday => "lightgray",
        }
    }
}

impl Display for Weekday {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized place categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "restaurant")]
    Restaurant,
    #[serde(rename = "sight-seeing")]
    SightSeeing,
    #[serde(rename = "hotel")]
    Hotel,
    #[serde(rename = "shopping")]
    Shopping,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Restaurant,
        Category::SightSeeing,
        Category::Hotel,
        Category::Shopping,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == value)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::SightSeeing => "sight-seeing",
            Self::Hotel => "hotel",
            Self::Shopping => "shopping",
        }
    }

    /// Map marker icon for this category.
    pub fn marker_icon(self) -> &'static str {
        match self {
            Self::Restaurant => "cutlery",
            Self::SightSeeing => "camera",
            Self::Hotel => "bed",
            Self::Shopping => "shopping-cart",
        }
    }
}

/// Validation errors for candidates and records.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceValidationError {
    /// `place_id` is empty or whitespace-only.
    MissingPlaceId,
    /// Latitude or longitude is NaN or infinite.
    NonFiniteCoordinate { place_id: PlaceId },
}

impl Display for PlaceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPlaceId => write!(f, "place_id must not be blank"),
            Self::NonFiniteCoordinate { place_id } => {
                write!(f, "coordinates of place `{place_id}` must be finite")
            }
        }
    }
}

impl Error for PlaceValidationError {}

/// A place picked from search results that is not yet a stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub place_id: PlaceId,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lon: f64,
}

impl Candidate {
    /// Checks the candidate can become a stored record.
    ///
    /// # Errors
    /// - `MissingPlaceId` when the identifier is blank.
    /// - `NonFiniteCoordinate` when either coordinate is NaN or infinite.
    pub fn validate(&self) -> Result<(), PlaceValidationError> {
        if self.place_id.trim().is_empty() {
            return Err(PlaceValidationError::MissingPlaceId);
        }
        if !Coordinate::new(self.lat, self.lon).is_finite() {
            return Err(PlaceValidationError::NonFiniteCoordinate {
                place_id: self.place_id.clone(),
            });
        }
        Ok(())
    }
}

/// One `t_places` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub place_id: PlaceId,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    /// Whether the place is shown on the map and in the schedule.
    pub is_active: bool,
    /// `None` means unscheduled (stored as `''`).
    pub day: Option<Weekday>,
    /// Ordering key within a day.
    pub trip_order: i64,
    /// Raw category text; see [`PlaceRecord::category_kind`].
    pub category: String,
}

impl PlaceRecord {
    /// Creates a record with column defaults for everything but id and name.
    pub fn new(place_id: impl Into<PlaceId>, name: impl Into<String>) -> Self {
        Self {
            place_id: place_id.into(),
            name: name.into(),
            address: String::new(),
            lat: TOKYO_CENTER.lat,
            lon: TOKYO_CENTER.lon,
            is_active: false,
            day: None,
            trip_order: 1,
            category: String::new(),
        }
    }

    /// Builds the record inserted when a candidate is accepted.
    ///
    /// # Invariants
    /// - `is_active = true`, unscheduled, `trip_order = 1`, empty category.
    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            address: candidate.address.clone(),
            lat: candidate.lat,
            lon: candidate.lon,
            is_active: true,
            ..Self::new(candidate.place_id.clone(), candidate.name.clone())
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    /// Returns the recognized category, if any.
    pub fn category_kind(&self) -> Option<Category> {
        Category::parse(&self.category)
    }

    /// Active for map/schedule purposes: flagged active with usable coordinates.
    pub fn is_displayable(&self) -> bool {
        self.is_active && self.coordinate().is_finite()
    }

    pub fn marker_color(&self) -> &'static str {
        self.day.map_or(UNSCHEDULED_COLOR, Weekday::marker_color)
    }

    pub fn marker_icon(&self) -> &'static str {
        self.category_kind().map_or(GENERIC_ICON, Category::marker_icon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_parse_is_exact() {
        assert_eq!(Weekday::parse("Monday"), Some(Weekday::Monday));
        assert_eq!(Weekday::parse("monday"), None);
        assert_eq!(Weekday::parse(""), None);
    }

    #[test]
    fn unrecognized_category_renders_generically() {
        let mut record = PlaceRecord::new("p1", "Kiosk");
        record.category = "museum".to_string();
        assert_eq!(record.category_kind(), None);
        assert_eq!(record.marker_icon(), GENERIC_ICON);

        record.category = "hotel".to_string();
        assert_eq!(record.marker_icon(), "bed");
    }

    #[test]
    fn candidate_without_id_is_rejected() {
        let candidate = Candidate {
            place_id: "  ".to_string(),
            name: "Nowhere".to_string(),
            address: String::new(),
            lat: 35.0,
            lon: 139.0,
        };
        assert_eq!(
            candidate.validate(),
            Err(PlaceValidationError::MissingPlaceId)
        );
    }

    #[test]
    fn from_candidate_applies_insert_defaults() {
        let candidate = Candidate {
            place_id: "abc".to_string(),
            name: "Tokyo Tower".to_string(),
            address: "Minato City".to_string(),
            lat: 35.6586,
            lon: 139.7454,
        };
        let record = PlaceRecord::from_candidate(&candidate);
        assert!(record.is_active);
        assert_eq!(record.day, None);
        assert_eq!(record.trip_order, 1);
        assert!(record.category.is_empty());
        assert_eq!(record.marker_color(), UNSCHEDULED_COLOR);
    }
}
