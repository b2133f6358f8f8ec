//! Command-line surface definitions.
//!
//! # Invariants
//! - Parsing performs no I/O; the store is opened only after a valid command.

use clap::{Parser, Subcommand};
use tripplan_core::Weekday;

#[derive(Debug, Parser)]
#[command(name = "tripplan", version)]
#[command(about = "Curate a day-by-day itinerary from searched places")]
#[command(
    after_help = "environment: DB, API_KEY, TRIPPLAN_LOG_LEVEL, TRIPPLAN_LOG_DIR (also read from ./.env)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Create the database if missing.
    Init,
    /// List stored places in row order.
    Places,
    /// Merge a selected place into the store.
    Accept {
        place_id: String,
        name: String,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        address: Option<String>,
    },
    /// Apply the next pending table change from a change-set JSON payload.
    Edit { change_set: String },
    /// Print the map centre.
    Center,
    /// Print map markers.
    Markers,
    /// Print one day's schedule, or the whole week.
    Schedule {
        #[arg(value_parser = parse_weekday)]
        day: Option<Weekday>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Places => "places",
            Self::Accept { .. } => "accept",
            Self::Edit { .. } => "edit",
            Self::Center => "center",
            Self::Markers => "markers",
            Self::Schedule { .. } => "schedule",
        }
    }
}

fn parse_weekday(value: &str) -> Result<Weekday, String> {
    Weekday::parse(value).ok_or_else(|| format!("unknown day `{value}`; expected Monday..Sunday"))
}
