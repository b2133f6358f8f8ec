//! Command-line entry point for the itinerary engine.
//!
//! # Responsibility
//! - Wire configuration, logging and the SQLite store together.
//! - Expose engine operations as subcommands with JSON output.
//!
//! # Invariants
//! - No business rules live here; every subcommand delegates to core.
//! - Failures exit with status 1 and a one-line message on stderr.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use serde_json::json;
use std::error::Error;
use std::process::ExitCode;
use tripplan_core::db::open_db;
use tripplan_core::logging::{field_value, init_from_config};
use tripplan_core::{
    AppliedChange, Candidate, ChangeSet, EditService, ItineraryService, MergeOutcome,
    MergeService, PlaceStore, PlannerConfig, SqlitePlaceStore,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tripplan: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> CliResult<()> {
    let config = PlannerConfig::from_env()?;
    init_from_config(&config)?;
    log::info!(
        "event=cli_start module=cli status=ok command={} db_path={} version={}",
        command.name(),
        field_value(config.db_path.display()),
        tripplan_core::core_version()
    );

    let conn = open_db(&config.db_path)?;
    let store = SqlitePlaceStore::try_new(&conn)?;

    match command {
        Command::Init => {
            println!("database ready at {}", config.db_path.display());
        }
        Command::Places => print_json(&store.load_all()?)?,
        Command::Accept {
            place_id,
            name,
            lat,
            lon,
            address,
        } => {
            let candidate = Candidate {
                place_id,
                name,
                address: address.unwrap_or_default(),
                lat,
                lon,
            };
            let outcome = MergeService::new(&store).merge(&candidate)?;
            print_json(&json!({
                "place_id": outcome.place_id(),
                "inserted": matches!(outcome, MergeOutcome::Inserted(_)),
            }))?;
        }
        Command::Edit { change_set } => {
            let changes: ChangeSet = serde_json::from_str(&change_set)?;
            let outcome = EditService::new(&store).reconcile(&changes)?;
            print_json(&json!({
                "applied": outcome.applied.as_ref().map(describe_change),
                "remaining": outcome.remaining,
            }))?;
        }
        Command::Center => print_json(&ItineraryService::new(&store).map_center()?)?,
        Command::Markers => print_json(&ItineraryService::new(&store).map_markers()?)?,
        Command::Schedule { day } => {
            let itinerary = ItineraryService::new(&store);
            match day {
                Some(day) => print_json(&itinerary.day_schedule(day)?)?,
                None => print_json(&itinerary.weekly_schedule()?)?,
            }
        }
    }

    Ok(())
}

fn describe_change(change: &AppliedChange) -> serde_json::Value {
    match change {
        AppliedChange::Edited {
            row,
            place_id,
            column,
            value,
        } => json!({
            "kind": "edit",
            "row": row,
            "place_id": place_id,
            "column": column.as_str(),
            "value": value,
        }),
        AppliedChange::Deleted { row, place_id } => json!({
            "kind": "delete",
            "row": row,
            "place_id": place_id,
        }),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
