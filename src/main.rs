mod commands;

use std::{fs, path::Path, process, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use commands::{Cli, Commands};
use drivelog_lib::{
    history, journal, process_all, retention, CoordinateGeocoder, Database, EngineError,
    NoMapRenderer, SettingsStore, TripProcessor,
};
use log::error;
use serde::Serialize;

#[tokio::main]
async fn main() {
    drivelog_lib::init_logging();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    if let Err(err) = run(command, &cli.db, &cli.settings).await {
        error!("Error: {err:#}");
        let code = match err.downcast_ref::<EngineError>() {
            Some(engine_err) if engine_err.is_not_found() => 2,
            _ => 1,
        };
        process::exit(code);
    }
}

async fn run(command: Commands, db_path: &Path, settings_path: &Path) -> Result<()> {
    let store = SettingsStore::new(settings_path.to_path_buf())?;
    let settings = store.trip_settings();

    if let Commands::PrintSettings = command {
        return print_json(&settings);
    }

    let db = Database::new(db_path.to_path_buf())?;
    let processor = TripProcessor::new(
        db.clone(),
        Arc::new(CoordinateGeocoder),
        Arc::new(NoMapRenderer),
    )
    .with_timeout(settings.collaborator_timeout());

    match command {
        Commands::Process => {
            let report = process_all(&db, &processor, &settings).await?;
            println!("{}", report.message());
        }
        Commands::Import { path } => {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read samples from {}", path.display()))?;
            let samples: Vec<drivelog_lib::db::RawSample> = serde_json::from_str(&contents)
                .with_context(|| format!("Malformed samples in {}", path.display()))?;
            let ids = db.insert_raw_samples(&samples).await?;
            println!("Imported {} sample(s)", ids.len());
        }
        Commands::Dedup => {
            println!("{}", journal::dedup_journal(&db).await?.message());
        }
        Commands::Segment { force } => {
            let config = settings.segmentation_config(force)?;
            println!("{}", processor.run_pass(&config).await?.message());
        }
        Commands::ResolveAddresses => {
            let resolved = processor.resolve_pending_addresses().await?;
            println!("Resolved addresses for {resolved} trip(s)");
        }
        Commands::Rollup { timestamp } => {
            println!("{}", history::rollup(&db, timestamp).await?.message());
        }
        Commands::RollupPending => {
            println!("{}", history::rollup_pending(&db).await?.message());
        }
        Commands::DeleteHistory { timestamp } => {
            history::delete_history_trip(&db, timestamp).await?;
            println!("Deleted history trip");
        }
        Commands::DeleteTrip { timestamp } => {
            retention::delete_trip(&db, timestamp).await?;
            println!("Deleted trip");
        }
        Commands::PurgeTrips { keep, after } => {
            let report = match (keep, after) {
                (Some(keep), _) => retention::purge_trips_by_count(&db, keep).await?,
                (None, Some(after)) => retention::purge_trips_after(&db, after).await?,
                (None, None) => bail!("purge-trips needs --keep or --after"),
            };
            println!("{}", report.message());
        }
        Commands::PurgeJournal { keep } => {
            let report =
                retention::purge_journal_by_trip_count(&db, keep, settings.trip_separator_secs)
                    .await?;
            println!("{}", report.message());
        }
        Commands::Deprocess => {
            println!("{}", retention::deprocess_journal(&db).await?.message());
        }
        Commands::Retention => {
            let report = retention::enforce_retention(&db, &settings.retention_config()).await?;
            println!("{}", report.message());
        }
        Commands::Trips => print_json(&db.list_trips().await?)?,
        Commands::Months => print_json(&db.list_month_summaries().await?)?,
        Commands::Month { key } => match db.get_month_summary(&key).await? {
            Some(month) => print_json(&month)?,
            None => return Err(EngineError::not_found("month", key).into()),
        },
        Commands::PrintSettings => print_json(&settings)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
