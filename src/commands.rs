use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{ArgGroup, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "drivelog")]
#[command(about = "Turns a raw GPS journal into scored trips and monthly history", long_about = None)]
pub struct Cli {
    /// SQLite database holding the journal, trips and history
    #[arg(long, global = true, default_value = "drivelog.sqlite3")]
    pub db: PathBuf,

    /// JSON settings file; defaults are used when it does not exist
    #[arg(long, global = true, default_value = "settings.json")]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Dedup, segment, file pending trips and apply retention limits
    Process,
    /// Append samples from a JSON array file to the journal
    Import { path: PathBuf },
    /// Remove duplicate samples from the journal
    Dedup,
    /// Group unprocessed samples into trips
    Segment {
        /// Regroup samples already marked processed
        #[arg(long)]
        force: bool,
    },
    /// Retry address lookups for trips stored without them
    ResolveAddresses,
    /// File the trip starting at TIMESTAMP into its month
    Rollup {
        #[arg(value_parser = parse_timestamp)]
        timestamp: DateTime<Utc>,
    },
    /// File every trip not yet archived
    RollupPending,
    /// Remove a filed trip from monthly history
    DeleteHistory {
        #[arg(value_parser = parse_timestamp)]
        timestamp: DateTime<Utc>,
    },
    /// Delete the live trip starting at TIMESTAMP
    DeleteTrip {
        #[arg(value_parser = parse_timestamp)]
        timestamp: DateTime<Utc>,
    },
    /// Delete live trips by count or by date
    #[command(group(ArgGroup::new("limit").required(true).args(["keep", "after"])))]
    PurgeTrips {
        /// Keep only the N newest trips
        #[arg(long)]
        keep: Option<usize>,
        /// Delete trips that start after this time
        #[arg(long, value_parser = parse_timestamp)]
        after: Option<DateTime<Utc>>,
    },
    /// Keep raw samples for only the N most recent trips
    PurgeJournal {
        #[arg(long)]
        keep: usize,
    },
    /// Mark every sample unprocessed
    Deprocess,
    /// Apply the retention limits from settings
    Retention,
    /// List trips, newest first, as JSON
    Trips,
    /// List month summaries as JSON
    Months,
    /// Print one month, with its trips, as JSON
    Month { key: String },
    /// Print the effective settings as JSON
    PrintSettings,
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
}
