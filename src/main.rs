use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod db;
mod error;
mod fuzzy;
mod ledger;
mod matcher;
mod meeting_date;
mod merge;
mod models;
mod normalize;
mod pipeline;
mod report;
mod roster;
mod store;
mod streak;

use config::{
    parse_threshold, parse_weekday, LedgerLayout, LedgerLocation, MatchConfig, Settings,
    DEFAULT_ROSTER_CACHE, DEFAULT_SHEET, DEFAULT_STREAK_HEADER,
};
use db::PgLedgerStore;
use ledger::Ledger;
use roster::JsonRosterCache;
use store::{CsvStore, TabularStore};

#[derive(Parser)]
#[command(name = "attendance-ledger")]
#[command(about = "Meeting attendance ledger fed by OCR'd participant lists", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// CSV ledger file; when omitted the ledger lives in Postgres (DATABASE_URL)
    #[arg(long, env = "ATTENDANCE_LEDGER", global = true)]
    ledger: Option<PathBuf>,

    /// Sheet id within the Postgres ledger
    #[arg(long, env = "ATTENDANCE_SHEET", default_value = DEFAULT_SHEET, global = true)]
    sheet: String,

    /// Local roster snapshot used when the ledger cannot be read
    #[arg(
        long,
        env = "ATTENDANCE_ROSTER_CACHE",
        default_value = DEFAULT_ROSTER_CACHE,
        global = true
    )]
    roster_cache: PathBuf,

    /// Header fragment identifying the consecutive-miss column
    #[arg(long, default_value = DEFAULT_STREAK_HEADER, global = true)]
    streak_header: String,

    /// Weekday the meeting is held on
    #[arg(long, default_value = "thu", value_parser = parse_weekday, global = true)]
    meeting_weekday: Weekday,

    #[arg(long, default_value = "85", value_parser = parse_threshold, global = true)]
    fuzzy_threshold: u8,

    #[arg(long, default_value = "90", value_parser = parse_threshold, global = true)]
    first_name_threshold: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo ledger
    Seed,
    /// Replace the Postgres sheet with a CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record attendance for a meeting from an OCR transcript
    Take {
        /// Transcript text file, or '-' for stdin
        #[arg(long)]
        transcript: PathBuf,
        /// Meeting date (DD/MM/YYYY); defaults to the transcript's file name
        #[arg(long, value_parser = parse_header_arg)]
        date: Option<NaiveDate>,
        /// Upload day (YYYY-MM-DD) used when no date is given or found
        #[arg(long)]
        uploaded: Option<NaiveDate>,
    },
    /// Show who a transcript matches without writing anything
    Match {
        #[arg(long)]
        transcript: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Recompute the consecutive-miss column
    Recalc {
        /// Last meeting date to consider (DD/MM/YYYY); defaults to today
        #[arg(long, value_parser = parse_header_arg)]
        cutoff: Option<NaiveDate>,
    },
    /// Write the ledger to a CSV file
    Export {
        #[arg(long)]
        out: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, value_parser = parse_header_arg)]
        cutoff: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn parse_header_arg(raw: &str) -> Result<NaiveDate, String> {
    meeting_date::parse_header(raw).ok_or_else(|| format!("'{raw}' is not a DD/MM/YYYY date"))
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn settings_from(cli: &Cli) -> anyhow::Result<Settings> {
    let ledger = match &cli.ledger {
        Some(path) => LedgerLocation::Csv(path.clone()),
        None => LedgerLocation::Postgres {
            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set when no --ledger file is given")?,
        },
    };
    Ok(Settings {
        sheet: cli.sheet.clone(),
        ledger,
        roster_cache: cli.roster_cache.clone(),
        layout: LedgerLayout {
            streak_header: cli.streak_header.clone(),
        },
        matching: MatchConfig {
            fuzzy_threshold: cli.fuzzy_threshold,
            first_name_threshold: cli.first_name_threshold,
        },
        meeting_weekday: cli.meeting_weekday,
    })
}

/// OCR output is opaque input; an unreadable transcript counts as empty.
fn read_transcript(path: &Path) -> String {
    let result = if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map(|_| text)
    } else {
        std::fs::read_to_string(path)
    };
    result.unwrap_or_else(|e| {
        tracing::warn!("Could not read transcript {}: {e}", path.display());
        String::new()
    })
}

async fn execute<S: TabularStore>(
    store: &S,
    command: Commands,
    settings: &Settings,
) -> anyhow::Result<()> {
    let cache = JsonRosterCache::new(&settings.roster_cache);

    match command {
        Commands::Take {
            transcript,
            date,
            uploaded,
        } => {
            let file_name = transcript.file_name().and_then(|name| name.to_str());
            let date = meeting_date::resolve_meeting_date(
                date,
                file_name,
                uploaded,
                settings.meeting_weekday,
            );
            let text = read_transcript(&transcript);
            let run = pipeline::take_attendance(
                store,
                &cache,
                &text,
                date,
                &settings.layout,
                &settings.matching,
            )
            .await
            .context("failed to record attendance")?;

            println!(
                "Identified {} of {} members for {} (run {}).",
                run.matches.len(),
                run.roster_size,
                meeting_date::format_header(run.date),
                run.run_id
            );
            for found in &run.matches {
                println!("- {}", found.member);
            }
            println!(
                "Attendance updated ({} cells, {} kept as present).",
                run.merge.writes.len(),
                run.merge.kept_present
            );
            match &run.streaks {
                Some(streaks) => {
                    println!("Streaks updated ({} cells).", streaks.writes.len());
                    for alert in &streaks.alerts {
                        println!(
                            "Member '{}' has reached {} consecutive misses.",
                            alert.member, alert.streak
                        );
                    }
                }
                None => println!("Streak column not found; streaks not updated."),
            }
        }
        Commands::Match { transcript, json } => {
            let roster = roster::load_roster(store, &cache).await;
            let text = read_transcript(&transcript);
            let matches = matcher::match_attendance(&text, &roster, &settings.matching);

            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!("No members matched.");
            } else {
                for found in &matches {
                    println!(
                        "- {} via {:?}{}",
                        found.member,
                        found.strategy,
                        found
                            .line
                            .as_deref()
                            .map(|line| format!(" ('{line}')"))
                            .unwrap_or_default()
                    );
                }
            }
        }
        Commands::Recalc { cutoff } => {
            let cutoff = cutoff.unwrap_or_else(meeting_date::today);
            let outcome = pipeline::sync_streaks(store, cutoff, &settings.layout)
                .await
                .context("failed to recalculate streaks")?;
            println!(
                "Streaks recalculated as of {} ({} updated, {} at the limit).",
                meeting_date::format_header(cutoff),
                outcome.writes.len(),
                outcome.locked
            );
            for alert in &outcome.alerts {
                println!(
                    "Member '{}' has reached {} consecutive misses.",
                    alert.member, alert.streak
                );
            }
        }
        Commands::Export { out } => {
            let grid = store.get_all_cells().await?;
            store::write_csv_grid(&out, &grid)?;
            println!("Ledger written to {}.", out.display());
        }
        Commands::Report { cutoff, out } => {
            let cutoff = cutoff.unwrap_or_else(meeting_date::today);
            let ledger = Ledger::from_grid(store.get_all_cells().await?, &settings.layout);
            let report = report::build_report(&settings.sheet, cutoff, &ledger);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::InitDb | Commands::Seed | Commands::Import { .. } => {
            anyhow::bail!("this command is handled by the ledger backend")
        }
    }

    Ok(())
}

async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = settings_from(&cli)?;
    let last_meeting =
        meeting_date::latest_meeting_day(meeting_date::today(), settings.meeting_weekday);

    match &settings.ledger {
        LedgerLocation::Csv(path) => {
            let store = CsvStore::new(path);
            match cli.command {
                Commands::Seed => {
                    store::write_csv_grid(store.path(), &db::seed_grid(last_meeting))?;
                    println!("Seed ledger written to {}.", store.path().display());
                }
                Commands::InitDb | Commands::Import { .. } => {
                    anyhow::bail!("init-db and import need a Postgres ledger (omit --ledger)");
                }
                command => execute(&store, command, &settings).await?,
            }
        }
        LedgerLocation::Postgres { database_url } => {
            let pool = connect(database_url).await?;
            let store = PgLedgerStore::new(pool.clone(), &settings.sheet);
            match cli.command {
                Commands::InitDb => {
                    db::init_db(&pool).await?;
                    println!("Schema ready.");
                }
                Commands::Seed => {
                    let inserted = db::seed(&pool, store.sheet(), last_meeting).await?;
                    println!("Seed data inserted ({inserted} cells).");
                }
                Commands::Import { csv } => {
                    let inserted = db::import_csv(&pool, store.sheet(), &csv).await?;
                    println!("Imported {inserted} cells from {}.", csv.display());
                }
                command => execute(&store, command, &settings).await?,
            }
        }
    }

    Ok(())
}
