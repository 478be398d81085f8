mod config;
mod csv_store;
mod domain;
mod entry;
mod error;
mod excel;
mod export;
mod formulas;
mod normalize;
mod ranking;
mod server;
mod store;
mod submission;
mod tracker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::AppConfig;
use crate::domain::Exercise;
use crate::entry::ExerciseEntry;
use crate::normalize::normalize;
use crate::ranking::{available_months, users};
use crate::server::AppState;
use crate::store::{RecordStore, load_or_empty, open_store};

/// Workout log dashboard backend: estimated 1RM leaderboards and monthly
/// growth rankings.
#[derive(Parser, Debug)]
#[command(name = "liftboard")]
#[command(about = "Workout log analytics with 1RM leaderboards and growth rankings")]
#[command(version)]
struct Args {
    /// Path to the record store (.csv or .xlsx).
    /// Can also be set via LIFTBOARD_FILE environment variable.
    #[arg(value_name = "FILE", env = "LIFTBOARD_FILE")]
    file: PathBuf,

    /// Port number for the web server.
    #[arg(long, env = "LIFTBOARD_PORT", default_value = "8080")]
    port: u16,

    /// Divisor K in the Epley estimate w × (1 + reps/K).
    #[arg(long, env = "LIFTBOARD_EPLEY_DIVISOR", default_value = "40")]
    epley_divisor: f64,

    /// Attempts for appending a submission before giving up.
    #[arg(long, env = "LIFTBOARD_RETRY_ATTEMPTS", default_value = "3")]
    retry_attempts: u32,

    /// Delay between append attempts, in milliseconds.
    #[arg(long, env = "LIFTBOARD_RETRY_DELAY_MS", default_value = "500")]
    retry_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let config = AppConfig::new(
        args.epley_divisor,
        args.retry_attempts,
        Duration::from_millis(args.retry_delay_ms),
    )
    .context("Invalid configuration")?;

    let store = open_store(&args.file)
        .with_context(|| format!("Cannot open store {}", args.file.display()))?;

    // Fail fast on an unreadable store; requests re-read it anyway
    println!("Loading workout records from: {}", args.file.display());
    print_summary(store.as_ref())
        .with_context(|| format!("Failed to load records from {}", args.file.display()))?;

    let static_dir = find_static_dir();
    if let Some(dir) = &static_dir {
        println!();
        println!("Static files: {}", dir.display());
    }

    let state = Arc::new(AppState::new(store, config));

    println!();
    server::run_server(state, args.port, static_dir).await?;

    Ok(())
}

/// Prints a startup summary of the store contents.
fn print_summary(store: &dyn RecordStore) -> Result<()> {
    let raw = load_or_empty(store)?;
    if raw.is_empty() {
        println!();
        println!("No records yet; the store is created by the first submission.");
        return Ok(());
    }
    let records = normalize(&raw);

    println!();
    println!("=== Workout Log Summary ===");
    println!();
    println!("Stored rows: {}", raw.len());
    println!(
        "Usable records: {} ({} skipped)",
        records.len(),
        raw.len() - records.len()
    );
    println!("Members: {}", users(&records).len());

    let months = available_months(&records);
    if let (Some(newest), Some(oldest)) = (months.first(), months.last()) {
        println!("Months: {} to {}", oldest, newest);
    }

    println!();
    for exercise in Exercise::all() {
        let count = records
            .iter()
            .filter(|r| !ExerciseEntry::parse(r.field(*exercise)).is_empty())
            .count();
        if count > 0 {
            println!("{:24} {:4} entries", exercise.id(), count);
        }
    }

    Ok(())
}

/// Finds the static directory for serving frontend files, if any.
fn find_static_dir() -> Option<PathBuf> {
    // Try relative to current working directory
    let cwd_static = PathBuf::from("static");
    if cwd_static.is_dir() {
        return Some(cwd_static);
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        let exe_static = exe_dir.join("static");
        if exe_static.is_dir() {
            return Some(exe_static);
        }
    }

    None
}
