//! ClarityDash CLI
//!
//! Command-line front end for the account store

use claritydash_core::logging_facility::{self, Profile};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "claritydash")]
#[command(about = "ClarityDash - account store administration", long_about = None)]
struct Cli {
    /// SQLite store file
    #[arg(
        long,
        global = true,
        env = "CLARITYDASH_DB",
        default_value = ".claritydash/store.db"
    )]
    db: PathBuf,

    /// Store settings (TOML); `--db` takes precedence over its `path`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Logging profile (development|production); silent when omitted
    #[arg(long, global = true)]
    log: Option<Profile>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Insert the baseline accounts unless already seeded
    Seed,
    /// Account operations
    Users(commands::users::UsersArgs),
    /// Verify that the user index matches the stored records
    Check,
    /// Repair drift between the user index and the stored records
    Reconcile,
}

fn main() {
    let cli = Cli::parse();

    if let Some(profile) = cli.log {
        logging_facility::init(profile);
    }

    let result = commands::open_storage(&cli.db, cli.config.as_deref()).and_then(|storage| {
        match cli.command {
            Commands::Seed => commands::seed::execute(&storage),
            Commands::Users(args) => commands::users::execute(&storage, args),
            Commands::Check => commands::maintenance::check(&storage),
            Commands::Reconcile => commands::maintenance::reconcile(&storage),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
