use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wtmpdb_db::SessionDb;

mod commands;
mod config;

use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "wtmpdb",
    about = "Record and report login sessions, boots, and shutdowns",
    version,
    disable_version_flag = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Print version number and exit
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the session history, newest first
    Last {
        /// Use FILE as the wtmpdb database
        #[arg(short = 'd', long = "database", value_name = "FILE")]
        database: Option<PathBuf>,

        /// Output raw entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a boot entry to the database
    Reboot {
        /// Use FILE as the wtmpdb database
        #[arg(short = 'd', long = "database", value_name = "FILE")]
        database: Option<PathBuf>,
    },

    /// Write the shutdown time for the current boot entry
    Shutdown {
        /// Use FILE as the wtmpdb database
        #[arg(short = 'd', long = "database", value_name = "FILE")]
        database: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Last { database, json } => commands::run_last(&resolve_database(database)?, json),
        Command::Reboot { database } => commands::run_reboot(&resolve_database(database)?),
        Command::Shutdown { database } => commands::run_shutdown(&resolve_database(database)?),
    }
}

/// Database path resolution: `-d` flag, then the config file, then the
/// compiled-in default.
fn resolve_database(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }

    if let Some(config) = Config::load(Path::new(config::CONFIG_PATH))? {
        if let Some(database) = config.database {
            return Ok(database);
        }
    }

    Ok(SessionDb::default_path())
}

/// Diagnostics go to stderr so they never mix into the report on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
