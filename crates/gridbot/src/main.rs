// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gridbot - read spreadsheet cells from Telegram.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod favourites;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gridbot_config::{ConfigError, GridbotConfig};

/// Gridbot - read spreadsheet cells from Telegram.
#[derive(Parser, Debug)]
#[command(name = "gridbot", version, about, long_about = None)]
struct Cli {
    /// Load this TOML file instead of the standard search path.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot until interrupted (default).
    Serve,
    /// Check configuration, spreadsheet folder and database.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// List saved favourites.
    Favourites {
        /// Only show favourites of this Telegram user id.
        #[arg(long)]
        user: Option<i64>,
    },
}

fn load(path: Option<&PathBuf>) -> Result<GridbotConfig, Vec<ConfigError>> {
    match path {
        Some(path) => gridbot_config::load_and_validate_path(path),
        None => gridbot_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    // A missing .env is normal.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            gridbot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(errors) = gridbot_config::validate_for_serve(&config) {
                gridbot_config::render_errors(&errors);
                std::process::exit(1);
            }
            serve::run_serve(config).await
        }
        Commands::Doctor { plain } => doctor::run_doctor(&config, plain).await,
        Commands::Favourites { user } => favourites::run_favourites(&config, user).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
