// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gridbot serve` command implementation.
//!
//! Opens the favourites database, builds the spreadsheet resolver and the
//! conversation engine, connects to Telegram and dispatches events until
//! SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use gridbot_agent::{ConversationEngine, Dispatcher, shutdown};
use gridbot_config::GridbotConfig;
use gridbot_core::{ChannelAdapter, FavouritesStore, GridbotError, PluginAdapter, UserId};
use gridbot_sheets::SheetResolver;
use gridbot_storage::SqliteFavourites;
use gridbot_telegram::TelegramChannel;
use tracing::{info, warn};

/// Runs the bot until a shutdown signal arrives.
pub async fn run_serve(config: GridbotConfig) -> Result<(), GridbotError> {
    init_tracing(&config.agent.log_level);

    info!(name = config.agent.name.as_str(), "starting gridbot serve");

    let storage = Arc::new(SqliteFavourites::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_file().display(), "favourites database ready");

    let folder = config.sheets.folder_path();
    if !folder.is_dir() {
        warn!(folder = %folder.display(), "spreadsheet folder does not exist yet");
    }
    let resolver = SheetResolver::new(folder, Duration::from_secs(config.sheets.eval_timeout_secs));

    if config.telegram.allowed_users.is_empty() {
        warn!("telegram.allowed_users is empty; every sender will be rejected");
    }
    let allowed = config.telegram.allowed_users.iter().copied().map(UserId);
    let engine = Arc::new(ConversationEngine::new(resolver, storage.clone(), allowed));

    let mut channel = TelegramChannel::new(&config.telegram)?;
    channel.connect().await?;
    let channel = Arc::new(channel);

    let cancel = shutdown::install_signal_handler();
    let mut dispatcher = Dispatcher::new(
        channel.clone(),
        engine,
        config.agent.max_concurrent_events,
    );
    dispatcher.run(cancel).await?;

    channel.shutdown().await?;
    info!("gridbot stopped");
    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn default_filter(log_level: &str) -> String {
    format!("gridbot={log_level},warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_scopes_level_to_gridbot() {
        assert_eq!(default_filter("debug"), "gridbot=debug,warn");
    }

    #[test]
    fn default_filter_parses() {
        assert!(tracing_subscriber::EnvFilter::try_new(default_filter("info")).is_ok());
    }
}
