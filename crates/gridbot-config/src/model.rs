// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model.
//!
//! Every section rejects unknown keys so that typos surface at startup.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GridbotConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub sheets: SheetsConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Process-wide behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// One of trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Events processed at the same time across all users.
    #[serde(default = "default_max_concurrent_events")]
    pub max_concurrent_events: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            max_concurrent_events: default_max_concurrent_events(),
        }
    }
}

fn default_agent_name() -> String {
    "gridbot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_concurrent_events() -> usize {
    32
}

/// Telegram bot settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. Required by `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Numeric Telegram user ids allowed to talk to the bot. Empty admits nobody.
    #[serde(default, deserialize_with = "deserialize_user_ids")]
    pub allowed_users: Vec<i64>,
}

/// Spreadsheet folder settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SheetsConfig {
    /// Folder scanned for `.xls` / `.xlsx` files. A leading `~` is expanded.
    #[serde(default = "default_folder")]
    pub folder: String,

    /// Upper bound on the offline formula fallback, in seconds.
    #[serde(default = "default_eval_timeout_secs")]
    pub eval_timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            folder: default_folder(),
            eval_timeout_secs: default_eval_timeout_secs(),
        }
    }
}

impl SheetsConfig {
    /// The configured folder with `~` expanded, made absolute.
    ///
    /// Existing folders are canonicalized so that every spelling of the same
    /// directory yields the same path; a folder that does not exist yet is
    /// resolved against the working directory.
    pub fn folder_path(&self) -> PathBuf {
        let path = expand_home(&self.folder);
        std::fs::canonicalize(&path)
            .or_else(|_| std::path::absolute(&path))
            .unwrap_or(path)
    }
}

fn default_folder() -> String {
    ".".to_string()
}

fn default_eval_timeout_secs() -> u64 {
    10
}

/// Favourites database settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable SQLite write-ahead logging.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

impl StorageConfig {
    /// The configured database path with `~` expanded.
    pub fn database_file(&self) -> PathBuf {
        expand_home(&self.database_path)
    }
}

fn default_database_path() -> String {
    "favourites.db".to_string()
}

fn default_true() -> bool {
    true
}

/// Expands a leading `~` or `~/` to the home directory.
///
/// Paths without a leading tilde, or hosts without a home directory, are
/// returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserEntry {
    Id(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserList {
    One(UserEntry),
    Many(Vec<UserEntry>),
}

/// Accepts `111`, `"111,222"`, `[111, "222"]` and mixtures of those.
fn deserialize_user_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match UserList::deserialize(deserializer)? {
        UserList::One(entry) => vec![entry],
        UserList::Many(entries) => entries,
    };

    let mut ids = Vec::new();
    for entry in entries {
        match entry {
            UserEntry::Id(id) => ids.push(id),
            UserEntry::Text(text) => {
                for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let id = part.parse::<i64>().map_err(|_| {
                        serde::de::Error::custom(format!(
                            "`{part}` is not a numeric Telegram user id"
                        ))
                    })?;
                    ids.push(id);
                }
            }
        }
    }
    Ok(ids)
}
