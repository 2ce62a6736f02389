// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with figment.
//!
//! Merge order, later wins:
//! 1. compiled defaults
//! 2. `/etc/gridbot/gridbot.toml`
//! 3. `$XDG_CONFIG_HOME/gridbot/gridbot.toml`
//! 4. `./gridbot.toml`
//! 5. legacy variables (`TOKEN`, `EXCEL_FOLDER`, `DB_PATH`, `AUTHORIZED_USERS`)
//! 6. `GRIDBOT_*` variables

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::GridbotConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/gridbot/gridbot.toml";
pub(crate) const LOCAL_CONFIG: &str = "gridbot.toml";

/// Sections recognised in `GRIDBOT_<SECTION>_<KEY>` variables.
const SECTIONS: &[&str] = &["agent", "telegram", "sheets", "storage"];

/// Variable names used by older deployments and the keys they set.
const LEGACY_VARS: &[(&str, &str)] = &[
    ("token", "telegram.bot_token"),
    ("excel_folder", "sheets.folder"),
    ("db_path", "storage.database_path"),
    ("authorized_users", "telegram.allowed_users"),
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gridbot").join(LOCAL_CONFIG))
}

/// Figment for the full hierarchy, before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(GridbotConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(legacy_env_provider())
        .merge(env_provider())
}

/// Loads the full hierarchy.
pub fn load_config() -> Result<GridbotConfig, figment::Error> {
    build_figment().extract()
}

/// Loads defaults overlaid with a TOML string. No files or environment.
pub fn load_config_from_str(toml_content: &str) -> Result<GridbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GridbotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads defaults, one explicit file and the environment.
pub fn load_config_from_path(path: &Path) -> Result<GridbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GridbotConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_env_provider())
        .merge(env_provider())
        .extract()
}

/// `GRIDBOT_SHEETS_EVAL_TIMEOUT_SECS` -> `sheets.eval_timeout_secs`.
///
/// Only the first underscore after a known section becomes a dot, so keys that
/// themselves contain underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("GRIDBOT_").map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or(key)
            .into()
    })
}

fn legacy_env_provider() -> Env {
    let names: Vec<&str> = LEGACY_VARS.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        LEGACY_VARS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, target)| target.to_string())
            .unwrap_or(key)
            .into()
    })
}
