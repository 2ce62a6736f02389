// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for Gridbot.
//!
//! TOML files and environment variables are merged with figment, unknown keys
//! are rejected, and every failure is reported as a miette diagnostic.
//!
//! ```no_run
//! let config = gridbot_config::load_and_validate().expect("config errors");
//! println!("reading spreadsheets from {}", config.sheets.folder_path().display());
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{GridbotConfig, expand_home};
pub use validation::validate_for_serve;

/// Loads the full file and environment hierarchy, then validates it.
pub fn load_and_validate() -> Result<GridbotConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Loads a TOML string over the defaults, then validates it.
pub fn load_and_validate_str(toml_content: &str) -> Result<GridbotConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Loads one explicit file plus the environment, then validates it.
pub fn load_and_validate_path(
    path: &std::path::Path,
) -> Result<GridbotConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

#[allow(clippy::result_large_err)]
fn finish(
    loaded: Result<GridbotConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<GridbotConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Reads whichever config files exist, for source spans in diagnostics.
fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG.into());
    [
        Some(local),
        loader::user_config_path(),
        Some(loader::SYSTEM_CONFIG.into()),
    ]
    .into_iter()
    .flatten()
    .filter_map(|path| {
        std::fs::read_to_string(&path)
            .ok()
            .map(|content| (path.display().to_string(), content))
    })
    .collect()
}
