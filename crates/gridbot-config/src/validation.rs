// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks run after deserialization.

use crate::diagnostic::ConfigError;
use crate::model::GridbotConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Longest offline formula evaluation allowed, in seconds.
pub const MAX_EVAL_TIMEOUT_SECS: u64 = 300;

/// Checks every rule and reports all violations together.
pub fn validate_config(config: &GridbotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "agent.log_level `{}` is not one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.agent.max_concurrent_events == 0 {
        errors.push(ConfigError::validation(
            "agent.max_concurrent_events must be at least 1",
        ));
    }

    let timeout = config.sheets.eval_timeout_secs;
    if !(1..=MAX_EVAL_TIMEOUT_SECS).contains(&timeout) {
        errors.push(ConfigError::validation(format!(
            "sheets.eval_timeout_secs must be between 1 and {MAX_EVAL_TIMEOUT_SECS}, got {timeout}"
        )));
    }

    if config.sheets.folder.trim().is_empty() {
        errors.push(ConfigError::validation("sheets.folder must not be empty"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Extra requirements of the long-running bot.
pub fn validate_for_serve(config: &GridbotConfig) -> Result<(), Vec<ConfigError>> {
    let has_token = config
        .telegram
        .bot_token
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if has_token {
        Ok(())
    } else {
        Err(vec![ConfigError::MissingKey {
            key: "telegram.bot_token".to_string(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&GridbotConfig::default()).is_ok());
    }

    #[test]
    fn all_violations_are_reported() {
        let mut config = GridbotConfig::default();
        config.agent.log_level = "loud".into();
        config.agent.max_concurrent_events = 0;
        config.sheets.eval_timeout_secs = 0;
        config.storage.database_path = "  ".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn timeout_upper_bound_is_inclusive() {
        let mut config = GridbotConfig::default();
        config.sheets.eval_timeout_secs = MAX_EVAL_TIMEOUT_SECS;
        assert!(validate_config(&config).is_ok());
        config.sheets.eval_timeout_secs = MAX_EVAL_TIMEOUT_SECS + 1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = GridbotConfig::default();
        config.agent.log_level = "DEBUG".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn serve_needs_a_token() {
        let mut config = GridbotConfig::default();
        assert!(validate_for_serve(&config).is_err());
        config.telegram.bot_token = Some(" ".into());
        assert!(validate_for_serve(&config).is_err());
        config.telegram.bot_token = Some("123:ABC".into());
        assert!(validate_for_serve(&config).is_ok());
    }
}
