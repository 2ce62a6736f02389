// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gridbot doctor` command implementation.
//!
//! Runs diagnostic checks against the configuration, the spreadsheet folder
//! and the favourites database, and prints one line per check.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use gridbot_config::GridbotConfig;
use gridbot_config::model::StorageConfig;
use gridbot_core::GridbotError;
use gridbot_storage::Database;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `gridbot doctor` command.
///
/// With `plain`, or when stdout is not a terminal, output is not colored.
pub async fn run_doctor(config: &GridbotConfig, plain: bool) -> Result<(), GridbotError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_token(config),
        check_allow_list(config),
        check_folder(&config.sheets.folder_path()),
        check_database(&config.storage).await,
        check_memory(),
    ];

    println!();
    println!("  gridbot doctor");
    println!("  {}", "-".repeat(50));

    for result in &results {
        println!("{}", render_line(result, use_color));
    }
    println!();

    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// The configuration itself already loaded; `serve` additionally needs a token.
fn check_token(config: &GridbotConfig) -> CheckResult {
    let start = Instant::now();
    match gridbot_config::validate_for_serve(config) {
        Ok(()) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(_) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            "telegram.bot_token is not set",
            start,
        ),
    }
}

fn check_allow_list(config: &GridbotConfig) -> CheckResult {
    let start = Instant::now();
    match config.telegram.allowed_users.len() {
        0 => CheckResult::new(
            "Allowed users",
            CheckStatus::Warn,
            "none configured; every sender will be rejected",
            start,
        ),
        n => CheckResult::new("Allowed users", CheckStatus::Pass, format!("{n} user(s)"), start),
    }
}

fn check_folder(folder: &Path) -> CheckResult {
    let start = Instant::now();
    if !folder.is_dir() {
        return CheckResult::new(
            "Spreadsheet folder",
            CheckStatus::Fail,
            format!("not a directory: {}", folder.display()),
            start,
        );
    }
    match gridbot_sheets::list_files(folder) {
        Ok(files) if files.is_empty() => CheckResult::new(
            "Spreadsheet folder",
            CheckStatus::Warn,
            format!("no .xls/.xlsx files in {}", folder.display()),
            start,
        ),
        Ok(files) => CheckResult::new(
            "Spreadsheet folder",
            CheckStatus::Pass,
            format!("{} file(s) in {}", files.len(), folder.display()),
            start,
        ),
        Err(e) => CheckResult::new("Spreadsheet folder", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Opens an existing database, which also applies pending migrations. A
/// missing file is only a warning; it is created on first `serve`.
async fn check_database(storage: &StorageConfig) -> CheckResult {
    let start = Instant::now();
    let path = storage.database_file();

    if !path.exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {} (will be created on first run)", path.display()),
            start,
        );
    }

    match Database::open(&path, storage.wal_mode).await {
        Ok(db) => match db.checkpoint().await {
            Ok(()) => CheckResult::new("Database", CheckStatus::Pass, "connected, schema current", start),
            Err(e) => CheckResult::new("Database", CheckStatus::Fail, e.to_string(), start),
        },
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Heap and resident size as seen by jemalloc.
fn check_memory() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        CheckResult::new(
            "Memory",
            CheckStatus::Pass,
            format!(
                "heap: {:.1} MB, resident: {:.1} MB",
                megabytes(allocated),
                megabytes(resident)
            ),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new("Memory", CheckStatus::Warn, "jemalloc not available on MSVC", start)
    }
}

#[cfg(not(target_env = "msvc"))]
fn megabytes(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_at(path: &Path) -> StorageConfig {
        StorageConfig {
            database_path: path.display().to_string(),
            wal_mode: true,
        }
    }

    #[test]
    fn missing_token_fails() {
        let config = GridbotConfig::default();
        assert_eq!(check_token(&config).status, CheckStatus::Fail);

        let mut config = GridbotConfig::default();
        config.telegram.bot_token = Some("123:abc".into());
        assert_eq!(check_token(&config).status, CheckStatus::Pass);
    }

    #[test]
    fn empty_allow_list_warns() {
        let mut config = GridbotConfig::default();
        assert_eq!(check_allow_list(&config).status, CheckStatus::Warn);
        config.telegram.allowed_users = vec![1, 2];
        let result = check_allow_list(&config);
        assert_eq!(result.status, CheckStatus::Pass);
        assert_eq!(result.message, "2 user(s)");
    }

    #[test]
    fn folder_checks() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_folder(&dir.path().join("missing")).status, CheckStatus::Fail);
        assert_eq!(check_folder(dir.path()).status, CheckStatus::Warn);

        std::fs::write(dir.path().join("Budget.xlsx"), b"x").unwrap();
        let result = check_folder(dir.path());
        assert_eq!(result.status, CheckStatus::Pass);
        assert!(result.message.starts_with("1 file(s)"));
    }

    #[tokio::test]
    async fn missing_database_warns_without_creating_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favourites.db");
        let result = check_database(&storage_at(&path)).await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn existing_database_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favourites.db");
        Database::open(&path, true).await.unwrap();
        assert_eq!(check_database(&storage_at(&path)).await.status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn corrupt_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favourites.db");
        std::fs::write(&path, b"this is not a sqlite file at all, just text").unwrap();
        assert_eq!(check_database(&storage_at(&path)).await.status, CheckStatus::Fail);
    }

    #[cfg(not(target_env = "msvc"))]
    #[test]
    fn memory_reports_jemalloc_stats() {
        let result = check_memory();
        assert_eq!(result.status, CheckStatus::Pass);
        assert!(result.message.starts_with("heap: "), "{}", result.message);
        assert!(result.message.contains("resident: "));
        assert_eq!(megabytes(3 * 1024 * 1024), 3.0);
    }

    #[test]
    fn plain_lines_are_tagged() {
        let result = CheckResult {
            name: "Database".into(),
            status: CheckStatus::Warn,
            message: "not found".into(),
            duration: Duration::from_millis(3),
        };
        let line = render_line(&result, false);
        assert!(line.contains("[WARN]"));
        assert!(line.contains("not found (3ms)"));
    }
}
