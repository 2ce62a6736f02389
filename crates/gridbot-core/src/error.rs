// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Gridbot.

use thiserror::Error;

/// The primary error type used across all Gridbot adapter traits and core operations.
#[derive(Debug, Error)]
pub enum GridbotError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging channel errors (connection failure, message format, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Spreadsheet access errors (unreadable workbook, unknown sheet).
    #[error("spreadsheet error: {message}")]
    Sheet {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GridbotError {
    /// Wraps any storage-layer error.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        GridbotError::Storage {
            source: Box::new(source),
        }
    }
}
