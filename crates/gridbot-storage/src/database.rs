// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread, so writes
//! are serialized without extra locking.

use std::path::Path;

use tokio_rusqlite::Connection;
use tracing::debug;

use gridbot_core::GridbotError;

use crate::migrations::run_migrations;

/// An open, migrated favourites database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path`, applies PRAGMAs and
    /// runs pending migrations.
    pub async fn open(path: &Path, wal_mode: bool) -> Result<Self, GridbotError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(GridbotError::storage)?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(GridbotError::storage)?;
        Self::prepare(conn, wal_mode).await
    }

    /// Opens a private in-memory database. Used by tests and `doctor`.
    pub async fn open_in_memory() -> Result<Self, GridbotError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(GridbotError::storage)?;
        Self::prepare(conn, false).await
    }

    async fn prepare(conn: Connection, wal_mode: bool) -> Result<Self, GridbotError> {
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            }
            conn.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| run_migrations(conn))
            .await
            .map_err(GridbotError::storage)?;
        debug!(wal_mode, "database ready");

        Ok(Self { conn })
    }

    /// The underlying connection handle.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Flushes the write-ahead log into the main database file.
    pub async fn checkpoint(&self) -> Result<(), GridbotError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Converts a tokio-rusqlite failure into a storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> GridbotError {
    GridbotError::storage(e)
}
