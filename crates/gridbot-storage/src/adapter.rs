// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the FavouritesStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use gridbot_config::model::StorageConfig;
use gridbot_core::{
    AdapterType, Favourite, FavouritesStore, GridbotError, HealthStatus, NewFavourite,
    PluginAdapter, UserId,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed favourites store.
///
/// The database is opened lazily by [`FavouritesStore::initialize`].
pub struct SqliteFavourites {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteFavourites {
    /// The connection is not opened until [`initialize`](FavouritesStore::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wraps an already opened database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, GridbotError> {
        self.db.get().ok_or_else(|| GridbotError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Every stored favourite, ordered by user then insertion.
    pub async fn list_all(&self) -> Result<Vec<Favourite>, GridbotError> {
        queries::favourites::list_all(self.db()?).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteFavourites {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, GridbotError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GridbotError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl FavouritesStore for SqliteFavourites {
    async fn initialize(&self) -> Result<(), GridbotError> {
        let path = self.config.database_file();
        let db = Database::open(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| GridbotError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %path.display(), "SQLite favourites store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), GridbotError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Favourite>, GridbotError> {
        queries::favourites::list_by_user(self.db()?, user_id).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Favourite>, GridbotError> {
        queries::favourites::get_by_id(self.db()?, id).await
    }

    async fn insert(&self, favourite: &NewFavourite) -> Result<i64, GridbotError> {
        queries::favourites::insert(self.db()?, favourite).await
    }

    async fn exists_for(
        &self,
        user_id: UserId,
        file_path: &str,
        sheet_name: &str,
        cell: &str,
    ) -> Result<bool, GridbotError> {
        queries::favourites::exists_for(self.db()?, user_id, file_path, sheet_name, cell).await
    }
}
