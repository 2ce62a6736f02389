// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory favourites store.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use gridbot_core::{
    AdapterType, Favourite, FavouritesStore, GridbotError, HealthStatus, NewFavourite,
    PluginAdapter, UserId,
};

/// A [`FavouritesStore`] backed by a `Vec`, with switchable failure injection.
#[derive(Default)]
pub struct MemoryFavourites {
    rows: Mutex<Vec<Favourite>>,
    failing: AtomicBool,
}

impl MemoryFavourites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of every stored row.
    pub async fn all(&self) -> Vec<Favourite> {
        self.rows.lock().await.clone()
    }

    fn check(&self) -> Result<(), GridbotError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(GridbotError::storage(std::io::Error::other(
                "injected storage failure",
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PluginAdapter for MemoryFavourites {
    fn name(&self) -> &str {
        "memory-favourites"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, GridbotError> {
        Ok(if self.failing.load(Ordering::SeqCst) {
            HealthStatus::Unhealthy("failure injected".into())
        } else {
            HealthStatus::Healthy
        })
    }

    async fn shutdown(&self) -> Result<(), GridbotError> {
        Ok(())
    }
}

#[async_trait]
impl FavouritesStore for MemoryFavourites {
    async fn initialize(&self) -> Result<(), GridbotError> {
        self.check()
    }

    async fn close(&self) -> Result<(), GridbotError> {
        Ok(())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Favourite>, GridbotError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Favourite>, GridbotError> {
        self.check()?;
        Ok(self.rows.lock().await.iter().find(|f| f.id == id).cloned())
    }

    async fn insert(&self, favourite: &NewFavourite) -> Result<i64, GridbotError> {
        self.check()?;
        let mut rows = self.rows.lock().await;
        let id = rows.last().map_or(1, |f| f.id + 1);
        rows.push(Favourite {
            id,
            user_id: favourite.user_id,
            nickname: favourite.nickname.clone(),
            file_path: favourite.file_path.clone(),
            sheet_name: favourite.sheet_name.clone(),
            cell: favourite.cell.clone(),
        });
        Ok(id)
    }

    async fn exists_for(
        &self,
        user_id: UserId,
        file_path: &str,
        sheet_name: &str,
        cell: &str,
    ) -> Result<bool, GridbotError> {
        self.check()?;
        Ok(self.rows.lock().await.iter().any(|f| {
            f.user_id == user_id
                && f.file_path == file_path
                && f.sheet_name == sheet_name
                && f.cell == cell
        }))
    }
}
