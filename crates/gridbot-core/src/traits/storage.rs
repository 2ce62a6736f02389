// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Favourites store trait for persistence backends (SQLite, in-memory).

use async_trait::async_trait;

use crate::error::GridbotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Favourite, NewFavourite, UserId};

/// Persistent store of saved lookups.
///
/// The store does not reject duplicates; callers check [`exists_for`]
/// before [`insert`]. Each operation is its own atomic unit.
///
/// [`exists_for`]: FavouritesStore::exists_for
/// [`insert`]: FavouritesStore::insert
#[async_trait]
pub trait FavouritesStore: PluginAdapter {
    /// Initializes the backend (connection, migrations).
    async fn initialize(&self) -> Result<(), GridbotError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), GridbotError>;

    /// Lists a user's favourites in insertion order.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Favourite>, GridbotError>;

    /// Looks up a favourite by its id.
    async fn get_by_id(&self, id: i64) -> Result<Option<Favourite>, GridbotError>;

    /// Persists a new favourite and returns its id.
    async fn insert(&self, favourite: &NewFavourite) -> Result<i64, GridbotError>;

    /// Whether the user already saved this exact (file, sheet, cell) lookup.
    async fn exists_for(
        &self,
        user_id: UserId,
        file_path: &str,
        sheet_name: &str,
        cell: &str,
    ) -> Result<bool, GridbotError>;
}
