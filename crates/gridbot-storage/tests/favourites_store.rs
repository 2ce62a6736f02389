// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Favourites store behaviour across process restarts.

use gridbot_config::model::StorageConfig;
use gridbot_core::{FavouritesStore, NewFavourite, PluginAdapter, UserId};
use gridbot_storage::SqliteFavourites;

fn config(path: &std::path::Path) -> StorageConfig {
    StorageConfig {
        database_path: path.display().to_string(),
        wal_mode: true,
    }
}

fn revenue(user: i64) -> NewFavourite {
    NewFavourite {
        user_id: UserId(user),
        nickname: "Revenue".to_string(),
        file_path: "/srv/sheets/report.xlsx".to_string(),
        sheet_name: "Q1".to_string(),
        cell: "C3".to_string(),
    }
}

#[tokio::test]
async fn favourites_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("favourites.db");

    let store = SqliteFavourites::new(config(&path));
    store.initialize().await.unwrap();
    let id = store.insert(&revenue(42)).await.unwrap();
    store.close().await.unwrap();
    store.shutdown().await.unwrap();
    drop(store);

    let reopened = SqliteFavourites::new(config(&path));
    reopened.initialize().await.unwrap();
    let list = reopened.list_by_user(UserId(42)).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, id);
    assert_eq!(list[0].nickname, "Revenue");
    assert!(
        reopened
            .exists_for(UserId(42), "/srv/sheets/report.xlsx", "Q1", "C3")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn exists_for_is_stable_across_unrelated_inserts() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteFavourites::new(config(&dir.path().join("fav.db")));
    store.initialize().await.unwrap();

    let check = || store.exists_for(UserId(1), "/srv/sheets/report.xlsx", "Q1", "C3");
    assert!(!check().await.unwrap());

    let mut other = revenue(1);
    other.cell = "D4".to_string();
    store.insert(&other).await.unwrap();
    assert!(!check().await.unwrap());
}

#[tokio::test]
async fn concurrent_inserts_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let store = std::sync::Arc::new(SqliteFavourites::new(config(&dir.path().join("c.db"))));
    store.initialize().await.unwrap();

    let mut handles = Vec::new();
    for user in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.insert(&revenue(user)).await }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
