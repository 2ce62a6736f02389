// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Favourite CRUD operations.

use gridbot_core::{Favourite, GridbotError, NewFavourite, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, user_id, nickname, file_path, sheet_name, cell_coord";

fn row_to_favourite(row: &rusqlite::Row<'_>) -> rusqlite::Result<Favourite> {
    Ok(Favourite {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        nickname: row.get(2)?,
        file_path: row.get(3)?,
        sheet_name: row.get(4)?,
        cell: row.get(5)?,
    })
}

/// Insert a favourite and return its row id.
pub async fn insert(db: &Database, favourite: &NewFavourite) -> Result<i64, GridbotError> {
    let favourite = favourite.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO favourites (user_id, nickname, file_path, sheet_name, cell_coord)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    favourite.user_id.0,
                    favourite.nickname,
                    favourite.file_path,
                    favourite.sheet_name,
                    favourite.cell,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// A user's favourites in insertion order.
pub async fn list_by_user(db: &Database, user_id: UserId) -> Result<Vec<Favourite>, GridbotError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM favourites WHERE user_id = ?1 ORDER BY id ASC"
            ))?;
            let rows = stmt
                .query_map(params![user_id.0], row_to_favourite)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a favourite by id.
pub async fn get_by_id(db: &Database, id: i64) -> Result<Option<Favourite>, GridbotError> {
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM favourites WHERE id = ?1"))?;
            let favourite = stmt
                .query_row(params![id], row_to_favourite)
                .optional()?;
            Ok(favourite)
        })
        .await
        .map_err(map_tr_err)
}

/// Whether the user already saved this exact lookup, under any nickname.
pub async fn exists_for(
    db: &Database,
    user_id: UserId,
    file_path: &str,
    sheet_name: &str,
    cell: &str,
) -> Result<bool, GridbotError> {
    let file_path = file_path.to_string();
    let sheet_name = sheet_name.to_string();
    let cell = cell.to_string();
    db.connection()
        .call(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM favourites
                    WHERE user_id = ?1 AND file_path = ?2 AND sheet_name = ?3 AND cell_coord = ?4
                 )",
                params![user_id.0, file_path, sheet_name, cell],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
        .map_err(map_tr_err)
}

/// Every favourite, grouped by user. Used by the operator listing.
pub async fn list_all(db: &Database) -> Result<Vec<Favourite>, GridbotError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM favourites ORDER BY user_id ASC, id ASC"
            ))?;
            let rows = stmt
                .query_map([], row_to_favourite)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fav(user: i64, nickname: &str, cell: &str) -> NewFavourite {
        NewFavourite {
            user_id: UserId(user),
            nickname: nickname.to_string(),
            file_path: "/srv/sheets/budget.xlsx".to_string(),
            sheet_name: "2026".to_string(),
            cell: cell.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_returns_increasing_ids() {
        let db = Database::open_in_memory().await.unwrap();
        let a = insert(&db, &fav(1, "rent", "C3")).await.unwrap();
        let b = insert(&db, &fav(1, "food", "C4")).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn list_by_user_is_in_insertion_order_and_scoped() {
        let db = Database::open_in_memory().await.unwrap();
        insert(&db, &fav(1, "zeta", "C3")).await.unwrap();
        insert(&db, &fav(2, "other", "C3")).await.unwrap();
        insert(&db, &fav(1, "alpha", "D9")).await.unwrap();

        let names: Vec<_> = list_by_user(&db, UserId(1))
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.nickname)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(list_by_user(&db, UserId(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_by_id_round_trips_fields() {
        let db = Database::open_in_memory().await.unwrap();
        let id = insert(&db, &fav(7, "Revenue", "B12")).await.unwrap();

        let found = get_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.user_id, UserId(7));
        assert_eq!(found.nickname, "Revenue");
        assert_eq!(found.sheet_name, "2026");
        assert_eq!(found.cell, "B12");
        assert!(get_by_id(&db, id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exists_for_ignores_nickname_and_other_cells() {
        let db = Database::open_in_memory().await.unwrap();
        let path = "/srv/sheets/budget.xlsx";

        assert!(!exists_for(&db, UserId(1), path, "2026", "C3").await.unwrap());
        insert(&db, &fav(1, "elsewhere", "D4")).await.unwrap();
        assert!(!exists_for(&db, UserId(1), path, "2026", "C3").await.unwrap());

        insert(&db, &fav(1, "anything", "C3")).await.unwrap();
        assert!(exists_for(&db, UserId(1), path, "2026", "C3").await.unwrap());
        assert!(!exists_for(&db, UserId(2), path, "2026", "C3").await.unwrap());
    }

    #[tokio::test]
    async fn duplicates_are_not_rejected_by_the_schema() {
        let db = Database::open_in_memory().await.unwrap();
        insert(&db, &fav(1, "a", "C3")).await.unwrap();
        insert(&db, &fav(1, "b", "C3")).await.unwrap();
        assert_eq!(list_by_user(&db, UserId(1)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_all_groups_by_user() {
        let db = Database::open_in_memory().await.unwrap();
        insert(&db, &fav(2, "b", "C3")).await.unwrap();
        insert(&db, &fav(1, "a", "C3")).await.unwrap();
        let users: Vec<_> = list_all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.user_id)
            .collect();
        assert_eq!(users, vec![UserId(1), UserId(2)]);
    }
}
