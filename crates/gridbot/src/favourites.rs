// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gridbot favourites` command implementation.

use gridbot_config::GridbotConfig;
use gridbot_core::{Favourite, FavouritesStore, GridbotError, UserId};
use gridbot_sheets::display_name;
use gridbot_storage::SqliteFavourites;

/// Prints saved favourites, optionally only those of one user.
pub async fn run_favourites(config: &GridbotConfig, user: Option<i64>) -> Result<(), GridbotError> {
    let path = config.storage.database_file();
    if !path.exists() {
        println!("No favourites database at {}.", path.display());
        return Ok(());
    }

    let store = SqliteFavourites::new(config.storage.clone());
    store.initialize().await?;
    let favourites = match user {
        Some(id) => store.list_by_user(UserId(id)).await?,
        None => store.list_all().await?,
    };
    store.close().await?;

    print!("{}", render(&favourites));
    Ok(())
}

fn render(favourites: &[Favourite]) -> String {
    if favourites.is_empty() {
        return "No favourites saved.\n".to_string();
    }

    let mut out = format!(
        "{:>6}  {:>12}  {:<20}  {}\n",
        "ID", "USER", "NICKNAME", "LOCATION"
    );
    for f in favourites {
        out.push_str(&format!(
            "{:>6}  {:>12}  {:<20}  {} / {}!{}\n",
            f.id,
            f.user_id.0,
            f.nickname,
            display_name(std::path::Path::new(&f.file_path)),
            f.sheet_name,
            f.cell
        ));
    }
    out
}
