// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing texts.

use std::fmt::Display;

pub const MENU_PROMPT: &str = "Choose an option:";
pub const SELECT_FILE: &str = "Select a file:";
pub const SELECT_FAVOURITE: &str = "Select a favourite:";
pub const ENTER_CELL: &str = "Enter cell coordinate (e.g. C3):";
pub const SAVE_PROMPT: &str = "Do you want to save this as a favourite? If yes, type a nickname. If not, press ❌ Exit or /exit.";
pub const EXITED: &str = "Exited. Type /start to begin again.";

pub const NO_FILES: &str = "No Excel files found in the configured folder.";
pub const NO_FAVOURITES: &str = "No favourites saved yet.";

pub const INVALID_FILE: &str = "Invalid file selection.";
pub const INVALID_SHEET: &str = "Invalid sheet selection.";
pub const INVALID_FAVOURITE: &str = "Invalid favourite selection.";
pub const FAVOURITE_NOT_FOUND: &str = "Favourite not found.";
pub const INVALID_CELL: &str = "Invalid cell format. Please enter like C3.";
pub const UNKNOWN_ACTION: &str = "Sorry, I didn’t understand that action.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Type /start to begin.";

pub const NOT_AUTHORIZED: &str = "Sorry, you are not authorized to use this bot.";
pub const NOT_AUTHORIZED_ALERT: &str = "Not authorized";

/// Sent when handling an event failed unexpectedly.
pub const FAILURE: &str = "Something went wrong while handling that request. Please try again.";

pub fn select_sheet(file_name: &str) -> String {
    format!("Select a sheet from {file_name}:")
}

pub fn cell_value(sheet: &str, cell: impl Display, value: impl Display) -> String {
    format!("Value in {sheet}!{cell}: {value}")
}

pub fn favourite_value(
    nickname: &str,
    sheet: &str,
    cell: impl Display,
    value: impl Display,
) -> String {
    format!("Value for {nickname} ({sheet}!{cell}): {value}")
}

pub fn favourite_saved(nickname: &str) -> String {
    format!("Favourite “{nickname}” saved ✅")
}

pub fn unavailable(reason: impl Display) -> String {
    format!("That spreadsheet is no longer available: {reason}")
}
