// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spreadsheet access for Gridbot.
//!
//! Lists `.xls`/`.xlsx` files in a folder, reads sheet names and single cells
//! with calamine, and evaluates formulas that were saved without a cached
//! result. Numbers are rendered in the bot's currency format.

pub mod coord;
pub mod error;
pub mod eval;
pub mod format;
pub mod listing;
pub mod resolver;
pub mod value;
pub mod workbook;

pub use coord::{CellRef, column_to_index, index_to_column, is_cell_coordinate};
pub use error::SheetError;
pub use format::format_currency;
pub use listing::{WorkbookFormat, display_name, list_files};
pub use resolver::{FORMULA_ERROR_PREFIX, SheetResolver};
pub use value::CellValue;
