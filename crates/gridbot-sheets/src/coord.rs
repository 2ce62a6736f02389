// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A1-style cell coordinates.
//!
//! Column letters use bijective base-26: `A` = 1, `Z` = 26, `AA` = 27. There is
//! no zero digit.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SheetError;

static CELL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z]+)(\d+)$").unwrap());

/// Widest column a worksheet can hold (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

/// Tallest worksheet.
pub const MAX_ROW: u32 = 1_048_576;

/// Whether `text` has the shape of a cell coordinate, e.g. `c3` or `AB12`.
pub fn is_cell_coordinate(text: &str) -> bool {
    CELL_RE.is_match(text)
}

/// One-based index of a column label, or `None` for empty or non-letter input.
///
/// ```
/// assert_eq!(gridbot_sheets::column_to_index("A"), Some(1));
/// assert_eq!(gridbot_sheets::column_to_index("aa"), Some(27));
/// ```
pub fn column_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, ch| {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(ch.to_ascii_uppercase()) - u32::from('A') + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// Column label for a one-based index. Zero has no label and yields an empty string.
pub fn index_to_column(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A parsed, bounds-checked cell reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    /// One-based row.
    row: u32,
    /// One-based column.
    col: u32,
}

impl CellRef {
    /// Builds a reference from one-based row and column numbers.
    pub fn new(row: u32, col: u32) -> Option<Self> {
        ((1..=MAX_ROW).contains(&row) && (1..=MAX_COLUMN).contains(&col))
            .then_some(Self { row, col })
    }

    /// Zero-based `(row, column)`, the form calamine ranges use.
    pub fn position(&self) -> (u32, u32) {
        (self.row - 1, self.col - 1)
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column(&self) -> u32 {
        self.col
    }
}

impl FromStr for CellRef {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SheetError::InvalidCoordinate(s.to_string());
        let caps = CELL_RE.captures(s.trim()).ok_or_else(invalid)?;
        let col = column_to_index(&caps[1]).ok_or_else(invalid)?;
        let row = caps[2].parse::<u32>().map_err(|_| invalid())?;
        CellRef::new(row, col).ok_or_else(invalid)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", index_to_column(self.col), self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_columns() {
        assert_eq!(column_to_index("A"), Some(1));
        assert_eq!(column_to_index("Z"), Some(26));
        assert_eq!(column_to_index("AA"), Some(27));
        assert_eq!(column_to_index("AZ"), Some(52));
        assert_eq!(column_to_index("XFD"), Some(MAX_COLUMN));
        assert_eq!(index_to_column(27), "AA");
        assert_eq!(index_to_column(702), "ZZ");
        assert_eq!(index_to_column(703), "AAA");
    }

    #[test]
    fn rejects_non_letters() {
        assert_eq!(column_to_index(""), None);
        assert_eq!(column_to_index("A1"), None);
        assert_eq!(column_to_index("É"), None);
    }

    #[test]
    fn parses_and_canonicalises() {
        let cell: CellRef = "c3".parse().unwrap();
        assert_eq!(cell.to_string(), "C3");
        assert_eq!(cell.position(), (2, 2));

        let cell: CellRef = "ab12".parse().unwrap();
        assert_eq!(cell.to_string(), "AB12");
        assert_eq!(cell.position(), (11, 27));
    }

    #[test]
    fn rejects_malformed_coordinates() {
        for bad in ["", "3C", "C", "12", "C 3", "C3D", "C-3", "$C$3"] {
            assert!(bad.parse::<CellRef>().is_err(), "{bad:?} should be rejected");
            assert!(!is_cell_coordinate(bad), "{bad:?} should not match");
        }
    }

    #[test]
    fn rejects_out_of_bounds() {
        assert!("A0".parse::<CellRef>().is_err());
        assert!("XFE1".parse::<CellRef>().is_err());
        assert!("A1048577".parse::<CellRef>().is_err());
        assert!("XFD1048576".parse::<CellRef>().is_ok());
    }

    proptest! {
        #[test]
        fn column_labels_round_trip(index in 1u32..=100_000) {
            prop_assert_eq!(column_to_index(&index_to_column(index)), Some(index));
        }

        #[test]
        fn labels_are_uppercase_letters(index in 1u32..=MAX_COLUMN) {
            let label = index_to_column(index);
            prop_assert!(!label.is_empty());
            prop_assert!(label.chars().all(|c| c.is_ascii_uppercase()));
        }

        #[test]
        fn canonical_form_reparses(row in 1u32..=MAX_ROW, col in 1u32..=MAX_COLUMN) {
            let cell = CellRef::new(row, col).unwrap();
            let lower = cell.to_string().to_lowercase();
            prop_assert_eq!(lower.parse::<CellRef>().unwrap(), cell);
        }
    }
}
