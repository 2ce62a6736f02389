// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use calamine::{CellErrorType, Data};

use crate::format::format_currency;

/// A resolved cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    /// Integers and floats alike.
    Number(f64),
    Text(String),
    Bool(bool),
    /// Rendered as `YYYY-MM-DD HH:MM:SS`.
    DateTime(String),
    /// An Excel error code such as `#DIV/0!`.
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::Error(e) => CellValue::Error(error_code(e).to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(dt) => CellValue::DateTime(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
                None => CellValue::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::DateTime(s.clone()),
        }
    }
}

/// The code Excel shows for a cell error.
pub fn error_code(err: &CellErrorType) -> &'static str {
    match err {
        CellErrorType::Div0 => "#DIV/0!",
        CellErrorType::NA => "#N/A",
        CellErrorType::Name => "#NAME?",
        CellErrorType::Null => "#NULL!",
        CellErrorType::Num => "#NUM!",
        CellErrorType::Ref => "#REF!",
        CellErrorType::Value => "#VALUE!",
        CellErrorType::GettingData => "#GETTING_DATA",
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => f.write_str("(empty)"),
            CellValue::Number(n) => f.write_str(&format_currency(*n)),
            CellValue::Text(s) if s.is_empty() => f.write_str("(empty)"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
            CellValue::DateTime(s) | CellValue::Error(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};

    #[test]
    fn numbers_render_as_currency() {
        assert_eq!(CellValue::from(&Data::Int(1500)).to_string(), "R1,500.00");
        assert_eq!(CellValue::from(&Data::Float(-2.5)).to_string(), "R-2.50");
    }

    #[test]
    fn non_numbers_pass_through() {
        assert_eq!(CellValue::from(&Data::String("Total".into())).to_string(), "Total");
        assert_eq!(CellValue::from(&Data::Bool(true)).to_string(), "TRUE");
        assert_eq!(CellValue::from(&Data::Empty).to_string(), "(empty)");
        assert_eq!(
            CellValue::from(&Data::Error(CellErrorType::Div0)).to_string(),
            "#DIV/0!"
        );
    }

    #[test]
    fn dates_render_as_timestamps() {
        // 45292.5 is 2024-01-01 12:00 in the 1900 date system.
        let dt = ExcelDateTime::new(45292.5, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            CellValue::from(&Data::DateTime(dt)).to_string(),
            "2024-01-01 12:00:00"
        );
    }
}
