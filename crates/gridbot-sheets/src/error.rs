// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors raised while locating and reading workbooks.

use std::path::PathBuf;
use std::time::Duration;

use gridbot_core::GridbotError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("unsupported file type: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("sheet `{sheet}` not found in {}", path.display())]
    SheetNotFound { path: PathBuf, sheet: String },

    #[error("invalid cell coordinate `{0}`")]
    InvalidCoordinate(String),

    /// The workbook exists but could not be parsed.
    #[error("cannot read workbook {}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl SheetError {
    /// True when the referenced file or sheet has gone away, as opposed to a
    /// failure reading something that exists.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SheetError::FileNotFound { .. } | SheetError::SheetNotFound { .. }
        )
    }
}

impl From<SheetError> for GridbotError {
    fn from(err: SheetError) -> Self {
        match err {
            SheetError::Timeout { duration } => GridbotError::Timeout { duration },
            other => GridbotError::Sheet {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        let missing = SheetError::FileNotFound {
            path: "a.xlsx".into(),
        };
        let sheet = SheetError::SheetNotFound {
            path: "a.xlsx".into(),
            sheet: "Q1".into(),
        };
        let broken = SheetError::Workbook {
            path: "a.xlsx".into(),
            message: "bad zip".into(),
        };
        assert!(missing.is_not_found());
        assert!(sheet.is_not_found());
        assert!(!broken.is_not_found());
    }

    #[test]
    fn converts_into_gridbot_error() {
        let err: GridbotError = SheetError::InvalidCoordinate("11".into()).into();
        assert!(matches!(err, GridbotError::Sheet { .. }));
        assert!(err.to_string().contains("11"));

        let err: GridbotError = SheetError::Timeout {
            duration: Duration::from_secs(3),
        }
        .into();
        assert!(matches!(err, GridbotError::Timeout { .. }));
    }
}
