// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async front door to the spreadsheet folder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::coord::CellRef;
use crate::error::SheetError;
use crate::eval::EvalError;
use crate::listing::{self, WorkbookFormat};
use crate::value::CellValue;
use crate::workbook;

/// Prefix of the text returned when the offline evaluation fails.
pub const FORMULA_ERROR_PREFIX: &str = "Error calculating formula: ";

/// Lists workbooks and reads cells without blocking the async runtime.
#[derive(Debug, Clone)]
pub struct SheetResolver {
    folder: PathBuf,
    eval_timeout: Duration,
}

async fn blocking<T, F>(f: F) -> Result<T, SheetError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SheetError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SheetError::Io(std::io::Error::other(e)))?
}

/// Runs `eval` on the blocking pool and waits at most `limit` for it. The
/// error side is the reason shown to the user.
async fn evaluate_bounded<F>(limit: Duration, eval: F) -> Result<CellValue, String>
where
    F: FnOnce() -> Result<CellValue, EvalError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(eval);
    // A timed-out evaluation keeps running on the blocking pool; only the wait is abandoned.
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(e.to_string()),
        Ok(Err(join)) => Err(join.to_string()),
        Err(_) => Err(format!("evaluation timed out after {limit:?}")),
    }
}

impl SheetResolver {
    /// A relative `folder` is resolved against the working directory, so the
    /// paths handed out stay valid as favourite keys.
    pub fn new(folder: impl Into<PathBuf>, eval_timeout: Duration) -> Self {
        let folder = folder.into();
        Self {
            folder: std::path::absolute(&folder).unwrap_or(folder),
            eval_timeout,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn eval_timeout(&self) -> Duration {
        self.eval_timeout
    }

    /// Spreadsheets in the configured folder, sorted by name.
    pub async fn list_files(&self) -> Result<Vec<PathBuf>, SheetError> {
        let folder = self.folder.clone();
        let files = blocking(move || listing::list_files(&folder)).await?;
        debug!(folder = %self.folder.display(), count = files.len(), "listed spreadsheets");
        Ok(files)
    }

    /// Sheet names of `file` in workbook order.
    pub async fn list_sheets(&self, file: &Path) -> Result<Vec<String>, SheetError> {
        let path = file.to_path_buf();
        blocking(move || workbook::list_sheets(&path)).await
    }

    /// Reads one cell.
    ///
    /// For `.xlsx`, a blank cached value triggers an offline evaluation of the
    /// cell's formula, bounded by the configured timeout. If that evaluation
    /// fails the result is a text value starting with `Error calculating
    /// formula:` rather than an error.
    pub async fn read_cell(
        &self,
        file: &Path,
        sheet: &str,
        cell: &CellRef,
    ) -> Result<CellValue, SheetError> {
        let format = workbook::detect_format(file)?;
        let stored = {
            let (path, sheet, cell) = (file.to_path_buf(), sheet.to_string(), *cell);
            blocking(move || workbook::read_stored(&path, &sheet, &cell)).await?
        };
        if stored != CellValue::Empty || format != WorkbookFormat::Xlsx {
            return Ok(stored);
        }

        debug!(file = %file.display(), sheet, cell = %cell, "no cached value, evaluating formula");
        let (path, sheet_name, at) = (file.to_path_buf(), sheet.to_string(), *cell);
        let reason = match evaluate_bounded(self.eval_timeout, move || {
            workbook::evaluate_cell(&path, &sheet_name, &at)
        })
        .await
        {
            Ok(value) => return Ok(value),
            Err(reason) => reason,
        };
        warn!(file = %file.display(), sheet, cell = %cell, %reason, "formula evaluation failed");
        Ok(CellValue::Text(format!("{FORMULA_ERROR_PREFIX}{reason}")))
    }
}
