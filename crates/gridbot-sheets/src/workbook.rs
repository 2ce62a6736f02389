// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blocking workbook access through calamine.
//!
//! Everything here does file I/O and parsing on the calling thread; async
//! callers go through [`crate::SheetResolver`].

use std::fmt::Display;
use std::io::{Read, Seek};
use std::path::Path;

use calamine::{Data, Range, Reader, Xls, Xlsx, XlsxError, open_workbook};

use crate::coord::CellRef;
use crate::error::SheetError;
use crate::eval::parser::Position;
use crate::eval::{CellSource, EvalError, Evaluator};
use crate::listing::WorkbookFormat;
use crate::value::CellValue;

fn workbook_error(path: &Path, err: impl Display) -> SheetError {
    SheetError::Workbook {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Checks the extension and that the file exists.
pub fn detect_format(path: &Path) -> Result<WorkbookFormat, SheetError> {
    let format = WorkbookFormat::from_path(path).ok_or_else(|| SheetError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    if !path.is_file() {
        return Err(SheetError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(format)
}

/// Sheet names in workbook order.
pub fn list_sheets(path: &Path) -> Result<Vec<String>, SheetError> {
    match detect_format(path)? {
        WorkbookFormat::Xlsx => {
            let wb: Xlsx<_> = open_workbook(path).map_err(|e: XlsxError| workbook_error(path, e))?;
            Ok(wb.sheet_names())
        }
        WorkbookFormat::Xls => {
            let wb: Xls<_> =
                open_workbook(path).map_err(|e: calamine::XlsError| workbook_error(path, e))?;
            Ok(wb.sheet_names())
        }
    }
}

/// The value stored in the file for `cell`, without evaluating anything.
///
/// For `.xlsx` this is the cached result of a formula, which is `Empty` when
/// the workbook was saved without one.
pub fn read_stored(path: &Path, sheet: &str, cell: &CellRef) -> Result<CellValue, SheetError> {
    match detect_format(path)? {
        WorkbookFormat::Xlsx => {
            let mut wb: Xlsx<_> =
                open_workbook(path).map_err(|e: XlsxError| workbook_error(path, e))?;
            stored_value(&mut wb, path, sheet, cell)
        }
        WorkbookFormat::Xls => {
            let mut wb: Xls<_> =
                open_workbook(path).map_err(|e: calamine::XlsError| workbook_error(path, e))?;
            stored_value(&mut wb, path, sheet, cell)
        }
    }
}

fn stored_value<RS, R>(
    wb: &mut R,
    path: &Path,
    sheet: &str,
    cell: &CellRef,
) -> Result<CellValue, SheetError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: Display,
{
    let name = find_sheet(&wb.sheet_names(), sheet).ok_or_else(|| SheetError::SheetNotFound {
        path: path.to_path_buf(),
        sheet: sheet.to_string(),
    })?;
    let range = wb
        .worksheet_range(&name)
        .map_err(|e| workbook_error(path, e))?;
    // Coordinates outside the stored range are blank cells.
    Ok(range
        .get_value(cell.position())
        .map(CellValue::from)
        .unwrap_or(CellValue::Empty))
}

/// Exact match first, then ignoring case.
fn find_sheet(names: &[String], wanted: &str) -> Option<String> {
    names
        .iter()
        .find(|n| *n == wanted)
        .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case(wanted)))
        .cloned()
}

/// Evaluates the formula stored at `cell` from the workbook's formula texts.
pub fn evaluate_cell(path: &Path, sheet: &str, cell: &CellRef) -> Result<CellValue, EvalError> {
    let workbook = LoadedWorkbook::load(path)?;
    Evaluator::new(&workbook).evaluate_cell(sheet, cell.position())
}

struct LoadedSheet {
    name: String,
    values: Range<Data>,
    formulas: Range<String>,
}

/// Every sheet of an `.xlsx` file held in memory for evaluation.
pub struct LoadedWorkbook {
    sheets: Vec<LoadedSheet>,
}

impl LoadedWorkbook {
    pub fn load(path: &Path) -> Result<Self, EvalError> {
        let mut wb: Xlsx<_> =
            open_workbook(path).map_err(|e: XlsxError| EvalError::Workbook(e.to_string()))?;
        let mut sheets = Vec::new();
        for name in wb.sheet_names() {
            let values = wb
                .worksheet_range(&name)
                .map_err(|e| EvalError::Workbook(e.to_string()))?;
            let formulas = wb
                .worksheet_formula(&name)
                .map_err(|e| EvalError::Workbook(e.to_string()))?;
            sheets.push(LoadedSheet {
                name,
                values,
                formulas,
            });
        }
        Ok(Self { sheets })
    }

    fn sheet(&self, name: &str) -> Option<&LoadedSheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .or_else(|| self.sheets.iter().find(|s| s.name.eq_ignore_ascii_case(name)))
    }
}

impl CellSource for LoadedWorkbook {
    fn sheet_name(&self, name: &str) -> Option<&str> {
        self.sheet(name).map(|s| s.name.as_str())
    }

    fn value(&self, sheet: &str, at: Position) -> CellValue {
        match self.sheet(sheet).and_then(|s| s.values.get_value(at)) {
            // Formulas do arithmetic on dates as serial numbers.
            Some(Data::DateTime(dt)) => CellValue::Number(dt.as_f64()),
            Some(data) => CellValue::from(data),
            None => CellValue::Empty,
        }
    }

    fn formula(&self, sheet: &str, at: Position) -> Option<&str> {
        self.sheet(sheet)?
            .formulas
            .get_value(at)
            .map(String::as_str)
            .filter(|f| !f.trim().is_empty())
    }

    fn extent(&self, sheet: &str) -> Option<Position> {
        let sheet = self.sheet(sheet)?;
        match (sheet.values.end(), sheet.formulas.end()) {
            (Some(a), Some(b)) => Some((a.0.max(b.0), a.1.max(b.1))),
            (a, b) => a.or(b),
        }
    }
}
