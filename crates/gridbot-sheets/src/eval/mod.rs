// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline formula evaluation.
//!
//! Used when a workbook stores a formula without a cached result. Formulas are
//! parsed into a small AST and walked against a [`CellSource`]; referenced cells
//! that are themselves uncached formulas are evaluated on demand.

mod engine;
pub mod parser;

use thiserror::Error;

use crate::value::CellValue;

pub use engine::Evaluator;
pub use parser::{Expr, parse_formula};

/// Deepest allowed chain of nested expressions or cell-to-cell formula hops.
pub const MAX_DEPTH: usize = 64;

/// Deepest recursion while evaluating, summed across every formula hop.
/// Operator chains such as `A1+A2+...` are folded in a loop and do not count.
pub const MAX_EVAL_DEPTH: usize = 128;

/// Excel's own limit on formula text.
pub const MAX_FORMULA_LEN: usize = 8192;

/// Why a formula could not be evaluated at all.
///
/// Spreadsheet-level errors such as `#DIV/0!` are values, not `EvalError`s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("cannot parse formula: {0}")]
    Parse(String),

    #[error("unsupported function {0}")]
    UnknownFunction(String),

    #[error("{name} takes {expected}")]
    Arity { name: String, expected: &'static str },

    #[error("sheet `{0}` does not exist")]
    UnknownSheet(String),

    #[error("circular reference through {0}")]
    Cycle(String),

    #[error("formula nests too deeply")]
    TooDeep,

    #[error("formula is longer than {MAX_FORMULA_LEN} characters")]
    TooLong,

    #[error("{0}")]
    Workbook(String),
}

/// Read access to a workbook's cached values and formula texts.
pub trait CellSource {
    /// Canonical name of the sheet matching `name` case-insensitively.
    fn sheet_name(&self, name: &str) -> Option<&str>;

    /// Cached value at a zero-based position. Dates are exposed as serial numbers.
    fn value(&self, sheet: &str, at: parser::Position) -> CellValue;

    /// Formula text at a zero-based position, without the leading `=`.
    fn formula(&self, sheet: &str, at: parser::Position) -> Option<&str>;

    /// Last used zero-based `(row, column)` of the sheet, if it has any cells.
    fn extent(&self, sheet: &str) -> Option<parser::Position>;
}
