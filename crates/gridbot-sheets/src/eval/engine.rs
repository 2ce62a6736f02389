// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tree-walking evaluation of parsed formulas.
//!
//! Spreadsheet errors (`#DIV/0!`, `#VALUE!`, `#NUM!`) are ordinary values that
//! propagate through operators and functions. Inner helpers carry them on the
//! `Err` side of `Result<_, CellValue>` so `?` can short-circuit.

use std::cmp::Ordering;

use super::parser::{BinaryOp, Expr, Position, parse_formula};
use super::{CellSource, EvalError, MAX_DEPTH, MAX_EVAL_DEPTH};
use crate::coord::index_to_column;
use crate::value::CellValue;

const DIV0: &str = "#DIV/0!";
const VALUE: &str = "#VALUE!";
const NUM: &str = "#NUM!";

fn xl_error(code: &str) -> CellValue {
    CellValue::Error(code.to_string())
}

/// An evaluated function argument.
enum Arg {
    /// A literal or computed scalar.
    Value(CellValue),
    /// Values read through a cell or range reference.
    Cells(Vec<CellValue>),
}

/// Evaluates formulas against one workbook.
pub struct Evaluator<'a> {
    source: &'a dyn CellSource,
    /// Cells currently being evaluated, innermost last.
    stack: Vec<(String, Position)>,
    /// Live `scalar` frames across all cells on `stack`.
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(source: &'a dyn CellSource) -> Self {
        Self {
            source,
            stack: Vec::new(),
            depth: 0,
        }
    }

    /// Computes the cell at `at`. Cells without a formula yield their cached value.
    pub fn evaluate_cell(&mut self, sheet: &str, at: Position) -> Result<CellValue, EvalError> {
        let sheet = self.resolve_sheet(Some(sheet), sheet)?;
        let Some(formula) = self.source.formula(&sheet, at).map(str::to_string) else {
            return Ok(self.source.value(&sheet, at));
        };

        if self.stack.iter().any(|(s, p)| *s == sheet && *p == at) {
            let label = format!("{sheet}!{}{}", index_to_column(at.1 + 1), at.0 + 1);
            return Err(EvalError::Cycle(label));
        }
        if self.stack.len() >= MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }

        self.stack.push((sheet.clone(), at));
        let result = parse_formula(&formula).and_then(|expr| self.scalar(&expr, &sheet));
        self.stack.pop();
        result.map(finite)
    }

    fn resolve_sheet(&self, sheet: Option<&str>, current: &str) -> Result<String, EvalError> {
        let wanted = sheet.unwrap_or(current);
        self.source
            .sheet_name(wanted)
            .map(str::to_string)
            .ok_or_else(|| EvalError::UnknownSheet(wanted.to_string()))
    }

    /// Value seen through a reference: the cached value, or the formula result
    /// when the cell holds an uncached formula.
    fn referenced(&mut self, sheet: &str, at: Position) -> Result<CellValue, EvalError> {
        let cached = self.source.value(sheet, at);
        if cached != CellValue::Empty || self.source.formula(sheet, at).is_none() {
            return Ok(cached);
        }
        self.evaluate_cell(sheet, at)
    }

    fn scalar(&mut self, expr: &Expr, current: &str) -> Result<CellValue, EvalError> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(EvalError::TooDeep);
        }
        self.depth += 1;
        let result = self.scalar_inner(expr, current);
        self.depth -= 1;
        result
    }

    fn scalar_inner(&mut self, expr: &Expr, current: &str) -> Result<CellValue, EvalError> {
        let value = match expr {
            Expr::Number(n) => CellValue::Number(*n),
            Expr::Text(s) => CellValue::Text(s.clone()),
            Expr::Bool(b) => CellValue::Bool(*b),
            Expr::Cell { sheet, at } => {
                let sheet = self.resolve_sheet(sheet.as_deref(), current)?;
                self.referenced(&sheet, *at)?
            }
            Expr::Range { .. } => xl_error(VALUE),
            Expr::Negate(inner) => {
                let v = self.scalar(inner, current)?;
                flatten(number(&v).map(|n| CellValue::Number(-n)))
            }
            Expr::Percent(inner) => {
                let v = self.scalar(inner, current)?;
                flatten(number(&v).map(|n| CellValue::Number(n / 100.0)))
            }
            Expr::Binary { .. } => self.chain(expr, current)?,
            Expr::Call { name, args } => self.call(name, args, current)?,
        };
        Ok(value)
    }

    /// Left-associative operators nest on the left, so a long `a+b+c+...`
    /// is walked down its left spine and folded back up without recursion.
    fn chain(&mut self, expr: &Expr, current: &str) -> Result<CellValue, EvalError> {
        let mut rights = Vec::new();
        let mut leftmost = expr;
        while let Expr::Binary { op, left, right } = leftmost {
            rights.push((*op, right.as_ref()));
            leftmost = left.as_ref();
        }

        let mut acc = self.scalar(leftmost, current)?;
        for (op, right) in rights.into_iter().rev() {
            let r = self.scalar(right, current)?;
            acc = flatten(binary(op, &acc, &r));
        }
        Ok(acc)
    }

    fn arg(&mut self, expr: &Expr, current: &str) -> Result<Arg, EvalError> {
        match expr {
            Expr::Cell { .. } => Ok(Arg::Cells(vec![self.scalar(expr, current)?])),
            Expr::Range { sheet, start, end } => {
                let sheet = self.resolve_sheet(sheet.as_deref(), current)?;
                let Some((max_row, max_col)) = self.source.extent(&sheet) else {
                    return Ok(Arg::Cells(Vec::new()));
                };
                let mut values = Vec::new();
                for row in start.0..=end.0.min(max_row) {
                    for col in start.1..=end.1.min(max_col) {
                        values.push(self.referenced(&sheet, (row, col))?);
                    }
                }
                Ok(Arg::Cells(values))
            }
            _ => Ok(Arg::Value(self.scalar(expr, current)?)),
        }
    }

    fn call(&mut self, name: &str, args: &[Expr], current: &str) -> Result<CellValue, EvalError> {
        if name == "IF" {
            return self.if_then_else(args, current);
        }

        let args = args
            .iter()
            .map(|a| self.arg(a, current))
            .collect::<Result<Vec<_>, _>>()?;

        let value = match name {
            "SUM" => flatten(numbers(&args).map(|ns| CellValue::Number(ns.iter().sum()))),
            "PRODUCT" => flatten(numbers(&args).map(|ns| {
                CellValue::Number(if ns.is_empty() { 0.0 } else { ns.iter().product() })
            })),
            "AVERAGE" => flatten(numbers(&args).and_then(|ns| {
                if ns.is_empty() {
                    Err(xl_error(DIV0))
                } else {
                    Ok(CellValue::Number(ns.iter().sum::<f64>() / ns.len() as f64))
                }
            })),
            "MIN" => flatten(numbers(&args).map(|ns| {
                CellValue::Number(ns.into_iter().reduce(f64::min).unwrap_or(0.0))
            })),
            "MAX" => flatten(numbers(&args).map(|ns| {
                CellValue::Number(ns.into_iter().reduce(f64::max).unwrap_or(0.0))
            })),
            "COUNT" => CellValue::Number(count(&args) as f64),
            "COUNTA" => CellValue::Number(count_non_empty(&args) as f64),
            "ABS" => {
                arity(name, &args, 1, 1, "exactly one argument")?;
                flatten(number(&single(&args[0])).map(|n| CellValue::Number(n.abs())))
            }
            "ROUND" => {
                arity(name, &args, 1, 2, "one or two arguments")?;
                flatten(round(&args))
            }
            "AND" => flatten(logicals(&args).map(|bs| CellValue::Bool(bs.iter().all(|b| *b)))),
            "OR" => flatten(logicals(&args).map(|bs| CellValue::Bool(bs.iter().any(|b| *b)))),
            "NOT" => {
                arity(name, &args, 1, 1, "exactly one argument")?;
                flatten(logical(&single(&args[0])).map(|b| CellValue::Bool(!b)))
            }
            "CONCATENATE" => {
                arity(name, &args, 1, usize::MAX, "at least one argument")?;
                flatten(
                    args.iter()
                        .map(|a| text(&single(a)))
                        .collect::<Result<String, _>>()
                        .map(CellValue::Text),
                )
            }
            "CONCAT" => {
                arity(name, &args, 1, usize::MAX, "at least one argument")?;
                flatten(concat_all(&args))
            }
            _ => return Err(EvalError::UnknownFunction(name.to_string())),
        };
        Ok(value)
    }

    /// Only the selected branch is evaluated.
    fn if_then_else(&mut self, args: &[Expr], current: &str) -> Result<CellValue, EvalError> {
        if !(2..=3).contains(&args.len()) {
            return Err(EvalError::Arity {
                name: "IF".into(),
                expected: "two or three arguments",
            });
        }
        let condition = self.scalar(&args[0], current)?;
        match logical(&condition) {
            Err(e) => Ok(e),
            Ok(true) => self.scalar(&args[1], current),
            Ok(false) => match args.get(2) {
                Some(otherwise) => self.scalar(otherwise, current),
                None => Ok(CellValue::Bool(false)),
            },
        }
    }
}

fn arity(
    name: &str,
    args: &[Arg],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), EvalError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(EvalError::Arity {
            name: name.to_string(),
            expected,
        })
    }
}

fn flatten(result: Result<CellValue, CellValue>) -> CellValue {
    result.unwrap_or_else(|e| e)
}

fn finite(value: CellValue) -> CellValue {
    match value {
        CellValue::Number(n) if !n.is_finite() => xl_error(NUM),
        other => other,
    }
}

/// Collapses an argument to one value, the way a scalar parameter sees it.
fn single(arg: &Arg) -> CellValue {
    match arg {
        Arg::Value(v) => v.clone(),
        Arg::Cells(values) => match values.as_slice() {
            [] => CellValue::Empty,
            [v] => v.clone(),
            _ => xl_error(VALUE),
        },
    }
}

fn number(value: &CellValue) -> Result<f64, CellValue> {
    match value {
        CellValue::Number(n) => Ok(*n),
        CellValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        CellValue::Empty => Ok(0.0),
        CellValue::Text(s) => s.trim().parse::<f64>().map_err(|_| xl_error(VALUE)),
        CellValue::DateTime(_) => Err(xl_error(VALUE)),
        CellValue::Error(_) => Err(value.clone()),
    }
}

fn logical(value: &CellValue) -> Result<bool, CellValue> {
    match value {
        CellValue::Bool(b) => Ok(*b),
        CellValue::Number(n) => Ok(*n != 0.0),
        CellValue::Empty => Ok(false),
        CellValue::Text(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
        CellValue::Text(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
        CellValue::Text(_) | CellValue::DateTime(_) => Err(xl_error(VALUE)),
        CellValue::Error(_) => Err(value.clone()),
    }
}

fn text(value: &CellValue) -> Result<String, CellValue> {
    match value {
        CellValue::Number(n) => Ok(number_text(*n)),
        CellValue::Bool(true) => Ok("TRUE".into()),
        CellValue::Bool(false) => Ok("FALSE".into()),
        CellValue::Empty => Ok(String::new()),
        CellValue::Text(s) | CellValue::DateTime(s) => Ok(s.clone()),
        CellValue::Error(_) => Err(value.clone()),
    }
}

/// Renders a number the way a General-formatted cell does: integers without a
/// fraction, others with up to 15 significant digits.
fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let magnitude = n.abs().log10().floor() as i32;
    let decimals = (14 - magnitude).clamp(0, 15) as usize;
    let fixed = format!("{n:.decimals$}");
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

/// Numbers for aggregate functions. Referenced text, booleans and blanks are
/// skipped; literal arguments are coerced.
fn numbers(args: &[Arg]) -> Result<Vec<f64>, CellValue> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Arg::Value(v) => out.push(number(v)?),
            Arg::Cells(values) => {
                for v in values {
                    match v {
                        CellValue::Number(n) => out.push(*n),
                        CellValue::Error(_) => return Err(v.clone()),
                        _ => {}
                    }
                }
            }
        }
    }
    Ok(out)
}

fn count(args: &[Arg]) -> usize {
    args.iter()
        .map(|arg| match arg {
            Arg::Value(CellValue::Empty | CellValue::Error(_)) => 0,
            Arg::Value(v) => usize::from(number(v).is_ok()),
            Arg::Cells(values) => values
                .iter()
                .filter(|v| matches!(v, CellValue::Number(_)))
                .count(),
        })
        .sum()
}

fn count_non_empty(args: &[Arg]) -> usize {
    args.iter()
        .map(|arg| match arg {
            Arg::Value(_) => 1,
            Arg::Cells(values) => values.iter().filter(|v| **v != CellValue::Empty).count(),
        })
        .sum()
}

fn logicals(args: &[Arg]) -> Result<Vec<bool>, CellValue> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Arg::Value(CellValue::Empty) => {}
            Arg::Value(v) => out.push(logical(v)?),
            Arg::Cells(values) => {
                for v in values {
                    match v {
                        CellValue::Bool(b) => out.push(*b),
                        CellValue::Number(n) => out.push(*n != 0.0),
                        CellValue::Error(_) => return Err(v.clone()),
                        _ => {}
                    }
                }
            }
        }
    }
    if out.is_empty() {
        return Err(xl_error(VALUE));
    }
    Ok(out)
}

fn concat_all(args: &[Arg]) -> Result<CellValue, CellValue> {
    let mut out = String::new();
    for arg in args {
        match arg {
            Arg::Value(v) => out.push_str(&text(v)?),
            Arg::Cells(values) => {
                for v in values {
                    out.push_str(&text(v)?);
                }
            }
        }
    }
    Ok(CellValue::Text(out))
}

/// Rounds half away from zero. Negative digit counts round left of the point.
fn round(args: &[Arg]) -> Result<CellValue, CellValue> {
    let value = number(&single(&args[0]))?;
    let digits = match args.get(1) {
        Some(arg) => number(&single(arg))?.trunc() as i32,
        None => 0,
    };
    let factor = 10f64.powi(digits.abs());
    let rounded = if digits >= 0 {
        // Absorb representation noise first: 2.345 * 100 is 234.49999999999997.
        let scaled = ((value * factor) * 1e9).round() / 1e9;
        scaled.round() / factor
    } else {
        (value / factor).round() * factor
    };
    Ok(CellValue::Number(rounded))
}

fn binary(op: BinaryOp, l: &CellValue, r: &CellValue) -> Result<CellValue, CellValue> {
    match op {
        BinaryOp::Concat => Ok(CellValue::Text(text(l)? + &text(r)?)),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(l, r)?;
            let result = match op {
                BinaryOp::Eq => ordering == Ordering::Equal,
                BinaryOp::Ne => ordering != Ordering::Equal,
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(CellValue::Bool(result))
        }
        _ => {
            let a = number(l)?;
            let b = number(r)?;
            let n = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if b == 0.0 => return Err(xl_error(DIV0)),
                BinaryOp::Div => a / b,
                BinaryOp::Pow if a == 0.0 && b == 0.0 => return Err(xl_error(NUM)),
                BinaryOp::Pow if a == 0.0 && b < 0.0 => return Err(xl_error(DIV0)),
                _ => a.powf(b),
            };
            Ok(finite(CellValue::Number(n)))
        }
    }
}

/// Comparison key. Across kinds, numbers sort before text before booleans.
#[derive(Debug)]
enum Key {
    Num(f64),
    Str(String),
    Bool(bool),
}

impl Key {
    fn rank(&self) -> u8 {
        match self {
            Key::Num(_) => 0,
            Key::Str(_) => 1,
            Key::Bool(_) => 2,
        }
    }
}

fn key(value: &CellValue, other: &CellValue) -> Key {
    match value {
        CellValue::Number(n) => Key::Num(*n),
        CellValue::Text(s) | CellValue::DateTime(s) => Key::Str(s.to_lowercase()),
        CellValue::Bool(b) => Key::Bool(*b),
        // A blank takes on the kind of whatever it is compared with.
        _ => match other {
            CellValue::Text(_) | CellValue::DateTime(_) => Key::Str(String::new()),
            CellValue::Bool(_) => Key::Bool(false),
            _ => Key::Num(0.0),
        },
    }
}

fn compare(l: &CellValue, r: &CellValue) -> Result<Ordering, CellValue> {
    for v in [l, r] {
        if matches!(v, CellValue::Error(_)) {
            return Err(v.clone());
        }
    }
    let ordering = match (key(l, r), key(r, l)) {
        (Key::Num(a), Key::Num(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Key::Str(a), Key::Str(b)) => a.cmp(&b),
        (Key::Bool(a), Key::Bool(b)) => a.cmp(&b),
        (a, b) => a.rank().cmp(&b.rank()),
    };
    Ok(ordering)
}
