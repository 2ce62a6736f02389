// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Currency rendering for numeric cell values.

/// Prefix shown before every numeric result.
pub const CURRENCY_PREFIX: &str = "R";

/// Formats a number as `R1,234.50`: the `R` prefix, comma thousands
/// separators and exactly two decimals. Negative values keep their sign
/// after the prefix (`R-1,234.50`).
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return format!("{CURRENCY_PREFIX}{value}");
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let negative = value.is_sign_negative() && fixed.bytes().any(|b| matches!(b, b'1'..=b'9'));

    let mut out = String::with_capacity(fixed.len() + whole.len() / 3 + 2);
    out.push_str(CURRENCY_PREFIX);
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(whole));
    out.push('.');
    out.push_str(frac);
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
