// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spreadsheet discovery in the configured folder.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SheetError;

/// Name prefixes of dotfiles and office lock files.
const HIDDEN_PREFIXES: &[&str] = &[".", "~$"];

/// Workbook flavours the resolver can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    /// Office Open XML (`.xlsx`).
    Xlsx,
    /// Legacy BIFF (`.xls`).
    Xls,
}

impl WorkbookFormat {
    /// Detects the format from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(WorkbookFormat::Xlsx),
            "xls" => Some(WorkbookFormat::Xls),
            _ => None,
        }
    }
}

fn is_hidden(name: &str) -> bool {
    HIDDEN_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Visible `.xls`/`.xlsx` files directly inside `folder`, sorted by name
/// ignoring case. A missing folder yields an empty list.
pub fn list_files(folder: &Path) -> Result<Vec<PathBuf>, SheetError> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if is_hidden(name) {
            continue;
        }
        let path = entry.path();
        if WorkbookFormat::from_path(&path).is_some() && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by_cached_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    Ok(files)
}

/// The file name shown on buttons and in prompts.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
