// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal legacy `.xls` writer for tests.
//!
//! Emits a BIFF8 `Workbook` stream inside a compound file: one BOUNDSHEET per
//! sheet in the globals, then a worksheet substream per sheet holding NUMBER,
//! LABEL and BOOLERR records. That is all calamine needs to list sheets and
//! read cell values.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use gridbot_sheets::CellRef;

const RECORD_BOF: u16 = 0x0809;
const RECORD_EOF: u16 = 0x000A;
const RECORD_CODEPAGE: u16 = 0x0042;
const RECORD_WINDOW1: u16 = 0x003D;
const RECORD_FONT: u16 = 0x0031;
const RECORD_XF: u16 = 0x00E0;
const RECORD_BOUNDSHEET: u16 = 0x0085;
const RECORD_DIMENSIONS: u16 = 0x0200;
const RECORD_WINDOW2: u16 = 0x023E;
const RECORD_NUMBER: u16 = 0x0203;
const RECORD_LABEL: u16 = 0x0204;
const RECORD_BOOLERR: u16 = 0x0205;

const BOF_VERSION_BIFF8: u16 = 0x0600;
const BOF_DT_WORKBOOK_GLOBALS: u16 = 0x0005;
const BOF_DT_WORKSHEET: u16 = 0x0010;

const XF_FLAG_LOCKED: u16 = 0x0001;
const XF_FLAG_STYLE: u16 = 0x0004;

/// Index of the single General cell XF, after the 16 style XFs.
const XF_GENERAL: u16 = 16;

const MAX_ROWS: u32 = 65_536;
const MAX_COLUMNS: u32 = 256;

#[derive(Debug, Clone)]
enum Cell {
    Number(f64),
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone)]
struct Sheet {
    name: String,
    cells: BTreeMap<(u32, u32), Cell>,
}

/// Builds a BIFF8 workbook sheet by sheet; cell setters apply to the latest sheet.
#[derive(Debug, Clone, Default)]
pub struct XlsBuilder {
    sheets: Vec<Sheet>,
}

impl XlsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, name: &str) -> Self {
        self.sheets.push(Sheet {
            name: name.to_string(),
            cells: BTreeMap::new(),
        });
        self
    }

    pub fn number(self, cell: &str, value: f64) -> Self {
        self.put(cell, Cell::Number(value))
    }

    pub fn text(self, cell: &str, value: &str) -> Self {
        self.put(cell, Cell::Text(value.to_string()))
    }

    pub fn bool(self, cell: &str, value: bool) -> Self {
        self.put(cell, Cell::Bool(value))
    }

    fn put(mut self, cell: &str, value: Cell) -> Self {
        let at: CellRef = cell.parse().expect("fixture cell coordinate");
        assert!(
            at.row() <= MAX_ROWS && at.column() <= MAX_COLUMNS,
            "{cell} is outside the BIFF8 grid"
        );
        if self.sheets.is_empty() {
            self = self.sheet("Sheet1");
        }
        if let Some(sheet) = self.sheets.last_mut() {
            sheet.cells.insert(at.position(), value);
        }
        self
    }

    /// Writes the compound file to `path` and returns it.
    pub fn write(&self, path: &Path) -> std::io::Result<PathBuf> {
        let stream = self.workbook_stream()?;

        let mut ole = cfb::CompoundFile::create(Cursor::new(Vec::new()))?;
        {
            let mut workbook = ole.create_stream("Workbook")?;
            workbook.write_all(&stream)?;
        }
        std::fs::write(path, ole.into_inner().into_inner())?;
        Ok(path.to_path_buf())
    }

    pub fn write_in(&self, dir: &Path, name: &str) -> std::io::Result<PathBuf> {
        self.write(&dir.join(name))
    }

    fn workbook_stream(&self) -> std::io::Result<Vec<u8>> {
        let mut globals = Vec::new();
        push_record(&mut globals, RECORD_BOF, &bof(BOF_DT_WORKBOOK_GLOBALS));
        push_record(&mut globals, RECORD_CODEPAGE, &1200u16.to_le_bytes());
        push_record(&mut globals, RECORD_WINDOW1, &window1());
        push_record(&mut globals, RECORD_FONT, &font("Arial")?);
        for _ in 0..XF_GENERAL {
            push_record(&mut globals, RECORD_XF, &xf_record(true));
        }
        push_record(&mut globals, RECORD_XF, &xf_record(false));

        // BOUNDSHEET offsets are patched once the substream positions are known.
        let mut offset_slots = Vec::with_capacity(self.sheets.len());
        for sheet in &self.sheets {
            let mut data = Vec::new();
            data.extend_from_slice(&0u32.to_le_bytes());
            data.extend_from_slice(&0u16.to_le_bytes()); // visible worksheet
            write_short_string(&mut data, &sheet.name)?;
            offset_slots.push(globals.len() + 4);
            push_record(&mut globals, RECORD_BOUNDSHEET, &data);
        }
        push_record(&mut globals, RECORD_EOF, &[]);

        for (sheet, slot) in self.sheets.iter().zip(offset_slots) {
            let offset = u32::try_from(globals.len()).map_err(std::io::Error::other)?;
            globals[slot..slot + 4].copy_from_slice(&offset.to_le_bytes());
            globals.extend_from_slice(&sheet_stream(sheet)?);
        }
        Ok(globals)
    }
}

fn sheet_stream(sheet: &Sheet) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    push_record(&mut out, RECORD_BOF, &bof(BOF_DT_WORKSHEET));

    let rows = sheet.cells.keys().map(|(r, _)| *r);
    let cols = sheet.cells.keys().map(|(_, c)| *c);
    let (first_row, last_row) = (rows.clone().min().unwrap_or(0), rows.max().map_or(0, |r| r + 1));
    let (first_col, last_col) = (cols.clone().min().unwrap_or(0), cols.max().map_or(0, |c| c + 1));
    let mut dims = Vec::new();
    dims.extend_from_slice(&first_row.to_le_bytes());
    dims.extend_from_slice(&last_row.to_le_bytes());
    dims.extend_from_slice(&(first_col as u16).to_le_bytes());
    dims.extend_from_slice(&(last_col as u16).to_le_bytes());
    dims.extend_from_slice(&0u16.to_le_bytes());
    push_record(&mut out, RECORD_DIMENSIONS, &dims);
    push_record(&mut out, RECORD_WINDOW2, &window2());

    for (&(row, col), cell) in &sheet.cells {
        let mut data = Vec::new();
        data.extend_from_slice(&(row as u16).to_le_bytes());
        data.extend_from_slice(&(col as u16).to_le_bytes());
        data.extend_from_slice(&XF_GENERAL.to_le_bytes());
        let id = match cell {
            Cell::Number(n) => {
                data.extend_from_slice(&n.to_le_bytes());
                RECORD_NUMBER
            }
            Cell::Text(s) => {
                write_long_string(&mut data, s)?;
                RECORD_LABEL
            }
            Cell::Bool(b) => {
                data.push(u8::from(*b));
                data.push(0); // a boolean, not an error code
                RECORD_BOOLERR
            }
        };
        push_record(&mut out, id, &data);
    }

    push_record(&mut out, RECORD_EOF, &[]);
    Ok(out)
}

fn push_record(out: &mut Vec<u8>, id: u16, data: &[u8]) {
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

fn bof(dt: u16) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..2].copy_from_slice(&BOF_VERSION_BIFF8.to_le_bytes());
    out[2..4].copy_from_slice(&dt.to_le_bytes());
    out[4..6].copy_from_slice(&0x0DBBu16.to_le_bytes()); // build
    out[6..8].copy_from_slice(&0x07CCu16.to_le_bytes()); // year
    out
}

fn window1() -> [u8; 18] {
    let mut out = [0u8; 18];
    out[14..16].copy_from_slice(&1u16.to_le_bytes()); // selected tabs
    out[16..18].copy_from_slice(&600u16.to_le_bytes()); // tab ratio
    out
}

fn window2() -> [u8; 18] {
    let mut out = [0u8; 18];
    out[0..2].copy_from_slice(&0x02B6u16.to_le_bytes());
    out
}

fn font(name: &str) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&200u16.to_le_bytes()); // 10pt in twips
    out.extend_from_slice(&0u16.to_le_bytes()); // options
    out.extend_from_slice(&0x7FFFu16.to_le_bytes()); // automatic colour
    out.extend_from_slice(&400u16.to_le_bytes()); // normal weight
    out.extend_from_slice(&0u16.to_le_bytes()); // no super/subscript
    out.extend_from_slice(&[0, 0, 0, 0]); // underline, family, charset, reserved
    write_short_string(&mut out, name)?;
    Ok(out)
}

fn xf_record(style: bool) -> [u8; 20] {
    let mut out = [0u8; 20];
    let flags = XF_FLAG_LOCKED | if style { XF_FLAG_STYLE } else { 0 };
    out[4..6].copy_from_slice(&flags.to_le_bytes());
    out[6] = 0x20; // General, bottom aligned
    out[9] = 0x3F;
    out
}

/// Character count and payload: 8-bit for ASCII, UTF-16LE otherwise.
fn encode(s: &str) -> (usize, u8, Vec<u8>) {
    if s.is_ascii() {
        (s.len(), 0x00, s.as_bytes().to_vec())
    } else {
        let units: Vec<u16> = s.encode_utf16().collect();
        let bytes = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        (units.len(), 0x01, bytes)
    }
}

/// ShortXLUnicodeString: one-byte length.
fn write_short_string(out: &mut Vec<u8>, s: &str) -> std::io::Result<()> {
    let (len, flags, bytes) = encode(s);
    out.push(u8::try_from(len).map_err(std::io::Error::other)?);
    out.push(flags);
    out.extend_from_slice(&bytes);
    Ok(())
}

/// XLUnicodeString: two-byte length.
fn write_long_string(out: &mut Vec<u8>, s: &str) -> std::io::Result<()> {
    let (len, flags, bytes) = encode(s);
    out.extend_from_slice(&u16::try_from(len).map_err(std::io::Error::other)?.to_le_bytes());
    out.push(flags);
    out.extend_from_slice(&bytes);
    Ok(())
}
