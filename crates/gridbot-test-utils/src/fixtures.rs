// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal `.xlsx` writer for tests.
//!
//! Writes just enough of an Office Open XML package for calamine to read:
//! inline strings, numbers, booleans and formulas with or without a cached
//! result.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use gridbot_sheets::CellRef;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[derive(Debug, Clone)]
enum Cell {
    Number(f64),
    Text(String),
    Bool(bool),
    Formula { text: String, cached: Option<f64> },
}

#[derive(Debug, Clone)]
struct Sheet {
    name: String,
    /// Keyed by (row, column) so rows come out in order.
    cells: BTreeMap<(u32, u32), Cell>,
}

/// Builds a workbook sheet by sheet; cell setters apply to the latest sheet.
#[derive(Debug, Clone, Default)]
pub struct XlsxBuilder {
    sheets: Vec<Sheet>,
}

impl XlsxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new sheet.
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

    /// A formula saved without a cached result, as written by tools that do
    /// not calculate.
    pub fn formula(self, cell: &str, text: &str) -> Self {
        self.put(
            cell,
            Cell::Formula {
                text: text.to_string(),
                cached: None,
            },
        )
    }

    /// A formula with the result a spreadsheet application would have cached.
    pub fn cached_formula(self, cell: &str, text: &str, cached: f64) -> Self {
        self.put(
            cell,
            Cell::Formula {
                text: text.to_string(),
                cached: Some(cached),
            },
        )
    }

    fn put(mut self, cell: &str, value: Cell) -> Self {
        let at: CellRef = cell.parse().expect("fixture cell coordinate");
        if self.sheets.is_empty() {
            self = self.sheet("Sheet1");
        }
        if let Some(sheet) = self.sheets.last_mut() {
            sheet.cells.insert((at.row(), at.column()), value);
        }
        self
    }

    /// Writes the package to `path` and returns it.
    pub fn write(&self, path: &Path) -> std::io::Result<PathBuf> {
        let file = std::fs::File::create(path)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        let mut put = |name: &str, body: String| -> std::io::Result<()> {
            zip.start_file(name, options).map_err(std::io::Error::other)?;
            zip.write_all(body.as_bytes())
        };

        put("[Content_Types].xml", self.content_types())?;
        put("_rels/.rels", ROOT_RELS.to_string())?;
        put("xl/workbook.xml", self.workbook_xml())?;
        put("xl/_rels/workbook.xml.rels", self.workbook_rels())?;
        for (i, sheet) in self.sheets.iter().enumerate() {
            put(&format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(sheet))?;
        }

        zip.finish().map_err(std::io::Error::other)?;
        Ok(path.to_path_buf())
    }

    /// Writes the package as `name` inside `dir`.
    pub fn write_in(&self, dir: &Path, name: &str) -> std::io::Result<PathBuf> {
        self.write(&dir.join(name))
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
"#,
        );
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
"#
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
"#,
        );
        for (i, sheet) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>\n",
                escape(&sheet.name),
                i + 1,
                i + 1
            ));
        }
        xml.push_str("</sheets>\n</workbook>");
        xml
    }

    fn workbook_rels(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
        );
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>
"#
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

fn sheet_xml(sheet: &Sheet) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
"#,
    );
    let mut current_row = None;
    for (&(row, col), cell) in &sheet.cells {
        if current_row != Some(row) {
            if current_row.is_some() {
                xml.push_str("</row>\n");
            }
            xml.push_str(&format!("<row r=\"{row}\">"));
            current_row = Some(row);
        }
        let reference = format!("{}{}", gridbot_sheets::index_to_column(col), row);
        xml.push_str(&cell_xml(&reference, cell));
    }
    if current_row.is_some() {
        xml.push_str("</row>\n");
    }
    xml.push_str("</sheetData>\n</worksheet>");
    xml
}

fn cell_xml(reference: &str, cell: &Cell) -> String {
    match cell {
        Cell::Number(n) => format!("<c r=\"{reference}\"><v>{n}</v></c>"),
        Cell::Text(s) => format!(
            "<c r=\"{reference}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
            escape(s)
        ),
        Cell::Bool(b) => format!("<c r=\"{reference}\" t=\"b\"><v>{}</v></c>", u8::from(*b)),
        Cell::Formula { text, cached: None } => {
            format!("<c r=\"{reference}\"><f>{}</f></c>", escape(text))
        }
        Cell::Formula {
            text,
            cached: Some(v),
        } => format!("<c r=\"{reference}\"><f>{}</f><v>{v}</v></c>", escape(text)),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
