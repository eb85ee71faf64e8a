use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::data::loader::{CLASS_COLUMN, GENE_COLUMN};
use crate::data::model::{Stage, StageTable};

pub const COMBINED_SHEET: &str = "All_Stages";
pub const STAGE_COLUMN: &str = "Stage";
pub const CASE_COLUMN: &str = "Case";

/// Row limit of the xlsx format, header included.
const MAX_ROWS: usize = 1_048_576;

// ---------------------------------------------------------------------------
// CellValue – type guess for a passthrough string
// ---------------------------------------------------------------------------

/// How a cell is written. A value becomes a number only when the number
/// prints back to exactly the source text, so `"007"`, `"+5"`, `"1e5"` and
/// integers wider than `i64` stay text.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue<'a> {
    Empty,
    Integer(i64),
    Float(f64),
    Text(&'a str),
}

impl<'a> CellValue<'a> {
    pub fn guess(s: &'a str) -> Self {
        if s.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(i) = s.parse::<i64>() {
            if i.to_string() == s {
                return CellValue::Integer(i);
            }
            return CellValue::Text(s);
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() && f.to_string() == s => CellValue::Float(f),
            _ => CellValue::Text(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Sheet – a named header + rows grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn table_columns(table: &StageTable) -> Vec<String> {
    if table.columns().is_empty() {
        vec![GENE_COLUMN.to_string(), CLASS_COLUMN.to_string()]
    } else {
        table.columns().to_vec()
    }
}

/// One stage: its source columns followed by the case id.
pub fn stage_sheet(table: &StageTable) -> Sheet {
    let columns = table_columns(table);
    let rows = table
        .records()
        .iter()
        .map(|rec| {
            let mut row: Vec<String> = columns
                .iter()
                .map(|c| rec.get(c).unwrap_or_default().to_string())
                .collect();
            row.push(rec.case_id.to_string());
            row
        })
        .collect();
    let mut headers = columns;
    headers.push(CASE_COLUMN.to_string());
    Sheet {
        name: table.stage().name().to_string(),
        headers,
        rows,
    }
}

/// All stages concatenated in canonical order with a leading stage column.
pub fn combined_sheet(tables: &BTreeMap<Stage, StageTable>) -> Sheet {
    let mut columns: Vec<String> = Vec::new();
    for table in tables.values() {
        for col in table_columns(table) {
            if !columns.contains(&col) {
                columns.push(col);
            }
        }
    }
    let mut rows = Vec::new();
    for (stage, table) in tables {
        for rec in table.records() {
            let mut row = Vec::with_capacity(columns.len() + 2);
            row.push(stage.name().to_string());
            row.extend(columns.iter().map(|c| rec.get(c).unwrap_or_default().to_string()));
            row.push(rec.case_id.to_string());
            rows.push(row);
        }
    }
    let mut headers = vec![STAGE_COLUMN.to_string()];
    headers.extend(columns);
    headers.push(CASE_COLUMN.to_string());
    Sheet {
        name: COMBINED_SHEET.to_string(),
        headers,
        rows,
    }
}

/// Per-stage sheets in canonical order, then the combined sheet.
pub fn cohort_sheets(tables: &BTreeMap<Stage, StageTable>) -> Vec<Sheet> {
    let mut sheets: Vec<Sheet> = tables.values().map(stage_sheet).collect();
    sheets.push(combined_sheet(tables));
    sheets
}

// ---------------------------------------------------------------------------
// xlsx writer
// ---------------------------------------------------------------------------

pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_xlsx(file, sheets).with_context(|| format!("writing workbook {}", path.display()))
}

/// Write a minimal SpreadsheetML package: inline strings, one bold header
/// row per sheet, no shared-string table.
pub fn write_xlsx<W: Write + Seek>(writer: W, sheets: &[Sheet]) -> Result<()> {
    if sheets.is_empty() {
        bail!("a workbook needs at least one sheet");
    }
    for sheet in sheets {
        validate_sheet_name(&sheet.name)?;
        if sheet.rows.len() + 1 > MAX_ROWS {
            bail!("sheet {} has {} rows, above the xlsx limit", sheet.name, sheet.rows.len());
        }
    }

    let mut zip = ZipWriter::new(writer);
    // Fixed timestamps keep repeated runs byte-identical.
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types(sheets.len()).as_bytes())?;
    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS.as_bytes())?;
    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml(sheets).as_bytes())?;
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(workbook_rels(sheets.len()).as_bytes())?;
    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(STYLES.as_bytes())?;
    for (i, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(sheet_xml(sheet).as_bytes())?;
    }
    zip.finish()?;
    Ok(())
}

fn validate_sheet_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > 31 {
        bail!("sheet name '{name}' must be 1-31 characters");
    }
    if name.chars().any(|c| "[]:*?/\\".contains(c)) {
        bail!("sheet name '{name}' contains a forbidden character");
    }
    Ok(())
}

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#
);

const STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="2"><font><sz val="11"/><name val="Calibri"/></font>"#,
    r#"<font><b/><sz val="11"/><name val="Calibri"/></font></fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill>"#,
    r#"<fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
    r#"<xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs>"#,
    r#"</styleSheet>"#
);

fn content_types(n_sheets: usize) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    for i in 1..=n_sheets {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(sheets: &[Sheet]) -> String {
    let mut xml = String::from(XML_DECL);
    let _ = write!(xml, r#"<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#);
    for (i, sheet) in sheets.iter().enumerate() {
        let _ = write!(
            xml,
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape_xml(&sheet.name),
            i + 1,
            i + 1
        );
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(n_sheets: usize) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    for i in 1..=n_sheets {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{i}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        );
    }
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{}" Type="{REL_NS}/styles" Target="styles.xml"/>"#,
        n_sheets + 1
    );
    xml.push_str("</Relationships>");
    xml
}

fn sheet_xml(sheet: &Sheet) -> String {
    let mut xml = String::from(XML_DECL);
    let _ = write!(xml, r#"<worksheet xmlns="{MAIN_NS}"><sheetData>"#);

    xml.push_str(r#"<row r="1">"#);
    for (col, header) in sheet.headers.iter().enumerate() {
        push_text_cell(&mut xml, &cell_ref(col, 1), header, Some(1));
    }
    xml.push_str("</row>");

    for (i, row) in sheet.rows.iter().enumerate() {
        let r = i + 2;
        let _ = write!(xml, r#"<row r="{r}">"#);
        for (col, value) in row.iter().enumerate() {
            let reference = cell_ref(col, r);
            match CellValue::guess(value) {
                CellValue::Empty => {}
                CellValue::Integer(v) => {
                    let _ = write!(xml, r#"<c r="{reference}"><v>{v}</v></c>"#);
                }
                CellValue::Float(v) => {
                    let _ = write!(xml, r#"<c r="{reference}"><v>{v}</v></c>"#);
                }
                CellValue::Text(s) => push_text_cell(&mut xml, &reference, s, None),
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_text_cell(xml: &mut String, reference: &str, text: &str, style: Option<u32>) {
    let style = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
    let _ = write!(
        xml,
        r#"<c r="{reference}" t="inlineStr"{style}><is><t xml:space="preserve">{}</t></is></c>"#,
        escape_xml(text)
    );
}

/// `A1`-style reference for a zero-based column and one-based row.
fn cell_ref(col: usize, row: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{row}", String::from_utf8_lossy(&letters))
}

/// Escape markup and drop control characters XML 1.0 cannot carry.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
