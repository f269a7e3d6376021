//! Serialization of report tables into downloadable files.
//!
//! One contract covers every export: a [`Table`] plus a [`Format`] yields the
//! file bytes. Column order is the table's header order in all formats, and
//! an empty table still produces a file holding just the header row.

use crate::error::{DashboardError, Result};
use crate::report::Table;
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Color, Format as CellFormat, FormatAlign, Workbook, Worksheet};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;
use std::str::FromStr;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const HEADER_FILL: u32 = 0xE9ECF0;
const MAX_SHEET_NAME: usize = 31;

/// Output file format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Xlsx,
    Csv,
    Json,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Xlsx => "xlsx",
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Format::Csv => "text/csv; charset=utf-8",
            Format::Json => "application/json",
        }
    }

    /// Download name: `<stem>_<YYYYmmdd_HHMM>.<ext>`
    pub fn file_name(self, stem: &str, at: NaiveDateTime) -> String {
        format!("{}_{}.{}", stem, at.format("%Y%m%d_%H%M"), self.extension())
    }
}

impl FromStr for Format {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Format> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(Format::Xlsx),
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            other => Err(DashboardError::validation(format!(
                "unsupported export format `{other}`"
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Serialize `table` into `format`
pub fn serialize(table: &Table, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Xlsx => to_xlsx(table, "Sheet1"),
        Format::Csv => to_csv(table),
        Format::Json => to_json(table),
    }
}

/// Comma-separated text, UTF-8 with a byte-order mark so spreadsheet
/// applications pick the right encoding for Arabic text
pub fn to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| DashboardError::Export(e.to_string()))
}

/// An array of objects keyed by header label, keys in column order
pub fn to_json(table: &Table) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&Records(table))?)
}

struct Records<'a>(&'a Table);

struct Record<'a> {
    headers: &'a [String],
    cells: &'a [String],
}

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.rows.len()))?;
        for cells in &self.0.rows {
            seq.serialize_element(&Record {
                headers: &self.0.headers,
                cells,
            })?;
        }
        seq.end()
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (i, header) in self.headers.iter().enumerate() {
            let cell = self.cells.get(i).map(String::as_str).unwrap_or("");
            map.serialize_entry(header, cell)?;
        }
        map.end()
    }
}

/// Single-sheet workbook
pub fn to_xlsx(table: &Table, sheet_name: &str) -> Result<Vec<u8>> {
    to_workbook(&[(sheet_name.to_string(), table.clone())])
}

/// Multi-sheet workbook, one right-to-left sheet per table
pub fn to_workbook(sheets: &[(String, Table)]) -> Result<Vec<u8>> {
    if sheets.is_empty() {
        return Err(DashboardError::Export("a workbook needs at least one sheet".into()));
    }
    let mut workbook = Workbook::new();
    for (name, table) in sheets {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(sheet_name(name))?;
        write_sheet(&mut worksheet, table)?;
        workbook.push_worksheet(worksheet);
    }
    Ok(workbook.save_to_buffer()?)
}

fn write_sheet(worksheet: &mut Worksheet, table: &Table) -> Result<()> {
    let header_format = CellFormat::new()
        .set_bold()
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Right);

    worksheet.set_right_to_left(true);

    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for (c, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col(c)?, header, &header_format)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = u32::try_from(r + 1)
            .map_err(|_| DashboardError::Export("too many rows for a worksheet".into()))?;
        for (c, cell) in row.iter().enumerate().take(table.headers.len()) {
            if !cell.is_empty() {
                worksheet.write_string(r, col(c)?, cell)?;
            }
            widths[c] = widths[c].max(cell.chars().count());
        }
    }
    for (c, width) in widths.into_iter().enumerate() {
        worksheet.set_column_width(col(c)?, (width + 2) as f64)?;
    }
    Ok(())
}

fn col(c: usize) -> Result<u16> {
    u16::try_from(c).map_err(|_| DashboardError::Export("too many columns for a worksheet".into()))
}

/// Worksheet names are capped at 31 characters and may not contain `[]:*?/\`
fn sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            vec!["الاسم".into(), "العدد".into()],
            vec![vec!["أحمد, علي".into(), "3".into()]],
        )
    }

    #[test]
    fn csv_starts_with_bom_and_quotes_commas() {
        let bytes = to_csv(&table()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "الاسم,العدد\n\"أحمد, علي\",3\n");
    }

    #[test]
    fn json_keeps_column_order_and_arabic_text() {
        let text = String::from_utf8(to_json(&table()).unwrap()).unwrap();
        let name = text.find("الاسم").unwrap();
        let count = text.find("العدد").unwrap();
        assert!(name < count);
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn format_parsing_and_names() {
        assert_eq!("Excel".parse::<Format>().unwrap(), Format::Xlsx);
        assert!("pdf".parse::<Format>().is_err());
        let at = chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 0)
            .unwrap();
        assert_eq!(Format::Csv.file_name("data_export", at), "data_export_20240305_0907.csv");
    }

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sheet_name("a/b:c"), "abc");
        assert_eq!(sheet_name("???"), "Sheet1");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }
}
