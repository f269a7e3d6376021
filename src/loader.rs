use crate::columns::Field;
use crate::employee::{DATE_FORMAT, Employee};
use crate::error::{DashboardError, Result};
use crate::store::RecordStore;
use calamine::{Data, Reader, Xlsx};
use log::{info, warn};
use std::io::Cursor;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Load employees from the bytes of an `.xlsx` workbook (first worksheet)
///
/// # Examples
/// ```no_run
/// use hr_dashboard::loader::load_xlsx;
///
/// let bytes = std::fs::read("employees.xlsx").unwrap();
/// match load_xlsx(&bytes) {
///     Ok(store) => println!("Loaded {} employees", store.len()),
///     Err(e) => eprintln!("Error loading workbook: {}", e),
/// }
/// ```
pub fn load_xlsx(bytes: &[u8]) -> Result<RecordStore> {
    RecordStore::new(read_xlsx(bytes)?)
}

/// Parse the first worksheet into employee rows without the store's
/// uniqueness check
pub fn read_xlsx(bytes: &[u8]) -> Result<Vec<Employee>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DashboardError::Spreadsheet("workbook has no worksheets".into()))??;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    rows_to_employees(rows)
}

/// Load employees from delimited text; a leading UTF-8 BOM is ignored
pub fn load_csv(bytes: &[u8]) -> Result<RecordStore> {
    RecordStore::new(read_csv(bytes)?)
}

pub fn read_csv(bytes: &[u8]) -> Result<Vec<Employee>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    rows_to_employees(rows)
}

/// Load a file, choosing the parser by extension
pub fn load_path(path: impl AsRef<Path>) -> Result<RecordStore> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let store = match extension(path).as_deref() {
        Some("xlsx") | Some("xlsm") => load_xlsx(&bytes)?,
        Some("csv") | Some("txt") => load_csv(&bytes)?,
        other => {
            return Err(DashboardError::validation(format!(
                "unsupported file type {:?}",
                other.unwrap_or("")
            )));
        }
    };
    info!("Loaded {} employees from {}", store.len(), path.display());
    Ok(store)
}

/// Load uploaded bytes, choosing the parser by the uploaded file name
pub fn load_upload(file_name: &str, bytes: &[u8]) -> Result<RecordStore> {
    RecordStore::new(read_upload(file_name, bytes)?)
}

/// Parse uploaded bytes into rows for a database import.
///
/// Keys are not checked here; the import counts bad rows one by one.
pub fn read_upload(file_name: &str, bytes: &[u8]) -> Result<Vec<Employee>> {
    match extension(Path::new(file_name)).as_deref() {
        Some("csv") | Some("txt") => read_csv(bytes),
        _ => read_xlsx(bytes),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => d
            .as_datetime()
            .map(|dt| dt.date().format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| d.as_f64().to_string()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => {
            warn!("Spreadsheet cell error {:?} read as empty", e);
            String::new()
        }
    }
}

/// Turn raw string rows (header first) into a validated store.
pub fn rows_to_store(rows: Vec<Vec<String>>) -> Result<RecordStore> {
    RecordStore::new(rows_to_employees(rows)?)
}

/// Map raw string rows (header first) to employees.
///
/// Header text is normalized to [`Field`]s here and nowhere else.
pub fn rows_to_employees(rows: Vec<Vec<String>>) -> Result<Vec<Employee>> {
    let mut rows = rows
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()));

    let header = rows
        .next()
        .ok_or_else(|| DashboardError::validation("the file has no header row"))?;

    let mut columns: Vec<Option<Field>> = Vec::with_capacity(header.len());
    for raw in &header {
        let field = Field::from_header(raw);
        match field {
            Some(f) if columns.contains(&Some(f)) => {
                return Err(DashboardError::validation(format!(
                    "column `{}` appears more than once",
                    f.label()
                )));
            }
            None if !raw.trim().is_empty() => {
                warn!("Ignoring unknown column `{}`", raw.trim());
            }
            _ => {}
        }
        columns.push(field);
    }

    let missing: Vec<&str> = Field::ALL
        .iter()
        .filter(|f| !columns.contains(&Some(**f)))
        .map(|f| f.label())
        .collect();
    if !missing.is_empty() {
        return Err(DashboardError::validation(format!(
            "missing required columns: {}",
            missing.join("، ")
        )));
    }

    let employees = rows
        .map(|row| {
            let mut employee = Employee::default();
            for (cell, field) in row.iter().zip(&columns) {
                if let Some(field) = field {
                    employee.set(*field, cell);
                }
            }
            employee
        })
        .collect();
    Ok(employees)
}
