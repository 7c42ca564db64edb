//! Parsing CSV and Excel files into cleaned tables

use crate::error::{Result, SheetSyncError};
use crate::table::{Cell, Table};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use duckdb::types::ValueRef;
use duckdb::Connection;
use std::collections::HashSet;
use std::path::Path;

/// File extensions the parser accepts
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// Loads tabular files into [`Table`]s
pub struct DataProcessor {
    connection: Connection,
    sheet: Option<String>,
}

impl DataProcessor {
    /// Create a processor backed by an in-memory DuckDB connection
    pub fn new() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute("SET enable_progress_bar=false", [])?;
        Ok(Self {
            connection,
            sheet: None,
        })
    }

    /// Read this worksheet from Excel files instead of the first one
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Whether the path has an extension the parser can read
    pub fn is_supported_format(path: &Path) -> bool {
        extension_of(path)
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Parse and clean a CSV or Excel file
    pub fn load_table(&self, file_path: &Path) -> Result<Table> {
        if !file_path.exists() {
            return Err(SheetSyncError::invalid_input(format!(
                "File not found: {}",
                file_path.display()
            )));
        }

        if !file_path.is_file() {
            return Err(SheetSyncError::invalid_input(format!(
                "Not a regular file: {}",
                file_path.display()
            )));
        }

        let extension = extension_of(file_path).unwrap_or_default();
        let (columns, records) = match extension.as_str() {
            "csv" => self.read_csv(file_path)?,
            "xlsx" | "xls" => self.read_excel(file_path)?,
            _ => {
                let shown = if extension.is_empty() {
                    "(none)".to_string()
                } else {
                    format!(".{}", extension)
                };
                return Err(SheetSyncError::unsupported_file_type(shown));
            }
        };

        if columns.is_empty() {
            return Err(empty_file_error(file_path));
        }

        let table = clean_records(columns, records)?;
        log::debug!(
            "Parsed {}: {} rows x {} columns",
            file_path.display(),
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }

    fn read_csv(&self, file_path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
        if std::fs::metadata(file_path)?.len() == 0 {
            return Err(empty_file_error(file_path));
        }

        let path_str = file_path.to_string_lossy().replace('\'', "''");
        let create_view_sql = format!(
            "CREATE OR REPLACE VIEW data_view AS \
             SELECT * FROM read_csv('{}', header=true, all_varchar=true)",
            path_str
        );

        self.connection
            .execute(&create_view_sql, [])
            .map_err(|e| convert_duckdb_error(e, file_path))?;

        let columns = self.column_names()?;
        if columns.is_empty() {
            return Ok((columns, Vec::new()));
        }

        let column_count = columns.len();
        let mut stmt = self.connection.prepare("SELECT * FROM data_view")?;
        let rows = stmt
            .query_map([], |row| {
                let mut record = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let cell = match row.get_ref(i)? {
                        ValueRef::Null => Cell::Empty,
                        ValueRef::Text(s) => Cell::infer(&String::from_utf8_lossy(s)),
                        ValueRef::Boolean(b) => Cell::Bool(b),
                        ValueRef::BigInt(v) => Cell::Integer(v),
                        ValueRef::Int(v) => Cell::Integer(v as i64),
                        ValueRef::Double(v) => Cell::float(v),
                        other => Cell::text(format!("{:?}", other)),
                    };
                    record.push(cell);
                }
                Ok(record)
            })
            .map_err(|e| convert_duckdb_error(e, file_path))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| convert_duckdb_error(e, file_path))?);
        }

        Ok((columns, records))
    }

    fn column_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.connection.prepare("DESCRIBE data_view")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut columns = Vec::new();
        for name in names {
            columns.push(name?);
        }
        Ok(columns)
    }

    fn read_excel(&self, file_path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
        let mut workbook: Sheets<_> = open_workbook_auto(file_path).map_err(|e| {
            SheetSyncError::invalid_input(format!(
                "Error parsing file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        let sheet_names = workbook.sheet_names().to_vec();
        let target = match &self.sheet {
            Some(name) => name.clone(),
            None => match sheet_names.first() {
                Some(first) => first.clone(),
                None => return Err(empty_file_error(file_path)),
            },
        };

        let range = workbook.worksheet_range(&target).map_err(|e| {
            SheetSyncError::invalid_input(format!(
                "Failed to read sheet '{}' in {}: {}",
                target,
                file_path.display(),
                e
            ))
        })?;

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok((Vec::new(), Vec::new()));
        };
        let columns = header_names(header);

        let records = rows
            .map(|cells| {
                (0..columns.len())
                    .map(|i| convert_excel_cell(cells.get(i)))
                    .collect()
            })
            .collect();

        Ok((columns, records))
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn empty_file_error(file_path: &Path) -> SheetSyncError {
    SheetSyncError::invalid_input(format!(
        "File is empty or contains no data: {}",
        file_path.display()
    ))
}

/// Convert DuckDB errors into input errors where the file is at fault
fn convert_duckdb_error(error: duckdb::Error, file_path: &Path) -> SheetSyncError {
    let error_msg = error.to_string();

    if error_msg.contains("No files found") || error_msg.contains("does not exist") {
        SheetSyncError::invalid_input(format!("File not found: {}", file_path.display()))
    } else if error_msg.contains("empty") {
        empty_file_error(file_path)
    } else if error_msg.contains("CSV")
        || error_msg.contains("Unterminated quoted field")
        || error_msg.contains("UTF-8")
    {
        SheetSyncError::invalid_input(format!(
            "Error parsing file {}: {}",
            file_path.display(),
            error_msg
        ))
    } else {
        SheetSyncError::DuckDb(error)
    }
}

/// Header cells as unique column names
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let base = match convert_excel_cell(Some(cell)) {
                Cell::Empty => format!("Unnamed: {}", index),
                other => other.to_string(),
            };
            let mut name = base.clone();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

fn convert_excel_cell(cell: Option<&Data>) -> Cell {
    match cell {
        None => Cell::Empty,
        Some(data) => match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::text(s),
            Data::Float(f) => Cell::float(*f),
            Data::Int(i) => Cell::Integer(*i),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Text(format_excel_datetime(dt.as_f64())),
            Data::DateTimeIso(s) => Cell::text(s),
            Data::DurationIso(s) => Cell::text(s),
            Data::Error(_) => Cell::Empty,
        },
    }
}

/// Format an Excel serial date (days since 1899-12-30) as ISO 8601.
/// Serials outside chrono's range are kept as the raw number.
fn format_excel_datetime(value: f64) -> String {
    if !value.is_finite() || value < 0.0 {
        return value.to_string();
    }

    let mut days = value.floor() as u64;
    let mut seconds = ((value - value.floor()) * 86400.0).round() as u32;
    if seconds >= 86400 {
        days = days.saturating_add(1);
        seconds -= 86400;
    }

    let date = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_days(chrono::Days::new(days)));
    let Some(date) = date else {
        return value.to_string();
    };

    if seconds == 0 {
        return date.format("%Y-%m-%d").to_string();
    }

    match chrono::NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0) {
        Some(time) => chrono::NaiveDateTime::new(date, time)
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
        None => date.format("%Y-%m-%d").to_string(),
    }
}

/// Drop empty rows and empty columns, then build the table
pub fn clean_records(columns: Vec<String>, records: Vec<Vec<Cell>>) -> Result<Table> {
    let records: Vec<Vec<Cell>> = records
        .into_iter()
        .map(|record| record.into_iter().map(normalize_cell).collect::<Vec<_>>())
        .filter(|record| !record.iter().all(Cell::is_empty))
        .collect();

    let keep: Vec<usize> = (0..columns.len())
        .filter(|&i| records.iter().any(|r| r.get(i).map_or(false, |c| !c.is_empty())))
        .collect();

    let kept_columns: Vec<String> = keep.iter().map(|&i| columns[i].clone()).collect();
    let kept_records = records
        .into_iter()
        .map(|record| {
            keep.iter()
                .map(|&i| record.get(i).cloned().unwrap_or(Cell::Empty))
                .collect()
        })
        .collect();

    Table::from_records(kept_columns, kept_records)
}

fn normalize_cell(cell: Cell) -> Cell {
    match cell {
        Cell::Text(s) => Cell::text(s),
        Cell::Float(f) => Cell::float(f),
        other => other,
    }
}
