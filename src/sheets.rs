//! Pushing tables to a Google Sheets worksheet

use crate::config::SheetsSettings;
use crate::error::{Result, SheetSyncError};
use crate::table::{Cell, Table};
use reqwest::blocking::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// A destination that replaces a worksheet's contents with a table
pub trait SheetWriter {
    /// Overwrite the worksheet with `table` and return a link to it
    fn push_table(&self, table: &Table) -> Result<String>;
}

/// Sheets API v4 writer authenticated with an OAuth bearer token
#[derive(Debug, Clone)]
pub struct GoogleSheetsWriter {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    worksheet_name: String,
    access_token: String,
}

impl GoogleSheetsWriter {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        worksheet_name: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SheetSyncError::sheets_push(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: crate::config::DEFAULT_SHEETS_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            worksheet_name: worksheet_name.into(),
            access_token: access_token.into(),
        })
    }

    /// Build a writer from settings, failing if anything required is missing
    pub fn from_settings(settings: &SheetsSettings) -> Result<Self> {
        let spreadsheet_id = required(&settings.spreadsheet_id, "sheets.spreadsheet_id")?;
        let worksheet_name = required(&settings.worksheet_name, "sheets.worksheet_name")?;
        let access_token = required(&settings.access_token, "sheets.access_token")
            .map_err(|_| {
                SheetSyncError::config(format!(
                    "Missing 'sheets.access_token' in configuration (or set {})",
                    crate::config::SHEETS_TOKEN_ENV
                ))
            })?;

        Ok(Self::new(spreadsheet_id, worksheet_name, access_token)?.with_api_base(&settings.api_base))
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn worksheet_name(&self) -> &str {
        &self.worksheet_name
    }

    fn values_url(&self, suffix: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}{}",
            self.api_base,
            encode_path_segment(&self.spreadsheet_id),
            encode_path_segment(&quote_range(&self.worksheet_name)),
            suffix
        )
    }

    fn clear(&self) -> Result<()> {
        let response = self
            .client
            .post(self.values_url(":clear"))
            .bearer_auth(&self.access_token)
            .json(&json!({}))
            .send()
            .map_err(|e| SheetSyncError::sheets_push(format!("Failed to clear worksheet: {}", e)))?;
        check_status(response, "clear worksheet")?;
        Ok(())
    }

    fn write_values(&self, values: Vec<Vec<Value>>) -> Result<()> {
        let body = json!({
            "range": quote_range(&self.worksheet_name),
            "majorDimension": "ROWS",
            "values": values,
        });

        let response = self
            .client
            .put(self.values_url("?valueInputOption=RAW"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .map_err(|e| SheetSyncError::sheets_push(format!("Failed to write worksheet: {}", e)))?;
        check_status(response, "write worksheet")?;
        Ok(())
    }

    /// Numeric id of the worksheet, used in the `#gid=` link fragment
    fn sheet_id(&self) -> Result<i64> {
        let url = format!(
            "{}/spreadsheets/{}?fields=sheets.properties",
            self.api_base,
            encode_path_segment(&self.spreadsheet_id)
        );

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|e| SheetSyncError::sheets_push(format!("Failed to read spreadsheet: {}", e)))?;
        let metadata: Value = check_status(response, "read spreadsheet")?
            .json()
            .map_err(|e| SheetSyncError::sheets_push(format!("Invalid spreadsheet metadata: {}", e)))?;

        find_sheet_id(&metadata, &self.worksheet_name).ok_or_else(|| {
            SheetSyncError::sheets_push(format!(
                "Worksheet '{}' not found in spreadsheet {}",
                self.worksheet_name, self.spreadsheet_id
            ))
        })
    }
}

impl SheetWriter for GoogleSheetsWriter {
    fn push_table(&self, table: &Table) -> Result<String> {
        let gid = self.sheet_id()?;
        self.clear()?;
        self.write_values(table_to_values(table))?;

        log::info!(
            "Pushed {} rows to worksheet '{}'",
            table.row_count(),
            self.worksheet_name
        );
        Ok(sheet_url(&self.spreadsheet_id, gid))
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(SheetSyncError::config(format!(
            "Missing '{}' in configuration",
            name
        ))),
    }
}

fn check_status(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(SheetSyncError::sheets_push(format!(
        "Failed to {}: HTTP {}: {}",
        action,
        status,
        body.trim()
    )))
}

fn find_sheet_id(metadata: &Value, worksheet_name: &str) -> Option<i64> {
    metadata
        .get("sheets")?
        .as_array()?
        .iter()
        .filter_map(|sheet| sheet.get("properties"))
        .find(|props| props.get("title").and_then(Value::as_str) == Some(worksheet_name))
        .and_then(|props| props.get("sheetId"))
        .and_then(Value::as_i64)
}

/// A1 range covering a whole worksheet
pub fn quote_range(worksheet_name: &str) -> String {
    format!("'{}'", worksheet_name.replace('\'', "''"))
}

/// Browser link to one worksheet of a spreadsheet
pub fn sheet_url(spreadsheet_id: &str, sheet_id: i64) -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/edit#gid={}",
        spreadsheet_id, sheet_id
    )
}

/// Header row followed by one row of values per table row
pub fn table_to_values(table: &Table) -> Vec<Vec<Value>> {
    let mut values = Vec::with_capacity(table.row_count() + 1);
    values.push(table.columns.iter().map(|c| Value::String(c.clone())).collect());
    for index in 0..table.row_count() {
        if let Some(record) = table.record(index) {
            values.push(record.into_iter().map(cell_to_value).collect());
        }
    }
    values
}

fn cell_to_value(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::String(String::new()),
        Cell::Bool(b) => Value::Bool(*b),
        Cell::Integer(i) => Value::from(*i),
        Cell::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(String::new())),
        Cell::Text(s) => Value::String(s.clone()),
    }
}

fn encode_path_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
