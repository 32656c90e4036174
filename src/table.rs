//! CSV parsing and column validation for uploaded telemetry files.
//!
//! An [`UploadedTable`] lives only for the duration of one upload request.
//! Parsing and validation are pure functions of the uploaded bytes; the
//! caller decides how to surface failures.

use thiserror::Error;

// ---

/// Columns every upload must carry, matched by exact name.
pub const REQUIRED_COLUMNS: [&str; 3] = ["Flowrate", "Pressure", "Temperature"];

/// The uploaded bytes could not be read as a CSV table. Details go to the
/// debug log; clients only ever see the generic message.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Invalid CSV file")]
    Malformed,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Carries the missing column names; the display message is the fixed
    /// requirement the client sees.
    #[error("CSV must contain Flowrate, Pressure, Temperature columns")]
    MissingColumns(Vec<String>),
}

/// Rectangular in-memory table with named columns. Never persisted.
#[derive(Debug)]
pub struct UploadedTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl UploadedTable {
    // ---
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Iterate the values of a named column, top to bottom.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a str>> {
        // ---
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(
            self.rows
                .iter()
                .map(move |row| row.get(idx).map(String::as_str).unwrap_or("")),
        )
    }
}

// ---

/// Parse raw upload bytes into a table. A missing or empty header row is
/// rejected like any other malformed input, matching how empty files have
/// always been refused.
pub fn parse(raw: &[u8]) -> Result<UploadedTable, ParseError> {
    // ---
    let mut reader = csv::Reader::from_reader(raw);

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(str::to_string).collect(),
        Err(e) => {
            tracing::debug!("Failed to read CSV header row: {}", e);
            return Err(ParseError::Malformed);
        }
    };

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        tracing::debug!("Upload has no usable header row");
        return Err(ParseError::Malformed);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => {
                tracing::debug!("Failed to read CSV record: {}", e);
                return Err(ParseError::Malformed);
            }
        }
    }

    Ok(UploadedTable { headers, rows })
}

/// Check that every required column is present, by exact string match. No
/// fuzzy matching, no case normalization.
pub fn validate(table: &UploadedTable) -> Result<(), ValidationError> {
    // ---
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !table.has_column(name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingColumns(missing))
    }
}
