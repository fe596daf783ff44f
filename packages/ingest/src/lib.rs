#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CSV ingestion pipeline for accident records.
//!
//! An upload passes through two stages:
//!
//! 1. [`parse_upload`] — synchronous structural validation. Rejects bad
//!    extensions, empty or malformed files, and headers missing any of the
//!    [`REQUIRED_COLUMNS`] before a single row is processed.
//! 2. [`run_ingestion`] — row processing in fixed batches of
//!    [`BATCH_SIZE`]. Each row is coerced independently; a bad row is
//!    skipped and recorded, never aborting its batch. Each batch's valid
//!    rows are persisted with one bulk insert, and a failed batch leaves
//!    earlier batches committed (partial-success semantics).
//!
//! Stage 2 runs on a background worker (see [`queue`]), so the upload
//! request is acknowledged without waiting for persistence.

pub mod queue;

use accident_analyser_accident_models::{NewAccident, canonical_date};
use accident_analyser_database::queries;
use serde::Serialize;
use switchy_database::Database;
use thiserror::Error;

/// Columns every uploaded CSV must contain, in reporting order.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "date",
    "latitude",
    "longitude",
    "address",
    "severity",
    "road_type",
    "weather",
    "description",
    "casualties",
    "vehicles_involved",
];

/// Number of rows validated and persisted per bulk insert.
pub const BATCH_SIZE: usize = 1000;

/// Errors that reject an upload before any row is processed.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The uploaded filename does not end in `.csv`.
    #[error("File must be a CSV")]
    NotCsv,

    /// The uploaded file has no content.
    #[error("CSV file is empty")]
    EmptyFile,

    /// The file could not be parsed as CSV.
    #[error("Invalid CSV format: {0}")]
    MalformedFile(String),

    /// The header row is missing required columns.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Explicit mapping from required column name to header index.
///
/// Built once per upload from the header row and validated against
/// [`REQUIRED_COLUMNS`] up front, so row processing never looks up a
/// column by name.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    date: usize,
    latitude: usize,
    longitude: usize,
    address: usize,
    severity: usize,
    road_type: usize,
    weather: usize,
    description: usize,
    casualties: usize,
    vehicles_involved: usize,
}

impl ColumnMap {
    /// Builds the column map from a trimmed header row.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::MissingColumns`] naming every required
    /// column absent from the header. Unknown extra columns are ignored.
    pub fn from_headers(headers: &[String]) -> Result<Self, UploadError> {
        let index_of = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| index_of(name).is_none())
            .map(|name| (*name).to_string())
            .collect();

        if !missing.is_empty() {
            return Err(UploadError::MissingColumns(missing));
        }

        Ok(Self {
            date: index_of("date").unwrap(),
            latitude: index_of("latitude").unwrap(),
            longitude: index_of("longitude").unwrap(),
            address: index_of("address").unwrap(),
            severity: index_of("severity").unwrap(),
            road_type: index_of("road_type").unwrap(),
            weather: index_of("weather").unwrap(),
            description: index_of("description").unwrap(),
            casualties: index_of("casualties").unwrap(),
            vehicles_involved: index_of("vehicles_involved").unwrap(),
        })
    }
}

/// A structurally valid upload, ready for background row processing.
#[derive(Debug, Clone)]
pub struct ParsedUpload {
    /// Header-to-field mapping for this upload.
    pub columns: ColumnMap,
    /// All data rows, in file order.
    pub rows: Vec<csv::StringRecord>,
}

impl ParsedUpload {
    /// Number of data rows in the upload.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }
}

/// One rejected row and the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// 1-based position of the row in the uploaded file.
    pub row: usize,
    /// Human-readable failure reason.
    pub error: String,
}

/// Per-upload ingestion report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Total data rows in the upload.
    pub total_rows: usize,
    /// Rows successfully persisted.
    pub successful: usize,
    /// Rows rejected or lost to a failed batch insert.
    pub failed: usize,
    /// Failures ordered by row position.
    pub errors: Vec<RowFailure>,
}

/// Validates the structure of an uploaded file and reads its rows.
///
/// No rows are persisted here; this is the synchronous stage that decides
/// whether the upload is acknowledged or rejected.
///
/// # Errors
///
/// Returns [`UploadError`] for a non-`.csv` filename, an empty file, a
/// structurally malformed file, or a header missing required columns.
pub fn parse_upload(filename: &str, bytes: &[u8]) -> Result<ParsedUpload, UploadError> {
    if !filename.to_ascii_lowercase().ends_with(".csv") {
        return Err(UploadError::NotCsv);
    }

    if bytes.is_empty() {
        return Err(UploadError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| UploadError::MalformedFile(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(UploadError::EmptyFile);
    }

    let columns = ColumnMap::from_headers(&headers)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| UploadError::MalformedFile(e.to_string()))?;
        rows.push(record);
    }

    Ok(ParsedUpload { columns, rows })
}

/// Reads a field by index, trimmed; `None` for missing or empty.
fn field<'a>(record: &'a csv::StringRecord, idx: usize) -> Option<&'a str> {
    let value = record.get(idx)?.trim();
    if value.is_empty() { None } else { Some(value) }
}

/// Parses an optional float field. Empty is absent; non-empty garbage is
/// a row failure.
fn coerce_f64(
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
) -> Result<Option<f64>, String> {
    field(record, idx).map_or(Ok(None), |value| {
        value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("Invalid float value '{value}' for column '{column}'"))
    })
}

/// Parses an optional integer field. Empty is absent; non-empty garbage
/// is a row failure.
fn coerce_i32(
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
) -> Result<Option<i32>, String> {
    field(record, idx).map_or(Ok(None), |value| {
        value
            .parse::<i32>()
            .map(Some)
            .map_err(|_| format!("Invalid integer value '{value}' for column '{column}'"))
    })
}

/// Coerces one CSV row into a [`NewAccident`].
///
/// A row is accepted iff the required fields (`date`, `severity`) are
/// present and every supplied numeric field parses. Optional fields left
/// empty become `NULL`. No sign or range validation is applied to the
/// numeric fields.
///
/// # Errors
///
/// Returns a human-readable reason naming the offending column/value.
pub fn coerce_row(
    columns: &ColumnMap,
    record: &csv::StringRecord,
) -> Result<NewAccident, String> {
    let date_raw =
        field(record, columns.date).ok_or_else(|| "Missing value for column 'date'".to_string())?;
    let date = canonical_date(date_raw)
        .ok_or_else(|| format!("Invalid date value '{date_raw}' for column 'date'"))?;

    let severity = field(record, columns.severity)
        .ok_or_else(|| "Missing value for column 'severity'".to_string())?
        .to_string();

    Ok(NewAccident {
        severity,
        date,
        latitude: coerce_f64(record, columns.latitude, "latitude")?,
        longitude: coerce_f64(record, columns.longitude, "longitude")?,
        address: field(record, columns.address).map(str::to_string),
        road_type: field(record, columns.road_type).map(str::to_string),
        weather_conditions: field(record, columns.weather).map(str::to_string),
        description: field(record, columns.description).map(str::to_string),
        number_of_casualties: coerce_i32(record, columns.casualties, "casualties")?,
        number_of_vehicles: coerce_i32(record, columns.vehicles_involved, "vehicles_involved")?,
        ..NewAccident::default()
    })
}

/// Processes a parsed upload: coerces rows in batches of [`BATCH_SIZE`],
/// bulk-inserts each batch's valid rows, and returns the report.
///
/// A coercion failure skips only that row. A failed batch insert marks
/// the whole batch's valid rows as failed; batches already committed are
/// not rolled back.
pub async fn run_ingestion(db: &dyn Database, parsed: &ParsedUpload) -> IngestReport {
    let total_rows = parsed.total_rows();
    let mut successful = 0usize;
    let mut errors: Vec<RowFailure> = Vec::new();

    for (batch_idx, batch) in parsed.rows.chunks(BATCH_SIZE).enumerate() {
        let base_row = batch_idx * BATCH_SIZE;
        let mut pending: Vec<NewAccident> = Vec::with_capacity(batch.len());
        let mut pending_rows: Vec<usize> = Vec::with_capacity(batch.len());

        for (offset, record) in batch.iter().enumerate() {
            let row = base_row + offset + 1;
            match coerce_row(&parsed.columns, record) {
                Ok(accident) => {
                    pending.push(accident);
                    pending_rows.push(row);
                }
                Err(error) => {
                    errors.push(RowFailure { row, error });
                }
            }
        }

        if pending.is_empty() {
            continue;
        }

        match queries::bulk_insert_accidents(db, &pending).await {
            Ok(inserted) => {
                successful += usize::try_from(inserted).unwrap_or(pending.len());
            }
            Err(e) => {
                log::error!("Batch {} insert failed: {e}", batch_idx + 1);
                for row in pending_rows {
                    errors.push(RowFailure {
                        row,
                        error: format!("Batch insert failed: {e}"),
                    });
                }
            }
        }
    }

    errors.sort_by_key(|failure| failure.row);

    IngestReport {
        total_rows,
        successful,
        failed: total_rows - successful,
        errors,
    }
}
