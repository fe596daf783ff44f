#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! API request and response types for the accident analyser server.
//!
//! These types are serialized to JSON for the REST API. Record and
//! analytics shapes live in their own model crates; this crate covers the
//! envelope types that only the HTTP layer cares about.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server crate version.
    pub version: String,
}

/// Pagination query parameters for the accident list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListQueryParams {
    /// Number of records to skip.
    pub offset: Option<u32>,
    /// Maximum number of records to return.
    pub limit: Option<u32>,
}

/// Date-range query parameters shared by the analytics endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeParams {
    /// Inclusive start of the range (`YYYY-MM-DD`).
    pub start_date: Option<NaiveDate>,
    /// Inclusive end of the range (`YYYY-MM-DD`).
    pub end_date: Option<NaiveDate>,
}

/// Query parameters for the top-locations endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopLocationsParams {
    /// Maximum number of locations to return (default 10).
    pub limit: Option<u32>,
    /// Inclusive start of the range.
    pub start_date: Option<NaiveDate>,
    /// Inclusive end of the range.
    pub end_date: Option<NaiveDate>,
}

/// Query parameters for the CSV upload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadQueryParams {
    /// Name of the uploaded file; must end in `.csv`.
    pub filename: String,
}

/// Acknowledgment returned when an upload is accepted for background
/// processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAck {
    /// Human-readable status message.
    pub message: String,
    /// Identifier of the queued ingestion job.
    pub upload_id: Uuid,
    /// Number of data rows accepted for processing.
    pub total_rows: usize,
    /// Always `"processing"`; the result is observable via later queries.
    pub status: String,
}
