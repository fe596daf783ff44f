#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Aggregation result types for the accident analyser.
//!
//! All of these are derived, read-only shapes recomputed on every query —
//! nothing here is persisted.

use serde::{Deserialize, Serialize};

/// Summary statistics over a date-filtered record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    /// Total accidents in range.
    pub total_accidents: i64,
    /// Mean casualties per accident (over records with a casualty count).
    pub average_casualties: f64,
    /// Mean vehicles per accident (over records with a vehicle count).
    pub average_vehicles: f64,
    /// Sum of casualties in range.
    pub total_casualties: i64,
    /// Sum of vehicles in range.
    pub total_vehicles: i64,
}

/// One group of a severity breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityStats {
    /// Severity value.
    pub severity: String,
    /// Accidents with this severity in range.
    pub count: i64,
    /// Share of the in-range total, 0-100, rounded to 2 decimal places.
    pub percentage: f64,
}

/// One group of a road-type breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadTypeStats {
    /// Road type value.
    pub road_type: String,
    /// Accidents on this road type in range.
    pub count: i64,
    /// Share of the in-range total, 0-100, rounded to 2 decimal places.
    pub percentage: f64,
}

/// One group of a weather breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherStats {
    /// Weather condition value.
    pub weather_condition: String,
    /// Accidents under this condition in range.
    pub count: i64,
    /// Share of the in-range total, 0-100, rounded to 2 decimal places.
    pub percentage: f64,
}

/// One entry of a top-locations ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStats {
    /// Longitude of the location.
    pub longitude: f64,
    /// Latitude of the location.
    pub latitude: f64,
    /// Accidents recorded at exactly this position.
    pub count: i64,
}
