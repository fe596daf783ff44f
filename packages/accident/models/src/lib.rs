#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Accident record types shared across the accident analyser.
//!
//! These are the canonical shapes of a traffic-accident record as it moves
//! through the system: [`AccidentRow`] for rows read back from the store,
//! [`NewAccident`] for inserts (single create or CSV ingestion), and
//! [`AccidentUpdate`] for partial updates where only supplied fields change.
//!
//! Dates are carried as canonical `YYYY-MM-DD` strings. Every write path
//! normalizes through [`canonical_date`], so string comparison on the
//! stored column is equivalent to calendar comparison.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// An accident record as retrieved from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentRow {
    /// Primary key, assigned by the store on insert.
    pub id: i64,
    /// Severity classification ("Fatal", "Serious", "Slight").
    pub severity: String,
    /// Date of the accident, canonical `YYYY-MM-DD`.
    pub date: String,
    /// Time of day, `HH:MM[:SS]`, if recorded.
    pub time: Option<String>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Street-level address or nearest landmark.
    pub address: Option<String>,
    /// Local authority district.
    pub local_authority: Option<String>,
    /// LSOA code of the accident location.
    pub lsoa_code: Option<String>,
    /// Road type (roundabout, single carriageway, ...).
    pub road_type: Option<String>,
    /// Road classification (A, B, motorway, ...).
    pub road_class: Option<String>,
    /// Posted speed limit in mph.
    pub speed_limit: Option<i32>,
    /// Junction control at the site, if any.
    pub junction_control: Option<String>,
    /// Weather conditions at the time.
    pub weather_conditions: Option<String>,
    /// Light conditions at the time.
    pub light_conditions: Option<String>,
    /// Road surface conditions.
    pub road_surface_conditions: Option<String>,
    /// Number of vehicles involved.
    pub number_of_vehicles: Option<i32>,
    /// Number of casualties.
    pub number_of_casualties: Option<i32>,
    /// Reporting police force.
    pub police_force: Option<String>,
    /// Urban or rural area indicator.
    pub urban_or_rural_area: Option<String>,
    /// Free-text description of the incident.
    pub description: Option<String>,
}

/// An accident record to be inserted.
///
/// Same shape as [`AccidentRow`] minus the `id`, which the store assigns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccident {
    /// Severity classification. Required.
    pub severity: String,
    /// Date of the accident, canonical `YYYY-MM-DD`. Required.
    pub date: String,
    /// Time of day, if recorded.
    pub time: Option<String>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Street-level address or nearest landmark.
    pub address: Option<String>,
    /// Local authority district.
    pub local_authority: Option<String>,
    /// LSOA code of the accident location.
    pub lsoa_code: Option<String>,
    /// Road type.
    pub road_type: Option<String>,
    /// Road classification.
    pub road_class: Option<String>,
    /// Posted speed limit in mph.
    pub speed_limit: Option<i32>,
    /// Junction control at the site.
    pub junction_control: Option<String>,
    /// Weather conditions.
    pub weather_conditions: Option<String>,
    /// Light conditions.
    pub light_conditions: Option<String>,
    /// Road surface conditions.
    pub road_surface_conditions: Option<String>,
    /// Number of vehicles involved.
    pub number_of_vehicles: Option<i32>,
    /// Number of casualties.
    pub number_of_casualties: Option<i32>,
    /// Reporting police force.
    pub police_force: Option<String>,
    /// Urban or rural area indicator.
    pub urban_or_rural_area: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

/// A partial update to an accident record.
///
/// Every field is optional; only supplied fields are written. An update
/// with no fields set leaves the row untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentUpdate {
    /// New severity classification.
    pub severity: Option<String>,
    /// New date, any format accepted by [`canonical_date`].
    pub date: Option<String>,
    /// New time of day.
    pub time: Option<String>,
    /// New longitude.
    pub longitude: Option<f64>,
    /// New latitude.
    pub latitude: Option<f64>,
    /// New address.
    pub address: Option<String>,
    /// New local authority district.
    pub local_authority: Option<String>,
    /// New LSOA code.
    pub lsoa_code: Option<String>,
    /// New road type.
    pub road_type: Option<String>,
    /// New road classification.
    pub road_class: Option<String>,
    /// New speed limit.
    pub speed_limit: Option<i32>,
    /// New junction control.
    pub junction_control: Option<String>,
    /// New weather conditions.
    pub weather_conditions: Option<String>,
    /// New light conditions.
    pub light_conditions: Option<String>,
    /// New road surface conditions.
    pub road_surface_conditions: Option<String>,
    /// New vehicle count.
    pub number_of_vehicles: Option<i32>,
    /// New casualty count.
    pub number_of_casualties: Option<i32>,
    /// New reporting police force.
    pub police_force: Option<String>,
    /// New urban/rural indicator.
    pub urban_or_rural_area: Option<String>,
    /// New description.
    pub description: Option<String>,
}

impl AccidentUpdate {
    /// Returns `true` if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.severity.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.longitude.is_none()
            && self.latitude.is_none()
            && self.address.is_none()
            && self.local_authority.is_none()
            && self.lsoa_code.is_none()
            && self.road_type.is_none()
            && self.road_class.is_none()
            && self.speed_limit.is_none()
            && self.junction_control.is_none()
            && self.weather_conditions.is_none()
            && self.light_conditions.is_none()
            && self.road_surface_conditions.is_none()
            && self.number_of_vehicles.is_none()
            && self.number_of_casualties.is_none()
            && self.police_force.is_none()
            && self.urban_or_rural_area.is_none()
            && self.description.is_none()
    }
}

/// Parses a date string in any of the accepted input formats and returns
/// it re-formatted as canonical `YYYY-MM-DD`.
///
/// Accepted inputs: `YYYY-MM-DD`, `YYYY/MM/DD`, `DD/MM/YYYY`, and ISO 8601
/// datetimes (the date component is kept, the rest discarded).
#[must_use]
pub fn canonical_date(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let date = parse_date(trimmed)?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Parses a date string in any of the accepted input formats.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    // ISO 8601 datetime, e.g. "2024-01-15T14:30:00"
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    None
}

/// Parses a time-of-day string and returns it re-formatted as `HH:MM:SS`.
///
/// Returns `None` for empty or unparsable input; an absent time is valid.
#[must_use]
pub fn canonical_time(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in ["%H:%M:%S", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, format) {
            return Some(time.format("%H:%M:%S").to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_iso_date() {
        assert_eq!(canonical_date("2024-01-15").unwrap(), "2024-01-15");
    }

    #[test]
    fn canonicalizes_slash_dates() {
        assert_eq!(canonical_date("2024/01/15").unwrap(), "2024-01-15");
        assert_eq!(canonical_date("15/01/2024").unwrap(), "2024-01-15");
    }

    #[test]
    fn canonicalizes_datetime_prefix() {
        assert_eq!(
            canonical_date("2024-01-15T14:30:00").unwrap(),
            "2024-01-15"
        );
    }

    #[test]
    fn rejects_garbage_date() {
        assert!(canonical_date("not-a-date").is_none());
        assert!(canonical_date("").is_none());
    }

    #[test]
    fn canonicalizes_times() {
        assert_eq!(canonical_time("14:30").unwrap(), "14:30:00");
        assert_eq!(canonical_time("14:30:59").unwrap(), "14:30:59");
    }

    #[test]
    fn empty_or_bad_time_is_absent() {
        assert!(canonical_time("").is_none());
        assert!(canonical_time("   ").is_none());
        assert!(canonical_time("25:99").is_none());
    }

    #[test]
    fn empty_update_is_empty() {
        assert!(AccidentUpdate::default().is_empty());
        let update = AccidentUpdate {
            severity: Some("Fatal".to_string()),
            ..AccidentUpdate::default()
        };
        assert!(!update.is_empty());
    }
}
