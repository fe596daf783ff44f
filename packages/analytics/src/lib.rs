#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Aggregation queries over accident records.
//!
//! Every query takes an optional inclusive `[start, end]` date range;
//! either bound may be omitted. Stored dates are canonical `YYYY-MM-DD`
//! strings, so the SQL below compares them with plain string operators and
//! still gets calendar semantics — the bounds are formatted the same way
//! before binding.

use std::fmt::Write as _;

use accident_analyser_analytics_models::{
    AnalyticsSummary, LocationStats, RoadTypeStats, SeverityStats, WeatherStats,
};
use accident_analyser_database::DbError;
use chrono::NaiveDate;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

/// Appends inclusive date-range conditions to a `WHERE`-bearing query.
fn push_date_filter(
    sql: &mut String,
    params: &mut Vec<DatabaseValue>,
    param_idx: &mut usize,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) {
    if let Some(start) = start {
        write!(sql, " AND date >= ${param_idx}").unwrap();
        params.push(DatabaseValue::String(start.format("%Y-%m-%d").to_string()));
        *param_idx += 1;
    }
    if let Some(end) = end {
        write!(sql, " AND date <= ${param_idx}").unwrap();
        params.push(DatabaseValue::String(end.format("%Y-%m-%d").to_string()));
        *param_idx += 1;
    }
}

/// Rounds to 2 decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Total number of accidents in range.
async fn count_in_range(
    db: &dyn Database,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<i64, DbError> {
    let mut sql = String::from("SELECT COUNT(*) as total FROM accidents WHERE 1=1");
    let mut params = Vec::new();
    let mut param_idx = 1usize;
    push_date_filter(&mut sql, &mut params, &mut param_idx, start, end);

    let rows = db.query_raw_params(&sql, &params).await?;
    Ok(rows.first().map_or(0, |r| r.to_value("total").unwrap_or(0)))
}

/// Computes summary statistics over the in-range record set.
///
/// Averages are taken over records that actually carry the count (SQL
/// `AVG` semantics: `NULL`s are excluded from the denominator) and report
/// `0.0` when no such record exists.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn summary(
    db: &dyn Database,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<AnalyticsSummary, DbError> {
    let mut sql = String::from(
        "SELECT COUNT(*) as total,
                COALESCE(SUM(number_of_casualties), 0) as total_casualties,
                COALESCE(SUM(number_of_vehicles), 0) as total_vehicles,
                COUNT(number_of_casualties) as casualty_rows,
                COUNT(number_of_vehicles) as vehicle_rows
         FROM accidents WHERE 1=1",
    );
    let mut params = Vec::new();
    let mut param_idx = 1usize;
    push_date_filter(&mut sql, &mut params, &mut param_idx, start, end);

    let rows = db.query_raw_params(&sql, &params).await?;
    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Summary query returned no row".to_string(),
    })?;

    let total_accidents: i64 = row.to_value("total").unwrap_or(0);
    let total_casualties: i64 = row.to_value("total_casualties").unwrap_or(0);
    let total_vehicles: i64 = row.to_value("total_vehicles").unwrap_or(0);
    let casualty_rows: i64 = row.to_value("casualty_rows").unwrap_or(0);
    let vehicle_rows: i64 = row.to_value("vehicle_rows").unwrap_or(0);

    #[allow(clippy::cast_precision_loss)]
    let average = |sum: i64, rows: i64| {
        if rows > 0 {
            sum as f64 / rows as f64
        } else {
            0.0
        }
    };

    Ok(AnalyticsSummary {
        total_accidents,
        average_casualties: average(total_casualties, casualty_rows),
        average_vehicles: average(total_vehicles, vehicle_rows),
        total_casualties,
        total_vehicles,
    })
}

/// Grouped counts and percentages for one dimension column.
///
/// The percentage denominator is the full in-range total (including rows
/// with a `NULL` dimension), computed before grouping; a zero total
/// degenerates to a denominator of 1. Groups are ordered by descending
/// count with the dimension value as a deterministic tie-break.
async fn grouped_counts(
    db: &dyn Database,
    column: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<(String, i64, f64)>, DbError> {
    let total = count_in_range(db, start, end).await?;
    let denominator = total.max(1);

    let mut sql = format!(
        "SELECT {column} as value, COUNT(*) as count
         FROM accidents WHERE {column} IS NOT NULL"
    );
    let mut params = Vec::new();
    let mut param_idx = 1usize;
    push_date_filter(&mut sql, &mut params, &mut param_idx, start, end);
    write!(sql, " GROUP BY {column} ORDER BY count DESC, {column} ASC").unwrap();

    let rows = db.query_raw_params(&sql, &params).await?;

    #[allow(clippy::cast_precision_loss)]
    let groups = rows
        .iter()
        .map(|row| {
            let value: String = row.to_value("value").unwrap_or_default();
            let count: i64 = row.to_value("count").unwrap_or(0);
            let percentage = round2(count as f64 * 100.0 / denominator as f64);
            (value, count, percentage)
        })
        .collect();

    Ok(groups)
}

/// Accident counts and percentages grouped by severity.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn by_severity(
    db: &dyn Database,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<SeverityStats>, DbError> {
    let groups = grouped_counts(db, "severity", start, end).await?;
    Ok(groups
        .into_iter()
        .map(|(severity, count, percentage)| SeverityStats {
            severity,
            count,
            percentage,
        })
        .collect())
}

/// Accident counts and percentages grouped by road type.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn by_road_type(
    db: &dyn Database,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<RoadTypeStats>, DbError> {
    let groups = grouped_counts(db, "road_type", start, end).await?;
    Ok(groups
        .into_iter()
        .map(|(road_type, count, percentage)| RoadTypeStats {
            road_type,
            count,
            percentage,
        })
        .collect())
}

/// Accident counts and percentages grouped by weather conditions.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn by_weather(
    db: &dyn Database,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<WeatherStats>, DbError> {
    let groups = grouped_counts(db, "weather_conditions", start, end).await?;
    Ok(groups
        .into_iter()
        .map(|(weather_condition, count, percentage)| WeatherStats {
            weather_condition,
            count,
            percentage,
        })
        .collect())
}

/// Distinct coordinate pairs ranked by descending accident count.
///
/// Ties are broken by the smallest accident id in the group (insertion
/// order), which keeps the ranking reproducible across runs.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn top_locations(
    db: &dyn Database,
    limit: u32,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<LocationStats>, DbError> {
    let mut sql = String::from(
        "SELECT longitude, latitude, COUNT(*) as count, MIN(id) as first_id
         FROM accidents
         WHERE longitude IS NOT NULL AND latitude IS NOT NULL",
    );
    let mut params = Vec::new();
    let mut param_idx = 1usize;
    push_date_filter(&mut sql, &mut params, &mut param_idx, start, end);

    write!(
        sql,
        " GROUP BY longitude, latitude ORDER BY count DESC, first_id ASC LIMIT ${param_idx}"
    )
    .unwrap();
    params.push(DatabaseValue::Int64(i64::from(limit)));

    let rows = db.query_raw_params(&sql, &params).await?;

    Ok(rows
        .iter()
        .map(|row| LocationStats {
            longitude: row.to_value("longitude").unwrap_or(0.0),
            latitude: row.to_value("latitude").unwrap_or(0.0),
            count: row.to_value("count").unwrap_or(0),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use accident_analyser_accident_models::NewAccident;
    use accident_analyser_database::{db, ensure_schema, queries};

    async fn test_db() -> Box<dyn Database> {
        let path = std::env::temp_dir().join(format!("analytics-test-{}.db", uuid::Uuid::new_v4()));
        let db = db::connect(path.to_str().unwrap()).await.unwrap();
        ensure_schema(db.as_ref()).await.unwrap();
        db
    }

    fn accident(severity: &str, date: &str) -> NewAccident {
        NewAccident {
            severity: severity.to_string(),
            date: date.to_string(),
            ..NewAccident::default()
        }
    }

    async fn seed(db: &dyn Database, accidents: &[NewAccident]) {
        queries::bulk_insert_accidents(db, accidents).await.unwrap();
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn summary_over_empty_range_is_all_zero() {
        let db = test_db().await;
        seed(db.as_ref(), &[accident("Slight", "2024-01-15")]).await;

        let result = summary(
            db.as_ref(),
            Some(date("2030-01-01")),
            Some(date("2030-12-31")),
        )
        .await
        .unwrap();

        assert_eq!(result.total_accidents, 0);
        assert!((result.average_casualties - 0.0).abs() < f64::EPSILON);
        assert!((result.average_vehicles - 0.0).abs() < f64::EPSILON);
        assert_eq!(result.total_casualties, 0);
        assert_eq!(result.total_vehicles, 0);
    }

    #[tokio::test]
    async fn summary_computes_totals_and_averages() {
        let db = test_db().await;
        seed(
            db.as_ref(),
            &[
                NewAccident {
                    number_of_casualties: Some(1),
                    number_of_vehicles: Some(2),
                    ..accident("Slight", "2024-01-15")
                },
                NewAccident {
                    number_of_casualties: Some(3),
                    number_of_vehicles: Some(4),
                    ..accident("Serious", "2024-01-16")
                },
                // No counts recorded; excluded from the averages.
                accident("Slight", "2024-01-17"),
            ],
        )
        .await;

        let result = summary(db.as_ref(), None, None).await.unwrap();

        assert_eq!(result.total_accidents, 3);
        assert_eq!(result.total_casualties, 4);
        assert_eq!(result.total_vehicles, 6);
        assert!((result.average_casualties - 2.0).abs() < f64::EPSILON);
        assert!((result.average_vehicles - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn date_bounds_are_inclusive() {
        let db = test_db().await;
        seed(
            db.as_ref(),
            &[
                accident("Slight", "2024-01-14"),
                accident("Slight", "2024-01-15"),
                accident("Slight", "2024-01-20"),
                accident("Slight", "2024-01-21"),
            ],
        )
        .await;

        let result = summary(
            db.as_ref(),
            Some(date("2024-01-15")),
            Some(date("2024-01-20")),
        )
        .await
        .unwrap();

        assert_eq!(result.total_accidents, 2);
    }

    #[tokio::test]
    async fn severity_breakdown_percentages_sum_to_100() {
        let db = test_db().await;
        let mut accidents = Vec::new();
        for _ in 0..2 {
            accidents.push(accident("Fatal", "2024-01-15"));
        }
        for _ in 0..8 {
            accidents.push(accident("Slight", "2024-01-16"));
        }
        seed(db.as_ref(), &accidents).await;

        let mut stats = by_severity(db.as_ref(), None, None).await.unwrap();
        stats.sort_by(|a, b| a.severity.cmp(&b.severity));

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].severity, "Fatal");
        assert_eq!(stats[0].count, 2);
        assert!((stats[0].percentage - 20.0).abs() < f64::EPSILON);
        assert_eq!(stats[1].severity, "Slight");
        assert_eq!(stats[1].count, 8);
        assert!((stats[1].percentage - 80.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn weather_breakdown_groups_non_null_values() {
        let db = test_db().await;
        seed(
            db.as_ref(),
            &[
                NewAccident {
                    weather_conditions: Some("Raining".to_string()),
                    ..accident("Slight", "2024-01-15")
                },
                NewAccident {
                    weather_conditions: Some("Raining".to_string()),
                    ..accident("Slight", "2024-01-16")
                },
                // NULL weather: not a group, but still in the denominator.
                accident("Slight", "2024-01-17"),
                NewAccident {
                    weather_conditions: Some("Fine".to_string()),
                    ..accident("Slight", "2024-01-18")
                },
            ],
        )
        .await;

        let stats = by_weather(db.as_ref(), None, None).await.unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].weather_condition, "Raining");
        assert_eq!(stats[0].count, 2);
        assert!((stats[0].percentage - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats[1].weather_condition, "Fine");
        assert!((stats[1].percentage - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn road_type_breakdown_respects_date_filter() {
        let db = test_db().await;
        seed(
            db.as_ref(),
            &[
                NewAccident {
                    road_type: Some("Motorway".to_string()),
                    ..accident("Slight", "2024-01-15")
                },
                NewAccident {
                    road_type: Some("Roundabout".to_string()),
                    ..accident("Slight", "2024-06-15")
                },
            ],
        )
        .await;

        let stats = by_road_type(db.as_ref(), None, Some(date("2024-03-01")))
            .await
            .unwrap();

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].road_type, "Motorway");
        assert!((stats[0].percentage - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn top_locations_rank_with_stable_tie_break() {
        let db = test_db().await;
        let at = |lng: f64, lat: f64| NewAccident {
            longitude: Some(lng),
            latitude: Some(lat),
            ..accident("Slight", "2024-01-15")
        };
        seed(
            db.as_ref(),
            &[
                at(-0.1, 51.5),
                at(-0.1, 51.5),
                at(-0.1, 51.5),
                at(-0.2, 51.6),
                at(-0.2, 51.6),
                at(-0.3, 51.7),
                at(-0.3, 51.7),
            ],
        )
        .await;

        let top = top_locations(db.as_ref(), 10, None, None).await.unwrap();

        assert_eq!(top.len(), 3);
        assert_eq!(top[0].count, 3);
        // The two 2-count groups tie; the earlier-inserted one ranks first.
        assert!((top[1].longitude - -0.2).abs() < f64::EPSILON);
        assert!((top[2].longitude - -0.3).abs() < f64::EPSILON);

        let limited = top_locations(db.as_ref(), 2, None, None).await.unwrap();
        assert_eq!(limited.len(), 2);
    }
}
