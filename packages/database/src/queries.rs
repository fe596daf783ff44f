//! CRUD and bulk-insert queries for accident records.
//!
//! All statements use `$n` placeholders through `query_raw_params()` /
//! `exec_raw_params()` so they run unchanged on both backends. Dates are
//! normalized to canonical `YYYY-MM-DD` at the write boundary, which keeps
//! the stored `TEXT` column comparable with plain string operators.

use std::fmt::Write as _;

use accident_analyser_accident_models::{
    AccidentRow, AccidentUpdate, NewAccident, canonical_date, canonical_time,
};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Insertable columns of the `accidents` table, in statement order.
const ACCIDENT_COLUMNS: [&str; 20] = [
    "severity",
    "date",
    "time",
    "longitude",
    "latitude",
    "address",
    "local_authority",
    "lsoa_code",
    "road_type",
    "road_class",
    "speed_limit",
    "junction_control",
    "weather_conditions",
    "light_conditions",
    "road_surface_conditions",
    "number_of_vehicles",
    "number_of_casualties",
    "police_force",
    "urban_or_rural_area",
    "description",
];

/// Maximum number of bind parameters per statement.
///
/// `SQLite` caps at 32 766 variables and `PostgreSQL` at 65 535, so bulk
/// inserts are chunked against the lower of the two.
const MAX_BIND_PARAMS: usize = 32_766;

/// Converts an `Option<&str>` to a [`DatabaseValue`], using `Null` for `None`.
fn opt_str(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |s| {
        DatabaseValue::String(s.to_string())
    })
}

/// Converts an `Option<f64>` to a [`DatabaseValue`], using `Null` for `None`.
fn opt_f64(value: Option<f64>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, DatabaseValue::Real64)
}

/// Converts an `Option<i32>` to a [`DatabaseValue`], using `Null` for `None`.
fn opt_i32(value: Option<i32>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, DatabaseValue::Int32)
}

/// Normalizes a date to canonical `YYYY-MM-DD` form.
fn normalize_date(date: &str) -> Result<String, DbError> {
    canonical_date(date).ok_or_else(|| DbError::Conversion {
        message: format!("Invalid date: {date}"),
    })
}

/// Builds the bind parameters for one accident, in [`ACCIDENT_COLUMNS`]
/// order. The date must already be canonical.
fn accident_params(date: String, accident: &NewAccident) -> Vec<DatabaseValue> {
    vec![
        DatabaseValue::String(accident.severity.clone()),
        DatabaseValue::String(date),
        opt_str(
            accident
                .time
                .as_deref()
                .and_then(canonical_time)
                .as_deref(),
        ),
        opt_f64(accident.longitude),
        opt_f64(accident.latitude),
        opt_str(accident.address.as_deref()),
        opt_str(accident.local_authority.as_deref()),
        opt_str(accident.lsoa_code.as_deref()),
        opt_str(accident.road_type.as_deref()),
        opt_str(accident.road_class.as_deref()),
        opt_i32(accident.speed_limit),
        opt_str(accident.junction_control.as_deref()),
        opt_str(accident.weather_conditions.as_deref()),
        opt_str(accident.light_conditions.as_deref()),
        opt_str(accident.road_surface_conditions.as_deref()),
        opt_i32(accident.number_of_vehicles),
        opt_i32(accident.number_of_casualties),
        opt_str(accident.police_force.as_deref()),
        opt_str(accident.urban_or_rural_area.as_deref()),
        opt_str(accident.description.as_deref()),
    ]
}

/// Maps a database row to an [`AccidentRow`].
fn row_to_accident(row: &switchy_database::Row) -> AccidentRow {
    AccidentRow {
        id: row.to_value("id").unwrap_or(0),
        severity: row.to_value("severity").unwrap_or_default(),
        date: row.to_value("date").unwrap_or_default(),
        time: row.to_value("time").unwrap_or(None),
        longitude: row.to_value("longitude").unwrap_or(None),
        latitude: row.to_value("latitude").unwrap_or(None),
        address: row.to_value("address").unwrap_or(None),
        local_authority: row.to_value("local_authority").unwrap_or(None),
        lsoa_code: row.to_value("lsoa_code").unwrap_or(None),
        road_type: row.to_value("road_type").unwrap_or(None),
        road_class: row.to_value("road_class").unwrap_or(None),
        speed_limit: row.to_value("speed_limit").unwrap_or(None),
        junction_control: row.to_value("junction_control").unwrap_or(None),
        weather_conditions: row.to_value("weather_conditions").unwrap_or(None),
        light_conditions: row.to_value("light_conditions").unwrap_or(None),
        road_surface_conditions: row.to_value("road_surface_conditions").unwrap_or(None),
        number_of_vehicles: row.to_value("number_of_vehicles").unwrap_or(None),
        number_of_casualties: row.to_value("number_of_casualties").unwrap_or(None),
        police_force: row.to_value("police_force").unwrap_or(None),
        urban_or_rural_area: row.to_value("urban_or_rural_area").unwrap_or(None),
        description: row.to_value("description").unwrap_or(None),
    }
}

/// Inserts a single accident record and returns it with its assigned id.
///
/// # Errors
///
/// Returns [`DbError`] if the date is unparsable or the insert fails.
pub async fn insert_accident(
    db: &dyn Database,
    accident: &NewAccident,
) -> Result<AccidentRow, DbError> {
    let date = normalize_date(&accident.date)?;

    let mut sql = format!(
        "INSERT INTO accidents ({}) VALUES (",
        ACCIDENT_COLUMNS.join(", ")
    );
    for i in 1..=ACCIDENT_COLUMNS.len() {
        if i > 1 {
            sql.push_str(", ");
        }
        write!(sql, "${i}").unwrap();
    }
    sql.push_str(") RETURNING id");

    let params = accident_params(date, accident);
    let rows = db.query_raw_params(&sql, &params).await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Insert did not return an id".to_string(),
    })?;
    let id: i64 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse inserted id: {e}"),
    })?;

    get_accident(db, id).await?.ok_or_else(|| DbError::Conversion {
        message: format!("Inserted accident {id} not found on read-back"),
    })
}

/// Inserts a batch of accident records in as few statements as possible.
///
/// Dates must already be canonical (the ingestion pipeline guarantees
/// this). The batch is split so no statement exceeds [`MAX_BIND_PARAMS`]
/// bind variables. Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any insert statement fails.
pub async fn bulk_insert_accidents(
    db: &dyn Database,
    accidents: &[NewAccident],
) -> Result<u64, DbError> {
    if accidents.is_empty() {
        return Ok(0);
    }

    let columns = ACCIDENT_COLUMNS.join(", ");
    let rows_per_statement = MAX_BIND_PARAMS / ACCIDENT_COLUMNS.len();
    let mut inserted = 0u64;

    for chunk in accidents.chunks(rows_per_statement) {
        let mut sql = format!("INSERT INTO accidents ({columns}) VALUES ");
        let mut params: Vec<DatabaseValue> = Vec::with_capacity(chunk.len() * ACCIDENT_COLUMNS.len());
        let mut param_idx = 1usize;

        for (i, accident) in chunk.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            for j in 0..ACCIDENT_COLUMNS.len() {
                if j > 0 {
                    sql.push_str(", ");
                }
                write!(sql, "${param_idx}").unwrap();
                param_idx += 1;
            }
            sql.push(')');

            let date = normalize_date(&accident.date)?;
            params.extend(accident_params(date, accident));
        }

        inserted += db.exec_raw_params(&sql, &params).await?;
    }

    Ok(inserted)
}

/// Fetches a single accident by id. Returns `None` if it doesn't exist.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_accident(db: &dyn Database, id: i64) -> Result<Option<AccidentRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM accidents WHERE id = $1",
            &[DatabaseValue::Int64(id)],
        )
        .await?;

    Ok(rows.first().map(row_to_accident))
}

/// Lists accident records ordered by id, with pagination.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_accidents(
    db: &dyn Database,
    offset: u32,
    limit: u32,
) -> Result<Vec<AccidentRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM accidents ORDER BY id LIMIT $1 OFFSET $2",
            &[
                DatabaseValue::Int64(i64::from(limit)),
                DatabaseValue::Int64(i64::from(offset)),
            ],
        )
        .await?;

    Ok(rows.iter().map(row_to_accident).collect())
}

/// Applies a partial update to an accident record.
///
/// Only supplied fields are written; an empty update is a no-op. Returns
/// the updated row, or `None` if no record has the given id.
///
/// # Errors
///
/// Returns [`DbError`] if a supplied date is unparsable or the database
/// operation fails.
#[allow(clippy::too_many_lines)]
pub async fn update_accident(
    db: &dyn Database,
    id: i64,
    update: &AccidentUpdate,
) -> Result<Option<AccidentRow>, DbError> {
    let Some(existing) = get_accident(db, id).await? else {
        return Ok(None);
    };

    if update.is_empty() {
        return Ok(Some(existing));
    }

    let mut sql = String::from("UPDATE accidents SET ");
    let mut params: Vec<DatabaseValue> = Vec::new();
    let mut param_idx = 1usize;

    let mut set = |sql: &mut String,
                   params: &mut Vec<DatabaseValue>,
                   column: &str,
                   value: DatabaseValue| {
        if param_idx > 1 {
            sql.push_str(", ");
        }
        write!(sql, "{column} = ${param_idx}").unwrap();
        params.push(value);
        param_idx += 1;
    };

    if let Some(severity) = &update.severity {
        set(
            &mut sql,
            &mut params,
            "severity",
            DatabaseValue::String(severity.clone()),
        );
    }
    if let Some(date) = &update.date {
        let date = normalize_date(date)?;
        set(&mut sql, &mut params, "date", DatabaseValue::String(date));
    }
    if let Some(time) = &update.time {
        set(
            &mut sql,
            &mut params,
            "time",
            opt_str(canonical_time(time).as_deref()),
        );
    }
    if let Some(longitude) = update.longitude {
        set(
            &mut sql,
            &mut params,
            "longitude",
            DatabaseValue::Real64(longitude),
        );
    }
    if let Some(latitude) = update.latitude {
        set(
            &mut sql,
            &mut params,
            "latitude",
            DatabaseValue::Real64(latitude),
        );
    }
    if let Some(address) = &update.address {
        set(
            &mut sql,
            &mut params,
            "address",
            DatabaseValue::String(address.clone()),
        );
    }
    if let Some(local_authority) = &update.local_authority {
        set(
            &mut sql,
            &mut params,
            "local_authority",
            DatabaseValue::String(local_authority.clone()),
        );
    }
    if let Some(lsoa_code) = &update.lsoa_code {
        set(
            &mut sql,
            &mut params,
            "lsoa_code",
            DatabaseValue::String(lsoa_code.clone()),
        );
    }
    if let Some(road_type) = &update.road_type {
        set(
            &mut sql,
            &mut params,
            "road_type",
            DatabaseValue::String(road_type.clone()),
        );
    }
    if let Some(road_class) = &update.road_class {
        set(
            &mut sql,
            &mut params,
            "road_class",
            DatabaseValue::String(road_class.clone()),
        );
    }
    if let Some(speed_limit) = update.speed_limit {
        set(
            &mut sql,
            &mut params,
            "speed_limit",
            DatabaseValue::Int32(speed_limit),
        );
    }
    if let Some(junction_control) = &update.junction_control {
        set(
            &mut sql,
            &mut params,
            "junction_control",
            DatabaseValue::String(junction_control.clone()),
        );
    }
    if let Some(weather_conditions) = &update.weather_conditions {
        set(
            &mut sql,
            &mut params,
            "weather_conditions",
            DatabaseValue::String(weather_conditions.clone()),
        );
    }
    if let Some(light_conditions) = &update.light_conditions {
        set(
            &mut sql,
            &mut params,
            "light_conditions",
            DatabaseValue::String(light_conditions.clone()),
        );
    }
    if let Some(road_surface_conditions) = &update.road_surface_conditions {
        set(
            &mut sql,
            &mut params,
            "road_surface_conditions",
            DatabaseValue::String(road_surface_conditions.clone()),
        );
    }
    if let Some(number_of_vehicles) = update.number_of_vehicles {
        set(
            &mut sql,
            &mut params,
            "number_of_vehicles",
            DatabaseValue::Int32(number_of_vehicles),
        );
    }
    if let Some(number_of_casualties) = update.number_of_casualties {
        set(
            &mut sql,
            &mut params,
            "number_of_casualties",
            DatabaseValue::Int32(number_of_casualties),
        );
    }
    if let Some(police_force) = &update.police_force {
        set(
            &mut sql,
            &mut params,
            "police_force",
            DatabaseValue::String(police_force.clone()),
        );
    }
    if let Some(urban_or_rural_area) = &update.urban_or_rural_area {
        set(
            &mut sql,
            &mut params,
            "urban_or_rural_area",
            DatabaseValue::String(urban_or_rural_area.clone()),
        );
    }
    if let Some(description) = &update.description {
        set(
            &mut sql,
            &mut params,
            "description",
            DatabaseValue::String(description.clone()),
        );
    }

    write!(sql, " WHERE id = ${param_idx}").unwrap();
    params.push(DatabaseValue::Int64(id));

    db.exec_raw_params(&sql, &params).await?;

    get_accident(db, id).await
}

/// Deletes an accident by id. Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_accident(db: &dyn Database, id: i64) -> Result<bool, DbError> {
    let deleted = db
        .exec_raw_params(
            "DELETE FROM accidents WHERE id = $1",
            &[DatabaseValue::Int64(id)],
        )
        .await?;

    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensure_schema;

    async fn test_db() -> Box<dyn Database> {
        let path = std::env::temp_dir().join(format!("accidents-test-{}.db", uuid::Uuid::new_v4()));
        let db = crate::db::connect(path.to_str().unwrap()).await.unwrap();
        ensure_schema(db.as_ref()).await.unwrap();
        db
    }

    fn sample_accident() -> NewAccident {
        NewAccident {
            severity: "Serious".to_string(),
            date: "2024-03-01".to_string(),
            time: Some("08:15".to_string()),
            longitude: Some(-0.1278),
            latitude: Some(51.5074),
            address: Some("Westminster Bridge".to_string()),
            road_type: Some("Single carriageway".to_string()),
            speed_limit: Some(30),
            weather_conditions: Some("Raining".to_string()),
            number_of_vehicles: Some(2),
            number_of_casualties: Some(1),
            description: Some("Rear-end collision".to_string()),
            ..NewAccident::default()
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let db = test_db().await;
        let created = insert_accident(db.as_ref(), &sample_accident())
            .await
            .unwrap();

        assert!(created.id > 0);
        assert_eq!(created.severity, "Serious");
        assert_eq!(created.date, "2024-03-01");
        assert_eq!(created.time.as_deref(), Some("08:15:00"));

        let fetched = get_accident(db.as_ref(), created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn insert_normalizes_slash_dates() {
        let db = test_db().await;
        let accident = NewAccident {
            date: "15/01/2024".to_string(),
            ..sample_accident()
        };
        let created = insert_accident(db.as_ref(), &accident).await.unwrap();
        assert_eq!(created.date, "2024-01-15");
    }

    #[tokio::test]
    async fn insert_rejects_bad_date() {
        let db = test_db().await;
        let accident = NewAccident {
            date: "yesterday".to_string(),
            ..sample_accident()
        };
        assert!(insert_accident(db.as_ref(), &accident).await.is_err());
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let db = test_db().await;
        let created = insert_accident(db.as_ref(), &sample_accident())
            .await
            .unwrap();

        let update = AccidentUpdate {
            severity: Some("Fatal".to_string()),
            ..AccidentUpdate::default()
        };
        let updated = update_accident(db.as_ref(), created.id, &update)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.severity, "Fatal");
        assert_eq!(updated.date, created.date);
        assert_eq!(updated.address, created.address);
        assert_eq!(updated.number_of_casualties, created.number_of_casualties);
    }

    #[tokio::test]
    async fn empty_update_returns_current_row() {
        let db = test_db().await;
        let created = insert_accident(db.as_ref(), &sample_accident())
            .await
            .unwrap();

        let updated = update_accident(db.as_ref(), created.id, &AccidentUpdate::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated, created);
    }

    #[tokio::test]
    async fn update_missing_returns_none() {
        let db = test_db().await;
        let update = AccidentUpdate {
            severity: Some("Fatal".to_string()),
            ..AccidentUpdate::default()
        };
        assert!(update_accident(db.as_ref(), 9999, &update)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let db = test_db().await;
        let created = insert_accident(db.as_ref(), &sample_accident())
            .await
            .unwrap();

        assert!(delete_accident(db.as_ref(), created.id).await.unwrap());
        assert!(get_accident(db.as_ref(), created.id).await.unwrap().is_none());
        assert!(!delete_accident(db.as_ref(), created.id).await.unwrap());
    }

    #[tokio::test]
    async fn list_paginates_in_id_order() {
        let db = test_db().await;
        for _ in 0..3 {
            insert_accident(db.as_ref(), &sample_accident())
                .await
                .unwrap();
        }

        let all = list_accidents(db.as_ref(), 0, 100).await.unwrap();
        assert_eq!(all.len(), 3);

        let page = list_accidents(db.as_ref(), 1, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, all[1].id);
        assert_eq!(page[1].id, all[2].id);
    }

    #[tokio::test]
    async fn bulk_insert_persists_all_rows() {
        let db = test_db().await;
        let batch: Vec<NewAccident> = (0..25).map(|_| sample_accident()).collect();

        let inserted = bulk_insert_accidents(db.as_ref(), &batch).await.unwrap();
        assert_eq!(inserted, 25);

        let all = list_accidents(db.as_ref(), 0, 100).await.unwrap();
        assert_eq!(all.len(), 25);
    }
}
