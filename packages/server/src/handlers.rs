//! HTTP handler functions for the accident analyser API.

use accident_analyser_accident_models::{AccidentUpdate, NewAccident, canonical_date};
use accident_analyser_database::queries;
use accident_analyser_ingest::{parse_upload, queue::IngestJob};
use accident_analyser_server_models::{
    ApiHealth, DateRangeParams, ListQueryParams, TopLocationsParams, UploadAck, UploadQueryParams,
};
use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::AppState;

/// Default page size for the accident list endpoint.
const DEFAULT_LIST_LIMIT: u32 = 100;

/// Default number of entries for the top-locations endpoint.
const DEFAULT_TOP_LOCATIONS: u32 = 10;

/// JSON body for a missing accident.
fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "Accident not found"
    }))
}

/// `GET /api/v1/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/v1/accidents`
///
/// Lists accident records with pagination.
pub async fn list_accidents(
    state: web::Data<AppState>,
    params: web::Query<ListQueryParams>,
) -> HttpResponse {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    match queries::list_accidents(state.db.as_ref(), offset, limit).await {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => {
            log::error!("Failed to list accidents: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to list accidents"
            }))
        }
    }
}

/// `GET /api/v1/accidents/{id}`
pub async fn get_accident(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();

    match queries::get_accident(state.db.as_ref(), id).await {
        Ok(Some(row)) => HttpResponse::Ok().json(row),
        Ok(None) => not_found(),
        Err(e) => {
            log::error!("Failed to get accident {id}: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to get accident"
            }))
        }
    }
}

/// `POST /api/v1/accidents`
///
/// Creates a single accident record from its JSON representation.
pub async fn create_accident(
    state: web::Data<AppState>,
    body: web::Json<NewAccident>,
) -> HttpResponse {
    let accident = body.into_inner();

    if accident.severity.trim().is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Severity is required"
        }));
    }
    if canonical_date(&accident.date).is_none() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Invalid date: {}", accident.date)
        }));
    }

    match queries::insert_accident(state.db.as_ref(), &accident).await {
        Ok(row) => HttpResponse::Created().json(row),
        Err(e) => {
            log::error!("Failed to create accident: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to create accident"
            }))
        }
    }
}

/// `PUT /api/v1/accidents/{id}`
///
/// Applies a partial update; only fields present in the body change.
pub async fn update_accident(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<AccidentUpdate>,
) -> HttpResponse {
    let id = path.into_inner();
    let update = body.into_inner();

    if let Some(date) = &update.date
        && canonical_date(date).is_none()
    {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Invalid date: {date}")
        }));
    }

    match queries::update_accident(state.db.as_ref(), id, &update).await {
        Ok(Some(row)) => HttpResponse::Ok().json(row),
        Ok(None) => not_found(),
        Err(e) => {
            log::error!("Failed to update accident {id}: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to update accident"
            }))
        }
    }
}

/// `DELETE /api/v1/accidents/{id}`
pub async fn delete_accident(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();

    match queries::delete_accident(state.db.as_ref(), id).await {
        Ok(true) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Accident deleted successfully"
        })),
        Ok(false) => not_found(),
        Err(e) => {
            log::error!("Failed to delete accident {id}: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to delete accident"
            }))
        }
    }
}

/// `POST /api/v1/upload-csv?filename=accidents.csv`
///
/// Takes the raw CSV as the request body. The file structure is validated
/// here; row processing happens on the background worker, so a structurally
/// valid upload is acknowledged with `202 Accepted` immediately.
pub async fn upload_csv(
    state: web::Data<AppState>,
    params: web::Query<UploadQueryParams>,
    body: web::Bytes,
) -> HttpResponse {
    // Every UploadError is a client input error: bad extension, empty or
    // malformed file, or missing required columns.
    let parsed = match parse_upload(&params.filename, &body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": e.to_string()
            }));
        }
    };

    let total_rows = parsed.total_rows();
    let upload_id = Uuid::new_v4();

    if let Err(e) = state.ingest_tx.send(IngestJob { upload_id, parsed }) {
        log::error!("Failed to enqueue upload {upload_id}: {e}");
        return HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "Ingestion worker unavailable"
        }));
    }

    HttpResponse::Accepted().json(UploadAck {
        message: "CSV upload started".to_string(),
        upload_id,
        total_rows,
        status: "processing".to_string(),
    })
}

/// `GET /api/v1/analytics/summary`
pub async fn analytics_summary(
    state: web::Data<AppState>,
    params: web::Query<DateRangeParams>,
) -> HttpResponse {
    match accident_analyser_analytics::summary(state.db.as_ref(), params.start_date, params.end_date)
        .await
    {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => {
            log::error!("Failed to compute summary: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to compute summary"
            }))
        }
    }
}

/// `GET /api/v1/analytics/by-severity`
pub async fn analytics_by_severity(
    state: web::Data<AppState>,
    params: web::Query<DateRangeParams>,
) -> HttpResponse {
    match accident_analyser_analytics::by_severity(
        state.db.as_ref(),
        params.start_date,
        params.end_date,
    )
    .await
    {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            log::error!("Failed to compute severity breakdown: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to compute severity breakdown"
            }))
        }
    }
}

/// `GET /api/v1/analytics/by-road-type`
pub async fn analytics_by_road_type(
    state: web::Data<AppState>,
    params: web::Query<DateRangeParams>,
) -> HttpResponse {
    match accident_analyser_analytics::by_road_type(
        state.db.as_ref(),
        params.start_date,
        params.end_date,
    )
    .await
    {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            log::error!("Failed to compute road type breakdown: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to compute road type breakdown"
            }))
        }
    }
}

/// `GET /api/v1/analytics/by-weather`
pub async fn analytics_by_weather(
    state: web::Data<AppState>,
    params: web::Query<DateRangeParams>,
) -> HttpResponse {
    match accident_analyser_analytics::by_weather(
        state.db.as_ref(),
        params.start_date,
        params.end_date,
    )
    .await
    {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            log::error!("Failed to compute weather breakdown: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to compute weather breakdown"
            }))
        }
    }
}

/// `GET /api/v1/analytics/top-locations`
pub async fn analytics_top_locations(
    state: web::Data<AppState>,
    params: web::Query<TopLocationsParams>,
) -> HttpResponse {
    let limit = params.limit.unwrap_or(DEFAULT_TOP_LOCATIONS);

    match accident_analyser_analytics::top_locations(
        state.db.as_ref(),
        limit,
        params.start_date,
        params.end_date,
    )
    .await
    {
        Ok(locations) => HttpResponse::Ok().json(locations),
        Err(e) => {
            log::error!("Failed to compute top locations: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to compute top locations"
            }))
        }
    }
}
