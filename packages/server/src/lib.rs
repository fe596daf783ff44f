#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the accident analyser.
//!
//! Serves the REST API for accident record CRUD, CSV upload, and the
//! analytics endpoints. CSV uploads are validated synchronously and then
//! handed to a background ingestion worker; the upload request is
//! acknowledged with `202 Accepted` without waiting for persistence.

mod handlers;

use accident_analyser_database::{db, ensure_schema};
use accident_analyser_ingest::queue::{self, IngestJob};
use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use std::sync::Arc;
use switchy_database::Database;
use tokio::sync::mpsc::UnboundedSender;

/// Server configuration, constructed once at startup and passed by
/// reference — there is no global settings object.
#[derive(Debug, Clone)]
pub struct Config {
    /// `DATABASE_URL`-style connection string; a non-`postgres://` value
    /// is treated as an `SQLite` file path.
    pub database_url: String,
    /// Address to bind the HTTP server to.
    pub bind_addr: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
}

impl Config {
    /// Builds the configuration from environment variables
    /// (`DATABASE_URL`, `BIND_ADDR`, `PORT`), with local defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| db::DEFAULT_SQLITE_PATH.to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Database connection.
    pub db: Arc<dyn Database>,
    /// Sender half of the background ingestion queue.
    pub ingest_tx: UnboundedSender<IngestJob>,
}

/// Starts the accident analyser API server.
///
/// Connects to the database, ensures the schema, starts the ingestion
/// worker, and runs the Actix-Web HTTP server until shutdown. This is a
/// regular async function — the caller provides the async runtime (e.g.
/// via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the database connection or schema setup fails.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: Config) -> std::io::Result<()> {
    log::info!("Connecting to database...");
    let db_conn = db::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    log::info!("Ensuring database schema...");
    ensure_schema(db_conn.as_ref())
        .await
        .expect("Failed to ensure database schema");

    let db: Arc<dyn Database> = Arc::from(db_conn);

    log::info!("Starting ingestion worker...");
    let (ingest_tx, _worker) = queue::spawn_worker(Arc::clone(&db));

    let state = web::Data::new(AppState { db, ingest_tx });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(handlers::health))
                    .route("/accidents", web::get().to(handlers::list_accidents))
                    .route("/accidents", web::post().to(handlers::create_accident))
                    .route("/accidents/{id}", web::get().to(handlers::get_accident))
                    .route("/accidents/{id}", web::put().to(handlers::update_accident))
                    .route(
                        "/accidents/{id}",
                        web::delete().to(handlers::delete_accident),
                    )
                    .route("/upload-csv", web::post().to(handlers::upload_csv))
                    .route(
                        "/analytics/summary",
                        web::get().to(handlers::analytics_summary),
                    )
                    .route(
                        "/analytics/by-severity",
                        web::get().to(handlers::analytics_by_severity),
                    )
                    .route(
                        "/analytics/by-road-type",
                        web::get().to(handlers::analytics_by_road_type),
                    )
                    .route(
                        "/analytics/by-weather",
                        web::get().to(handlers::analytics_by_weather),
                    )
                    .route(
                        "/analytics/top-locations",
                        web::get().to(handlers::analytics_top_locations),
                    ),
            )
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
