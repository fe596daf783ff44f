//! Database connection utilities.

use std::path::Path;

use switchy_database::Database;
use switchy_database_connection::Credentials;

/// Default `SQLite` database path used when `DATABASE_URL` is not set.
pub const DEFAULT_SQLITE_PATH: &str = "data/accidents.db";

/// Creates a new database connection from a `DATABASE_URL`-style string.
///
/// A `postgres://` URL connects via the raw Postgres backend with native
/// TLS and a 120-second `statement_timeout` so stalled queries fail with
/// an error instead of hanging indefinitely. Anything else is treated as
/// an `SQLite` file path (parent directories are created as needed).
///
/// # Errors
///
/// Returns an error if the connection fails or the `SQLite` parent
/// directory cannot be created.
pub async fn connect(url: &str) -> Result<Box<dyn Database>, Box<dyn std::error::Error>> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        // Credentials::from_url cannot parse query parameters like
        // `?sslmode=require`; the native-tls connector negotiates TLS on
        // its own, so drop everything after `?`.
        let url_base = url.split('?').next().unwrap_or(url);

        let creds = Credentials::from_url(url_base)?;
        let db = switchy_database_connection::init_postgres_raw_native_tls(creds).await?;

        // Bound statement runtime so a stalled bulk insert surfaces as an
        // error instead of holding the ingestion worker forever.
        db.exec_raw("SET statement_timeout = '120s'").await?;

        return Ok(db);
    }

    let path = Path::new(url);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = switchy_database_connection::init_sqlite_rusqlite(Some(path))?;

    Ok(db)
}

/// Creates a connection from the `DATABASE_URL` environment variable,
/// falling back to the local `SQLite` file at [`DEFAULT_SQLITE_PATH`].
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect_from_env() -> Result<Box<dyn Database>, Box<dyn std::error::Error>> {
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_SQLITE_PATH.to_string());
    connect(&url).await
}
