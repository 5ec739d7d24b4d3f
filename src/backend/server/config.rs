/**
 * Database Loading
 *
 * Opens the SQLite pool named by `DATABASE_URL` and applies the migrations in
 * `./migrations`. Unlike the optional services elsewhere, the chat core cannot
 * run without its store, so every failure here is returned to the caller.
 */

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::backend::error::BackendError;

/// Open the pool and run migrations.
///
/// In-memory URLs get a single connection that never expires: each SQLite
/// connection to `:memory:` is its own database.
pub async fn load_database(database_url: &str) -> Result<SqlitePool, BackendError> {
    tracing::info!("Connecting to database...");

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new().connect_with(options).await?
    };

    tracing::info!("Running database migrations...");
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Database ready");

    Ok(pool)
}
