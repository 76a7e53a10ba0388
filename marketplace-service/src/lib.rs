pub mod api;
pub mod blob;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;

use diesel::{Connection, PgConnection};
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::handlers::DbPool;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies pending migrations over a short-lived blocking connection.
pub fn run_migrations(database_url: &str) -> AppResult<()> {
    let mut conn = PgConnection::establish(database_url)
        .map_err(|e| AppError::Internal(format!("cannot connect for migrations: {e}")))?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| AppError::Internal(format!("migration error: {e}")))?;
    info!(applied = applied.len(), "database migrations completed");
    Ok(())
}

pub async fn build_pool(database_url: &str, max_size: u32) -> AppResult<DbPool> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .build(config)
        .await
        .map_err(|e| AppError::Pool(e.to_string()))
}
