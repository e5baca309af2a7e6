//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! quench-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `QUENCH_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`, matching the storefront binary)
//!
//! # Migration Files
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded into
//! the binary at compile time, so the CLI can run against a fresh database
//! without a source checkout.

use sqlx::PgPool;
use tracing::info;

/// Errors that can occur while running migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Required environment variable is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails, or
/// a migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("QUENCH_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("QUENCH_DATABASE_URL"))?;

    info!("Connecting to storefront database...");
    let pool = PgPool::connect(&database_url).await?;

    info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Storefront migrations complete!");
    Ok(())
}
