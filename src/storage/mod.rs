//! Storage implementations.
//!
//! SQLite holds both the append-only raw tables and the three datasets the
//! reload materializes. Schema is managed by the embedded migrations.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::StorageConfig;
use crate::model::UnknownChannel;

pub mod helpers;
pub mod schema;
pub mod sqlite;

pub use sqlite::{OutputStore, RawStore};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid timestamp in {column}: {value}")]
    InvalidTimestamp { column: &'static str, value: String },

    #[error("Invalid decimal in {column}: {value}")]
    InvalidDecimal { column: &'static str, value: String },

    #[error("Invalid channel: {0}")]
    InvalidChannel(#[from] UnknownChannel),
}

impl StorageError {
    /// Engine error code, when the failure came from the database itself.
    pub fn code(&self) -> Option<String> {
        match self {
            StorageError::Database(e) => e
                .as_database_error()
                .and_then(|db| db.code())
                .map(|code| code.into_owned()),
            _ => None,
        }
    }
}

/// Open the configured SQLite database and apply migrations.
pub async fn connect(config: &StorageConfig) -> Result<SqlitePool> {
    info!(path = %config.path, wal = config.wal, "Opening storage");

    if let Some(parent) = Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let journal_mode = if config.wal {
        SqliteJournalMode::Wal
    } else {
        SqliteJournalMode::Delete
    };

    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(journal_mode)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Open a private in-memory database with migrations applied.
///
/// Limited to one connection: every SQLite in-memory connection is its own
/// database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Apply the embedded migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("migrations/sqlite").run(pool).await?;
    Ok(())
}
