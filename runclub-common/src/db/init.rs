//! Database initialization
//!
//! Opens the SQLite file in WAL mode behind two pools:
//! - a writer pool capped at one connection, so write transactions queue
//!   on connection acquisition and commit one at a time
//! - a reader pool for lookups and statistics, which WAL lets run while the
//!   writer is busy
//!
//! `busy_timeout` bounds how long a connection waits on a lock held by
//! another process before the lock-contention error surfaces.

use crate::config::DatabaseSettings;
use crate::db::migrations::run_migrations;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

/// Storage handle shared by the coordinator, lookups and HTTP state
#[derive(Debug, Clone)]
pub struct Database {
    writer: SqlitePool,
    reader: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and apply pending migrations
    pub async fn open(settings: &DatabaseSettings) -> Result<Self> {
        let newly_created = !settings.path.exists();

        // Create parent directory if it doesn't exist
        if let Some(parent) = settings.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&settings.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(settings.busy_timeout)
            .foreign_keys(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options.clone())
            .await?;

        if newly_created {
            info!("Initialized new database: {}", settings.path.display());
        } else {
            info!("Opened existing database: {}", settings.path.display());
        }

        run_migrations(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(settings.max_read_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await?;

        info!(
            busy_timeout_ms = settings.busy_timeout.as_millis() as u64,
            read_connections = settings.max_read_connections,
            "Database pools ready (1 writer)"
        );

        Ok(Self { writer, reader })
    }

    /// Pool for write transactions (one connection)
    pub fn writer(&self) -> &SqlitePool {
        &self.writer
    }

    /// Pool for reads outside write transactions
    pub fn reader(&self) -> &SqlitePool {
        &self.reader
    }

    /// Close both pools, waiting for checked-out connections to return
    pub async fn close(&self) {
        self.reader.close().await;
        self.writer.close().await;
    }
}
