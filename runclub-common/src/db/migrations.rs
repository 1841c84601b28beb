//! Database schema migrations
//!
//! Migrations are compiled in as an ordered list. Each pending migration
//! runs inside its own transaction together with its `schema_migrations`
//! ledger row, so a migration is either fully applied and recorded or not
//! at all.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field already recorded them
//! 2. **Always add new migrations** with the next version number
//! 3. **Use ALTER TABLE** over DROP/CREATE to preserve scan history

use crate::{time, Result};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

/// One schema change
#[derive(Debug)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

/// All migrations, ascending by version
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "initial schema",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS seasons (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                registration_token TEXT UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS tracks (
                id TEXT PRIMARY KEY,
                season_id TEXT NOT NULL REFERENCES seasons(id),
                name TEXT NOT NULL,
                distance_miles REAL NOT NULL CHECK (distance_miles > 0),
                is_default INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS registrations (
                id TEXT PRIMARY KEY,
                season_id TEXT REFERENCES seasons(id),
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                grade TEXT NOT NULL,
                teacher TEXT NOT NULL,
                gender TEXT,
                parent_contact_number TEXT NOT NULL,
                backup_contact_number TEXT,
                parent_email TEXT NOT NULL,
                dismissal_method TEXT,
                allergies TEXT,
                medical_info TEXT,
                registered_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS scan_records (
                id TEXT PRIMARY KEY,
                registration_id TEXT NOT NULL REFERENCES registrations(id),
                season_id TEXT REFERENCES seasons(id),
                track_id TEXT REFERENCES tracks(id),
                scanned_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_tracks_season ON tracks(season_id)",
            "CREATE INDEX IF NOT EXISTS idx_registrations_season ON registrations(season_id)",
            "CREATE INDEX IF NOT EXISTS idx_scan_records_runner_time ON scan_records(registration_id, scanned_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_scan_records_season ON scan_records(season_id)",
        ],
    },
    Migration {
        version: 2,
        description: "single active season and default track",
        statements: &[
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_seasons_single_active ON seasons(is_active) WHERE is_active = 1",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tracks_single_default ON tracks(season_id) WHERE is_default = 1",
        ],
    },
    Migration {
        version: 3,
        description: "append only scan records",
        statements: &[
            r#"
            CREATE TRIGGER IF NOT EXISTS scan_records_no_update
            BEFORE UPDATE ON scan_records
            BEGIN
                SELECT RAISE(ABORT, 'scan_records is append-only');
            END
            "#,
            r#"
            CREATE TRIGGER IF NOT EXISTS scan_records_no_delete
            BEFORE DELETE ON scan_records
            BEGIN
                SELECT RAISE(ABORT, 'scan_records is append-only');
            END
            "#,
        ],
    },
];

/// Highest version known to this build
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

async fn create_ledger_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Versions recorded in the ledger, ascending
pub async fn applied_versions(pool: &SqlitePool) -> Result<Vec<i64>> {
    create_ledger_table(pool).await?;

    let versions = sqlx::query_scalar::<_, i64>(
        "SELECT version FROM schema_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await?;

    Ok(versions)
}

/// Newest version recorded in the ledger, without creating it
pub async fn current_version(pool: &SqlitePool) -> Result<Option<i64>> {
    let version = sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;

    Ok(version)
}

/// Run all pending migrations, returning how many were applied
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize> {
    let applied = applied_versions(pool).await?;

    if let Some(&newest) = applied.last() {
        if newest > latest_version() {
            warn!(
                "Database schema version ({}) is newer than code version ({})",
                newest,
                latest_version()
            );
        }
    }

    let mut count = 0;
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        info!(
            "Applying migration v{}: {}",
            migration.version, migration.description
        );

        if let Err(e) = apply(pool, migration).await {
            error!(version = migration.version, error = %e, "Migration failed");
            return Err(e);
        }

        count += 1;
        info!("✓ Migration v{} completed", migration.version);
    }

    if count == 0 {
        info!("Database schema is up to date (v{})", latest_version());
    }

    Ok(count)
}

async fn apply(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    for statement in migration.statements {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    sqlx::query(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?, ?, ?)",
    )
    .bind(migration.version)
    .bind(migration.description)
    .bind(time::to_db(&time::now()))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
