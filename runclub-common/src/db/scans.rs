//! Scan record persistence and lookups
//!
//! Scan records are append-only: this module only inserts and reads, and
//! storage triggers reject any UPDATE or DELETE.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqliteConnection};
use uuid::Uuid;

use super::models::{ScanListing, ScanRecord};
use crate::{time, uuid_utils, Result};

const SCAN_COLUMNS: &str = "id, registration_id, season_id, track_id, scanned_at";

pub(crate) fn scan_from_row(row: &SqliteRow) -> Result<ScanRecord> {
    let id: String = row.try_get("id")?;
    let registration_id: String = row.try_get("registration_id")?;
    let season_id: Option<String> = row.try_get("season_id")?;
    let track_id: Option<String> = row.try_get("track_id")?;
    let scanned_at: String = row.try_get("scanned_at")?;

    Ok(ScanRecord {
        id: uuid_utils::from_db("scan_records.id", &id)?,
        registration_id: uuid_utils::from_db("scan_records.registration_id", &registration_id)?,
        season_id: uuid_utils::from_db_opt("scan_records.season_id", season_id)?,
        track_id: uuid_utils::from_db_opt("scan_records.track_id", track_id)?,
        scanned_at: time::from_db(&scanned_at)?,
    })
}

/// Append a scan record inside the caller's transaction
pub(crate) async fn insert_scan(conn: &mut SqliteConnection, scan: &ScanRecord) -> Result<()> {
    let sql = format!(
        "INSERT INTO scan_records ({}) VALUES (?, ?, ?, ?, ?)",
        SCAN_COLUMNS
    );
    sqlx::query(&sql)
        .bind(scan.id.to_string())
        .bind(scan.registration_id.to_string())
        .bind(scan.season_id.map(|id| id.to_string()))
        .bind(scan.track_id.map(|id| id.to_string()))
        .bind(time::to_db(&scan.scanned_at))
        .execute(conn)
        .await?;

    Ok(())
}

/// Timestamp of the runner's most recent scan, across all seasons
pub async fn latest_scan_time<'e, E>(
    executor: E,
    registration_id: Uuid,
) -> Result<Option<DateTime<Utc>>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let value: Option<String> = sqlx::query_scalar(
        "SELECT scanned_at FROM scan_records WHERE registration_id = ? ORDER BY scanned_at DESC LIMIT 1",
    )
    .bind(registration_id.to_string())
    .fetch_optional(executor)
    .await?;

    value.as_deref().map(time::from_db).transpose()
}

/// The runner's last scan strictly before `before`
pub async fn get_previous_scan<'e, E>(
    executor: E,
    registration_id: Uuid,
    before: DateTime<Utc>,
) -> Result<Option<ScanRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM scan_records WHERE registration_id = ? AND scanned_at < ? \
         ORDER BY scanned_at DESC LIMIT 1",
        SCAN_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(registration_id.to_string())
        .bind(time::to_db(&before))
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(scan_from_row).transpose()
}

/// All scans of one runner, newest first
pub async fn list_scans_for_registration<'e, E>(
    executor: E,
    registration_id: Uuid,
) -> Result<Vec<ScanRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM scan_records WHERE registration_id = ? ORDER BY scanned_at DESC",
        SCAN_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(registration_id.to_string())
        .fetch_all(executor)
        .await?;

    rows.iter().map(scan_from_row).collect()
}

/// Scans with runner, season and track names, newest first
pub async fn list_scans<'e, E>(executor: E, season_id: Option<Uuid>) -> Result<Vec<ScanListing>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let season = season_id.map(|id| id.to_string());
    let rows = sqlx::query(
        r#"
        SELECT sr.id, sr.registration_id, sr.season_id, sr.track_id, sr.scanned_at,
            r.first_name, r.last_name, s.name AS season_name, t.name AS track_name
        FROM scan_records sr
        JOIN registrations r ON sr.registration_id = r.id
        LEFT JOIN seasons s ON sr.season_id = s.id
        LEFT JOIN tracks t ON sr.track_id = t.id
        WHERE (? IS NULL OR sr.season_id = ?)
        ORDER BY sr.scanned_at DESC
        "#,
    )
    .bind(&season)
    .bind(&season)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            let first_name: String = row.try_get("first_name")?;
            let last_name: String = row.try_get("last_name")?;
            Ok(ScanListing {
                scan: scan_from_row(row)?,
                runner_name: format!("{} {}", first_name, last_name),
                season_name: row.try_get("season_name")?,
                track_name: row.try_get("track_name")?,
            })
        })
        .collect()
}

pub async fn count_scans_for_season<'e, E>(executor: E, season_id: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM scan_records WHERE season_id = ?")
        .bind(season_id.to_string())
        .fetch_one(executor)
        .await?;

    Ok(count)
}

pub async fn count_scans_for_registration<'e, E>(executor: E, registration_id: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM scan_records WHERE registration_id = ?")
        .bind(registration_id.to_string())
        .fetch_one(executor)
        .await?;

    Ok(count)
}
