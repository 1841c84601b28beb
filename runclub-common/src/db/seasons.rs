//! Season persistence and lookups
//!
//! At most one season is active. Activation always runs as
//! "deactivate all, activate one" inside a single transaction on the writer
//! pool; the partial unique index on `is_active` backs this up.

use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::models::{NewSeason, Season, SeasonSummary};
use crate::{time, uuid_utils, validation, Error, Result};

const SEASON_COLUMNS: &str = "id, name, is_active, created_at, registration_token";

pub(crate) fn season_from_row(row: &SqliteRow) -> Result<Season> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Season {
        id: uuid_utils::from_db("seasons.id", &id)?,
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
        created_at: time::from_db(&created_at)?,
        registration_token: row.try_get("registration_token")?,
    })
}

/// Create a season; an active season deactivates every other season
pub async fn create_season(pool: &SqlitePool, new: NewSeason) -> Result<Season> {
    let name = new.name.trim().to_string();
    validation::require_present("Season name", &name)?;

    let season = Season {
        id: uuid_utils::generate(),
        name,
        is_active: new.is_active,
        created_at: time::now(),
        registration_token: Some(
            new.registration_token
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| uuid_utils::generate().to_string()),
        ),
    };

    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    if season.is_active {
        sqlx::query("UPDATE seasons SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO seasons (id, name, is_active, created_at, registration_token)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(season.id.to_string())
    .bind(&season.name)
    .bind(season.is_active)
    .bind(time::to_db(&season.created_at))
    .bind(&season.registration_token)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        let duplicate_token = e
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);
        if duplicate_token {
            Error::InvalidInput("Registration token already in use".to_string())
        } else {
            Error::Database(e)
        }
    })?;

    tx.commit().await?;

    info!(season_id = %season.id, active = season.is_active, "Created season '{}'", season.name);
    Ok(season)
}

/// Make one season the only active season
pub async fn activate_season(pool: &SqlitePool, id: Uuid) -> Result<Season> {
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let Some(mut season) = get_season(&mut *tx, id).await? else {
        tx.rollback().await?;
        return Err(Error::NotFound(format!("Season {}", id)));
    };

    sqlx::query("UPDATE seasons SET is_active = 0 WHERE is_active = 1")
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE seasons SET is_active = 1 WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(season_id = %id, "Activated season '{}'", season.name);
    season.is_active = true;
    Ok(season)
}

/// Clear the active flag of one season
pub async fn deactivate_season(pool: &SqlitePool, id: Uuid) -> Result<Season> {
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let Some(mut season) = get_season(&mut *tx, id).await? else {
        tx.rollback().await?;
        return Err(Error::NotFound(format!("Season {}", id)));
    };

    sqlx::query("UPDATE seasons SET is_active = 0 WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(season_id = %id, "Deactivated season '{}'", season.name);
    season.is_active = false;
    Ok(season)
}

pub async fn get_season<'e, E>(executor: E, id: Uuid) -> Result<Option<Season>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM seasons WHERE id = ?", SEASON_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(season_from_row).transpose()
}

/// The currently active season, resolved through the `is_active` index
pub async fn get_active_season<'e, E>(executor: E) -> Result<Option<Season>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM seasons WHERE is_active = 1", SEASON_COLUMNS);
    let row = sqlx::query(&sql).fetch_optional(executor).await?;

    row.as_ref().map(season_from_row).transpose()
}

pub async fn get_season_by_registration_token<'e, E>(
    executor: E,
    token: &str,
) -> Result<Option<Season>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM seasons WHERE registration_token = ?",
        SEASON_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(token)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(season_from_row).transpose()
}

/// All seasons, newest first
pub async fn list_seasons<'e, E>(executor: E) -> Result<Vec<Season>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM seasons ORDER BY created_at DESC",
        SEASON_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(executor).await?;

    rows.iter().map(season_from_row).collect()
}

/// All seasons with registration and scan counts, newest first
pub async fn list_season_summaries<'e, E>(executor: E) -> Result<Vec<SeasonSummary>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT s.id, s.name, s.is_active, s.created_at, s.registration_token,
            (SELECT COUNT(*) FROM registrations r WHERE r.season_id = s.id) AS registration_count,
            (SELECT COUNT(*) FROM scan_records sr WHERE sr.season_id = s.id) AS scan_count
        FROM seasons s
        ORDER BY s.created_at DESC
        "#,
    )
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(SeasonSummary {
                season: season_from_row(row)?,
                registration_count: row.try_get("registration_count")?,
                scan_count: row.try_get("scan_count")?,
            })
        })
        .collect()
}
