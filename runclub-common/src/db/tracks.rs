//! Track persistence and lookups
//!
//! At most one track per season carries the default flag. Creating a default
//! track clears the previous default of the same season in the same
//! transaction; other seasons are untouched.

use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::models::{NewTrack, Track};
use super::seasons;
use crate::{time, uuid_utils, validation, Error, Result};

const TRACK_COLUMNS: &str = "id, season_id, name, distance_miles, is_default, created_at";

/// Just enough of a track to run the debounce check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackDistance {
    pub id: Uuid,
    pub distance_miles: f64,
}

pub(crate) fn track_from_row(row: &SqliteRow) -> Result<Track> {
    let id: String = row.try_get("id")?;
    let season_id: String = row.try_get("season_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Track {
        id: uuid_utils::from_db("tracks.id", &id)?,
        season_id: uuid_utils::from_db("tracks.season_id", &season_id)?,
        name: row.try_get("name")?,
        distance_miles: row.try_get("distance_miles")?,
        is_default: row.try_get("is_default")?,
        created_at: time::from_db(&created_at)?,
    })
}

fn track_distance_from_row(row: &SqliteRow) -> Result<TrackDistance> {
    let id: String = row.try_get("id")?;
    Ok(TrackDistance {
        id: uuid_utils::from_db("tracks.id", &id)?,
        distance_miles: row.try_get("distance_miles")?,
    })
}

/// Create a track in an existing season
pub async fn create_track(pool: &SqlitePool, new: NewTrack) -> Result<Track> {
    let name = new.name.trim().to_string();
    validation::require_present("Track name", &name)?;
    validation::require_distance(new.distance_miles)?;

    let track = Track {
        id: uuid_utils::generate(),
        season_id: new.season_id,
        name,
        distance_miles: new.distance_miles,
        is_default: new.is_default,
        created_at: time::now(),
    };

    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    if seasons::get_season(&mut *tx, track.season_id).await?.is_none() {
        tx.rollback().await?;
        return Err(Error::NotFound(format!("Season {}", track.season_id)));
    }

    if track.is_default {
        sqlx::query("UPDATE tracks SET is_default = 0 WHERE season_id = ? AND is_default = 1")
            .bind(track.season_id.to_string())
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO tracks (id, season_id, name, distance_miles, is_default, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(track.id.to_string())
    .bind(track.season_id.to_string())
    .bind(&track.name)
    .bind(track.distance_miles)
    .bind(track.is_default)
    .bind(time::to_db(&track.created_at))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        track_id = %track.id,
        season_id = %track.season_id,
        distance_miles = track.distance_miles,
        default = track.is_default,
        "Created track '{}'",
        track.name
    );
    Ok(track)
}

pub async fn get_track<'e, E>(executor: E, id: Uuid) -> Result<Option<Track>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM tracks WHERE id = ?", TRACK_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(track_from_row).transpose()
}

pub async fn get_default_track_for_season<'e, E>(
    executor: E,
    season_id: Uuid,
) -> Result<Option<Track>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM tracks WHERE season_id = ? AND is_default = 1",
        TRACK_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(season_id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(track_from_row).transpose()
}

/// Tracks of a season, default first, then by name
pub async fn list_tracks_for_season<'e, E>(executor: E, season_id: Uuid) -> Result<Vec<Track>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM tracks WHERE season_id = ? ORDER BY is_default DESC, name ASC",
        TRACK_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(season_id.to_string())
        .fetch_all(executor)
        .await?;

    rows.iter().map(track_from_row).collect()
}

/// Distance of an explicitly requested track
pub async fn track_distance<'e, E>(executor: E, id: Uuid) -> Result<Option<TrackDistance>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, distance_miles FROM tracks WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(track_distance_from_row).transpose()
}

/// Distance of a season's default track
pub async fn default_track_distance<'e, E>(
    executor: E,
    season_id: Uuid,
) -> Result<Option<TrackDistance>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT id, distance_miles FROM tracks WHERE season_id = ? AND is_default = 1",
    )
    .bind(season_id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(track_distance_from_row).transpose()
}
