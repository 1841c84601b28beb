//! Season statistics
//!
//! Read-only rollups over one season. All queries run in a single read
//! transaction on the reader pool so the numbers come from one snapshot.
//! Scans count toward the season they were frozen to at insert time, and a
//! scan with no track contributes zero distance.

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;
use uuid::Uuid;

use crate::db::models::Season;
use crate::db::{seasons, Database};
use crate::{uuid_utils, Error, Result};

/// Runners listed in the season-wide leaderboard
pub const TOP_RUNNERS_OVERALL: i64 = 10;
/// Runners listed per grade
pub const TOP_RUNNERS_PER_GRADE: i64 = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonStats {
    pub season: Season,
    pub total_runners: i64,
    pub total_scans: i64,
    pub total_distance_miles: f64,
    pub average_distance_per_scan: f64,
    pub grades: Vec<GradeStats>,
    pub top_runners: Vec<RunnerStats>,
    pub track_usage: Vec<TrackUsage>,
}

/// Breakdown over runners of one grade with at least one scan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeStats {
    pub grade: String,
    pub runner_count: i64,
    pub scan_count: i64,
    pub total_distance_miles: f64,
    pub top_runners: Vec<RunnerStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerStats {
    pub registration_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    pub teacher: String,
    pub scan_count: i64,
    pub total_distance_miles: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackUsage {
    pub track_id: Uuid,
    pub track_name: String,
    pub scan_count: i64,
}

/// Compute the statistics of one season
pub async fn season_statistics(db: &Database, season_id: Uuid) -> Result<SeasonStats> {
    let mut tx = db.reader().begin().await?;

    let season = seasons::get_season(&mut *tx, season_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Season {}", season_id)))?;
    let id = season_id.to_string();

    let total_runners: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE season_id = ?")
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;

    let totals = sqlx::query(
        r#"
        SELECT COUNT(*) AS total_scans, TOTAL(t.distance_miles) AS total_distance
        FROM scan_records sr
        LEFT JOIN tracks t ON sr.track_id = t.id
        WHERE sr.season_id = ?
        "#,
    )
    .bind(&id)
    .fetch_one(&mut *tx)
    .await?;
    let total_scans: i64 = totals.try_get("total_scans")?;
    let total_distance_miles: f64 = totals.try_get("total_distance")?;

    let average_distance_per_scan = if total_scans > 0 {
        total_distance_miles / total_scans as f64
    } else {
        0.0
    };

    let grade_rows = sqlx::query(
        r#"
        SELECT r.grade,
            COUNT(DISTINCT r.id) AS runner_count,
            COUNT(sr.id) AS scan_count,
            TOTAL(t.distance_miles) AS total_distance
        FROM registrations r
        JOIN scan_records sr ON sr.registration_id = r.id AND sr.season_id = ?
        LEFT JOIN tracks t ON sr.track_id = t.id
        WHERE r.season_id = ?
        GROUP BY r.grade
        ORDER BY CASE WHEN r.grade = 'K' THEN 0 ELSE 1 END, r.grade
        "#,
    )
    .bind(&id)
    .bind(&id)
    .fetch_all(&mut *tx)
    .await?;

    let mut grades = Vec::with_capacity(grade_rows.len());
    for row in &grade_rows {
        let grade: String = row.try_get("grade")?;
        let top_runners =
            leaderboard(&mut *tx, &id, Some(grade.as_str()), TOP_RUNNERS_PER_GRADE).await?;
        grades.push(GradeStats {
            grade,
            runner_count: row.try_get("runner_count")?,
            scan_count: row.try_get("scan_count")?,
            total_distance_miles: row.try_get("total_distance")?,
            top_runners,
        });
    }

    let top_runners = leaderboard(&mut *tx, &id, None, TOP_RUNNERS_OVERALL).await?;

    let track_rows = sqlx::query(
        r#"
        SELECT t.id, t.name, COUNT(*) AS scan_count
        FROM scan_records sr
        JOIN tracks t ON sr.track_id = t.id
        WHERE sr.season_id = ?
        GROUP BY t.id, t.name
        ORDER BY scan_count DESC, t.name
        "#,
    )
    .bind(&id)
    .fetch_all(&mut *tx)
    .await?;

    let track_usage = track_rows
        .iter()
        .map(|row| -> Result<TrackUsage> {
            let track_id: String = row.try_get("id")?;
            Ok(TrackUsage {
                track_id: uuid_utils::from_db("tracks.id", &track_id)?,
                track_name: row.try_get("name")?,
                scan_count: row.try_get("scan_count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tx.commit().await?;

    debug!(
        season_id = %season_id,
        total_runners,
        total_scans,
        total_distance_miles,
        "Computed season statistics"
    );

    Ok(SeasonStats {
        season,
        total_runners,
        total_scans,
        total_distance_miles,
        average_distance_per_scan,
        grades,
        top_runners,
        track_usage,
    })
}

/// Leaderboard by distance, then scan count; runners without scans excluded
async fn leaderboard(
    conn: &mut SqliteConnection,
    season_id: &str,
    grade: Option<&str>,
    limit: i64,
) -> Result<Vec<RunnerStats>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id, r.first_name, r.last_name, r.grade, r.teacher,
            COUNT(sr.id) AS scan_count,
            TOTAL(t.distance_miles) AS total_distance
        FROM registrations r
        LEFT JOIN scan_records sr ON sr.registration_id = r.id AND sr.season_id = ?
        LEFT JOIN tracks t ON sr.track_id = t.id
        WHERE r.season_id = ? AND (? IS NULL OR r.grade = ?)
        GROUP BY r.id, r.first_name, r.last_name, r.grade, r.teacher
        HAVING COUNT(sr.id) > 0
        ORDER BY total_distance DESC, scan_count DESC, r.last_name, r.first_name
        LIMIT ?
        "#,
    )
    .bind(season_id)
    .bind(season_id)
    .bind(grade)
    .bind(grade)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(runner_from_row).collect()
}

fn runner_from_row(row: &SqliteRow) -> Result<RunnerStats> {
    let id: String = row.try_get("id")?;
    Ok(RunnerStats {
        registration_id: uuid_utils::from_db("registrations.id", &id)?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        grade: row.try_get("grade")?,
        teacher: row.try_get("teacher")?,
        scan_count: row.try_get("scan_count")?,
        total_distance_miles: row.try_get("total_distance")?,
    })
}
