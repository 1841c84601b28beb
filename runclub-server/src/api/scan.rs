//! Scan recording and scan history
//!
//! POST /api/scan answers 200 for every scan outcome, including rejections
//! and unknown identifiers; the `success` flag carries the verdict. Only
//! storage failures become error responses.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use runclub_common::db::models::{Registration, ScanListing, ScanRecord, Season, Track};
use runclub_common::db::scans;
use runclub_common::scan::MissingEntity;
use runclub_common::ScanOutcome;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Runner identifier read from the QR code
    pub code: String,
    #[serde(default, alias = "trackId")]
    pub track_id: Option<String>,
}

/// Body of every POST /api/scan response
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_record: Option<ScanRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<Season>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<Track>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_scan_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lap_time_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace_minutes_per_mile: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_minutes: Option<i64>,
}

impl ScanResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }
}

impl From<ScanOutcome> for ScanResult {
    fn from(outcome: ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Accepted(accepted) => {
                let accepted = *accepted;
                Self {
                    success: true,
                    message: format!(
                        "Successfully recorded run for {}",
                        accepted.registration.full_name()
                    ),
                    previous_scan_at: accepted.previous_scan.map(|p| p.scanned_at),
                    registration: Some(accepted.registration),
                    scan_record: Some(accepted.scan),
                    season: accepted.season,
                    track: accepted.track,
                    lap_time_minutes: accepted.lap_time_minutes,
                    pace_minutes_per_mile: accepted.pace_minutes_per_mile,
                    retry_after_minutes: None,
                }
            }
            ScanOutcome::Rejected(rejection) => {
                let retry = rejection.retry_after_minutes().ceil().max(1.0) as i64;
                Self {
                    message: format!("{}. Try again in {} minutes.", rejection, retry),
                    previous_scan_at: Some(rejection.last_scan_at),
                    retry_after_minutes: Some(retry),
                    ..Self::failure("")
                }
            }
            ScanOutcome::NotFound {
                entity: MissingEntity::Runner,
                ..
            } => Self::failure("Runner not found"),
            ScanOutcome::NotFound {
                entity: MissingEntity::Track,
                ..
            } => Self::failure("Track not found"),
            ScanOutcome::InvalidIdentifier(_) => Self::failure("Invalid QR code format"),
        }
    }
}

/// POST /api/scan
pub async fn record_scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!("Malformed scan request: {}", rejection.body_text());
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(ScanResult::failure("Invalid request format")),
            )
                .into_response());
        }
    };

    let outcome = state
        .scans
        .record_scan(&request.code, request.track_id.as_deref())
        .await?;

    Ok(Json(ScanResult::from(outcome)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ScanListQuery {
    pub registration_id: Option<Uuid>,
    pub season_id: Option<Uuid>,
}

/// Scan history, per runner or across a season
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ScanList {
    Runner(Vec<ScanRecord>),
    Listing(Vec<ScanListing>),
}

/// GET /api/scans?registration_id=&season_id=
pub async fn list_scans(
    State(state): State<AppState>,
    Query(query): Query<ScanListQuery>,
) -> ApiResult<Json<ScanList>> {
    let list = match query.registration_id {
        Some(id) => ScanList::Runner(
            scans::list_scans_for_registration(state.db.reader(), id).await?,
        ),
        None => ScanList::Listing(scans::list_scans(state.db.reader(), query.season_id).await?),
    };

    Ok(Json(list))
}
