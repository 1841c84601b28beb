//! Tracks within a season

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use runclub_common::db::models::{NewTrack, Track};
use runclub_common::db::{seasons, tracks};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrackRequest {
    pub name: String,
    pub distance_miles: f64,
    #[serde(default)]
    pub is_default: bool,
}

/// GET /api/seasons/:id/tracks
pub async fn list_tracks(
    State(state): State<AppState>,
    Path(season_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Track>>> {
    if seasons::get_season(state.db.reader(), season_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Season {} not found", season_id)));
    }

    Ok(Json(
        tracks::list_tracks_for_season(state.db.reader(), season_id).await?,
    ))
}

/// POST /api/seasons/:id/tracks
pub async fn create_track(
    State(state): State<AppState>,
    Path(season_id): Path<Uuid>,
    Json(request): Json<CreateTrackRequest>,
) -> ApiResult<(StatusCode, Json<Track>)> {
    let track = tracks::create_track(
        state.db.writer(),
        NewTrack {
            season_id,
            name: request.name,
            distance_miles: request.distance_miles,
            is_default: request.is_default,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(track)))
}
