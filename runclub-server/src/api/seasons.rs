//! Season management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use runclub_common::db::models::{NewSeason, Season, SeasonSummary};
use runclub_common::db::seasons;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/seasons
pub async fn list_seasons(State(state): State<AppState>) -> ApiResult<Json<Vec<SeasonSummary>>> {
    Ok(Json(seasons::list_season_summaries(state.db.reader()).await?))
}

/// POST /api/seasons
pub async fn create_season(
    State(state): State<AppState>,
    Json(new): Json<NewSeason>,
) -> ApiResult<(StatusCode, Json<Season>)> {
    let season = seasons::create_season(state.db.writer(), new).await?;
    Ok((StatusCode::CREATED, Json(season)))
}

/// GET /api/seasons/active
pub async fn active_season(State(state): State<AppState>) -> ApiResult<Json<Season>> {
    seasons::get_active_season(state.db.reader())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No active season".to_string()))
}

/// POST /api/seasons/:id/activate
pub async fn activate_season(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Season>> {
    Ok(Json(seasons::activate_season(state.db.writer(), id).await?))
}

/// POST /api/seasons/:id/deactivate
pub async fn deactivate_season(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Season>> {
    Ok(Json(seasons::deactivate_season(state.db.writer(), id).await?))
}

/// GET /api/register/:token
///
/// Resolves a public self-registration link to its season.
pub async fn season_for_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<Season>> {
    seasons::get_season_by_registration_token(state.db.reader(), &token)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Registration link not found".to_string()))
}
