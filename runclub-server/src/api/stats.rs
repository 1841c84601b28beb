//! Season statistics endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use runclub_common::stats::{self, SeasonStats};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/seasons/:id/stats
pub async fn season_stats(
    State(state): State<AppState>,
    Path(season_id): Path<Uuid>,
) -> ApiResult<Json<SeasonStats>> {
    Ok(Json(stats::season_statistics(&state.db, season_id).await?))
}
