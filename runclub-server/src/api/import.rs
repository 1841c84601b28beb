//! Bulk registration import

use axum::{
    extract::{Path, State},
    Json,
};
use runclub_common::db::models::RegistrationDraft;
use runclub_common::db::seasons;
use runclub_common::import::{self, ImportReport};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/seasons/:id/import
///
/// Body is a JSON array of registrations. Bad rows are reported, not fatal.
pub async fn import_registrations(
    State(state): State<AppState>,
    Path(season_id): Path<Uuid>,
    Json(rows): Json<Vec<RegistrationDraft>>,
) -> ApiResult<Json<ImportReport>> {
    let season = seasons::get_season(state.db.reader(), season_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Season {} not found", season_id)))?;

    Ok(Json(import::import_registrations(&state.db, &season, rows).await?))
}
