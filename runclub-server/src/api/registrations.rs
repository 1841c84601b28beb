//! Runner registrations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use runclub_common::db::models::{Registration, RegistrationDraft, RegistrationFilter, RegistrationPage};
use runclub_common::db::{registrations, seasons};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query parameters for registration listings
#[derive(Debug, Deserialize)]
pub struct RegistrationQuery {
    pub season_id: Option<Uuid>,
    pub search: Option<String>,
    /// Page number (1-indexed)
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /api/registrations
pub async fn list_registrations(
    State(state): State<AppState>,
    Query(query): Query<RegistrationQuery>,
) -> ApiResult<Json<RegistrationPage>> {
    let defaults = RegistrationFilter::default();
    let filter = RegistrationFilter {
        season_id: query.season_id,
        search: query.search,
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };

    Ok(Json(
        registrations::list_registrations(state.db.reader(), &filter).await?,
    ))
}

/// POST /api/registrations
///
/// A draft without a season joins the active season; with no active season
/// the request is refused.
pub async fn create_registration(
    State(state): State<AppState>,
    Json(mut draft): Json<RegistrationDraft>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    if draft.season_id.is_none() {
        let active = seasons::get_active_season(state.db.reader())
            .await?
            .ok_or_else(|| {
                ApiError::BadRequest("Cannot register runners without an active season".to_string())
            })?;
        draft.season_id = Some(active.id);
    }

    let registration = registrations::create_registration(state.db.writer(), draft).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// GET /api/registrations/:id
pub async fn get_registration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Registration>> {
    registrations::get_registration(state.db.reader(), id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Registration {} not found", id)))
}
