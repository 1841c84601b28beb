//! runclub-server library - HTTP front end for the run club scan service

use axum::routing::{get, post};
use axum::Router;
use runclub_common::{Database, ScanCoordinator};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Writer and reader pools
    pub db: Database,
    /// Sole entry point for recording scans
    pub scans: ScanCoordinator,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        let scans = ScanCoordinator::new(db.clone());
        Self { db, scans }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/scan", post(api::record_scan))
        .route("/api/scans", get(api::list_scans))
        .route("/api/seasons", get(api::list_seasons).post(api::create_season))
        .route("/api/seasons/active", get(api::active_season))
        .route("/api/seasons/:id/activate", post(api::activate_season))
        .route("/api/seasons/:id/deactivate", post(api::deactivate_season))
        .route("/api/seasons/:id/stats", get(api::season_stats))
        .route(
            "/api/seasons/:id/tracks",
            get(api::list_tracks).post(api::create_track),
        )
        .route("/api/seasons/:id/import", post(api::import_registrations))
        .route(
            "/api/registrations",
            get(api::list_registrations).post(api::create_registration),
        )
        .route("/api/registrations/:id", get(api::get_registration))
        .route("/api/register/:token", get(api::season_for_token));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
