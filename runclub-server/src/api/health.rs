//! Health check endpoint
//!
//! Reports whether the reader pool can reach the database and which
//! schema version it is on. An unreachable database answers 503 so a
//! load balancer stops routing scans here.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use runclub_common::db::migrations;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub schema_version: Option<i64>,
    pub expected_schema_version: i64,
    pub version: &'static str,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let schema_version = migrations::current_version(state.db.reader()).await;

    let (status, database, schema_version) = match schema_version {
        Ok(version) => (StatusCode::OK, "ok", version),
        Err(e) => {
            warn!(error = %e, "Health check could not reach the database");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable", None)
        }
    };

    let body = HealthResponse {
        status: if status == StatusCode::OK { "ok" } else { "degraded" },
        database,
        schema_version,
        expected_schema_version: migrations::latest_version(),
        version: env!("CARGO_PKG_VERSION"),
    };

    (status, Json(body))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
