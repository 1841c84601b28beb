//! Integration tests for runclub-server API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use runclub_common::config::DatabaseSettings;
use runclub_common::Database;
use runclub_server::{build_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: fresh database and router; TempDir must outlive the test
async fn setup_app() -> (TempDir, Router) {
    let temp_dir = TempDir::new().unwrap();
    let settings = DatabaseSettings::new(temp_dir.path().join("runclub-api.db"));
    let db = Database::open(&settings).await.unwrap();
    (temp_dir, build_router(AppState::new(db)))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: send a request and return status plus JSON body
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn registration_body() -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "grade": "3",
        "teacher": "Ms. Rivera",
        "parentContactNumber": "555-123-4567",
        "parentEmail": "ada@example.com"
    })
}

/// Active season with a one-mile default track and one runner; returns
/// (season id, runner id)
async fn seed(app: &Router) -> (String, String) {
    let (status, season) = send(app, post_json("/api/seasons", json!({"name": "Fall", "isActive": true}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let season_id = season["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        post_json(
            &format!("/api/seasons/{}/tracks", season_id),
            json!({"name": "Mile loop", "distanceMiles": 1.0, "isDefault": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, runner) = send(app, post_json("/api/registrations", registration_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(runner["seasonId"], season_id.as_str());

    (season_id, runner["id"].as_str().unwrap().to_string())
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["schemaVersion"], body["expectedSchemaVersion"]);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let temp_dir = TempDir::new().unwrap();
    let settings = DatabaseSettings::new(temp_dir.path().join("runclub-api.db"));
    let db = Database::open(&settings).await.unwrap();
    let app = build_router(AppState::new(db.clone()));
    db.close().await;

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "unavailable");
    assert!(body["schemaVersion"].is_null());
}

// =============================================================================
// Scans
// =============================================================================

#[tokio::test]
async fn test_scan_accepted_then_debounced() {
    let (_dir, app) = setup_app().await;
    let (_season_id, runner_id) = seed(&app).await;

    let (status, body) = send(&app, post_json("/api/scan", json!({"code": runner_id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully recorded run for Ada Lovelace");
    assert_eq!(body["registration"]["id"], runner_id.as_str());
    assert_eq!(body["track"]["name"], "Mile loop");
    assert!(body["scanRecord"]["id"].is_string());

    let (status, body) = send(&app, post_json("/api/scan", json!({"code": runner_id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("too soon"), "{}", message);
    assert!(message.ends_with("Try again in 5 minutes."), "{}", message);
    assert_eq!(body["retryAfterMinutes"], 5);

    let (status, body) = send(&app, get(&format!("/api/scans?registration_id={}", runner_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_scan_negative_outcomes_are_ok_responses() {
    let (_dir, app) = setup_app().await;
    let (_season_id, runner_id) = seed(&app).await;

    let (status, body) = send(&app, post_json("/api/scan", json!({"code": "garbage"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid QR code format");

    let unknown = uuid::Uuid::new_v4().to_string();
    let (status, body) = send(&app, post_json("/api/scan", json!({"code": unknown}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Runner not found");

    let (status, body) = send(
        &app,
        post_json("/api/scan", json!({"code": runner_id, "track_id": unknown})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Track not found");

    let (status, body) = send(&app, get("/api/scans")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_scan_malformed_body() {
    let (_dir, app) = setup_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/scan")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid request format");
}

// =============================================================================
// Seasons, tracks, registrations
// =============================================================================

#[tokio::test]
async fn test_season_lifecycle() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, get("/api/seasons/active")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (_, fall) = send(&app, post_json("/api/seasons", json!({"name": "Fall", "isActive": true}))).await;
    let (_, spring) = send(&app, post_json("/api/seasons", json!({"name": "Spring", "isActive": false}))).await;
    let spring_id = spring["id"].as_str().unwrap();

    let (status, body) = send(&app, post_json(&format!("/api/seasons/{}/activate", spring_id), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isActive"], true);

    let (_, active) = send(&app, get("/api/seasons/active")).await;
    assert_eq!(active["id"], spring_id);

    let (_, seasons) = send(&app, get("/api/seasons")).await;
    let seasons = seasons.as_array().unwrap();
    assert_eq!(seasons.len(), 2);
    let fall_summary = seasons.iter().find(|s| s["id"] == fall["id"]).unwrap();
    assert_eq!(fall_summary["isActive"], false);
    assert_eq!(fall_summary["registrationCount"], 0);

    let token = fall["registrationToken"].as_str().unwrap();
    let (status, body) = send(&app, get(&format!("/api/register/{}", token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], fall["id"]);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(&app, post_json(&format!("/api/seasons/{}/activate", missing), json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, post_json(&format!("/api/seasons/{}/deactivate", spring_id), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get("/api/seasons/active")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_track_validation() {
    let (_dir, app) = setup_app().await;
    let (season_id, _) = seed(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/seasons/{}/tracks", season_id),
            json!({"name": "Broken", "distanceMiles": 0.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = send(&app, get(&format!("/api/seasons/{}/tracks", season_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, get(&format!("/api/seasons/{}/tracks", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registration_requires_active_season() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, post_json("/api/registrations", registration_body())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_registration_endpoints() {
    let (_dir, app) = setup_app().await;
    let (season_id, runner_id) = seed(&app).await;

    let mut invalid = registration_body();
    invalid["parentContactNumber"] = json!("5551234567");
    let (status, body) = send(&app, post_json("/api/registrations", invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("DDD-DDD-DDDD"));

    let (status, body) = send(&app, get(&format!("/api/registrations/{}", runner_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Ada");

    let (status, _) = send(&app, get(&format!("/api/registrations/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        get(&format!("/api/registrations?season_id={}&search=love&page=1&per_page=10", season_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["perPage"], 10);
    assert_eq!(body["registrations"][0]["id"], runner_id.as_str());
}

#[tokio::test]
async fn test_import_and_stats() {
    let (_dir, app) = setup_app().await;
    let (season_id, runner_id) = seed(&app).await;

    let mut bad = registration_body();
    bad["grade"] = json!("12");
    let mut second = registration_body();
    second["firstName"] = json!("Grace");
    second["lastName"] = json!("Hopper");
    second["grade"] = json!("K");

    let (status, report) = send(
        &app,
        post_json(&format!("/api/seasons/{}/import", season_id), json!([second, bad])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["imported"], 1);
    assert_eq!(report["failed"][0]["row"], 2);

    send(&app, post_json("/api/scan", json!({"code": runner_id}))).await;

    let (status, stats) = send(&app, get(&format!("/api/seasons/{}/stats", season_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalRunners"], 2);
    assert_eq!(stats["totalScans"], 1);
    assert_eq!(stats["totalDistanceMiles"], 1.0);
    assert_eq!(stats["topRunners"][0]["registrationId"], runner_id.as_str());
    assert_eq!(stats["trackUsage"][0]["trackName"], "Mile loop");

    let (status, _) = send(&app, get(&format!("/api/seasons/{}/stats", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
