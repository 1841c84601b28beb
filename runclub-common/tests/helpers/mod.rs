//! Shared fixtures for runclub-common integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use runclub_common::config::DatabaseSettings;
use runclub_common::db::models::{
    NewSeason, NewTrack, Registration, RegistrationDraft, Season, Track,
};
use runclub_common::db::{registrations, seasons, tracks};
use runclub_common::debounce::DebounceRejection;
use runclub_common::scan::AcceptedScan;
use runclub_common::{Database, ScanOutcome};
use tempfile::TempDir;
use uuid::Uuid;

/// Open a fresh database in a temporary directory
///
/// The TempDir must be kept alive for the duration of the test.
pub async fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let settings = DatabaseSettings::new(temp_dir.path().join("runclub-test.db"));
    let db = Database::open(&settings).await.unwrap();
    (temp_dir, db)
}

/// Fixed reference instant for timing-sensitive tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 3, 15, 0, 0).unwrap()
}

pub async fn season(db: &Database, name: &str, active: bool) -> Season {
    seasons::create_season(
        db.writer(),
        NewSeason {
            name: name.to_string(),
            is_active: active,
            registration_token: None,
        },
    )
    .await
    .unwrap()
}

pub async fn track(db: &Database, season_id: Uuid, name: &str, miles: f64, default: bool) -> Track {
    tracks::create_track(
        db.writer(),
        NewTrack {
            season_id,
            name: name.to_string(),
            distance_miles: miles,
            is_default: default,
        },
    )
    .await
    .unwrap()
}

/// A draft that passes validation
pub fn draft(first: &str, last: &str, grade: &str) -> RegistrationDraft {
    RegistrationDraft {
        season_id: None,
        first_name: first.to_string(),
        last_name: last.to_string(),
        grade: grade.to_string(),
        teacher: "Ms. Rivera".to_string(),
        gender: None,
        parent_contact_number: "555-123-4567".to_string(),
        backup_contact_number: None,
        parent_email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        dismissal_method: None,
        allergies: None,
        medical_info: None,
    }
}

pub async fn runner(db: &Database, season_id: Option<Uuid>, first: &str, last: &str, grade: &str) -> Registration {
    let mut draft = draft(first, last, grade);
    draft.season_id = season_id;
    registrations::create_registration(db.writer(), draft).await.unwrap()
}

pub async fn scan_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM scan_records")
        .fetch_one(db.reader())
        .await
        .unwrap()
}

pub fn expect_accepted(outcome: ScanOutcome) -> Box<AcceptedScan> {
    match outcome {
        ScanOutcome::Accepted(accepted) => accepted,
        other => panic!("Expected accepted scan, got {:?}", other),
    }
}

pub fn expect_rejected(outcome: ScanOutcome) -> DebounceRejection {
    match outcome {
        ScanOutcome::Rejected(rejection) => rejection,
        other => panic!("Expected rejected scan, got {:?}", other),
    }
}
