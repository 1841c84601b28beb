//! Scan transaction coordinator
//!
//! `record_scan` is the only mutating entry point for scans. Registration,
//! season and track lookups, the debounce decision and the insert all run
//! in one write transaction. Write transactions go through the one-connection
//! writer pool, so two scans for the same runner can never both observe
//! "no recent scan": the second waits for the first to commit and then sees
//! its row.

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::models::{Registration, ScanRecord, Season, Track};
use crate::db::{registrations, scans, seasons, tracks, Database};
use crate::debounce::{self, DebounceRejection, Verdict};
use crate::{time, uuid_utils, Result};

/// Which identifier failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingEntity {
    Runner,
    Track,
}

/// A committed scan plus display data gathered after commit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedScan {
    pub scan: ScanRecord,
    pub registration: Registration,
    pub season: Option<Season>,
    /// Re-read after commit; `None` when no track applied or the read failed
    pub track: Option<Track>,
    pub previous_scan: Option<ScanRecord>,
    pub lap_time_minutes: Option<f64>,
    pub pace_minutes_per_mile: Option<f64>,
}

/// Result of a scan attempt
///
/// Every variant is an ordinary outcome; storage failures come back as
/// `Err` from [`ScanCoordinator::record_scan`].
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Accepted(Box<AcceptedScan>),
    Rejected(DebounceRejection),
    NotFound { entity: MissingEntity, id: Uuid },
    InvalidIdentifier(String),
}

/// What the write transaction decided
enum Decision {
    Committed {
        scan: ScanRecord,
        registration: Registration,
        season: Option<Season>,
        distance_miles: f64,
    },
    Rejected(DebounceRejection),
    Missing(MissingEntity, Uuid),
}

#[derive(Debug, Clone)]
pub struct ScanCoordinator {
    db: Database,
}

impl ScanCoordinator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a scan at the current time
    pub async fn record_scan(&self, runner_id: &str, track_id: Option<&str>) -> Result<ScanOutcome> {
        self.record_scan_at(runner_id, track_id, time::now()).await
    }

    /// Record a scan as if it happened at `now`
    ///
    /// An empty track identifier counts as no track.
    pub async fn record_scan_at(
        &self,
        runner_id: &str,
        track_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome> {
        let Ok(registration_id) = uuid_utils::parse(runner_id) else {
            debug!(code = runner_id, "Scan with malformed runner identifier");
            return Ok(ScanOutcome::InvalidIdentifier(runner_id.to_string()));
        };

        let track_id = match track_id.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => match uuid_utils::parse(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    debug!(track = raw, "Scan with malformed track identifier");
                    return Ok(ScanOutcome::InvalidIdentifier(raw.to_string()));
                }
            },
        };

        let now = now.trunc_subsecs(6);

        match self.decide(registration_id, track_id, now).await? {
            Decision::Committed {
                scan,
                registration,
                season,
                distance_miles,
            } => {
                let accepted = self.enrich(scan, registration, season, distance_miles).await;
                info!(
                    scan_id = %accepted.scan.id,
                    registration_id = %registration_id,
                    track_id = ?accepted.scan.track_id,
                    lap_time_minutes = ?accepted.lap_time_minutes,
                    "Recorded scan for {}",
                    accepted.registration.full_name()
                );
                Ok(ScanOutcome::Accepted(Box::new(accepted)))
            }
            Decision::Rejected(rejection) => {
                debug!(
                    registration_id = %registration_id,
                    elapsed_minutes = rejection.elapsed_minutes,
                    minimum_minutes = rejection.minimum_minutes,
                    "Scan debounced"
                );
                Ok(ScanOutcome::Rejected(rejection))
            }
            Decision::Missing(entity, id) => {
                debug!(?entity, %id, "Scan for unknown identifier");
                Ok(ScanOutcome::NotFound { entity, id })
            }
        }
    }

    /// Lookup, debounce and insert as one transaction
    ///
    /// Every early return rolls back; `?` exits roll back when the
    /// transaction is dropped.
    async fn decide(
        &self,
        registration_id: Uuid,
        track_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        let started = Instant::now();
        let mut tx = self.db.writer().begin_with("BEGIN IMMEDIATE").await?;

        let Some(registration) = registrations::get_registration(&mut *tx, registration_id).await?
        else {
            tx.rollback().await?;
            return Ok(Decision::Missing(MissingEntity::Runner, registration_id));
        };

        let season = match registration.season_id {
            Some(season_id) => seasons::get_season(&mut *tx, season_id).await?,
            None => None,
        };

        let track = match (track_id, registration.season_id) {
            (Some(id), _) => match tracks::track_distance(&mut *tx, id).await? {
                Some(track) => Some(track),
                None => {
                    tx.rollback().await?;
                    return Ok(Decision::Missing(MissingEntity::Track, id));
                }
            },
            (None, Some(season_id)) => tracks::default_track_distance(&mut *tx, season_id).await?,
            (None, None) => None,
        };
        let distance_miles = track.map(|t| t.distance_miles).unwrap_or(0.0);

        if let Verdict::Reject(rejection) =
            debounce::evaluate_scan(&mut *tx, registration_id, distance_miles, now).await?
        {
            tx.rollback().await?;
            return Ok(Decision::Rejected(rejection));
        }

        let scan = ScanRecord {
            id: uuid_utils::generate(),
            registration_id,
            season_id: registration.season_id,
            track_id: track.map(|t| t.id),
            scanned_at: now,
        };
        scans::insert_scan(&mut *tx, &scan).await?;
        tx.commit().await?;

        let held_ms = started.elapsed().as_millis() as u64;
        if held_ms > 2000 {
            warn!(held_ms, "Scan transaction held the writer for an extended period");
        } else {
            debug!(held_ms, "Scan transaction committed");
        }

        Ok(Decision::Committed {
            scan,
            registration,
            season,
            distance_miles,
        })
    }

    /// Post-commit reads for display; failures only cost the extra fields
    async fn enrich(
        &self,
        scan: ScanRecord,
        registration: Registration,
        season: Option<Season>,
        distance_miles: f64,
    ) -> AcceptedScan {
        let track = match scan.track_id {
            Some(id) => tracks::get_track(self.db.reader(), id)
                .await
                .unwrap_or_else(|e| {
                    warn!(track_id = %id, error = %e, "Failed to load track for scan response");
                    None
                }),
            None => None,
        };

        let previous_scan =
            scans::get_previous_scan(self.db.reader(), scan.registration_id, scan.scanned_at)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to load previous scan");
                    None
                });

        let lap_time_minutes = previous_scan
            .as_ref()
            .map(|previous| time::minutes(scan.scanned_at - previous.scanned_at));
        let pace_minutes_per_mile = lap_time_minutes
            .filter(|_| distance_miles > 0.0)
            .map(|lap| lap / distance_miles);

        AcceptedScan {
            scan,
            registration,
            season,
            track,
            previous_scan,
            lap_time_minutes,
            pace_minutes_per_mile,
        }
    }
}
