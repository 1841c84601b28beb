//! Pace-based scan debounce
//!
//! A scan is rejected when the time since the runner's previous scan is
//! shorter than the track distance at [`PACE_FLOOR_MINUTES_PER_MILE`]. With no
//! resolvable distance the check cannot fire and the scan is accepted.
//!
//! The boundary is inclusive: `elapsed == minimum` is accepted.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{Executor, Sqlite};
use std::fmt;
use uuid::Uuid;

use crate::db::scans;
use crate::{time, Result};

/// No runner laps faster than this
pub const PACE_FLOOR_MINUTES_PER_MILE: f64 = 5.0;

/// Why a scan was refused
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebounceRejection {
    pub last_scan_at: DateTime<Utc>,
    pub elapsed_minutes: f64,
    /// Pace implied by accepting this scan
    pub pace_minutes_per_mile: f64,
    pub minimum_minutes: f64,
    pub distance_miles: f64,
}

impl DebounceRejection {
    /// Minutes until a scan for the same distance would be accepted
    pub fn retry_after_minutes(&self) -> f64 {
        (self.minimum_minutes - self.elapsed_minutes).max(0.0)
    }
}

impl fmt::Display for DebounceRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scan rejected: too soon since last scan ({:.1} minutes ago, {:.1} min/mile pace). \
             Minimum pace is {} min/mile",
            self.elapsed_minutes, self.pace_minutes_per_mile, PACE_FLOOR_MINUTES_PER_MILE
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept,
    Reject(DebounceRejection),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Shortest plausible time to cover `distance_miles`
pub fn minimum_interval(distance_miles: f64) -> Duration {
    let micros = distance_miles * PACE_FLOOR_MINUTES_PER_MILE * 60_000_000.0;
    Duration::microseconds(micros.round() as i64)
}

/// Decide a scan from the previous scan time alone
pub fn evaluate(
    last_scan_at: Option<DateTime<Utc>>,
    distance_miles: f64,
    now: DateTime<Utc>,
) -> Verdict {
    let Some(last_scan_at) = last_scan_at else {
        return Verdict::Accept;
    };

    if distance_miles.is_nan() || distance_miles <= 0.0 {
        return Verdict::Accept;
    }

    let elapsed = now - last_scan_at;
    let minimum = minimum_interval(distance_miles);
    if elapsed >= minimum {
        return Verdict::Accept;
    }

    let elapsed_minutes = time::minutes(elapsed);
    Verdict::Reject(DebounceRejection {
        last_scan_at,
        elapsed_minutes,
        pace_minutes_per_mile: elapsed_minutes / distance_miles,
        minimum_minutes: time::minutes(minimum),
        distance_miles,
    })
}

/// Look up the runner's latest scan and decide
///
/// Pass the open write transaction as the executor so the decision and the
/// following insert see the same snapshot.
pub async fn evaluate_scan<'e, E>(
    executor: E,
    registration_id: Uuid,
    distance_miles: f64,
    now: DateTime<Utc>,
) -> Result<Verdict>
where
    E: Executor<'e, Database = Sqlite>,
{
    if distance_miles.is_nan() || distance_miles <= 0.0 {
        return Ok(Verdict::Accept);
    }

    let last_scan_at = scans::latest_scan_time(executor, registration_id).await?;
    Ok(evaluate(last_scan_at, distance_miles, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 3, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_first_scan_always_accepted() {
        assert!(evaluate(None, 1.0, t0()).is_accept());
        assert!(evaluate(None, 100.0, t0()).is_accept());
        assert!(evaluate(None, 0.0, t0()).is_accept());
    }

    #[test]
    fn test_no_distance_bypasses_check() {
        assert!(evaluate(Some(t0()), 0.0, t0()).is_accept());
        assert!(evaluate(Some(t0()), -1.0, t0() + Duration::seconds(1)).is_accept());
        assert!(evaluate(Some(t0()), f64::NAN, t0()).is_accept());
    }

    #[test]
    fn test_one_mile_track() {
        let two = evaluate(Some(t0()), 1.0, t0() + Duration::minutes(2));
        match two {
            Verdict::Reject(r) => {
                assert_eq!(r.elapsed_minutes, 2.0);
                assert_eq!(r.pace_minutes_per_mile, 2.0);
                assert_eq!(r.minimum_minutes, 5.0);
                assert_eq!(r.retry_after_minutes(), 3.0);
                assert!(r.to_string().contains("too soon"));
                assert!(r.to_string().contains("Minimum pace is 5 min/mile"));
            }
            Verdict::Accept => panic!("2 minutes on a 1 mile track must be rejected"),
        }

        assert!(evaluate(Some(t0()), 1.0, t0() + Duration::minutes(6)).is_accept());
    }

    #[test]
    fn test_boundary_is_inclusive() {
        // 0.25 mi * 5 min/mi = 1m15s
        let at_floor = t0() + Duration::seconds(75);
        assert!(evaluate(Some(t0()), 0.25, at_floor).is_accept());

        let just_under = at_floor - Duration::microseconds(1);
        assert!(!evaluate(Some(t0()), 0.25, just_under).is_accept());
    }

    #[test]
    fn test_clock_behind_last_scan_is_rejected() {
        assert!(!evaluate(Some(t0()), 1.0, t0() - Duration::minutes(1)).is_accept());
    }

    #[test]
    fn test_minimum_interval() {
        assert_eq!(minimum_interval(1.0), Duration::minutes(5));
        assert_eq!(minimum_interval(0.25), Duration::seconds(75));
        assert_eq!(minimum_interval(3.1), Duration::seconds(930));
    }

    #[test]
    fn test_message_format() {
        let rejection = DebounceRejection {
            last_scan_at: t0(),
            elapsed_minutes: 2.0,
            pace_minutes_per_mile: 2.0,
            minimum_minutes: 5.0,
            distance_miles: 1.0,
        };
        assert_eq!(
            rejection.to_string(),
            "scan rejected: too soon since last scan (2.0 minutes ago, 2.0 min/mile pace). Minimum pace is 5 min/mile"
        );
    }
}
