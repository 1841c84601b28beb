//! HTTP API handlers for runclub-server

pub mod health;
pub mod import;
pub mod registrations;
pub mod scan;
pub mod seasons;
pub mod stats;
pub mod tracks;

pub use health::health_routes;
pub use import::import_registrations;
pub use registrations::{create_registration, get_registration, list_registrations};
pub use scan::{list_scans, record_scan};
pub use seasons::{
    activate_season, active_season, create_season, deactivate_season, list_seasons,
    season_for_token,
};
pub use stats::season_stats;
pub use tracks::{create_track, list_tracks};
