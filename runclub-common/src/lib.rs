//! # Run Club Common Library
//!
//! Shared code for the run club scan service:
//! - Database handle, schema migrations and directory lookups
//! - Pace-based scan debounce
//! - Scan transaction coordinator
//! - Season statistics
//! - Bulk registration import
//! - Configuration loading

pub mod config;
pub mod db;
pub mod debounce;
pub mod error;
pub mod import;
pub mod scan;
pub mod stats;
pub mod time;
pub mod uuid_utils;
pub mod validation;

pub use db::Database;
pub use error::{Error, Result};
pub use scan::{ScanCoordinator, ScanOutcome};
