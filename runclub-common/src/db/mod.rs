//! Database handle, schema migrations, models and directory queries

pub mod init;
pub mod migrations;
pub mod models;
pub mod registrations;
pub mod scans;
pub mod seasons;
pub mod tracks;

pub use init::Database;
pub use migrations::run_migrations;
pub use models::*;
