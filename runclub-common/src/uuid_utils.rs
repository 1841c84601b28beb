//! UUID utilities

use uuid::Uuid;

use crate::{Error, Result};

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> std::result::Result<Uuid, uuid::Error> {
    Uuid::parse_str(s.trim())
}

/// Parse a UUID column read back from the database
pub(crate) fn from_db(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid UUID in column {}: {}", column, e)))
}

/// Parse an optional UUID column read back from the database
pub(crate) fn from_db_opt(column: &str, value: Option<String>) -> Result<Option<Uuid>> {
    value.map(|v| from_db(column, &v)).transpose()
}
