//! Input validation performed before anything touches storage

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// ASCII digits only; `\d` would also admit other Unicode digits.
const PHONE_PATTERN: &str = r"^[0-9]{3}-[0-9]{3}-[0-9]{4}$";

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PHONE_PATTERN).expect("valid regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));

/// Grades accepted for registration, kindergarten through fifth
pub const VALID_GRADES: &[&str] = &["K", "1", "2", "3", "4", "5"];

/// Gender values accepted for registration
pub const VALID_GENDERS: &[&str] = &["Male", "Female", "Other", "Prefer not to say"];

/// Check a contact number against the `DDD-DDD-DDDD` pattern
pub fn is_valid_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

/// Validate a contact number, naming the field in the error
pub fn require_phone(field: &str, value: &str) -> Result<()> {
    if is_valid_phone(value) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{} must match DDD-DDD-DDDD, got '{}'",
            field, value
        )))
    }
}

/// Email shape check: one `@`, no whitespace, a dot in the domain
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Reject blank required fields
pub fn require_present(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::InvalidInput(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

pub fn require_grade(value: &str) -> Result<()> {
    if VALID_GRADES.contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Invalid grade '{}'", value)))
    }
}

pub fn require_gender(value: &str) -> Result<()> {
    if VALID_GENDERS.contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Invalid gender '{}'", value)))
    }
}

/// Track distances must be positive real numbers
pub fn require_distance(miles: f64) -> Result<()> {
    if miles.is_finite() && miles > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Track distance must be a positive number of miles, got {}",
            miles
        )))
    }
}
