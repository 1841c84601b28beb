//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation;
use crate::Result;

/// A named period of run club activity; at most one is active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Token for unauthenticated self-registration links
    pub registration_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSeason {
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    /// Generated when absent
    #[serde(default)]
    pub registration_token: Option<String>,
}

/// Season with its registration and scan counts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonSummary {
    #[serde(flatten)]
    pub season: Season,
    pub registration_count: i64,
    pub scan_count: i64,
}

/// A named route of fixed distance within one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: Uuid,
    pub season_id: Uuid,
    pub name: String,
    pub distance_miles: f64,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrack {
    pub season_id: Uuid,
    pub name: String,
    pub distance_miles: f64,
    #[serde(default)]
    pub is_default: bool,
}

/// A runner enrolled in a season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    /// `None` for legacy rows that predate seasons
    pub season_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    pub teacher: String,
    pub gender: Option<String>,
    pub parent_contact_number: String,
    pub backup_contact_number: Option<String>,
    pub parent_email: String,
    pub dismissal_method: Option<String>,
    pub allergies: Option<String>,
    pub medical_info: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Registration input before validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDraft {
    #[serde(default)]
    pub season_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    pub teacher: String,
    #[serde(default)]
    pub gender: Option<String>,
    pub parent_contact_number: String,
    #[serde(default)]
    pub backup_contact_number: Option<String>,
    pub parent_email: String,
    #[serde(default)]
    pub dismissal_method: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medical_info: Option<String>,
}

impl RegistrationDraft {
    /// Trim every field and turn blank optional fields into `None`
    pub fn normalized(self) -> Self {
        fn opt(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            season_id: self.season_id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            grade: self.grade.trim().to_string(),
            teacher: self.teacher.trim().to_string(),
            gender: opt(self.gender),
            parent_contact_number: self.parent_contact_number.trim().to_string(),
            backup_contact_number: opt(self.backup_contact_number),
            parent_email: self.parent_email.trim().to_string(),
            dismissal_method: opt(self.dismissal_method),
            allergies: opt(self.allergies),
            medical_info: opt(self.medical_info),
        }
    }

    /// Field checks that need no storage access; expects a normalized draft
    pub fn validate(&self) -> Result<()> {
        validation::require_present("First name", &self.first_name)?;
        validation::require_present("Last name", &self.last_name)?;
        validation::require_present("Grade", &self.grade)?;
        validation::require_present("Teacher", &self.teacher)?;
        validation::require_present("Parent contact number", &self.parent_contact_number)?;
        validation::require_present("Parent email", &self.parent_email)?;

        validation::require_grade(&self.grade)?;
        if let Some(gender) = &self.gender {
            validation::require_gender(gender)?;
        }

        validation::require_phone("Parent contact number", &self.parent_contact_number)?;
        if let Some(backup) = &self.backup_contact_number {
            validation::require_phone("Backup contact number", backup)?;
        }

        if !validation::is_valid_email(&self.parent_email) {
            return Err(crate::Error::InvalidInput(format!(
                "Invalid parent email '{}'",
                self.parent_email
            )));
        }

        Ok(())
    }
}

/// Filter and page selection for registration listings
#[derive(Debug, Clone)]
pub struct RegistrationFilter {
    pub season_id: Option<Uuid>,
    /// Case-insensitive substring over names, grade, teacher and email
    pub search: Option<String>,
    /// 1-based
    pub page: u32,
    pub per_page: u32,
}

impl Default for RegistrationFilter {
    fn default() -> Self {
        Self {
            season_id: None,
            search: None,
            page: 1,
            per_page: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPage {
    pub registrations: Vec<Registration>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

/// One recorded lap. Append-only.
///
/// `season_id` and `track_id` are copied at insert time and do not follow
/// later changes to the registration or season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub season_id: Option<Uuid>,
    pub track_id: Option<Uuid>,
    pub scanned_at: DateTime<Utc>,
}

/// Scan joined with the names needed for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanListing {
    #[serde(flatten)]
    pub scan: ScanRecord,
    pub runner_name: String,
    pub season_name: Option<String>,
    pub track_name: Option<String>,
}
