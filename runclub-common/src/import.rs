//! Bulk registration import
//!
//! Rows are persisted one at a time. A row that fails validation or storage is
//! reported with its 1-based position and the batch carries on.

use serde::Serialize;
use tracing::{info, warn};

use crate::db::models::{RegistrationDraft, Season};
use crate::db::{registrations, Database};
use crate::Result;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub failed: Vec<RowFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    /// 1-based position in the submitted batch
    pub row: usize,
    pub message: String,
}

/// Import registrations into `season`
///
/// Each draft's season is overwritten with `season.id`.
pub async fn import_registrations(
    db: &Database,
    season: &Season,
    rows: Vec<RegistrationDraft>,
) -> Result<ImportReport> {
    let total = rows.len();
    let mut report = ImportReport::default();

    for (index, mut draft) in rows.into_iter().enumerate() {
        let row = index + 1;
        draft.season_id = Some(season.id);

        match registrations::create_registration(db.writer(), draft).await {
            Ok(_) => report.imported += 1,
            Err(e) => {
                warn!(season_id = %season.id, row, error = %e, "Import row rejected");
                report.failed.push(RowFailure {
                    row,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        season_id = %season.id,
        total,
        imported = report.imported,
        failed = report.failed.len(),
        "Registration import finished"
    );

    Ok(report)
}
