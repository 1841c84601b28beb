//! Registration persistence and lookups

use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{Registration, RegistrationDraft, RegistrationFilter, RegistrationPage};
use super::seasons;
use crate::{time, uuid_utils, Error, Result};

const REGISTRATION_COLUMNS: &str = "id, season_id, first_name, last_name, grade, teacher, gender, \
    parent_contact_number, backup_contact_number, parent_email, \
    dismissal_method, allergies, medical_info, registered_at";

/// Upper bound on page size for listings
pub const MAX_PER_PAGE: u32 = 500;

pub(crate) fn registration_from_row(row: &SqliteRow) -> Result<Registration> {
    let id: String = row.try_get("id")?;
    let season_id: Option<String> = row.try_get("season_id")?;
    let registered_at: String = row.try_get("registered_at")?;

    Ok(Registration {
        id: uuid_utils::from_db("registrations.id", &id)?,
        season_id: uuid_utils::from_db_opt("registrations.season_id", season_id)?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        grade: row.try_get("grade")?,
        teacher: row.try_get("teacher")?,
        gender: row.try_get("gender")?,
        parent_contact_number: row.try_get("parent_contact_number")?,
        backup_contact_number: row.try_get("backup_contact_number")?,
        parent_email: row.try_get("parent_email")?,
        dismissal_method: row.try_get("dismissal_method")?,
        allergies: row.try_get("allergies")?,
        medical_info: row.try_get("medical_info")?,
        registered_at: time::from_db(&registered_at)?,
    })
}

/// Validate and store a registration
///
/// Field validation happens before any query runs.
pub async fn create_registration(pool: &SqlitePool, draft: RegistrationDraft) -> Result<Registration> {
    let draft = draft.normalized();
    draft.validate()?;

    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    if let Some(season_id) = draft.season_id {
        if seasons::get_season(&mut *tx, season_id).await?.is_none() {
            tx.rollback().await?;
            return Err(Error::NotFound(format!("Season {}", season_id)));
        }
    }

    let registration = Registration {
        id: uuid_utils::generate(),
        season_id: draft.season_id,
        first_name: draft.first_name,
        last_name: draft.last_name,
        grade: draft.grade,
        teacher: draft.teacher,
        gender: draft.gender,
        parent_contact_number: draft.parent_contact_number,
        backup_contact_number: draft.backup_contact_number,
        parent_email: draft.parent_email,
        dismissal_method: draft.dismissal_method,
        allergies: draft.allergies,
        medical_info: draft.medical_info,
        registered_at: time::now(),
    };

    let sql = format!(
        "INSERT INTO registrations ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        REGISTRATION_COLUMNS
    );
    sqlx::query(&sql)
        .bind(registration.id.to_string())
        .bind(registration.season_id.map(|id| id.to_string()))
        .bind(&registration.first_name)
        .bind(&registration.last_name)
        .bind(&registration.grade)
        .bind(&registration.teacher)
        .bind(&registration.gender)
        .bind(&registration.parent_contact_number)
        .bind(&registration.backup_contact_number)
        .bind(&registration.parent_email)
        .bind(&registration.dismissal_method)
        .bind(&registration.allergies)
        .bind(&registration.medical_info)
        .bind(time::to_db(&registration.registered_at))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        registration_id = %registration.id,
        season_id = ?registration.season_id,
        "Registered {}",
        registration.full_name()
    );
    Ok(registration)
}

pub async fn get_registration<'e, E>(executor: E, id: Uuid) -> Result<Option<Registration>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM registrations WHERE id = ?",
        REGISTRATION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(registration_from_row).transpose()
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `\` as escape character
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

const FILTER_CLAUSE: &str = r#"
    WHERE (? IS NULL OR season_id = ?)
      AND (? IS NULL
           OR first_name LIKE ? ESCAPE '\'
           OR last_name LIKE ? ESCAPE '\'
           OR grade LIKE ? ESCAPE '\'
           OR teacher LIKE ? ESCAPE '\'
           OR parent_email LIKE ? ESCAPE '\')
"#;

/// Registrations matching a filter, newest first, one page at a time
pub async fn list_registrations(
    pool: &SqlitePool,
    filter: &RegistrationFilter,
) -> Result<RegistrationPage> {
    let page = filter.page.max(1);
    let per_page = filter.per_page.clamp(1, MAX_PER_PAGE);
    let offset = i64::from(page - 1) * i64::from(per_page);

    let season = filter.season_id.map(|id| id.to_string());
    let pattern = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);

    let count_sql = format!("SELECT COUNT(*) FROM registrations {}", FILTER_CLAUSE);
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(&season)
        .bind(&season)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

    let list_sql = format!(
        "SELECT {} FROM registrations {} ORDER BY registered_at DESC, last_name, first_name LIMIT ? OFFSET ?",
        REGISTRATION_COLUMNS, FILTER_CLAUSE
    );
    let rows = sqlx::query(&list_sql)
        .bind(&season)
        .bind(&season)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let registrations = rows
        .iter()
        .map(registration_from_row)
        .collect::<Result<Vec<_>>>()?;

    let total_pages = ((total + i64::from(per_page) - 1) / i64::from(per_page)) as u32;
    debug!(total, page, per_page, "Listed registrations");

    Ok(RegistrationPage {
        registrations,
        total,
        page,
        per_page,
        total_pages,
    })
}

pub async fn count_registrations_for_season<'e, E>(executor: E, season_id: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE season_id = ?")
        .bind(season_id.to_string())
        .fetch_one(executor)
        .await?;

    Ok(count)
}
