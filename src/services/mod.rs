use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;

use crate::database::user_repo;
use crate::forms::FormErrors;
use crate::models::UserRow;

pub mod accommodation_service;
pub mod activity_service;
pub mod lbw_service;
pub mod message_service;
pub mod notification_service;
pub mod registration_service;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,
    #[error("not allowed")]
    Forbidden,
    #[error("invalid input: {0}")]
    Invalid(FormErrors),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("attachment storage error: {0}")]
    Storage(#[from] std::io::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone)]
pub struct PersonView {
    pub user_id: String,
    pub name: String,
}

impl From<UserRow> for PersonView {
    fn from(row: UserRow) -> Self {
        let name = row.display_name().to_string();
        Self {
            user_id: row.user_id,
            name,
        }
    }
}

pub(crate) fn people(rows: Vec<UserRow>) -> Vec<PersonView> {
    rows.into_iter().map(PersonView::from).collect()
}

/// Owners named on a form, or the acting user when none were named.
pub(crate) async fn resolve_owner_ids(
    pool: &SqlitePool,
    requested: &[String],
    actor_user_id: &str,
) -> ServiceResult<Vec<String>> {
    if requested.is_empty() {
        return Ok(vec![actor_user_id.to_string()]);
    }
    let unknown = user_repo::find_unknown_user_ids(pool, requested).await?;
    if !unknown.is_empty() {
        let mut errors = FormErrors::default();
        errors.add("owner_ids", format!("Unknown users: {}", unknown.join(", ")));
        return Err(ServiceError::Invalid(errors));
    }
    Ok(requested.to_vec())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%a %-d %b %Y").to_string()
}

pub fn format_date_range(start: NaiveDate, end: NaiveDate) -> String {
    if start == end {
        format_date(start)
    } else {
        format!("{} - {}", format_date(start), format_date(end))
    }
}

pub fn format_datetime(at: NaiveDateTime) -> String {
    at.format("%a %-d %b %Y %H:%M UTC").to_string()
}
