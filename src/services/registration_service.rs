use sqlx::SqlitePool;
use tracing::info;

use crate::database::registration_repo;
use crate::forms::{RegistrationForm, ValidRegistration};
use crate::services::lbw_service;
use crate::services::{format_date, ServiceError, ServiceResult};

pub struct ParticipantView {
    pub user_id: String,
    pub name: String,
    pub arrival_label: String,
    pub departure_label: String,
    pub nights: i64,
    pub comment: String,
}

/// Form for the register page: the viewer's current registration, or the
/// full event range when they have none yet.
pub async fn registration_form(
    pool: &SqlitePool,
    lbw_id: i64,
    user_id: &str,
) -> ServiceResult<(RegistrationForm, bool)> {
    let lbw = lbw_service::require_lbw(pool, lbw_id).await?;
    let form = match registration_repo::load_registration(pool, lbw_id, user_id).await? {
        Some(existing) => (
            RegistrationForm::for_dates(
                existing.arrival_date,
                existing.departure_date,
                &existing.comment,
            ),
            true,
        ),
        None => (
            RegistrationForm::for_dates(lbw.start_date, lbw.end_date, ""),
            false,
        ),
    };
    Ok(form)
}

pub async fn is_registered(pool: &SqlitePool, lbw_id: i64, user_id: &str) -> sqlx::Result<bool> {
    Ok(registration_repo::load_registration(pool, lbw_id, user_id)
        .await?
        .is_some())
}

/// Creates the registration or rewrites the existing one.
pub async fn register(
    pool: &SqlitePool,
    lbw_id: i64,
    user_id: &str,
    registration: &ValidRegistration,
) -> ServiceResult<()> {
    lbw_service::require_lbw(pool, lbw_id).await?;
    registration_repo::upsert_registration(
        pool,
        lbw_id,
        user_id,
        registration_repo::RegistrationFields {
            arrival_date: registration.arrival_date,
            departure_date: registration.departure_date,
            comment: &registration.comment,
        },
    )
    .await?;
    info!(lbw_id, user = %user_id, "registration saved");
    Ok(())
}

pub async fn deregister(pool: &SqlitePool, lbw_id: i64, user_id: &str) -> ServiceResult<()> {
    let removed = registration_repo::delete_registration(pool, lbw_id, user_id).await?;
    if removed == 0 {
        return Err(ServiceError::NotFound);
    }
    info!(lbw_id, user = %user_id, "registration removed");
    Ok(())
}

pub async fn participants(pool: &SqlitePool, lbw_id: i64) -> ServiceResult<Vec<ParticipantView>> {
    lbw_service::require_lbw(pool, lbw_id).await?;
    let rows = registration_repo::list_participants(pool, lbw_id).await?;
    Ok(rows
        .into_iter()
        .map(|p| ParticipantView {
            name: if p.name.trim().is_empty() {
                p.user_id.clone()
            } else {
                p.name
            },
            user_id: p.user_id,
            arrival_label: format_date(p.arrival_date),
            departure_label: format_date(p.departure_date),
            nights: (p.departure_date - p.arrival_date).num_days(),
            comment: p.comment,
        })
        .collect())
}
