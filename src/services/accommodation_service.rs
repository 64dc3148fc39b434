use sqlx::SqlitePool;
use tracing::info;

use crate::database::accommodation_repo;
use crate::forms::ValidAccommodation;
use crate::services::lbw_service;
use crate::services::ServiceResult;

pub struct AccommodationView {
    pub name: String,
    pub location: String,
    pub capacity: Option<i64>,
    pub details: String,
    pub submitter_name: String,
}

pub async fn list(pool: &SqlitePool, lbw_id: i64) -> ServiceResult<Vec<AccommodationView>> {
    let rows = accommodation_repo::list_accommodations(pool, lbw_id).await?;
    Ok(rows
        .into_iter()
        .map(|row| AccommodationView {
            submitter_name: if row.submitter_name.trim().is_empty() {
                row.submitted_by
            } else {
                row.submitter_name
            },
            name: row.name,
            location: row.location,
            capacity: row.capacity,
            details: row.details,
        })
        .collect())
}

pub async fn offer(
    pool: &SqlitePool,
    lbw_id: i64,
    user_id: &str,
    acc: &ValidAccommodation,
) -> ServiceResult<i64> {
    lbw_service::require_lbw(pool, lbw_id).await?;
    let id = accommodation_repo::insert_accommodation(
        pool,
        accommodation_repo::NewAccommodation {
            lbw_id,
            submitted_by: user_id,
            name: &acc.name,
            location: &acc.location,
            capacity: acc.capacity,
            details: &acc.details,
        },
    )
    .await?;
    info!(lbw_id, accommodation_id = id, user = %user_id, "accommodation offered");
    Ok(id)
}
