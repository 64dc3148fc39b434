use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::database::{activity_repo, lbw_repo, registration_repo};
use crate::forms::{LbwForm, ValidLbw};
use crate::models::LbwRow;
use crate::services::activity_service;
use crate::services::{
    format_date_range, people, resolve_owner_ids, PersonView, ServiceError, ServiceResult,
};

#[derive(Debug, Clone)]
pub struct LbwSummaryView {
    pub lbw_id: i64,
    pub short_name: String,
    pub location: String,
    pub date_label: String,
}

impl From<LbwRow> for LbwSummaryView {
    fn from(row: LbwRow) -> Self {
        Self {
            lbw_id: row.lbw_id,
            short_name: row.short_name,
            location: row.location,
            date_label: format_date_range(row.start_date, row.end_date),
        }
    }
}

pub struct LbwDetailView {
    pub lbw_id: i64,
    pub short_name: String,
    pub description: String,
    pub location: String,
    pub date_label: String,
    pub owners: Vec<PersonView>,
    pub attendees: Vec<PersonView>,
    pub is_owner: bool,
    pub is_registered: bool,
}

/// Every LBW, newest first. Used for the sidebar on every page.
pub async fn list_all(pool: &SqlitePool) -> sqlx::Result<Vec<LbwSummaryView>> {
    let rows = lbw_repo::list_lbws(pool).await?;
    Ok(rows.into_iter().map(LbwSummaryView::from).collect())
}

/// The front page: signed-in viewers only see LBWs they are not already
/// owning or attending.
pub async fn list_index(
    pool: &SqlitePool,
    viewer_id: Option<&str>,
) -> sqlx::Result<Vec<LbwSummaryView>> {
    let rows = match viewer_id {
        Some(user_id) => lbw_repo::list_lbws_not_involving(pool, user_id).await?,
        None => lbw_repo::list_lbws(pool).await?,
    };
    Ok(rows.into_iter().map(LbwSummaryView::from).collect())
}

pub async fn require_lbw(pool: &SqlitePool, lbw_id: i64) -> ServiceResult<LbwRow> {
    lbw_repo::load_lbw(pool, lbw_id)
        .await?
        .ok_or(ServiceError::NotFound)
}

pub async fn is_owner(pool: &SqlitePool, lbw_id: i64, user_id: &str) -> sqlx::Result<bool> {
    lbw_repo::is_owner(pool, lbw_id, user_id).await
}

pub async fn load_detail_view(
    pool: &SqlitePool,
    lbw_id: i64,
    viewer_id: Option<&str>,
) -> ServiceResult<LbwDetailView> {
    let row = require_lbw(pool, lbw_id).await?;
    let owners = people(lbw_repo::list_owners(pool, lbw_id).await?);
    let attendees: Vec<PersonView> = registration_repo::list_participants(pool, lbw_id)
        .await?
        .into_iter()
        .map(|p| PersonView {
            name: if p.name.trim().is_empty() {
                p.user_id.clone()
            } else {
                p.name
            },
            user_id: p.user_id,
        })
        .collect();

    let is_owner = viewer_id.is_some_and(|id| owners.iter().any(|o| o.user_id == id));
    let is_registered = viewer_id.is_some_and(|id| attendees.iter().any(|a| a.user_id == id));

    Ok(LbwDetailView {
        lbw_id: row.lbw_id,
        short_name: row.short_name,
        description: row.description,
        location: row.location,
        date_label: format_date_range(row.start_date, row.end_date),
        owners,
        attendees,
        is_owner,
        is_registered,
    })
}

pub async fn create_lbw(pool: &SqlitePool, creator_id: &str, lbw: &ValidLbw) -> ServiceResult<LbwRow> {
    let owner_ids = resolve_owner_ids(pool, &lbw.owner_ids, creator_id).await?;

    let mut tx = pool.begin().await?;
    let lbw_id = lbw_repo::insert_lbw(&mut tx, fields(lbw)).await?;
    lbw_repo::replace_owners(&mut tx, lbw_id, &owner_ids).await?;
    tx.commit().await?;

    info!(lbw_id, creator = %creator_id, "lbw proposed");
    require_lbw(pool, lbw_id).await
}

pub async fn update_lbw(
    pool: &SqlitePool,
    lbw_id: i64,
    actor_id: &str,
    lbw: &ValidLbw,
) -> ServiceResult<()> {
    require_lbw(pool, lbw_id).await?;
    if !is_owner(pool, lbw_id, actor_id).await? {
        return Err(ServiceError::Forbidden);
    }
    let owner_ids = resolve_owner_ids(pool, &lbw.owner_ids, actor_id).await?;

    let mut tx = pool.begin().await?;
    lbw_repo::update_lbw(&mut tx, lbw_id, fields(lbw)).await?;
    lbw_repo::replace_owners(&mut tx, lbw_id, &owner_ids).await?;
    tx.commit().await?;
    Ok(())
}

/// Deletes the LBW and, through the schema, everything hanging off it.
/// Attachment files are removed afterwards on a best-effort basis.
pub async fn delete_lbw(pool: &SqlitePool, lbw_id: i64, actor_id: &str) -> ServiceResult<()> {
    require_lbw(pool, lbw_id).await?;
    if !is_owner(pool, lbw_id, actor_id).await? {
        return Err(ServiceError::Forbidden);
    }

    let attachment_paths: Vec<String> = activity_repo::list_activities(pool, lbw_id)
        .await?
        .into_iter()
        .filter_map(|a| a.attachment_path)
        .collect();

    lbw_repo::delete_lbw(pool, lbw_id).await?;
    info!(lbw_id, actor = %actor_id, "lbw deleted");

    for path in attachment_paths {
        if let Err(e) = activity_service::remove_attachment_file(&path).await {
            warn!("Could not remove attachment {}: {}", path, e);
        }
    }
    Ok(())
}

/// Edit form prefilled from the stored LBW, owners included so a plain
/// resubmit keeps them.
pub async fn update_form(pool: &SqlitePool, lbw_id: i64) -> ServiceResult<LbwForm> {
    let row = require_lbw(pool, lbw_id).await?;
    let owners = lbw_repo::list_owners(pool, lbw_id).await?;
    Ok(LbwForm {
        lbw_id: Some(row.lbw_id.to_string()),
        short_name: row.short_name,
        description: row.description,
        location: row.location,
        start_date: row.start_date.format("%Y-%m-%d").to_string(),
        end_date: row.end_date.format("%Y-%m-%d").to_string(),
        owner_ids: owners
            .into_iter()
            .map(|o| o.user_id)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn fields(lbw: &ValidLbw) -> lbw_repo::LbwFields<'_> {
    lbw_repo::LbwFields {
        short_name: &lbw.short_name,
        description: &lbw.description,
        location: &lbw.location,
        start_date: lbw.start_date,
        end_date: lbw.end_date,
    }
}
