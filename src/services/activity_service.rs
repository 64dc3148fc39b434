use std::path::Path;

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{activity_repo, lbw_repo};
use crate::forms::{ActivityForm, ValidActivity};
use crate::models::ActivityRow;
use crate::services::lbw_service;
use crate::services::{
    format_date, format_datetime, people, resolve_owner_ids, PersonView, ServiceError,
    ServiceResult,
};

#[derive(Debug, Clone)]
pub struct ActivityCardView {
    pub activity_id: i64,
    pub short_name: String,
    pub description: String,
    pub start_label: Option<String>,
    pub time_label: Option<String>,
    pub duration_label: Option<String>,
    pub owner_names: String,
    pub attendee_count: usize,
    pub has_attachment: bool,
}

pub struct ActivityView {
    pub activity_id: i64,
    pub lbw_id: i64,
    pub short_name: String,
    pub description: String,
    pub start_label: Option<String>,
    pub duration_label: Option<String>,
    pub attachment_name: Option<String>,
    pub owners: Vec<PersonView>,
    pub attendees: Vec<PersonView>,
    pub is_owner: bool,
    pub can_schedule: bool,
    pub is_attending: bool,
    /// Current start split the way the schedule widget posts it back.
    pub schedule_day: String,
    pub schedule_hour: String,
    pub schedule_min: String,
}

pub struct ScheduleDayView {
    pub day_label: String,
    pub entries: Vec<ActivityCardView>,
}

pub struct ScheduleView {
    pub days: Vec<ScheduleDayView>,
    pub unscheduled: Vec<ActivityCardView>,
}

#[derive(Debug)]
pub struct SavedActivity {
    pub activity: ActivityRow,
    pub created: bool,
}

/// Loads an activity and checks it belongs to `lbw_id`.
pub async fn require_activity(
    pool: &SqlitePool,
    lbw_id: i64,
    activity_id: i64,
) -> ServiceResult<ActivityRow> {
    match activity_repo::load_activity(pool, activity_id).await? {
        Some(row) if row.lbw_id == lbw_id => Ok(row),
        _ => Err(ServiceError::NotFound),
    }
}

pub async fn is_owner(pool: &SqlitePool, activity_id: i64, user_id: &str) -> sqlx::Result<bool> {
    activity_repo::is_owner(pool, activity_id, user_id).await
}

pub async fn list_cards(pool: &SqlitePool, lbw_id: i64) -> ServiceResult<Vec<ActivityCardView>> {
    lbw_service::require_lbw(pool, lbw_id).await?;
    let rows = activity_repo::list_activities(pool, lbw_id).await?;
    let mut cards = Vec::with_capacity(rows.len());
    for row in rows {
        cards.push(build_card(pool, row).await?);
    }
    Ok(cards)
}

pub async fn load_schedule(pool: &SqlitePool, lbw_id: i64) -> ServiceResult<ScheduleView> {
    let cards = list_cards(pool, lbw_id).await?;
    Ok(group_by_day(cards))
}

// Cards arrive ordered by start; consecutive cards with the same day label
// share a group.
fn group_by_day(cards: Vec<ActivityCardView>) -> ScheduleView {
    let mut days: Vec<ScheduleDayView> = Vec::new();
    let mut unscheduled = Vec::new();
    for card in cards {
        let Some(day_label) = card.start_label.clone() else {
            unscheduled.push(card);
            continue;
        };
        match days.last_mut() {
            Some(day) if day.day_label == day_label => day.entries.push(card),
            _ => days.push(ScheduleDayView {
                day_label,
                entries: vec![card],
            }),
        }
    }
    ScheduleView { days, unscheduled }
}

async fn build_card(pool: &SqlitePool, row: ActivityRow) -> sqlx::Result<ActivityCardView> {
    let owners = activity_repo::list_owners(pool, row.activity_id).await?;
    let attendees = activity_repo::list_attendees(pool, row.activity_id).await?;
    Ok(ActivityCardView {
        activity_id: row.activity_id,
        short_name: row.short_name,
        description: row.description,
        start_label: row.start_date.map(|s| format_date(s.date())),
        time_label: row.start_date.map(|s| s.format("%H:%M").to_string()),
        duration_label: row.duration_minutes.map(duration_label),
        owner_names: owners
            .iter()
            .map(|o| o.display_name().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        attendee_count: attendees.len(),
        has_attachment: row.attachment_path.is_some(),
    })
}

pub async fn load_view(
    pool: &SqlitePool,
    lbw_id: i64,
    activity_id: i64,
    viewer_id: Option<&str>,
) -> ServiceResult<ActivityView> {
    let row = require_activity(pool, lbw_id, activity_id).await?;
    let owners = people(activity_repo::list_owners(pool, activity_id).await?);
    let attendees = people(activity_repo::list_attendees(pool, activity_id).await?);

    let is_owner = viewer_id.is_some_and(|id| owners.iter().any(|o| o.user_id == id));
    let is_attending = viewer_id.is_some_and(|id| attendees.iter().any(|a| a.user_id == id));
    let can_schedule = match viewer_id {
        Some(id) => is_owner || lbw_repo::is_owner(pool, lbw_id, id).await?,
        None => false,
    };

    let (schedule_day, schedule_hour, schedule_min) = match row.start_date {
        Some(start) => (
            start.format("%m/%d/%Y").to_string(),
            start.format("%H").to_string(),
            start.format("%M").to_string(),
        ),
        None => (String::new(), String::new(), String::new()),
    };

    Ok(ActivityView {
        activity_id: row.activity_id,
        lbw_id: row.lbw_id,
        short_name: row.short_name,
        description: row.description,
        start_label: row.start_date.map(format_datetime),
        duration_label: row.duration_minutes.map(duration_label),
        attachment_name: row.attachment_name,
        owners,
        attendees,
        is_owner,
        can_schedule,
        is_attending,
        schedule_day,
        schedule_hour,
        schedule_min,
    })
}

/// Creates an activity, or updates one when the form carries an id.
/// A new activity with no named owners is owned by its proposer.
pub async fn save_activity(
    pool: &SqlitePool,
    lbw_id: i64,
    actor_id: &str,
    form: &ValidActivity,
) -> ServiceResult<SavedActivity> {
    lbw_service::require_lbw(pool, lbw_id).await?;

    let (activity_id, created) = match form.activity_id {
        Some(activity_id) => {
            require_activity(pool, lbw_id, activity_id).await?;
            if !activity_repo::is_owner(pool, activity_id, actor_id).await? {
                return Err(ServiceError::Forbidden);
            }
            let owner_ids = resolve_owner_ids(pool, &form.owner_ids, actor_id).await?;
            let mut tx = pool.begin().await?;
            activity_repo::update_activity(&mut tx, activity_id, fields(form)).await?;
            activity_repo::replace_owners(&mut tx, activity_id, &owner_ids).await?;
            tx.commit().await?;
            (activity_id, false)
        }
        None => {
            let owner_ids = resolve_owner_ids(pool, &form.owner_ids, actor_id).await?;
            let mut tx = pool.begin().await?;
            let activity_id = activity_repo::insert_activity(&mut tx, lbw_id, fields(form)).await?;
            activity_repo::replace_owners(&mut tx, activity_id, &owner_ids).await?;
            tx.commit().await?;
            info!(lbw_id, activity_id, proposer = %actor_id, "activity proposed");
            (activity_id, true)
        }
    };

    let activity = require_activity(pool, lbw_id, activity_id).await?;
    Ok(SavedActivity { activity, created })
}

/// Activity owners and the LBW's organizers may place an activity on the
/// schedule. `None` takes it off again.
pub async fn schedule_activity(
    pool: &SqlitePool,
    lbw_id: i64,
    activity_id: i64,
    actor_id: &str,
    start: Option<NaiveDateTime>,
) -> ServiceResult<()> {
    require_activity(pool, lbw_id, activity_id).await?;
    let allowed = activity_repo::is_owner(pool, activity_id, actor_id).await?
        || lbw_repo::is_owner(pool, lbw_id, actor_id).await?;
    if !allowed {
        return Err(ServiceError::Forbidden);
    }
    activity_repo::update_start_date(pool, activity_id, start).await?;
    Ok(())
}

/// Returns whether the user attends the activity after the toggle.
pub async fn toggle_attendance(
    pool: &SqlitePool,
    lbw_id: i64,
    activity_id: i64,
    user_id: &str,
) -> ServiceResult<bool> {
    require_activity(pool, lbw_id, activity_id).await?;
    let mut tx = pool.begin().await?;
    let attending = activity_repo::toggle_attendee(&mut tx, activity_id, user_id).await?;
    tx.commit().await?;
    Ok(attending)
}

pub async fn cancel_activity(
    pool: &SqlitePool,
    lbw_id: i64,
    activity_id: i64,
    actor_id: &str,
) -> ServiceResult<()> {
    let row = require_activity(pool, lbw_id, activity_id).await?;
    if !activity_repo::is_owner(pool, activity_id, actor_id).await? {
        return Err(ServiceError::Forbidden);
    }
    activity_repo::delete_activity(pool, activity_id).await?;
    info!(lbw_id, activity_id, actor = %actor_id, "activity cancelled");

    if let Some(path) = row.attachment_path {
        if let Err(e) = remove_attachment_file(&path).await {
            warn!("Could not remove attachment {}: {}", path, e);
        }
    }
    Ok(())
}

/// Stores an uploaded file under `dir` and points the activity at it,
/// replacing any previous attachment.
pub async fn store_attachment(
    pool: &SqlitePool,
    dir: &Path,
    lbw_id: i64,
    activity_id: i64,
    actor_id: &str,
    file_name: &str,
    bytes: &[u8],
) -> ServiceResult<()> {
    let row = require_activity(pool, lbw_id, activity_id).await?;
    if !activity_repo::is_owner(pool, activity_id, actor_id).await? {
        return Err(ServiceError::Forbidden);
    }

    let display_name = sanitize_file_name(file_name);
    tokio::fs::create_dir_all(dir).await?;
    let stored = dir.join(format!("{}-{}", Uuid::new_v4(), display_name));
    tokio::fs::write(&stored, bytes).await?;
    let stored = stored.to_string_lossy().to_string();

    if let Err(e) = activity_repo::update_attachment(pool, activity_id, &display_name, &stored).await
    {
        if let Err(io) = remove_attachment_file(&stored).await {
            warn!("Could not remove orphaned attachment {}: {}", stored, io);
        }
        return Err(e.into());
    }
    info!(activity_id, bytes = bytes.len(), "attachment stored");

    if let Some(old) = row.attachment_path {
        if let Err(e) = remove_attachment_file(&old).await {
            warn!("Could not remove replaced attachment {}: {}", old, e);
        }
    }
    Ok(())
}

/// File name and contents of the activity's attachment.
pub async fn load_attachment(
    pool: &SqlitePool,
    lbw_id: i64,
    activity_id: i64,
) -> ServiceResult<(String, Vec<u8>)> {
    let row = require_activity(pool, lbw_id, activity_id).await?;
    let (Some(name), Some(path)) = (row.attachment_name, row.attachment_path) else {
        return Err(ServiceError::NotFound);
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok((name, bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Attachment file missing for activity {}: {}", activity_id, path);
            Err(ServiceError::NotFound)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn remove_attachment_file(path: &str) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

pub async fn update_form(
    pool: &SqlitePool,
    lbw_id: i64,
    activity_id: i64,
) -> ServiceResult<ActivityForm> {
    let row = require_activity(pool, lbw_id, activity_id).await?;
    let owners = activity_repo::list_owners(pool, activity_id).await?;
    Ok(ActivityForm {
        activity_id: Some(row.activity_id.to_string()),
        short_name: row.short_name,
        description: row.description,
        duration_minutes: row
            .duration_minutes
            .map(|d| d.to_string())
            .unwrap_or_default(),
        owner_ids: owners
            .into_iter()
            .map(|o| o.user_id)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn fields(form: &ValidActivity) -> activity_repo::ActivityFields<'_> {
    activity_repo::ActivityFields {
        short_name: &form.short_name,
        description: &form.description,
        duration_minutes: form.duration_minutes,
    }
}

fn duration_label(minutes: i64) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{} h", h),
        (h, m) => format!("{} h {} min", h, m),
    }
}

// Keep only the last path component and characters safe in a file name.
fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' '))
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}
