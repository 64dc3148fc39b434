use sqlx::SqlitePool;
use tracing::info;

use crate::database::{activity_repo, lbw_repo, message_repo};
use crate::forms::{FormErrors, MessageTarget, ValidMessage};
use crate::models::{ActivityRow, LbwRow, MessageRow};
use crate::services::{format_datetime, ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct MessageView {
    pub message_id: i64,
    pub writer_id: String,
    pub writer_name: String,
    pub subject: String,
    pub body: String,
    pub created_label: String,
    pub parent_id: Option<i64>,
    pub is_mine: bool,
}

fn to_view(row: MessageRow, viewer_id: Option<&str>) -> MessageView {
    MessageView {
        is_mine: viewer_id == Some(row.writer_id.as_str()),
        writer_name: if row.writer_name.trim().is_empty() {
            row.writer_id.clone()
        } else {
            row.writer_name
        },
        message_id: row.message_id,
        writer_id: row.writer_id,
        subject: row.subject,
        body: row.body,
        created_label: format_datetime(row.created_at),
        parent_id: row.parent_id,
    }
}

fn to_views(rows: Vec<MessageRow>, viewer_id: Option<&str>) -> Vec<MessageView> {
    rows.into_iter().map(|r| to_view(r, viewer_id)).collect()
}

/// Event-level thread; activity messages are not included.
pub async fn lbw_thread(
    pool: &SqlitePool,
    lbw_id: i64,
    viewer_id: Option<&str>,
) -> sqlx::Result<Vec<MessageView>> {
    let rows = message_repo::list_lbw_messages(pool, lbw_id).await?;
    Ok(to_views(rows, viewer_id))
}

pub async fn activity_thread(
    pool: &SqlitePool,
    activity_id: i64,
    viewer_id: Option<&str>,
) -> sqlx::Result<Vec<MessageView>> {
    let rows = message_repo::list_activity_messages(pool, activity_id).await?;
    Ok(to_views(rows, viewer_id))
}

/// The LBW a message ultimately belongs to, directly or through its activity.
async fn owning_lbw_id(pool: &SqlitePool, row: &MessageRow) -> sqlx::Result<Option<i64>> {
    if let Some(lbw_id) = row.lbw_id {
        return Ok(Some(lbw_id));
    }
    let Some(activity_id) = row.activity_id else {
        return Ok(None);
    };
    Ok(activity_repo::load_activity(pool, activity_id)
        .await?
        .map(|a| a.lbw_id))
}

/// Loads a message that lives somewhere under `lbw_id`.
async fn require_message(
    pool: &SqlitePool,
    lbw_id: i64,
    message_id: i64,
) -> ServiceResult<MessageRow> {
    let row = message_repo::load_message(pool, message_id)
        .await?
        .ok_or(ServiceError::NotFound)?;
    if owning_lbw_id(pool, &row).await? != Some(lbw_id) {
        return Err(ServiceError::NotFound);
    }
    Ok(row)
}

pub struct MessagePage {
    pub message: MessageView,
    pub replies: Vec<MessageView>,
    pub activity: Option<ActivityRow>,
}

pub async fn load_message_page(
    pool: &SqlitePool,
    lbw_id: i64,
    message_id: i64,
    viewer_id: Option<&str>,
) -> ServiceResult<MessagePage> {
    let row = require_message(pool, lbw_id, message_id).await?;
    let activity = match row.activity_id {
        Some(activity_id) => activity_repo::load_activity(pool, activity_id).await?,
        None => None,
    };
    let replies = to_views(message_repo::list_replies(pool, message_id).await?, viewer_id);
    Ok(MessagePage {
        message: to_view(row, viewer_id),
        replies,
        activity,
    })
}

/// What the compose page needs to post back into the right thread.
pub struct ComposeContext {
    pub lbw: LbwRow,
    pub activity: Option<ActivityRow>,
    pub parent: Option<MessageView>,
}

pub async fn compose_for_lbw(pool: &SqlitePool, lbw_id: i64) -> ServiceResult<ComposeContext> {
    let lbw = lbw_repo::load_lbw(pool, lbw_id)
        .await?
        .ok_or(ServiceError::NotFound)?;
    Ok(ComposeContext {
        lbw,
        activity: None,
        parent: None,
    })
}

pub async fn compose_for_activity(
    pool: &SqlitePool,
    lbw_id: i64,
    activity_id: i64,
) -> ServiceResult<ComposeContext> {
    let activity = match activity_repo::load_activity(pool, activity_id).await? {
        Some(a) if a.lbw_id == lbw_id => a,
        _ => return Err(ServiceError::NotFound),
    };
    let mut ctx = compose_for_lbw(pool, lbw_id).await?;
    ctx.activity = Some(activity);
    Ok(ctx)
}

pub async fn compose_reply(
    pool: &SqlitePool,
    lbw_id: i64,
    message_id: i64,
    viewer_id: Option<&str>,
) -> ServiceResult<ComposeContext> {
    let parent = require_message(pool, lbw_id, message_id).await?;
    let mut ctx = match parent.activity_id {
        Some(activity_id) => compose_for_activity(pool, lbw_id, activity_id).await?,
        None => compose_for_lbw(pool, lbw_id).await?,
    };
    ctx.parent = Some(to_view(parent, viewer_id));
    Ok(ctx)
}

fn thread_of(row: &MessageRow) -> Option<MessageTarget> {
    match (row.activity_id, row.lbw_id) {
        (Some(activity_id), None) => Some(MessageTarget::Activity(activity_id)),
        (None, Some(lbw_id)) => Some(MessageTarget::Lbw(lbw_id)),
        _ => None,
    }
}

fn invalid(field: &'static str, message: &str) -> ServiceError {
    let mut errors = FormErrors::default();
    errors.add(field, message);
    ServiceError::Invalid(errors)
}

/// Stores a message in its thread. The thread must belong to `lbw_id`, and a
/// reply must stay in its parent's thread.
pub async fn save_message(
    pool: &SqlitePool,
    lbw_id: i64,
    writer_id: &str,
    msg: &ValidMessage,
) -> ServiceResult<MessageTarget> {
    match msg.target {
        MessageTarget::Lbw(target_lbw) => {
            if target_lbw != lbw_id || lbw_repo::load_lbw(pool, target_lbw).await?.is_none() {
                return Err(ServiceError::NotFound);
            }
        }
        MessageTarget::Activity(activity_id) => match activity_repo::load_activity(pool, activity_id).await? {
            Some(a) if a.lbw_id == lbw_id => {}
            _ => return Err(ServiceError::NotFound),
        },
    }

    if let Some(parent_id) = msg.parent_id {
        let Some(parent) = message_repo::load_message(pool, parent_id).await? else {
            return Err(invalid("parent_id", "The message you replied to no longer exists."));
        };
        if thread_of(&parent) != Some(msg.target) {
            return Err(invalid("parent_id", "A reply must stay in the same thread."));
        }
    }

    let (lbw_col, activity_col) = match msg.target {
        MessageTarget::Lbw(id) => (Some(id), None),
        MessageTarget::Activity(id) => (None, Some(id)),
    };
    let message_id = message_repo::insert_message(
        pool,
        message_repo::NewMessage {
            lbw_id: lbw_col,
            activity_id: activity_col,
            writer_id,
            parent_id: msg.parent_id,
            subject: &msg.subject,
            body: &msg.body,
        },
    )
    .await?;
    info!(message_id, writer = %writer_id, "message posted");
    Ok(msg.target)
}

pub async fn delete_message(
    pool: &SqlitePool,
    lbw_id: i64,
    message_id: i64,
    actor_id: &str,
) -> ServiceResult<()> {
    let row = require_message(pool, lbw_id, message_id).await?;
    if row.writer_id != actor_id {
        return Err(ServiceError::Forbidden);
    }
    message_repo::delete_message(pool, message_id).await?;
    info!(message_id, writer = %actor_id, "message deleted");
    Ok(())
}
