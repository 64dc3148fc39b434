use chrono::NaiveDateTime;
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::{ActivityRow, UserRow};

const ACTIVITY_COLUMNS: &str = r#"
  activity_id,
  lbw_id,
  short_name,
  description,
  duration_minutes,
  start_date,
  attachment_name,
  attachment_path
"#;

// Scheduled activities first, in start order; unscheduled ones after, by name.
pub async fn list_activities(pool: &SqlitePool, lbw_id: i64) -> sqlx::Result<Vec<ActivityRow>> {
    let sql = format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE lbw_id = ?1 \
         ORDER BY start_date IS NULL, start_date ASC, short_name ASC"
    );
    sqlx::query_as::<_, ActivityRow>(&sql)
        .bind(lbw_id)
        .fetch_all(pool)
        .await
}

pub async fn load_activity(
    pool: &SqlitePool,
    activity_id: i64,
) -> sqlx::Result<Option<ActivityRow>> {
    let sql = format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE activity_id = ?1 LIMIT 1");
    sqlx::query_as::<_, ActivityRow>(&sql)
        .bind(activity_id)
        .fetch_optional(pool)
        .await
}

pub struct ActivityFields<'a> {
    pub short_name: &'a str,
    pub description: &'a str,
    pub duration_minutes: Option<i64>,
}

const SQL_INSERT_ACTIVITY: &str = r#"
INSERT INTO activities (lbw_id, short_name, description, duration_minutes)
VALUES (?1, ?2, ?3, ?4)
"#;

pub async fn insert_activity(
    conn: &mut SqliteConnection,
    lbw_id: i64,
    fields: ActivityFields<'_>,
) -> sqlx::Result<i64> {
    let res = sqlx::query(SQL_INSERT_ACTIVITY)
        .bind(lbw_id)
        .bind(fields.short_name)
        .bind(fields.description)
        .bind(fields.duration_minutes)
        .execute(conn)
        .await?;
    Ok(res.last_insert_rowid())
}

const SQL_UPDATE_ACTIVITY: &str = r#"
UPDATE activities
SET short_name = ?1, description = ?2, duration_minutes = ?3
WHERE activity_id = ?4
"#;

pub async fn update_activity(
    conn: &mut SqliteConnection,
    activity_id: i64,
    fields: ActivityFields<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_ACTIVITY)
        .bind(fields.short_name)
        .bind(fields.description)
        .bind(fields.duration_minutes)
        .bind(activity_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

const SQL_UPDATE_START_DATE: &str = r#"
UPDATE activities SET start_date = ?1 WHERE activity_id = ?2
"#;

pub async fn update_start_date(
    pool: &SqlitePool,
    activity_id: i64,
    start_date: Option<NaiveDateTime>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_START_DATE)
        .bind(start_date)
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_UPDATE_ATTACHMENT: &str = r#"
UPDATE activities SET attachment_name = ?1, attachment_path = ?2 WHERE activity_id = ?3
"#;

pub async fn update_attachment(
    pool: &SqlitePool,
    activity_id: i64,
    attachment_name: &str,
    attachment_path: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_ATTACHMENT)
        .bind(attachment_name)
        .bind(attachment_path)
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_DELETE_ACTIVITY: &str = r#"
DELETE FROM activities WHERE activity_id = ?1
"#;

pub async fn delete_activity(pool: &SqlitePool, activity_id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_ACTIVITY)
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LIST_ACTIVITY_OWNERS: &str = r#"
SELECT u.user_id, u.name, u.email
FROM activity_owners o
JOIN users u ON u.user_id = o.user_id
WHERE o.activity_id = ?1
ORDER BY u.name ASC, u.user_id ASC
"#;

pub async fn list_owners(pool: &SqlitePool, activity_id: i64) -> sqlx::Result<Vec<UserRow>> {
    sqlx::query_as::<_, UserRow>(SQL_LIST_ACTIVITY_OWNERS)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}

const SQL_IS_ACTIVITY_OWNER: &str = r#"
SELECT COUNT(*) FROM activity_owners WHERE activity_id = ?1 AND user_id = ?2
"#;

pub async fn is_owner(pool: &SqlitePool, activity_id: i64, user_id: &str) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(SQL_IS_ACTIVITY_OWNER)
        .bind(activity_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

const SQL_CLEAR_ACTIVITY_OWNERS: &str = r#"
DELETE FROM activity_owners WHERE activity_id = ?1
"#;

const SQL_INSERT_ACTIVITY_OWNER: &str = r#"
INSERT OR IGNORE INTO activity_owners (activity_id, user_id) VALUES (?1, ?2)
"#;

pub async fn replace_owners(
    conn: &mut SqliteConnection,
    activity_id: i64,
    user_ids: &[String],
) -> sqlx::Result<()> {
    sqlx::query(SQL_CLEAR_ACTIVITY_OWNERS)
        .bind(activity_id)
        .execute(&mut *conn)
        .await?;
    for user_id in user_ids {
        sqlx::query(SQL_INSERT_ACTIVITY_OWNER)
            .bind(activity_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

const SQL_LIST_ACTIVITY_ATTENDEES: &str = r#"
SELECT u.user_id, u.name, u.email
FROM activity_attendees a
JOIN users u ON u.user_id = a.user_id
WHERE a.activity_id = ?1
ORDER BY u.name ASC, u.user_id ASC
"#;

pub async fn list_attendees(pool: &SqlitePool, activity_id: i64) -> sqlx::Result<Vec<UserRow>> {
    sqlx::query_as::<_, UserRow>(SQL_LIST_ACTIVITY_ATTENDEES)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}

const SQL_REMOVE_ATTENDEE: &str = r#"
DELETE FROM activity_attendees WHERE activity_id = ?1 AND user_id = ?2
"#;

const SQL_ADD_ATTENDEE: &str = r#"
INSERT OR IGNORE INTO activity_attendees (activity_id, user_id) VALUES (?1, ?2)
"#;

/// Flips membership in one transaction. Returns `true` when the user is
/// attending afterwards.
pub async fn toggle_attendee(
    conn: &mut SqliteConnection,
    activity_id: i64,
    user_id: &str,
) -> sqlx::Result<bool> {
    let removed = sqlx::query(SQL_REMOVE_ATTENDEE)
        .bind(activity_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if removed > 0 {
        return Ok(false);
    }
    sqlx::query(SQL_ADD_ATTENDEE)
        .bind(activity_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(true)
}
