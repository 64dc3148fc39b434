use sqlx::SqlitePool;

use crate::models::MessageRow;

const MESSAGE_SELECT: &str = r#"
SELECT
  m.message_id,
  m.lbw_id,
  m.activity_id,
  m.writer_id,
  u.name AS writer_name,
  m.parent_id,
  m.subject,
  m.body,
  m.created_at
FROM messages m
JOIN users u ON u.user_id = m.writer_id
"#;

pub async fn list_lbw_messages(pool: &SqlitePool, lbw_id: i64) -> sqlx::Result<Vec<MessageRow>> {
    let sql = format!(
        "{MESSAGE_SELECT} WHERE m.lbw_id = ?1 AND m.activity_id IS NULL \
         ORDER BY m.created_at ASC, m.message_id ASC"
    );
    sqlx::query_as::<_, MessageRow>(&sql)
        .bind(lbw_id)
        .fetch_all(pool)
        .await
}

pub async fn list_activity_messages(
    pool: &SqlitePool,
    activity_id: i64,
) -> sqlx::Result<Vec<MessageRow>> {
    let sql = format!(
        "{MESSAGE_SELECT} WHERE m.activity_id = ?1 ORDER BY m.created_at ASC, m.message_id ASC"
    );
    sqlx::query_as::<_, MessageRow>(&sql)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}

pub async fn list_replies(pool: &SqlitePool, parent_id: i64) -> sqlx::Result<Vec<MessageRow>> {
    let sql = format!(
        "{MESSAGE_SELECT} WHERE m.parent_id = ?1 ORDER BY m.created_at ASC, m.message_id ASC"
    );
    sqlx::query_as::<_, MessageRow>(&sql)
        .bind(parent_id)
        .fetch_all(pool)
        .await
}

pub async fn load_message(pool: &SqlitePool, message_id: i64) -> sqlx::Result<Option<MessageRow>> {
    let sql = format!("{MESSAGE_SELECT} WHERE m.message_id = ?1 LIMIT 1");
    sqlx::query_as::<_, MessageRow>(&sql)
        .bind(message_id)
        .fetch_optional(pool)
        .await
}

pub struct NewMessage<'a> {
    pub lbw_id: Option<i64>,
    pub activity_id: Option<i64>,
    pub writer_id: &'a str,
    pub parent_id: Option<i64>,
    pub subject: &'a str,
    pub body: &'a str,
}

const SQL_INSERT_MESSAGE: &str = r#"
INSERT INTO messages (lbw_id, activity_id, writer_id, parent_id, subject, body)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

pub async fn insert_message(pool: &SqlitePool, msg: NewMessage<'_>) -> sqlx::Result<i64> {
    let res = sqlx::query(SQL_INSERT_MESSAGE)
        .bind(msg.lbw_id)
        .bind(msg.activity_id)
        .bind(msg.writer_id)
        .bind(msg.parent_id)
        .bind(msg.subject)
        .bind(msg.body)
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}

const SQL_DELETE_MESSAGE: &str = r#"
DELETE FROM messages WHERE message_id = ?1
"#;

pub async fn delete_message(pool: &SqlitePool, message_id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_MESSAGE)
        .bind(message_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
