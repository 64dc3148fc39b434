use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::models::{ParticipantRow, RegistrationRow};

const SQL_LOAD_REGISTRATION: &str = r#"
SELECT registration_id, lbw_id, user_id, arrival_date, departure_date, comment
FROM user_registrations
WHERE lbw_id = ?1 AND user_id = ?2
LIMIT 1
"#;

pub async fn load_registration(
    pool: &SqlitePool,
    lbw_id: i64,
    user_id: &str,
) -> sqlx::Result<Option<RegistrationRow>> {
    sqlx::query_as::<_, RegistrationRow>(SQL_LOAD_REGISTRATION)
        .bind(lbw_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub struct RegistrationFields<'a> {
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub comment: &'a str,
}

// One row per (lbw, user); a repeat submission rewrites the dates.
const SQL_UPSERT_REGISTRATION: &str = r#"
INSERT INTO user_registrations (lbw_id, user_id, arrival_date, departure_date, comment)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(lbw_id, user_id) DO UPDATE SET
  arrival_date = excluded.arrival_date,
  departure_date = excluded.departure_date,
  comment = excluded.comment,
  updated_at = CURRENT_TIMESTAMP
"#;

pub async fn upsert_registration(
    pool: &SqlitePool,
    lbw_id: i64,
    user_id: &str,
    fields: RegistrationFields<'_>,
) -> sqlx::Result<()> {
    sqlx::query(SQL_UPSERT_REGISTRATION)
        .bind(lbw_id)
        .bind(user_id)
        .bind(fields.arrival_date)
        .bind(fields.departure_date)
        .bind(fields.comment)
        .execute(pool)
        .await?;
    Ok(())
}

const SQL_DELETE_REGISTRATION: &str = r#"
DELETE FROM user_registrations WHERE lbw_id = ?1 AND user_id = ?2
"#;

pub async fn delete_registration(
    pool: &SqlitePool,
    lbw_id: i64,
    user_id: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_REGISTRATION)
        .bind(lbw_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LIST_PARTICIPANTS: &str = r#"
SELECT r.user_id, u.name, r.arrival_date, r.departure_date, r.comment
FROM user_registrations r
JOIN users u ON u.user_id = r.user_id
WHERE r.lbw_id = ?1
ORDER BY r.arrival_date ASC, u.name ASC
"#;

pub async fn list_participants(
    pool: &SqlitePool,
    lbw_id: i64,
) -> sqlx::Result<Vec<ParticipantRow>> {
    sqlx::query_as::<_, ParticipantRow>(SQL_LIST_PARTICIPANTS)
        .bind(lbw_id)
        .fetch_all(pool)
        .await
}
