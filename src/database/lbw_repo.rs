use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::{LbwRow, UserRow};

const SQL_LIST_LBWS: &str = r#"
SELECT lbw_id, short_name, description, location, start_date, end_date
FROM lbws
ORDER BY start_date DESC, lbw_id DESC
"#;

pub async fn list_lbws(pool: &SqlitePool) -> sqlx::Result<Vec<LbwRow>> {
    sqlx::query_as::<_, LbwRow>(SQL_LIST_LBWS)
        .fetch_all(pool)
        .await
}

// LBWs the viewer neither owns nor is registered for.
const SQL_LIST_LBWS_NOT_INVOLVING_USER: &str = r#"
SELECT l.lbw_id, l.short_name, l.description, l.location, l.start_date, l.end_date
FROM lbws l
WHERE NOT EXISTS (
    SELECT 1 FROM lbw_owners o WHERE o.lbw_id = l.lbw_id AND o.user_id = ?1
  )
  AND NOT EXISTS (
    SELECT 1 FROM user_registrations r WHERE r.lbw_id = l.lbw_id AND r.user_id = ?1
  )
ORDER BY l.start_date DESC, l.lbw_id DESC
"#;

pub async fn list_lbws_not_involving(
    pool: &SqlitePool,
    user_id: &str,
) -> sqlx::Result<Vec<LbwRow>> {
    sqlx::query_as::<_, LbwRow>(SQL_LIST_LBWS_NOT_INVOLVING_USER)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

const SQL_LOAD_LBW: &str = r#"
SELECT lbw_id, short_name, description, location, start_date, end_date
FROM lbws
WHERE lbw_id = ?1
LIMIT 1
"#;

pub async fn load_lbw(pool: &SqlitePool, lbw_id: i64) -> sqlx::Result<Option<LbwRow>> {
    sqlx::query_as::<_, LbwRow>(SQL_LOAD_LBW)
        .bind(lbw_id)
        .fetch_optional(pool)
        .await
}

pub struct LbwFields<'a> {
    pub short_name: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

const SQL_INSERT_LBW: &str = r#"
INSERT INTO lbws (short_name, description, location, start_date, end_date)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub async fn insert_lbw(conn: &mut SqliteConnection, fields: LbwFields<'_>) -> sqlx::Result<i64> {
    let res = sqlx::query(SQL_INSERT_LBW)
        .bind(fields.short_name)
        .bind(fields.description)
        .bind(fields.location)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .execute(conn)
        .await?;
    Ok(res.last_insert_rowid())
}

const SQL_UPDATE_LBW: &str = r#"
UPDATE lbws
SET short_name = ?1, description = ?2, location = ?3, start_date = ?4, end_date = ?5
WHERE lbw_id = ?6
"#;

pub async fn update_lbw(
    conn: &mut SqliteConnection,
    lbw_id: i64,
    fields: LbwFields<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_LBW)
        .bind(fields.short_name)
        .bind(fields.description)
        .bind(fields.location)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .bind(lbw_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

const SQL_DELETE_LBW: &str = r#"
DELETE FROM lbws WHERE lbw_id = ?1
"#;

pub async fn delete_lbw(pool: &SqlitePool, lbw_id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_LBW)
        .bind(lbw_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LIST_LBW_OWNERS: &str = r#"
SELECT u.user_id, u.name, u.email
FROM lbw_owners o
JOIN users u ON u.user_id = o.user_id
WHERE o.lbw_id = ?1
ORDER BY u.name ASC, u.user_id ASC
"#;

pub async fn list_owners(pool: &SqlitePool, lbw_id: i64) -> sqlx::Result<Vec<UserRow>> {
    sqlx::query_as::<_, UserRow>(SQL_LIST_LBW_OWNERS)
        .bind(lbw_id)
        .fetch_all(pool)
        .await
}

const SQL_IS_LBW_OWNER: &str = r#"
SELECT COUNT(*) FROM lbw_owners WHERE lbw_id = ?1 AND user_id = ?2
"#;

pub async fn is_owner(pool: &SqlitePool, lbw_id: i64, user_id: &str) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(SQL_IS_LBW_OWNER)
        .bind(lbw_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

const SQL_CLEAR_LBW_OWNERS: &str = r#"
DELETE FROM lbw_owners WHERE lbw_id = ?1
"#;

const SQL_INSERT_LBW_OWNER: &str = r#"
INSERT OR IGNORE INTO lbw_owners (lbw_id, user_id) VALUES (?1, ?2)
"#;

pub async fn replace_owners(
    conn: &mut SqliteConnection,
    lbw_id: i64,
    user_ids: &[String],
) -> sqlx::Result<()> {
    sqlx::query(SQL_CLEAR_LBW_OWNERS)
        .bind(lbw_id)
        .execute(&mut *conn)
        .await?;
    for user_id in user_ids {
        sqlx::query(SQL_INSERT_LBW_OWNER)
            .bind(lbw_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
