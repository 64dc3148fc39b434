use sqlx::SqlitePool;

use crate::models::UserRow;

const SQL_UPSERT_USER: &str = r#"
INSERT INTO users (user_id, name, email)
VALUES (?1, COALESCE(?2, ''), ?3)
ON CONFLICT(user_id) DO UPDATE SET
  name = CASE WHEN ?2 IS NULL OR ?2 = '' THEN users.name ELSE ?2 END,
  email = COALESCE(?3, users.email)
"#;

/// Users live in the auth service; we keep a local copy keyed by token subject.
pub async fn upsert_user(
    pool: &SqlitePool,
    user_id: &str,
    name: Option<&str>,
    email: Option<&str>,
) -> sqlx::Result<()> {
    sqlx::query(SQL_UPSERT_USER)
        .bind(user_id)
        .bind(name)
        .bind(email)
        .execute(pool)
        .await?;
    Ok(())
}

const SQL_LOAD_USER: &str = r#"
SELECT user_id, name, email
FROM users
WHERE user_id = ?1
LIMIT 1
"#;

pub async fn load_user(pool: &SqlitePool, user_id: &str) -> sqlx::Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>(SQL_LOAD_USER)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Returns the ids from `user_ids` that have no users row.
pub async fn find_unknown_user_ids(
    pool: &SqlitePool,
    user_ids: &[String],
) -> sqlx::Result<Vec<String>> {
    let mut unknown = Vec::new();
    for user_id in user_ids {
        if load_user(pool, user_id).await?.is_none() {
            unknown.push(user_id.clone());
        }
    }
    Ok(unknown)
}

// Identity used when no access token is present (local development).
const SQL_LOAD_CURRENT_USER: &str = r#"
SELECT u.user_id, u.name, u.email
FROM current_user c
JOIN users u ON u.user_id = c.user_id
LIMIT 1
"#;

pub async fn load_current_user(pool: &SqlitePool) -> sqlx::Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>(SQL_LOAD_CURRENT_USER)
        .fetch_optional(pool)
        .await
}
