use sqlx::SqlitePool;

use crate::models::AccommodationRow;

const SQL_LIST_ACCOMMODATIONS: &str = r#"
SELECT
  a.accommodation_id,
  a.lbw_id,
  a.submitted_by,
  u.name AS submitter_name,
  a.name,
  a.location,
  a.capacity,
  a.details
FROM accommodations a
JOIN users u ON u.user_id = a.submitted_by
WHERE a.lbw_id = ?1
ORDER BY a.created_at ASC, a.accommodation_id ASC
"#;

pub async fn list_accommodations(
    pool: &SqlitePool,
    lbw_id: i64,
) -> sqlx::Result<Vec<AccommodationRow>> {
    sqlx::query_as::<_, AccommodationRow>(SQL_LIST_ACCOMMODATIONS)
        .bind(lbw_id)
        .fetch_all(pool)
        .await
}

pub struct NewAccommodation<'a> {
    pub lbw_id: i64,
    pub submitted_by: &'a str,
    pub name: &'a str,
    pub location: &'a str,
    pub capacity: Option<i64>,
    pub details: &'a str,
}

const SQL_INSERT_ACCOMMODATION: &str = r#"
INSERT INTO accommodations (lbw_id, submitted_by, name, location, capacity, details)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

pub async fn insert_accommodation(
    pool: &SqlitePool,
    acc: NewAccommodation<'_>,
) -> sqlx::Result<i64> {
    let res = sqlx::query(SQL_INSERT_ACCOMMODATION)
        .bind(acc.lbw_id)
        .bind(acc.submitted_by)
        .bind(acc.name)
        .bind(acc.location)
        .bind(acc.capacity)
        .bind(acc.details)
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}
