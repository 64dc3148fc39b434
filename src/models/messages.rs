use chrono::NaiveDateTime;

// Exactly one of `lbw_id` / `activity_id` is set (CHECK constraint on the table).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub message_id: i64,
    pub lbw_id: Option<i64>,
    pub activity_id: Option<i64>,
    pub writer_id: String,
    pub writer_name: String,
    pub parent_id: Option<i64>,
    pub subject: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}
