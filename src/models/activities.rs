use chrono::NaiveDateTime;

// `start_date` is stored as a naive UTC timestamp.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub activity_id: i64,
    pub lbw_id: i64,
    pub short_name: String,
    pub description: String,
    pub duration_minutes: Option<i64>,
    pub start_date: Option<NaiveDateTime>,
    pub attachment_name: Option<String>,
    pub attachment_path: Option<String>,
}
