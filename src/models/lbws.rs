use chrono::NaiveDate;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LbwRow {
    pub lbw_id: i64,
    pub short_name: String,
    pub description: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
