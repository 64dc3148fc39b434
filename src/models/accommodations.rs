#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccommodationRow {
    pub accommodation_id: i64,
    pub lbw_id: i64,
    pub submitted_by: String,
    pub submitter_name: String,
    pub name: String,
    pub location: String,
    pub capacity: Option<i64>,
    pub details: String,
}
