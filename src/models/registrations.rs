use chrono::NaiveDate;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegistrationRow {
    pub registration_id: i64,
    pub lbw_id: i64,
    pub user_id: String,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub comment: String,
}

/// Registration joined with the registered user's name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParticipantRow {
    pub user_id: String,
    pub name: String,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub comment: String,
}
