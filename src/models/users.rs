#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
}

impl UserRow {
    /// Name to show in lists; falls back to the id for users the auth
    /// service never gave a name.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.user_id
        } else {
            &self.name
        }
    }
}
