use serde::Deserialize;

use super::{optional_id, parse_owner_ids, short_name, FormErrors};

pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

/// Propose/update form. A present `activity_id` turns the submission into an
/// update of that activity.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivityForm {
    pub activity_id: Option<String>,
    pub short_name: String,
    pub description: String,
    pub duration_minutes: String,
    pub owner_ids: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidActivity {
    pub activity_id: Option<i64>,
    pub short_name: String,
    pub description: String,
    pub duration_minutes: Option<i64>,
    pub owner_ids: Vec<String>,
}

impl ActivityForm {
    pub fn validate(&self) -> Result<ValidActivity, FormErrors> {
        let mut errors = FormErrors::default();
        let activity_id = optional_id(&mut errors, "activity_id", self.activity_id.as_deref());
        let short_name = short_name(&mut errors, &self.short_name);

        let raw_duration = self.duration_minutes.trim();
        let duration_minutes = if raw_duration.is_empty() {
            None
        } else {
            match raw_duration.parse::<i64>() {
                Ok(v) if (1..=MAX_DURATION_MINUTES).contains(&v) => Some(v),
                Ok(_) => {
                    errors.add(
                        "duration_minutes",
                        format!("Duration must be between 1 and {} minutes.", MAX_DURATION_MINUTES),
                    );
                    None
                }
                Err(_) => {
                    errors.add("duration_minutes", "Enter a whole number.");
                    None
                }
            }
        };

        errors.into_result(|| ValidActivity {
            activity_id,
            short_name,
            description: self.description.trim().to_string(),
            duration_minutes,
            owner_ids: parse_owner_ids(&self.owner_ids),
        })
    }
}
