use chrono::NaiveDate;
use serde::Deserialize;

use super::{parse_owner_ids, required_date, short_name, FormErrors};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LbwForm {
    pub lbw_id: Option<String>,
    pub short_name: String,
    pub description: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub owner_ids: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidLbw {
    pub short_name: String,
    pub description: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub owner_ids: Vec<String>,
}

impl LbwForm {
    pub fn validate(&self) -> Result<ValidLbw, FormErrors> {
        let mut errors = FormErrors::default();
        let short_name = short_name(&mut errors, &self.short_name);
        let start_date = required_date(&mut errors, "start_date", &self.start_date);
        let end_date = required_date(&mut errors, "end_date", &self.end_date);

        let (Some(start_date), Some(end_date)) = (start_date, end_date) else {
            return Err(errors);
        };
        if end_date < start_date {
            errors.add("end_date", "The end date must not be before the start date.");
        }

        errors.into_result(|| ValidLbw {
            short_name,
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
            start_date,
            end_date,
            owner_ids: parse_owner_ids(&self.owner_ids),
        })
    }
}

/// Confirmation posted from the delete page; the id must match the URL.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteLbwForm {
    pub lbw_id: String,
}

impl DeleteLbwForm {
    pub fn confirms(&self, lbw_id: i64) -> bool {
        self.lbw_id.trim().parse::<i64>().ok() == Some(lbw_id)
    }
}
