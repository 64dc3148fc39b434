use chrono::NaiveDate;
use serde::Deserialize;

use super::{required_date, FormErrors};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub arrival_date: String,
    pub departure_date: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub comment: String,
}

impl RegistrationForm {
    /// Prefill for a first-time registration: the whole event.
    pub fn for_dates(arrival: NaiveDate, departure: NaiveDate, comment: &str) -> Self {
        Self {
            arrival_date: arrival.format("%Y-%m-%d").to_string(),
            departure_date: departure.format("%Y-%m-%d").to_string(),
            comment: comment.to_string(),
        }
    }

    pub fn validate(&self) -> Result<ValidRegistration, FormErrors> {
        let mut errors = FormErrors::default();
        let arrival = required_date(&mut errors, "arrival_date", &self.arrival_date);
        let departure = required_date(&mut errors, "departure_date", &self.departure_date);

        let (Some(arrival_date), Some(departure_date)) = (arrival, departure) else {
            return Err(errors);
        };
        if departure_date < arrival_date {
            errors.add(
                "departure_date",
                "The departure date must not be before the arrival date.",
            );
        }

        errors.into_result(|| ValidRegistration {
            arrival_date,
            departure_date,
            comment: self.comment.trim().to_string(),
        })
    }
}
