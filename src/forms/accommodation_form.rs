use serde::Deserialize;

use super::FormErrors;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccommodationForm {
    pub name: String,
    pub location: String,
    pub capacity: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAccommodation {
    pub name: String,
    pub location: String,
    pub capacity: Option<i64>,
    pub details: String,
}

impl AccommodationForm {
    pub fn validate(&self) -> Result<ValidAccommodation, FormErrors> {
        let mut errors = FormErrors::default();
        let name = self.name.trim().to_string();
        if name.is_empty() {
            errors.add("name", "This field is required.");
        }

        let raw_capacity = self.capacity.trim();
        let capacity = if raw_capacity.is_empty() {
            None
        } else {
            match raw_capacity.parse::<i64>() {
                Ok(v) if v >= 0 => Some(v),
                _ => {
                    errors.add("capacity", "Enter a whole number of beds.");
                    None
                }
            }
        };

        errors.into_result(|| ValidAccommodation {
            name,
            location: self.location.trim().to_string(),
            capacity,
            details: self.details.trim().to_string(),
        })
    }
}
