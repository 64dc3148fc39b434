//! Submitted-form coercion and validation.
//!
//! Every form is deserialized with all fields as raw strings so a bad value
//! never turns into an extractor rejection; `validate` then produces either a
//! typed value ready for persistence or a [`FormErrors`] the page re-renders.

use chrono::NaiveDate;

pub mod accommodation_form;
pub mod activity_form;
pub mod lbw_form;
pub mod message_form;
pub mod registration_form;
pub mod schedule_form;

pub use accommodation_form::{AccommodationForm, ValidAccommodation};
pub use activity_form::{ActivityForm, ValidActivity};
pub use lbw_form::{DeleteLbwForm, LbwForm, ValidLbw};
pub use message_form::{MessageForm, MessageTarget, ValidMessage};
pub use registration_form::{RegistrationForm, ValidRegistration};
pub use schedule_form::{ScheduleError, ScheduleForm};

pub const SHORT_NAME_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub errors: Vec<FieldError>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// First message recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Accepts `YYYY-MM-DD` (date inputs) and `MM/DD/YYYY` (the date picker).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

pub(crate) fn required_date(
    errors: &mut FormErrors,
    field: &'static str,
    raw: &str,
) -> Option<NaiveDate> {
    if raw.trim().is_empty() {
        errors.add(field, "This field is required.");
        return None;
    }
    let parsed = parse_date(raw);
    if parsed.is_none() {
        errors.add(field, "Enter a valid date.");
    }
    parsed
}

pub(crate) fn short_name(errors: &mut FormErrors, raw: &str) -> String {
    let value = raw.trim().to_string();
    if value.is_empty() {
        errors.add("short_name", "This field is required.");
    } else if value.chars().count() > SHORT_NAME_MAX {
        errors.add(
            "short_name",
            format!("Ensure this value has at most {} characters.", SHORT_NAME_MAX),
        );
    }
    value
}

/// Parses an optional id field; empty means absent.
pub(crate) fn optional_id(
    errors: &mut FormErrors,
    field: &'static str,
    raw: Option<&str>,
) -> Option<i64> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.add(field, "Invalid id.");
            None
        }
    }
}

/// Owner ids arrive as one text field separated by commas or whitespace.
pub fn parse_owner_ids(raw: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let id = id.trim();
        if !id.is_empty() && !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}
