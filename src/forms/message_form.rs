use serde::Deserialize;

use super::{optional_id, FormErrors};

pub const SUBJECT_MAX: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageForm {
    pub lbw_id: Option<String>,
    pub activity_id: Option<String>,
    pub parent_id: Option<String>,
    pub subject: String,
    pub body: String,
}

/// The thread a message belongs to. A message is in exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    Lbw(i64),
    Activity(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidMessage {
    pub target: MessageTarget,
    pub parent_id: Option<i64>,
    pub subject: String,
    pub body: String,
}

impl MessageForm {
    pub fn validate(&self) -> Result<ValidMessage, FormErrors> {
        let mut errors = FormErrors::default();
        let lbw_id = optional_id(&mut errors, "lbw_id", self.lbw_id.as_deref());
        let activity_id = optional_id(&mut errors, "activity_id", self.activity_id.as_deref());
        let parent_id = optional_id(&mut errors, "parent_id", self.parent_id.as_deref());

        // The compose page posts the event id alongside the activity id.
        let target = match (activity_id, lbw_id) {
            (Some(activity_id), _) => Some(MessageTarget::Activity(activity_id)),
            (None, Some(lbw_id)) => Some(MessageTarget::Lbw(lbw_id)),
            (None, None) => {
                errors.add("lbw_id", "A message needs an event or an activity.");
                None
            }
        };

        let subject = self.subject.trim().to_string();
        if subject.chars().count() > SUBJECT_MAX {
            errors.add(
                "subject",
                format!("Ensure this value has at most {} characters.", SUBJECT_MAX),
            );
        }
        let body = self.body.trim().to_string();
        if body.is_empty() {
            errors.add("body", "This field is required.");
        }

        match target {
            Some(target) if errors.is_empty() => Ok(ValidMessage {
                target,
                parent_id,
                subject,
                body,
            }),
            _ => Err(errors),
        }
    }
}
