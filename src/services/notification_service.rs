use askama::Template;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::MailConfig;
use crate::models::{ActivityRow, LbwRow};
use crate::services::format_date_range;

#[derive(Template)]
#[template(path = "email/new_lbw.txt")]
struct NewLbwEmail<'a> {
    lbw: &'a LbwRow,
    date_label: String,
    domain: &'a str,
}

#[derive(Template)]
#[template(path = "email/new_activity.txt")]
struct NewActivityEmail<'a> {
    lbw: &'a LbwRow,
    activity: &'a ActivityRow,
    domain: &'a str,
}

/// Payload posted to the mail relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Best-effort announcements to the organizers list.
#[derive(Debug, Clone)]
pub struct Mailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn disabled() -> Self {
        Self::new(MailConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.to.is_empty()
    }

    pub fn new_lbw_email(
        &self,
        lbw: &LbwRow,
        domain: &str,
    ) -> Result<Option<OutgoingEmail>, askama::Error> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let body = NewLbwEmail {
            lbw,
            date_label: format_date_range(lbw.start_date, lbw.end_date),
            domain,
        }
        .render()?;
        Ok(Some(self.email(format!("New LBW proposed: {}", lbw.short_name), body)))
    }

    pub fn new_activity_email(
        &self,
        lbw: &LbwRow,
        activity: &ActivityRow,
        domain: &str,
    ) -> Result<Option<OutgoingEmail>, askama::Error> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let body = NewActivityEmail {
            lbw,
            activity,
            domain,
        }
        .render()?;
        Ok(Some(self.email(
            format!(
                "New activity {} proposed for LBW {}",
                activity.short_name, lbw.short_name
            ),
            body,
        )))
    }

    pub fn notify_new_lbw(&self, lbw: &LbwRow, domain: &str) {
        match self.new_lbw_email(lbw, domain) {
            Ok(Some(email)) => self.dispatch(email),
            Ok(None) => {}
            Err(e) => warn!("New LBW email could not be rendered: {}", e),
        }
    }

    pub fn notify_new_activity(&self, lbw: &LbwRow, activity: &ActivityRow, domain: &str) {
        match self.new_activity_email(lbw, activity, domain) {
            Ok(Some(email)) => self.dispatch(email),
            Ok(None) => {}
            Err(e) => warn!("New activity email could not be rendered: {}", e),
        }
    }

    fn email(&self, subject: String, body: String) -> OutgoingEmail {
        OutgoingEmail {
            from: self.config.from.clone(),
            to: self.config.to.clone(),
            subject,
            body,
        }
    }

    // Sent in the background; the request never waits on the relay.
    fn dispatch(&self, email: OutgoingEmail) {
        let Some(url) = self.config.api_url.clone() else {
            warn!(subject = %email.subject, "MAIL_API_URL not set, dropping notification");
            return;
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client
                .post(&url)
                .json(&email)
                .send()
                .await
                .and_then(|resp| resp.error_for_status());
            match result {
                Ok(_) => info!(subject = %email.subject, recipients = email.to.len(), "notification sent"),
                Err(e) => warn!(subject = %email.subject, "notification failed: {}", e),
            }
        });
    }
}
