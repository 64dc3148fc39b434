use std::path::PathBuf;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set (see .env)")]
    Missing(&'static str),
    #[error("{name} is not a valid number: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailConfig {
    /// HTTP relay accepting `{from, to, subject, body}` JSON.
    pub api_url: Option<String>,
    pub from: String,
    /// Organizers who hear about new LBWs and activities. Empty disables mail.
    pub to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub attachment_dir: PathBuf,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match var("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
                name: "PORT",
                value: raw,
            })?,
            None => 3000,
        };
        let attachment_dir = var("ATTACHMENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("attachments"));

        let mail = MailConfig {
            api_url: var("MAIL_API_URL"),
            from: var("LBW_FROM_EMAIL").unwrap_or_else(|| "lbw@localhost".to_string()),
            to: var("LBW_TO_EMAIL")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Ok(Self {
            database_url,
            host,
            port,
            attachment_dir,
            mail,
        })
    }
}
