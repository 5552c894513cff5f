use std::env;
use std::time::Duration;
use thiserror::Error;

pub const URL_VAR: &str = "NEXTCLOUD_URL";
pub const USER_VAR: &str = "NEXTCLOUD_USER";
pub const TOKEN_VAR: &str = "NEXTCLOUD_TOKEN";
pub const TIMEOUT_VAR: &str = "NCPASS_TIMEOUT";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variables! Need NEXTCLOUD_URL, NEXTCLOUD_USER and NEXTCLOUD_TOKEN (unset: {})", .0.join(", "))]
    MissingVariables(Vec<&'static str>),
    #[error("NCPASS_TIMEOUT must be a whole number of seconds, got '{0}'")]
    InvalidTimeout(String),
}

// Connection settings for the Nextcloud instance, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub user: String,
    pub token: String,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let url = read(URL_VAR);
        let user = read(USER_VAR);
        let token = read(TOKEN_VAR);

        let (url, user, token) = match (url, user, token) {
            (Some(url), Some(user), Some(token)) => (url, user, token),
            (url, user, token) => {
                let missing = [(URL_VAR, url.is_none()), (USER_VAR, user.is_none()), (TOKEN_VAR, token.is_none())]
                    .into_iter()
                    .filter(|(_, missing)| *missing)
                    .map(|(name, _)| name)
                    .collect();
                return Err(ConfigError::MissingVariables(missing));
            }
        };

        let timeout = match read(TIMEOUT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Config {
            url: url.trim().trim_end_matches('/').to_string(),
            user,
            token,
            timeout: Duration::from_secs(timeout),
        })
    }
}
