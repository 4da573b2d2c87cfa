//! Process configuration, read once at startup from environment variables.
//!
//! Every entry point builds a [`Settings`] and passes it (or values derived
//! from it) down explicitly. Tests use [`Settings::from_lookup`] with a map.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::ConfigError;

pub const ENV_DATABASE: &str = "FRONTDESK_DATABASE";
pub const ENV_CHECKIN_WEBHOOK: &str = "CHECKIN_WEBHOOK_URL";
pub const ENV_MAIL_WEBHOOK: &str = "MAIL_WEBHOOK_URL";
pub const ENV_TIMEZONE: &str = "TIMEZONE";
pub const ENV_RETRY_INTERVAL: &str = "SYNC_RETRY_INTERVAL";
pub const ENV_INTAKE_DAYS: &str = "DEFAULT_INTAKE_DAYS";
pub const ENV_SLACK_WEBHOOK: &str = "SLACK_WEBHOOK_URL";
pub const ENV_SLACK_NOTIFY_STAFF: &str = "SLACK_NOTIFY_STAFF";
pub const ENV_LOG_DIR: &str = "LOG_DIR";

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::New_York;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_INTAKE_DAYS: u32 = 7;
/// Fixed; not configurable.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const APP_DIR: &str = "frontdesk";

/// Remote endpoints. `None` disables sync for that kind without failing startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub checkin: Option<String>,
    pub mail: Option<String>,
}

/// Chat notification target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSettings {
    pub webhook: Option<String>,
    /// Only check-ins assigned to this staff name are announced; `None` means all.
    pub notify_staff: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub endpoints: Endpoints,
    pub timezone: Tz,
    pub retry_interval: Duration,
    pub http_timeout: Duration,
    pub default_intake_days: u32,
    pub chat: ChatSettings,
    pub log_dir: PathBuf,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// Empty or whitespace-only values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_path = match get(ENV_DATABASE) {
            Some(path) => PathBuf::from(path),
            None => app_data_dir(ENV_DATABASE)?.join("frontdesk.db"),
        };

        let log_dir = match get(ENV_LOG_DIR) {
            Some(path) => PathBuf::from(path),
            None => app_data_dir(ENV_LOG_DIR)?.join("logs"),
        };

        let timezone = match get(ENV_TIMEZONE) {
            Some(name) => name.parse::<Tz>().map_err(|_| ConfigError::InvalidTimezone {
                var: ENV_TIMEZONE,
                value: name,
            })?,
            None => DEFAULT_TIMEZONE,
        };

        let retry_interval = match get(ENV_RETRY_INTERVAL) {
            Some(raw) => Duration::from_secs(parse_number(ENV_RETRY_INTERVAL, &raw)?),
            None => DEFAULT_RETRY_INTERVAL,
        };

        let default_intake_days = match get(ENV_INTAKE_DAYS) {
            Some(raw) => parse_number(ENV_INTAKE_DAYS, &raw)?,
            None => DEFAULT_INTAKE_DAYS,
        };

        Ok(Self {
            database_path,
            endpoints: Endpoints {
                checkin: get(ENV_CHECKIN_WEBHOOK),
                mail: get(ENV_MAIL_WEBHOOK),
            },
            timezone,
            retry_interval,
            http_timeout: HTTP_TIMEOUT,
            default_intake_days,
            chat: ChatSettings {
                webhook: get(ENV_SLACK_WEBHOOK),
                notify_staff: get(ENV_SLACK_NOTIFY_STAFF),
            },
            log_dir,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

fn app_data_dir(var: &'static str) -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::DataDirNotFound { var })
}
