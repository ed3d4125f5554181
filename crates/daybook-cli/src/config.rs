use daybook_core::models::{MaterializationConfig, UserProfile};
use daybook_core::sun::DEFAULT_SUN_API_URL;
use daybook_core::timeline::TimelineConfig;
use daybook_core::timezone::validate_timezone;
use figment::{Figment, providers::{Format, Toml, Env}};
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_path: String,
    pub profile: ProfileConfig,
    pub sun: SunConfig,
    pub materialization: MaterializationSettings,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ProfileConfig {
    /// User's timezone (IANA format)
    pub timezone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SunConfig {
    pub enabled: bool,
    pub api_url: String,
    pub timeout_secs: u64,
}

/// Backfill sweep settings
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MaterializationSettings {
    /// Days ahead of today covered by a sweep
    pub lookahead_days: i64,
    /// Days before today covered by a sweep
    pub grace_days: i64,
    /// Limit for activities created per routine in one sweep
    pub max_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "daybook.db".to_string(),
            profile: ProfileConfig::default(),
            sun: SunConfig::default(),
            materialization: MaterializationSettings::default(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            timezone: detect_system_timezone(),
            latitude: None,
            longitude: None,
        }
    }
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: DEFAULT_SUN_API_URL.to_string(),
            timeout_secs: 5,
        }
    }
}

impl Default for MaterializationSettings {
    fn default() -> Self {
        let core = MaterializationConfig::default();
        Self {
            lookahead_days: core.lookahead_days,
            grace_days: core.grace_days,
            max_batch_size: core.max_batch_size,
        }
    }
}

impl Config {
    /// Defaults, then `daybook.toml`, then `DAYBOOK_*` environment variables.
    /// Nested keys use a double underscore: `DAYBOOK_PROFILE__TIMEZONE`.
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("daybook.toml"))
            .merge(Env::prefixed("DAYBOOK_").split("__"))
            .extract()
    }

    pub fn user_profile(&self) -> UserProfile {
        UserProfile {
            timezone: self.profile.timezone.clone(),
            latitude: self.profile.latitude,
            longitude: self.profile.longitude,
        }
    }

    pub fn materialization_config(&self) -> MaterializationConfig {
        MaterializationConfig {
            lookahead_days: self.materialization.lookahead_days,
            grace_days: self.materialization.grace_days,
            max_batch_size: self.materialization.max_batch_size,
        }
    }

    pub fn timeline_config(&self) -> TimelineConfig {
        TimelineConfig {
            sun_timeout: Duration::from_secs(self.sun.timeout_secs),
        }
    }
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    // Check TZ environment variable
    if let Ok(tz) = std::env::var("TZ") {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&local_tz).is_ok() {
            return local_tz;
        }
    }

    "UTC".to_string()
}
