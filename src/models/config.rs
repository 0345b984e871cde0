//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::DoctorLocator;

/// Root application configuration.
///
/// Loaded from a TOML file; every recognized option is a named field and
/// unknown keys are rejected, so typos surface at load time instead of
/// being silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Patient portal credentials
    pub luxmed: LuxmedConfig,

    /// Appointment filter and polling window settings
    pub luxmedsniper: SniperConfig,

    /// Remote seen-appointment store settings
    pub firebase: FirebaseConfig,

    /// Push notification channel settings
    pub pushover: PushoverConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!(
                "cannot open configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.luxmed.email.trim().is_empty() {
            return Err(AppError::config("luxmed.email is empty"));
        }
        if self.luxmed.password.is_empty() {
            return Err(AppError::config("luxmed.password is empty"));
        }
        if self.luxmedsniper.lookup_time_days == 0 {
            return Err(AppError::config(
                "luxmedsniper.lookup_time_days must be > 0",
            ));
        }
        // Malformed locator ids fail here, before any network activity.
        self.luxmedsniper.doctor_locator()?;
        if self.firebase.firebase_key.trim().is_empty() {
            return Err(AppError::config("firebase.firebase_key is empty"));
        }
        if self.pushover.user_key.trim().is_empty() {
            return Err(AppError::config("pushover.user_key is empty"));
        }
        if self.pushover.api_token.trim().is_empty() {
            return Err(AppError::config("pushover.api_token is empty"));
        }
        if self.pushover.message_template.trim().is_empty() {
            return Err(AppError::config("pushover.message_template is empty"));
        }
        Ok(())
    }
}

/// Patient portal account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LuxmedConfig {
    /// Portal account email
    pub email: String,

    /// Portal account password
    pub password: String,
}

/// Appointment filter and polling window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SniperConfig {
    /// Composite `city*service*clinic*doctor` filter id (`-1` = any)
    pub doctor_locator_id: String,

    /// How many days ahead to search for available terms
    #[serde(default = "defaults::lookup_time_days")]
    pub lookup_time_days: u32,
}

impl SniperConfig {
    /// Parse the configured locator id.
    pub fn doctor_locator(&self) -> Result<DoctorLocator> {
        self.doctor_locator_id.parse()
    }
}

/// Remote seen-appointment store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirebaseConfig {
    /// Path to the service-account key file
    pub firebase_key: String,
}

/// Push notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushoverConfig {
    /// Destination user key
    pub user_key: String,

    /// Application API token
    pub api_token: String,

    /// Notification title, substituted for `{title}` in the template
    #[serde(default = "defaults::title")]
    pub title: String,

    /// Message template; see [`crate::models::Appointment::format`]
    pub message_template: String,
}

mod defaults {
    pub fn lookup_time_days() -> u32 {
        14
    }

    pub fn title() -> String {
        "LuxMedSniper".into()
    }
}
