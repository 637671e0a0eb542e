//! Settings file management

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

pub const API_URL_ENV: &str = "SQD_API_URL";
pub const API_TOKEN_ENV: &str = "SQD_API_TOKEN";
pub const DEBUG_ENV: &str = "SQD_DEBUG";

/// sqdctl settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Base URL for the SQD cloud API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Deployment key used to authenticate API requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,

    /// Delay between two deployment status polls, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Emit diagnostics as JSON
    #[serde(default)]
    pub json_logs: bool,
}

fn default_api_url() -> String {
    "https://cloud.sqd.dev/api".to_string()
}

fn default_poll_interval() -> u64 {
    3000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            api_url: default_api_url(),
            credentials: None,
            poll_interval_ms: default_poll_interval(),
            json_logs: false,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file does not exist
    pub async fn load(file: &File) -> Result<Self, AppError> {
        if !file.exists().await {
            debug!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        file.read_json::<Settings>().await
    }

    /// Persist settings
    pub async fn save(&self, file: &File) -> Result<(), AppError> {
        file.write_json(self).await
    }

    /// Save a deployment key into the settings file
    ///
    /// Starts from what is on disk so that environment overrides applied to
    /// the running configuration are never persisted.
    pub async fn store_credentials(file: &File, token: String) -> Result<Self, AppError> {
        let settings = Settings {
            credentials: Some(token),
            ..Self::load(file).await?
        };
        settings.save(file).await?;
        Ok(settings)
    }

    /// Apply environment overrides
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = lookup(API_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.credentials = Some(token);
        }
        if lookup(DEBUG_ENV).is_some_and(|v| !v.is_empty() && v != "0" && v != "false") {
            self.log_level = LogLevel::Debug;
        }
        self
    }

    pub fn token(&self) -> Option<SecretString> {
        self.credentials.clone().map(SecretString::from)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
