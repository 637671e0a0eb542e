//! Application configuration options

use crate::deploy::tracker;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Cloud API base URL
    pub api_url: String,

    /// Deployment tracker options
    pub tracker: tracker::Options,

    /// Attach the live log tail once a deployment succeeds
    pub stream_logs: bool,

    /// Number of historical log entries shown when no limit is given
    pub history_limit: u32,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            api_url: "https://cloud.sqd.dev/api".to_string(),
            tracker: tracker::Options::default(),
            stream_logs: true,
            history_limit: 100,
        }
    }
}

impl AppOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_url: settings.api_url.clone(),
            tracker: tracker::Options {
                interval: settings.poll_interval(),
            },
            ..Default::default()
        }
    }
}
