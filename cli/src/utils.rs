//! Utility functions

use serde::{Deserialize, Serialize};

/// Version information for sqdctl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: build_value(option_env!("GIT_HASH")),
        build_time: build_value(option_env!("BUILD_TIME")),
    }
}

/// Build metadata, "unknown" when missing or empty
fn build_value(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("unknown")
        .to_string()
}
