//! API models

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Envelope wrapping every control-plane response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub payload: Option<T>,
}

/// Deployment record as returned by `GET /orgs/{org}/deployments/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub failed: Option<String>,
    #[serde(default)]
    pub logs: Vec<DeployLog>,
    #[serde(default, rename = "type")]
    pub deployment_type: Option<String>,
    #[serde(default)]
    pub squid: Option<SquidSummary>,
    #[serde(default)]
    pub deployment_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One line of the deployment's own build/rollout log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployLog {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub message: String,
}

/// Squid the deployment belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquidSummary {
    pub name: String,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Squid runtime log entry, historical or live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub level: LogSeverity,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Page of historical squid logs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLogsResponse {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub invalid_fields: Vec<InvalidField>,
}

/// Offending field reported with a 400 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidField {
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
    #[serde(default)]
    pub message: String,
}

/// Log severity; unknown values are kept verbatim
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogSeverity {
    Debug,
    #[default]
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Fatal,
    Other(String),
}

impl LogSeverity {
    /// Canonical uppercase display form
    pub fn as_str(&self) -> &str {
        match self {
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO",
            LogSeverity::Notice => "NOTICE",
            LogSeverity::Warning => "WARNING",
            LogSeverity::Error => "ERROR",
            LogSeverity::Critical => "CRITICAL",
            LogSeverity::Fatal => "FATAL",
            LogSeverity::Other(raw) => raw,
        }
    }
}

impl From<&str> for LogSeverity {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "TRACE" => LogSeverity::Debug,
            "INFO" => LogSeverity::Info,
            "NOTICE" => LogSeverity::Notice,
            "WARN" | "WARNING" => LogSeverity::Warning,
            "ERROR" => LogSeverity::Error,
            "CRITICAL" => LogSeverity::Critical,
            "FATAL" => LogSeverity::Fatal,
            other => LogSeverity::Other(other.to_string()),
        }
    }
}

impl From<String> for LogSeverity {
    fn from(value: String) -> Self {
        LogSeverity::from(value.as_str())
    }
}

impl From<LogSeverity> for String {
    fn from(value: LogSeverity) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment ids are numeric on the server but opaque to clients
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
