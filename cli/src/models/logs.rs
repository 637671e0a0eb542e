//! Squid log addressing and filters

use chrono::{DateTime, SecondsFormat, Utc};
use openapi_client::models::LogSeverity;

/// How a squid version is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SquidReference {
    Slot(String),
    Tag(String),
    /// Whatever version the server considers current
    Default,
}

/// Squid whose logs are read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquidTarget {
    pub org: String,
    pub name: String,
    pub reference: SquidReference,
}

impl SquidTarget {
    /// API path segments addressing this squid
    pub fn segments(&self) -> Vec<String> {
        let mut segments = vec![
            "orgs".to_string(),
            self.org.clone(),
            "squids".to_string(),
            self.name.clone(),
        ];
        match &self.reference {
            SquidReference::Slot(slot) => {
                segments.push("slots".to_string());
                segments.push(slot.clone());
            }
            SquidReference::Tag(tag) => {
                segments.push("tags".to_string());
                segments.push(tag.clone());
            }
            SquidReference::Default => {}
        }
        segments
    }
}

/// Filters applied to historical and live squid logs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilters {
    pub containers: Vec<String>,
    pub levels: Vec<LogSeverity>,
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub next_page: Option<String>,
}

impl LogFilters {
    /// Render as query parameters; list filters repeat their key
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for container in &self.containers {
            pairs.push(("container".to_string(), container.clone()));
        }
        for level in &self.levels {
            pairs.push(("level".to_string(), level.as_str().to_lowercase()));
        }
        if let Some(search) = self.search.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.clone()));
        }
        if let Some(since) = self.since {
            pairs.push((
                "from".to_string(),
                since.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(page) = &self.next_page {
            pairs.push(("nextPage".to_string(), page.clone()));
        }
        pairs
    }
}
