//! Deployment models

use std::fmt;

use openapi_client::models::{DeployLog, DeploymentResponse, SquidSummary};
use serde::{Deserialize, Serialize};

use crate::models::logs::{SquidReference, SquidTarget};

/// Addresses one deployment on the control plane
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentHandle {
    /// Organization code owning the deployment
    pub org: String,

    /// Deployment id, stable for the lifetime of one deploy operation
    pub id: String,
}

impl DeploymentHandle {
    pub fn new(org: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            id: id.into(),
        }
    }
}

/// Deployment phase reported by the server
///
/// Phases are not visited in a strict order: which ones show up depends on
/// whether the operation is a fresh deploy, an update, a removal or a hard
/// reset. Anything the client does not know about lands in `Other` and is
/// treated as still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeploymentStatus {
    Unpacking,
    Resetting,
    ImageBuilding,
    SquidDeleting,
    AddonsDeleting,
    Deploying,
    SquidSyncing,
    AddonsSyncing,
    ConfiguringIngress,
    Ok,
    Other(String),
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentStatus::Unpacking => "UNPACKING",
            DeploymentStatus::Resetting => "RESETTING",
            DeploymentStatus::ImageBuilding => "IMAGE_BUILDING",
            DeploymentStatus::SquidDeleting => "SQUID_DELETING",
            DeploymentStatus::AddonsDeleting => "ADDONS_DELETING",
            DeploymentStatus::Deploying => "DEPLOYING",
            DeploymentStatus::SquidSyncing => "SQUID_SYNCING",
            DeploymentStatus::AddonsSyncing => "ADDONS_SYNCING",
            DeploymentStatus::ConfiguringIngress => "CONFIGURING_INGRESS",
            DeploymentStatus::Ok => "OK",
            DeploymentStatus::Other(raw) => raw,
        }
    }

    /// Success terminal state
    pub fn is_ok(&self) -> bool {
        matches!(self, DeploymentStatus::Ok)
    }

    /// Human readable progress label
    pub fn describe(&self) -> String {
        match self {
            DeploymentStatus::Unpacking | DeploymentStatus::Resetting => "preparing...".to_string(),
            DeploymentStatus::ImageBuilding => "building...".to_string(),
            DeploymentStatus::SquidDeleting | DeploymentStatus::AddonsDeleting => {
                "removing...".to_string()
            }
            DeploymentStatus::Deploying
            | DeploymentStatus::SquidSyncing
            | DeploymentStatus::AddonsSyncing => "deploying...".to_string(),
            DeploymentStatus::ConfiguringIngress => "configuring ingress...".to_string(),
            DeploymentStatus::Ok => "done".to_string(),
            DeploymentStatus::Other(raw) => format!("{}...", raw.to_lowercase().replace('_', " ")),
        }
    }
}

impl From<&str> for DeploymentStatus {
    fn from(value: &str) -> Self {
        match value {
            "UNPACKING" => DeploymentStatus::Unpacking,
            "RESETTING" => DeploymentStatus::Resetting,
            "IMAGE_BUILDING" => DeploymentStatus::ImageBuilding,
            "SQUID_DELETING" => DeploymentStatus::SquidDeleting,
            "ADDONS_DELETING" => DeploymentStatus::AddonsDeleting,
            "DEPLOYING" => DeploymentStatus::Deploying,
            "SQUID_SYNCING" => DeploymentStatus::SquidSyncing,
            "ADDONS_SYNCING" => DeploymentStatus::AddonsSyncing,
            "CONFIGURING_INGRESS" => DeploymentStatus::ConfiguringIngress,
            "OK" => DeploymentStatus::Ok,
            other => DeploymentStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome marker of a deployment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FailureMarker {
    #[default]
    None,
    Unexpected,
    Reason(String),
}

impl FailureMarker {
    /// Parse the wire value; `NO`, empty and absent all mean no failure
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some("NO") => FailureMarker::None,
            Some("UNEXPECTED") => FailureMarker::Unexpected,
            Some(reason) => FailureMarker::Reason(reason.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, FailureMarker::None)
    }
}

/// A polled deployment record
#[derive(Debug, Clone)]
pub struct Deployment {
    pub id: String,
    pub status: DeploymentStatus,
    pub failed: FailureMarker,
    pub logs: Vec<DeployLog>,
    pub squid: Option<SquidSummary>,
    pub deployment_url: Option<String>,
}

impl Deployment {
    /// Live log target for the squid this deployment rolled out
    pub fn log_target(&self, org: &str) -> Option<SquidTarget> {
        let squid = self.squid.as_ref()?;
        let reference = match (&squid.slot, squid.tags.first()) {
            (Some(slot), _) => SquidReference::Slot(slot.clone()),
            (None, Some(tag)) => SquidReference::Tag(tag.clone()),
            (None, None) => SquidReference::Default,
        };
        Some(SquidTarget {
            org: org.to_string(),
            name: squid.name.clone(),
            reference,
        })
    }
}

impl From<DeploymentResponse> for Deployment {
    fn from(response: DeploymentResponse) -> Self {
        Self {
            status: DeploymentStatus::from(response.status.as_str()),
            failed: FailureMarker::from_wire(response.failed.as_deref()),
            id: response.id,
            logs: response.logs,
            squid: response.squid,
            deployment_url: response.deployment_url,
        }
    }
}
