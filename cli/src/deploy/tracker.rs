//! Deployment status poller
//!
//! Polls a deployment record until it reaches a terminal state, rendering new
//! deployment log lines and status transitions along the way.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::deploy::cursor::LogCursor;
use crate::deploy::format::format_deploy_log;
use crate::errors::{ApiError, DeployError};
use crate::models::deployment::{Deployment, DeploymentHandle, DeploymentStatus};

/// Source of deployment records, implemented by the HTTP client
#[async_trait]
pub trait DeploymentSource: Send + Sync {
    /// Fetch the current record; `None` when the server has no record to return
    async fn fetch_deployment(
        &self,
        handle: &DeploymentHandle,
    ) -> Result<Option<Deployment>, ApiError>;
}

/// Receiver of everything a tracking session wants to show
pub trait ProgressSink {
    /// A formatted log line
    fn on_line(&mut self, line: &str);

    /// The deployment moved to a new phase
    fn on_transition(&mut self, status: &DeploymentStatus);
}

/// Tracker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay between two polls
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
        }
    }
}

/// How a tracking session ended
#[derive(Debug, Clone)]
pub enum TrackOutcome {
    /// The server stopped returning a record
    Complete,

    /// The deployment reached `OK`
    Deployed(Deployment),
}

/// Result of a single poll
#[derive(Debug, Clone)]
pub enum Tick {
    Pending,
    Finished(TrackOutcome),
}

/// Poll session for one deployment
///
/// Owns its log cursor, so several sessions can track different deployments
/// side by side.
#[derive(Debug)]
pub struct DeploymentTracker {
    handle: DeploymentHandle,
    options: Options,
    cursor: LogCursor,
    last_status: Option<DeploymentStatus>,
}

impl DeploymentTracker {
    pub fn new(handle: DeploymentHandle, options: Options) -> Self {
        Self {
            handle,
            options,
            cursor: LogCursor::new(),
            last_status: None,
        }
    }

    pub fn handle(&self) -> &DeploymentHandle {
        &self.handle
    }

    pub fn cursor(&self) -> LogCursor {
        self.cursor
    }

    pub fn last_status(&self) -> Option<&DeploymentStatus> {
        self.last_status.as_ref()
    }

    /// Poll once
    ///
    /// A set failure marker wins over any status change seen in the same poll.
    pub async fn tick<D, P>(&mut self, source: &D, sink: &mut P) -> Result<Tick, DeployError>
    where
        D: DeploymentSource + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let Some(deployment) = source.fetch_deployment(&self.handle).await? else {
            info!("Deployment {} no longer reported, tracking complete", self.handle.id);
            return Ok(Tick::Finished(TrackOutcome::Complete));
        };

        for log in self.cursor.take_new(&deployment.logs) {
            sink.on_line(&format_deploy_log(log));
        }

        if deployment.failed.is_failure() {
            info!("Deployment {} failed: {:?}", deployment.id, deployment.failed);
            return Err(DeployError::WorkflowFailure {
                deploy_id: deployment.id.clone(),
                reason: deployment.failed.clone(),
            });
        }

        if self.last_status.as_ref() != Some(&deployment.status) {
            debug!(
                "Deployment {} status {:?} -> {}",
                deployment.id,
                self.last_status.as_ref().map(DeploymentStatus::as_str),
                deployment.status
            );
            sink.on_transition(&deployment.status);
            self.last_status = Some(deployment.status.clone());
        }

        if deployment.status.is_ok() {
            return Ok(Tick::Finished(TrackOutcome::Deployed(deployment)));
        }

        Ok(Tick::Pending)
    }

    /// Poll until the deployment succeeds, fails or disappears
    pub async fn run<D, P, S, F>(
        &mut self,
        source: &D,
        sink: &mut P,
        sleep_fn: S,
    ) -> Result<TrackOutcome, DeployError>
    where
        D: DeploymentSource + ?Sized,
        P: ProgressSink + ?Sized,
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        info!("Tracking deployment {} in {}", self.handle.id, self.handle.org);

        loop {
            if let Tick::Finished(outcome) = self.tick(source, sink).await? {
                return Ok(outcome);
            }
            sleep_fn(self.options.interval).await;
        }
    }
}
