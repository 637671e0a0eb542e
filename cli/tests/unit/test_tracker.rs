//! Deployment tracker tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use http::{Method, StatusCode};
use openapi_client::models::{DeployLog, SquidSummary};

use sqdctl::deploy::tracker::{
    DeploymentSource, DeploymentTracker, Options, ProgressSink, Tick, TrackOutcome,
};
use sqdctl::errors::{ApiError, ApiErrorKind, DeployError};
use sqdctl::models::deployment::{Deployment, DeploymentHandle, DeploymentStatus, FailureMarker};

/// Replays a fixed sequence of poll results
struct Script {
    polls: Mutex<VecDeque<Result<Option<Deployment>, ApiError>>>,
}

impl Script {
    fn new(polls: Vec<Result<Option<Deployment>, ApiError>>) -> Self {
        Self {
            polls: Mutex::new(polls.into()),
        }
    }

    fn records(records: Vec<Deployment>) -> Self {
        Self::new(records.into_iter().map(|r| Ok(Some(r))).collect())
    }
}

#[async_trait]
impl DeploymentSource for Script {
    async fn fetch_deployment(
        &self,
        _handle: &DeploymentHandle,
    ) -> Result<Option<Deployment>, ApiError> {
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .expect("polled past the end of the script")
    }
}

#[derive(Default)]
struct Recorder {
    lines: Vec<String>,
    transitions: Vec<DeploymentStatus>,
}

impl ProgressSink for Recorder {
    fn on_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn on_transition(&mut self, status: &DeploymentStatus) {
        self.transitions.push(status.clone());
    }
}

fn record(status: &str, logs: &[&str]) -> Deployment {
    Deployment {
        id: "42".to_string(),
        status: DeploymentStatus::from(status),
        failed: FailureMarker::None,
        logs: logs
            .iter()
            .map(|message| DeployLog {
                severity: "info".to_string(),
                message: message.to_string(),
            })
            .collect(),
        squid: None,
        deployment_url: None,
    }
}

fn failed(status: &str, marker: FailureMarker) -> Deployment {
    Deployment {
        failed: marker,
        ..record(status, &[])
    }
}

fn tracker() -> DeploymentTracker {
    DeploymentTracker::new(DeploymentHandle::new("acme", "42"), Options::default())
}

async fn no_sleep(_: std::time::Duration) {}

#[tokio::test]
async fn test_transitions_until_ok() {
    let source = Script::records(vec![
        record("UNPACKING", &[]),
        record("UNPACKING", &[]),
        record("IMAGE_BUILDING", &[]),
        record("DEPLOYING", &[]),
        record("OK", &[]),
    ]);
    let mut sink = Recorder::default();

    let outcome = tracker().run(&source, &mut sink, no_sleep).await.unwrap();

    assert!(matches!(outcome, TrackOutcome::Deployed(ref d) if d.status.is_ok()));
    assert_eq!(
        sink.transitions,
        vec![
            DeploymentStatus::Unpacking,
            DeploymentStatus::ImageBuilding,
            DeploymentStatus::Deploying,
            DeploymentStatus::Ok,
        ]
    );
    assert!(source.polls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_absent_record_completes() {
    let source = Script::new(vec![Ok(None)]);
    let mut sink = Recorder::default();

    let outcome = tracker().run(&source, &mut sink, no_sleep).await.unwrap();

    assert!(matches!(outcome, TrackOutcome::Complete));
    assert!(sink.lines.is_empty());
    assert!(sink.transitions.is_empty());
}

#[tokio::test]
async fn test_absent_record_after_progress_completes() {
    let source = Script::new(vec![Ok(Some(record("SQUID_DELETING", &["removing"]))), Ok(None)]);
    let mut sink = Recorder::default();

    let outcome = tracker().run(&source, &mut sink, no_sleep).await.unwrap();

    assert!(matches!(outcome, TrackOutcome::Complete));
    assert_eq!(sink.lines.len(), 1);
    assert_eq!(sink.transitions, vec![DeploymentStatus::SquidDeleting]);
}

#[tokio::test]
async fn test_failure_wins_over_status_change() {
    let source = Script::records(vec![
        record("UNPACKING", &[]),
        failed("IMAGE_BUILDING", FailureMarker::Reason("SOURCE_FILES_BUILD_FAILED".to_string())),
    ]);
    let mut sink = Recorder::default();

    let err = tracker().run(&source, &mut sink, no_sleep).await.unwrap_err();

    match err {
        DeployError::WorkflowFailure { deploy_id, reason } => {
            assert_eq!(deploy_id, "42");
            assert_eq!(
                reason,
                FailureMarker::Reason("SOURCE_FILES_BUILD_FAILED".to_string())
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sink.transitions, vec![DeploymentStatus::Unpacking]);
}

#[tokio::test]
async fn test_unexpected_failure_mentions_deploy_id() {
    let source = Script::records(vec![failed("DEPLOYING", FailureMarker::Unexpected)]);
    let mut sink = Recorder::default();

    let err = tracker().run(&source, &mut sink, no_sleep).await.unwrap_err();

    assert!(err.to_string().contains("deploy id 42"));
    assert!(sink.transitions.is_empty());
}

#[tokio::test]
async fn test_logs_of_failed_poll_are_still_shown() {
    let mut last = failed("IMAGE_BUILDING", FailureMarker::Unexpected);
    last.logs = record("IMAGE_BUILDING", &["step 1", "error: exit 1"]).logs;
    let source = Script::records(vec![last]);
    let mut sink = Recorder::default();

    assert!(tracker().run(&source, &mut sink, no_sleep).await.is_err());
    assert_eq!(sink.lines.len(), 2);
    assert!(sink.lines[1].contains("error: exit 1"));
}

#[tokio::test]
async fn test_growing_logs_are_emitted_once() {
    let source = Script::records(vec![
        record("UNPACKING", &["a"]),
        record("UNPACKING", &["a", "b"]),
        record("IMAGE_BUILDING", &["a", "b", "", "c"]),
        record("OK", &["a", "b", "", "c"]),
    ]);
    let mut sink = Recorder::default();
    let mut tracker = tracker();

    tracker.run(&source, &mut sink, no_sleep).await.unwrap();

    assert_eq!(sink.lines.len(), 3);
    for (line, expected) in sink.lines.iter().zip(["a", "b", "c"]) {
        assert!(line.contains(expected), "{line} should contain {expected}");
    }
    assert_eq!(tracker.cursor().position(), 4);
}

#[tokio::test]
async fn test_unknown_status_keeps_polling() {
    let source = Script::records(vec![record("WARMING_UP", &[]), record("OK", &[])]);
    let mut sink = Recorder::default();
    let mut tracker = tracker();

    let tick = tracker.tick(&source, &mut sink).await.unwrap();
    assert!(matches!(tick, Tick::Pending));
    assert_eq!(
        sink.transitions,
        vec![DeploymentStatus::Other("WARMING_UP".to_string())]
    );

    let tick = tracker.tick(&source, &mut sink).await.unwrap();
    assert!(matches!(tick, Tick::Finished(TrackOutcome::Deployed(_))));
}

#[tokio::test]
async fn test_transport_error_ends_session() {
    let source = Script::new(vec![
        Ok(Some(record("UNPACKING", &[]))),
        Err(ApiError::status(
            Method::GET,
            "/orgs/acme/deployments/42",
            StatusCode::UNAUTHORIZED,
            "",
        )),
    ]);
    let mut sink = Recorder::default();

    let err = tracker().run(&source, &mut sink, no_sleep).await.unwrap_err();

    match err {
        DeployError::Transport(e) => assert_eq!(e.kind(), Some(ApiErrorKind::Unauthenticated)),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_deployed_record_exposes_log_target() {
    let mut done = record("OK", &[]);
    done.squid = Some(SquidSummary {
        name: "indexer".to_string(),
        slot: None,
        tags: vec!["prod".to_string(), "latest".to_string()],
    });
    done.deployment_url = Some("https://cloud.sqd.dev/squids/indexer".to_string());
    let source = Script::records(vec![done]);
    let mut sink = Recorder::default();

    let TrackOutcome::Deployed(deployment) = tracker().run(&source, &mut sink, no_sleep).await.unwrap() else {
        panic!("expected a deployed outcome");
    };

    let target = deployment.log_target("acme").unwrap();
    assert_eq!(
        target.segments(),
        vec!["orgs", "acme", "squids", "indexer", "tags", "prod"]
    );
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let first = Script::records(vec![record("DEPLOYING", &["a", "b"])]);
    let second = Script::records(vec![record("DEPLOYING", &["a", "b"])]);
    let mut sink = Recorder::default();
    let mut one = tracker();
    let mut two = DeploymentTracker::new(DeploymentHandle::new("acme", "43"), Options::default());

    one.tick(&first, &mut sink).await.unwrap();
    two.tick(&second, &mut sink).await.unwrap();

    assert_eq!(sink.lines.len(), 4);
    assert_eq!(sink.transitions.len(), 2);
    assert_eq!(two.handle().id, "43");
}
