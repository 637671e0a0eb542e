//! Live tail tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use http::{Method, StatusCode};
use tokio_test::{assert_pending, assert_ready};

use sqdctl::deploy::abort::AbortHandle;
use sqdctl::errors::{ApiError, TailError};
use sqdctl::models::logs::{LogFilters, SquidReference, SquidTarget};
use sqdctl::workers::tail::{LineStream, LiveTail, LogStreamSource};

/// What one stream open produces
enum Open {
    /// Fail with this HTTP status
    Status(u16),
    /// Yield these frames, then close
    Frames(Vec<&'static str>),
    /// Yield these frames, then stay silent
    FramesThenIdle(Vec<&'static str>),
    /// Yield these frames, then break
    FramesThenError(Vec<&'static str>),
    /// Never answer
    Hang,
}

struct Scripted {
    opens: Mutex<VecDeque<Open>>,
    calls: AtomicU32,
}

impl Scripted {
    fn new(opens: Vec<Open>) -> Arc<Self> {
        Arc::new(Self {
            opens: Mutex::new(opens.into()),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

fn status(code: u16) -> ApiError {
    ApiError::status(
        Method::GET,
        "/orgs/acme/squids/indexer/logs/follow",
        StatusCode::from_u16(code).unwrap(),
        "",
    )
}

fn frames(list: Vec<&'static str>) -> impl futures::Stream<Item = Result<String, ApiError>> {
    stream::iter(list.into_iter().map(|frame| Ok(frame.to_string())))
}

#[async_trait]
impl LogStreamSource for Scripted {
    async fn open_log_stream(
        &self,
        _target: &SquidTarget,
        _filters: &LogFilters,
    ) -> Result<LineStream, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.opens.lock().unwrap().pop_front();
        match next {
            Some(Open::Status(code)) => Err(status(code)),
            Some(Open::Frames(list)) => Ok(frames(list).boxed()),
            Some(Open::FramesThenIdle(list)) => Ok(frames(list).chain(stream::pending()).boxed()),
            Some(Open::FramesThenError(list)) => {
                Ok(frames(list).chain(stream::once(async { Err(status(502)) })).boxed())
            }
            Some(Open::Hang) => std::future::pending().await,
            // Nothing left to say
            None => Ok(stream::pending().boxed()),
        }
    }
}

fn target() -> SquidTarget {
    SquidTarget {
        org: "acme".to_string(),
        name: "indexer".to_string(),
        reference: SquidReference::Slot("a1b2c3".to_string()),
    }
}

fn entry(message: &str) -> String {
    format!(r#"[{{"timestamp":"2024-01-01T00:00:00Z","container":"processor","level":"INFO","payload":"{message}"}}]"#)
}

fn leak(text: String) -> &'static str {
    Box::leak(text.into_boxed_str())
}

fn tail(source: Arc<Scripted>, abort: AbortHandle) -> LiveTail<Scripted> {
    LiveTail::new(source, target(), LogFilters::default(), abort)
}

#[tokio::test]
async fn test_idle_timeouts_reconnect_immediately() {
    let source = Scripted::new(vec![
        Open::Status(524),
        Open::Status(524),
        Open::Status(524),
        Open::FramesThenIdle(vec![leak(entry("block 1")), leak(entry("block 2"))]),
    ]);
    let mut tail = tail(source.clone(), AbortHandle::new());

    let first = tail.next_line().await.unwrap().unwrap();
    let second = tail.next_line().await.unwrap().unwrap();

    assert!(first.ends_with("block 1"));
    assert!(second.ends_with("block 2"));
    assert_eq!(tail.attempts(), 4);
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn test_other_open_failure_is_surfaced_once() {
    let source = Scripted::new(vec![Open::Status(500)]);
    let mut tail = tail(source.clone(), AbortHandle::new());

    let err = tail.next_line().await.unwrap().unwrap_err();
    let TailError::StreamTransport(inner) = err;
    assert_eq!(inner.status_code(), Some(StatusCode::INTERNAL_SERVER_ERROR));

    assert!(tail.next_line().await.is_none());
    assert_eq!(tail.attempts(), 1);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_clean_close_reconnects() {
    let source = Scripted::new(vec![
        Open::Frames(vec![leak(entry("before"))]),
        Open::FramesThenIdle(vec![leak(entry("after"))]),
    ]);
    let mut tail = tail(source.clone(), AbortHandle::new());

    assert!(tail.next_line().await.unwrap().unwrap().ends_with("before"));
    assert!(tail.next_line().await.unwrap().unwrap().ends_with("after"));
    assert_eq!(tail.attempts(), 2);
}

#[tokio::test]
async fn test_malformed_frame_reconnects() {
    let source = Scripted::new(vec![
        Open::FramesThenIdle(vec!["{not json", leak(entry("lost"))]),
        Open::FramesThenIdle(vec![leak(entry("recovered"))]),
    ]);
    let mut tail = tail(source.clone(), AbortHandle::new());

    let line = tail.next_line().await.unwrap().unwrap();
    assert!(line.ends_with("recovered"));
    assert_eq!(tail.attempts(), 2);
}

#[tokio::test]
async fn test_mid_stream_error_ends_tail() {
    let source = Scripted::new(vec![Open::FramesThenError(vec![leak(entry("last words"))])]);
    let mut tail = tail(source.clone(), AbortHandle::new());

    assert!(tail.next_line().await.unwrap().is_ok());
    assert!(matches!(
        tail.next_line().await,
        Some(Err(TailError::StreamTransport(_)))
    ));
    assert!(tail.next_line().await.is_none());
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_one_frame_with_several_entries() {
    let frame = r#"[{"timestamp":"t1","level":"INFO","payload":"one"},{"timestamp":"t2","level":"ERROR","payload":{"message":"two"}}]"#;
    let source = Scripted::new(vec![Open::FramesThenIdle(vec![frame])]);
    let mut tail = tail(source, AbortHandle::new());

    assert!(tail.next_line().await.unwrap().unwrap().ends_with("one"));
    assert!(tail.next_line().await.unwrap().unwrap().ends_with("two"));
}

#[tokio::test]
async fn test_abort_while_waiting_ends_tail() {
    let source = Scripted::new(vec![Open::FramesThenIdle(vec![])]);
    let abort = AbortHandle::new();
    let mut tail = tail(source.clone(), abort.clone());

    {
        let mut next = tokio_test::task::spawn(tail.next_line());
        assert_pending!(next.poll());

        abort.abort();
        assert!(next.is_woken());
        assert!(assert_ready!(next.poll()).is_none());
    }

    assert!(tail.next_line().await.is_none());
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_no_line_after_abort() {
    let frame = r#"[{"timestamp":"t","payload":"a"},{"timestamp":"t","payload":"b"},{"timestamp":"t","payload":"c"}]"#;
    let source = Scripted::new(vec![Open::FramesThenIdle(vec![frame])]);
    let abort = AbortHandle::new();
    let mut tail = tail(source, abort.clone());

    assert!(tail.next_line().await.unwrap().unwrap().ends_with("a"));
    abort.abort();
    assert!(tail.next_line().await.is_none());
    assert!(tail.next_line().await.is_none());
}

#[tokio::test]
async fn test_aborted_before_start_never_connects() {
    let source = Scripted::new(vec![Open::Status(524)]);
    let abort = AbortHandle::new();
    abort.abort();
    let mut tail = tail(source.clone(), abort);

    assert!(tail.next_line().await.is_none());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_abort_while_opening_stops_reconnects() {
    let source = Scripted::new(vec![
        Open::Status(524),
        Open::Hang,
        Open::FramesThenIdle(vec![leak(entry("too late"))]),
    ]);
    let abort = AbortHandle::new();
    let mut tail = tail(source.clone(), abort.clone());

    {
        let mut next = tokio_test::task::spawn(tail.next_line());
        assert_pending!(next.poll());
        assert_eq!(source.calls(), 2);

        abort.abort();
        assert!(next.is_woken());
        assert!(assert_ready!(next.poll()).is_none());
    }

    assert!(tail.next_line().await.is_none());
    assert_eq!(tail.attempts(), 2);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_into_stream() {
    let source = Scripted::new(vec![
        Open::Frames(vec![leak(entry("x")), leak(entry("y"))]),
        Open::Status(403),
    ]);
    let lines: Vec<Result<String, TailError>> =
        tail(source, AbortHandle::new()).into_stream().collect().await;

    assert_eq!(lines.len(), 3);
    assert!(lines[0].as_ref().unwrap().ends_with("x"));
    assert!(lines[1].as_ref().unwrap().ends_with("y"));
    assert!(lines[2].is_err());
}
