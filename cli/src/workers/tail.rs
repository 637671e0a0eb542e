//! Live log tail with automatic reconnects

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use openapi_client::models::LogEntry;
use tracing::{debug, info, warn};

use crate::deploy::abort::AbortHandle;
use crate::deploy::format::format_entry;
use crate::deploy::tracker::ProgressSink;
use crate::errors::{ApiError, TailError};
use crate::models::logs::{LogFilters, SquidTarget};

/// Status the upstream proxy answers with when it closes an idle stream
const UPSTREAM_IDLE_TIMEOUT: u16 = 524;

/// Newline-delimited frames of an open log stream
pub type LineStream = BoxStream<'static, Result<String, ApiError>>;

/// Opens server-pushed log streams, implemented by the HTTP client
#[async_trait]
pub trait LogStreamSource: Send + Sync {
    async fn open_log_stream(
        &self,
        target: &SquidTarget,
        filters: &LogFilters,
    ) -> Result<LineStream, ApiError>;
}

/// Endless sequence of formatted live log lines
///
/// The underlying stream is reopened whenever the server closes it, answers
/// with an idle timeout (524) or sends a frame that does not parse. Any other
/// failure ends the tail with [`TailError::StreamTransport`]. Lines around a
/// reconnect may be missed or repeated.
pub struct LiveTail<S: LogStreamSource + ?Sized> {
    source: Arc<S>,
    target: SquidTarget,
    filters: LogFilters,
    abort: AbortHandle,
    stream: Option<LineStream>,
    pending: VecDeque<String>,
    attempts: u32,
    finished: bool,
}

impl<S: LogStreamSource + ?Sized> LiveTail<S> {
    pub fn new(source: Arc<S>, target: SquidTarget, filters: LogFilters, abort: AbortHandle) -> Self {
        Self {
            source,
            target,
            filters,
            abort,
            stream: None,
            pending: VecDeque::new(),
            attempts: 0,
            finished: false,
        }
    }

    /// Number of times a stream open was attempted
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Next formatted line
    ///
    /// Returns `None` once the abort handle fires or after an error has been
    /// returned.
    pub async fn next_line(&mut self) -> Option<Result<String, TailError>> {
        loop {
            if self.finished || self.abort.is_aborted() {
                self.release();
                return None;
            }

            if let Some(line) = self.pending.pop_front() {
                return Some(Ok(line));
            }

            if self.stream.is_none() {
                if let Err(e) = self.connect().await {
                    self.finished = true;
                    return Some(Err(e));
                }
                continue;
            }

            let Some(stream) = self.stream.as_mut() else {
                continue;
            };

            let item = tokio::select! {
                biased;
                _ = self.abort.aborted() => continue,
                item = stream.next() => item,
            };

            match item {
                Some(Ok(frame)) => self.handle_frame(&frame),
                Some(Err(e)) => {
                    warn!("Live log stream broke: {}", e);
                    self.release();
                    self.finished = true;
                    return Some(Err(TailError::StreamTransport(e)));
                }
                None => {
                    debug!("Live log stream closed by server, reconnecting...");
                    self.stream = None;
                }
            }
        }
    }

    /// Forward lines to `sink` until aborted or the stream fails
    pub async fn run<P: ProgressSink + ?Sized>(&mut self, sink: &mut P) -> Result<(), TailError> {
        info!("Streaming live logs of {}...", self.target.name);
        while let Some(line) = self.next_line().await {
            sink.on_line(&line?);
        }
        Ok(())
    }

    /// Open a stream, retrying straight away on idle timeouts
    async fn connect(&mut self) -> Result<(), TailError> {
        loop {
            if self.abort.is_aborted() {
                return Ok(());
            }

            self.attempts += 1;
            debug!("Opening live log stream (attempt {})", self.attempts);

            let opened = tokio::select! {
                biased;
                _ = self.abort.aborted() => return Ok(()),
                opened = self.source.open_log_stream(&self.target, &self.filters) => opened,
            };

            match opened {
                Ok(stream) => {
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) if e.status_code().map(|s| s.as_u16()) == Some(UPSTREAM_IDLE_TIMEOUT) => {
                    debug!("Live log stream timed out upstream, reconnecting...");
                }
                Err(e) => return Err(TailError::StreamTransport(e)),
            }
        }
    }

    fn handle_frame(&mut self, frame: &str) {
        let frame = frame.trim();
        if frame.is_empty() {
            return;
        }

        match serde_json::from_str::<Vec<LogEntry>>(frame) {
            Ok(entries) => self.pending.extend(entries.iter().map(format_entry)),
            Err(e) => {
                warn!("Malformed live log frame, reconnecting: {}", e);
                self.stream = None;
            }
        }
    }

    fn release(&mut self) {
        self.stream = None;
        self.pending.clear();
    }
}

impl<S: LogStreamSource + ?Sized + 'static> LiveTail<S> {
    /// Consume the tail as a stream of lines
    pub fn into_stream(self) -> impl Stream<Item = Result<String, TailError>> + Send {
        futures::stream::unfold(self, |mut tail| async move {
            let item = tail.next_line().await?;
            Some((item, tail))
        })
    }
}
