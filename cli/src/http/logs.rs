//! Squid logs API client

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use openapi_client::models::HistoryLogsResponse;
use tracing::debug;

use crate::errors::ApiError;
use crate::http::client::HttpClient;
use crate::models::logs::{LogFilters, SquidTarget};
use crate::workers::tail::{LineStream, LogStreamSource};

impl HttpClient {
    /// Fetch one page of historical squid logs
    pub async fn fetch_logs(
        &self,
        target: &SquidTarget,
        filters: &LogFilters,
    ) -> Result<HistoryLogsResponse, ApiError> {
        let mut segments = target.segments();
        segments.extend(["logs".to_string(), "history".to_string()]);
        let url = self.url(&segments, &filters.query_pairs())?;

        let page: Option<HistoryLogsResponse> = self.get(url).await?;
        Ok(page.unwrap_or(HistoryLogsResponse {
            logs: Vec::new(),
            next_page: None,
        }))
    }
}

#[async_trait]
impl LogStreamSource for HttpClient {
    async fn open_log_stream(
        &self,
        target: &SquidTarget,
        filters: &LogFilters,
    ) -> Result<LineStream, ApiError> {
        let mut segments = target.segments();
        segments.extend(["logs".to_string(), "follow".to_string()]);
        let url = self.url(&segments, &filters.query_pairs())?;

        let response = self.get_stream(url).await?;
        debug!("Live log stream opened ({})", response.status());
        Ok(split_lines(response.bytes_stream()))
    }
}

/// Splits a byte stream into newline-terminated lines
///
/// A trailing line without terminator is emitted when the stream ends. After a
/// transport error the stream ends.
pub fn split_lines<S, B, E>(chunks: S) -> LineStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    struct State<S> {
        chunks: std::pin::Pin<Box<S>>,
        buffer: LineBuffer,
        ready: VecDeque<String>,
        done: bool,
    }

    let state = State {
        chunks: Box::pin(chunks),
        buffer: LineBuffer::default(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.done {
                return None;
            }
            match state.chunks.next().await {
                Some(Ok(chunk)) => state.ready.extend(state.buffer.push(chunk.as_ref())),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.done = true;
                    state.ready.extend(state.buffer.finish());
                }
            }
        }
    })
    .boxed()
}

/// Accumulates bytes until complete lines are available
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.partial.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.partial.drain(..=end).collect();
            lines.push(decode_line(&raw));
        }
        lines
    }

    /// Flush the unterminated remainder
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.partial);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.trim_end_matches(['\n', '\r']).to_string()
}
