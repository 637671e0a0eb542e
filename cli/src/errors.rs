//! Error types for sqdctl
//!
//! Request-level failures are classified from the HTTP method, status and
//! body (see [`classify_http`]); workflow-level failures come from the
//! deployment's `failed` marker.

use std::fmt;

use http::{Method, StatusCode};
use openapi_client::models::ErrorResponse;
use thiserror::Error;

use crate::models::deployment::FailureMarker;

/// Top-level error type for the sqdctl binary
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Tail(#[from] TailError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Transport-level error raised by the HTTP boundary
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Status(StatusError),

    #[error("Invalid response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid API url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Build a non-2xx response error
    pub fn status(
        method: Method,
        path: impl Into<String>,
        status: StatusCode,
        body: impl Into<String>,
    ) -> Self {
        ApiError::Status(StatusError {
            method,
            path: path.into(),
            status,
            body: body.into(),
        })
    }

    /// HTTP status attached to the error, when the server answered
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status(err) => Some(err.status),
            ApiError::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Classified kind for status errors
    pub fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            ApiError::Status(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Non-2xx response, kept raw for diagnostics
#[derive(Debug, Clone)]
pub struct StatusError {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub body: String,
}

impl StatusError {
    pub fn kind(&self) -> ApiErrorKind {
        classify_http(&self.method, self.status, &self.body)
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ApiErrorKind::UnexpectedFailure { .. } => write!(
                f,
                "{} {} failed with status {}: {}",
                self.method,
                self.path,
                self.status.as_u16(),
                self.body
            ),
            kind => write!(f, "{kind}"),
        }
    }
}

/// Offending field of a rejected request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

/// Which kind of "not found" a 404 means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundKind {
    /// The endpoint itself is unknown to the server (CLI/API version mismatch)
    UnknownEndpoint,
    /// The addressed resource does not exist
    Resource(String),
}

/// Classified request failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    #[error("Authentication failure. Please obtain a new deployment key and run `sqdctl --auth=<key>`")]
    Unauthenticated,

    #[error("{}", render_validation(.message, .fields))]
    ValidationError {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("{}", render_not_found(.0))]
    NotFound(NotFoundKind),

    #[error("Method not allowed by the API. Please make sure you have the latest version of sqdctl")]
    MethodNotAllowed,

    #[error("The SQD cloud API is temporarily unavailable. Please try again later")]
    UpstreamUnavailable,

    #[error("Unexpected API response {status}: {body}")]
    UnexpectedFailure { status: u16, body: String },
}

/// Map an HTTP failure onto the error taxonomy
pub fn classify_http(method: &Method, status: StatusCode, body: &str) -> ApiErrorKind {
    match status.as_u16() {
        401 => ApiErrorKind::Unauthenticated,
        400 => {
            let parsed = parse_error_body(body);
            let fields = parsed
                .invalid_fields
                .iter()
                .map(|field| FieldError {
                    path: render_path(&field.path),
                    message: field.message.clone(),
                })
                .collect();
            ApiErrorKind::ValidationError {
                message: parsed.error.unwrap_or_default(),
                fields,
            }
        }
        404 => {
            let text = parse_error_body(body).error.unwrap_or_default();
            let pattern = format!("cannot {} ", method.as_str().to_ascii_lowercase());
            if text.to_ascii_lowercase().starts_with(&pattern) {
                ApiErrorKind::NotFound(NotFoundKind::UnknownEndpoint)
            } else {
                ApiErrorKind::NotFound(NotFoundKind::Resource(text))
            }
        }
        405 => ApiErrorKind::MethodNotAllowed,
        502..=504 => ApiErrorKind::UpstreamUnavailable,
        code => ApiErrorKind::UnexpectedFailure {
            status: code,
            body: body.to_string(),
        },
    }
}

/// Error bodies are usually `{"error": ...}` but proxies answer with plain text
fn parse_error_body(body: &str) -> ErrorResponse {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => {
            serde_json::from_value(serde_json::Value::Object(map)).unwrap_or_default()
        }
        Ok(serde_json::Value::String(text)) => ErrorResponse {
            error: Some(text),
            ..Default::default()
        },
        _ => ErrorResponse {
            error: Some(body.trim().to_string()),
            ..Default::default()
        },
    }
}

fn render_path(path: &[serde_json::Value]) -> String {
    path.iter()
        .map(|segment| match segment {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn render_validation(message: &str, fields: &[FieldError]) -> String {
    let mut lines = vec![if message.is_empty() {
        "Validation error".to_string()
    } else {
        format!("Validation error: {message}")
    }];
    for (index, field) in fields.iter().enumerate() {
        lines.push(format!("  {}) {}: {}", index + 1, field.path, field.message));
    }
    lines.join("\n")
}

fn render_not_found(kind: &NotFoundKind) -> String {
    match kind {
        NotFoundKind::UnknownEndpoint => {
            "Unknown API endpoint. Please make sure you have the latest version of sqdctl".to_string()
        }
        NotFoundKind::Resource(text) if text.is_empty() => "Not found".to_string(),
        NotFoundKind::Resource(text) => format!("Not found: {text}"),
    }
}

/// Error returned by a deployment tracking session
#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Transport(#[from] ApiError),

    #[error("{}", render_workflow_failure(.deploy_id, .reason))]
    WorkflowFailure {
        deploy_id: String,
        reason: FailureMarker,
    },
}

fn render_workflow_failure(deploy_id: &str, reason: &FailureMarker) -> String {
    match reason {
        FailureMarker::Reason(reason) => reason.clone(),
        FailureMarker::Unexpected | FailureMarker::None => format!(
            "An unexpected error occurred. Please report it to SQD support and include the deploy id {deploy_id}"
        ),
    }
}

/// Error that ends a live tail session
#[derive(Error, Debug)]
pub enum TailError {
    #[error("Live log stream failed: {0}")]
    StreamTransport(#[source] ApiError),
}
