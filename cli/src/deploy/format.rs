//! Log line formatting
//!
//! Turns structured log entries into single display lines. Formatting never
//! fails: payloads of unexpected shape degrade to whatever can be shown.

use colored::{ColoredString, Colorize};
use openapi_client::models::{DeployLog, LogEntry, LogSeverity};
use serde_json::{Map, Value};

const DB_CONTAINER: &str = "db";

/// Format a squid runtime log entry as one display line
pub fn format_entry(entry: &LogEntry) -> String {
    let mut segments: Vec<String> = Vec::with_capacity(4);

    if let Some(container) = entry.container.as_deref().filter(|c| !c.is_empty()) {
        segments.push(container.cyan().to_string());
    }
    if !entry.timestamp.is_empty() {
        segments.push(entry.timestamp.dimmed().to_string());
    }
    segments.push(paint(&entry.level, entry.level.as_str()).to_string());

    let body = render_payload(entry.container.as_deref(), &entry.payload);
    if !body.is_empty() {
        segments.push(body);
    }

    segments.join(" ")
}

/// Format a deployment log line, colored by its severity
pub fn format_deploy_log(log: &DeployLog) -> String {
    let severity = LogSeverity::from(log.severity.as_str());
    paint(&severity, &log.message).to_string()
}

/// Render the payload part of a log line without any coloring
pub fn render_payload(container: Option<&str>, payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Object(fields) => render_structured(container, fields),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn render_structured(container: Option<&str>, fields: &Map<String, Value>) -> String {
    let mut residual = fields.clone();

    let message = take_text(&mut residual, "message").unwrap_or_default();
    let namespace = take_text(&mut residual, "namespace");
    let error = residual.remove("error").and_then(render_error);
    residual.remove("level");

    let statement = if container == Some(DB_CONTAINER) {
        take_text(&mut residual, "statement")
    } else {
        None
    };

    // Without a message the error takes its place
    let (message, error) = match error {
        Some(error) if message.is_empty() => (error, None),
        error => (message, error),
    };

    let mut segments = Vec::with_capacity(5);
    if let Some(namespace) = namespace.filter(|ns| !ns.is_empty()) {
        segments.push(format!("[{namespace}]"));
    }
    let message_empty = message.is_empty();
    segments.push(message);
    segments.extend(error);
    segments.extend(statement);
    if message_empty || !residual.is_empty() {
        segments.push(Value::Object(residual).to_string());
    }

    segments
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove `key` and return it as text; non-string values are serialized
fn take_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn render_error(error: Value) -> Option<String> {
    match error {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Object(mut fields) => match take_text(&mut fields, "stack")
            .or_else(|| take_text(&mut fields, "message"))
        {
            Some(text) => Some(text),
            None => Some(Value::Object(fields).to_string()),
        },
        other => Some(other.to_string()),
    }
}

fn paint(severity: &LogSeverity, text: &str) -> ColoredString {
    match severity {
        LogSeverity::Debug => text.dimmed(),
        LogSeverity::Info | LogSeverity::Notice => text.normal(),
        LogSeverity::Warning => text.yellow(),
        LogSeverity::Error | LogSeverity::Critical => text.red(),
        LogSeverity::Fatal => text.red().bold(),
        LogSeverity::Other(_) => text.normal(),
    }
}
