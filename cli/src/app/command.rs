//! Command line parsing

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use openapi_client::models::LogSeverity;

use crate::errors::AppError;
use crate::models::deployment::DeploymentHandle;
use crate::models::logs::{LogFilters, SquidReference, SquidTarget};

pub const USAGE: &str = "\
Usage:
  sqdctl --deploy=<id> --org=<code> [--no-stream-logs]
  sqdctl --logs=<squid> --org=<code> [--slot=<slot> | --tag=<tag>]
         [--container=<a,b>] [--level=<error,warning>] [--search=<text>]
         [--since=<rfc3339>] [--limit=<n>] [--follow]
  sqdctl --auth=<deployment key>
  sqdctl --version";

/// What the user asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Version,
    Help,
    Auth {
        token: String,
    },
    Deploy {
        handle: DeploymentHandle,
        stream_logs: bool,
    },
    Logs {
        target: SquidTarget,
        filters: LogFilters,
        follow: bool,
    },
}

/// Collect `--key=value` and `--flag` arguments
pub fn parse_args<I>(args: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = String>,
{
    let mut cli_args = HashMap::new();

    for arg in args {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    cli_args
}

impl Command {
    pub fn from_args(args: &HashMap<String, String>) -> Result<Self, AppError> {
        if args.contains_key("version") {
            return Ok(Command::Version);
        }

        if let Some(token) = args.get("auth") {
            if token.is_empty() || token == "true" {
                return Err(AppError::InvalidArgument("--auth requires a key".to_string()));
            }
            return Ok(Command::Auth {
                token: token.clone(),
            });
        }

        if let Some(id) = args.get("deploy") {
            return Ok(Command::Deploy {
                handle: DeploymentHandle::new(required(args, "org")?, non_flag(id, "deploy")?),
                stream_logs: !args.contains_key("no-stream-logs"),
            });
        }

        if let Some(name) = args.get("logs") {
            let reference = match (args.get("slot"), args.get("tag")) {
                (Some(_), Some(_)) => {
                    return Err(AppError::InvalidArgument(
                        "--slot and --tag are mutually exclusive".to_string(),
                    ))
                }
                (Some(slot), None) => SquidReference::Slot(non_flag(slot, "slot")?),
                (None, Some(tag)) => SquidReference::Tag(non_flag(tag, "tag")?),
                (None, None) => SquidReference::Default,
            };

            return Ok(Command::Logs {
                target: SquidTarget {
                    org: required(args, "org")?,
                    name: non_flag(name, "logs")?,
                    reference,
                },
                filters: parse_filters(args)?,
                follow: args.contains_key("follow"),
            });
        }

        Ok(Command::Help)
    }
}

fn parse_filters(args: &HashMap<String, String>) -> Result<LogFilters, AppError> {
    let since = args
        .get("since")
        .map(|value| {
            DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| AppError::InvalidArgument(format!("--since={value}: {e}")))
        })
        .transpose()?;

    let limit = args
        .get("limit")
        .map(|value| {
            value
                .parse::<u32>()
                .map_err(|e| AppError::InvalidArgument(format!("--limit={value}: {e}")))
        })
        .transpose()?;

    Ok(LogFilters {
        containers: split_list(args.get("container")),
        levels: split_list(args.get("level"))
            .iter()
            .map(|level| LogSeverity::from(level.as_str()))
            .collect(),
        search: args.get("search").cloned(),
        since,
        limit,
        next_page: None,
    })
}

fn split_list(value: Option<&String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn required(args: &HashMap<String, String>, key: &str) -> Result<String, AppError> {
    match args.get(key) {
        Some(value) => non_flag(value, key),
        None => Err(AppError::InvalidArgument(format!("--{key} is required"))),
    }
}

/// A bare `--key` is stored as "true"; reject it where a value is expected
fn non_flag(value: &str, key: &str) -> Result<String, AppError> {
    if value.is_empty() || value == "true" {
        return Err(AppError::InvalidArgument(format!("--{key} requires a value")));
    }
    Ok(value.to_string())
}
