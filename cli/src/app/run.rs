//! Command execution

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::app::command::Command;
use crate::app::console::ConsoleSink;
use crate::app::options::AppOptions;
use crate::deploy::abort::AbortHandle;
use crate::deploy::format::format_entry;
use crate::deploy::tracker::{DeploymentTracker, ProgressSink, TrackOutcome};
use crate::errors::{AppError, TailError};
use crate::http::client::HttpClient;
use crate::models::deployment::DeploymentHandle;
use crate::models::logs::{LogFilters, SquidTarget};
use crate::workers::tail::LiveTail;

/// Run a remote command until it completes or `shutdown_signal` resolves
pub async fn run(
    client: Arc<HttpClient>,
    options: AppOptions,
    command: Command,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    let mut shutdown = Box::pin(shutdown_signal);

    match command {
        Command::Deploy {
            handle,
            stream_logs,
        } => {
            let options = AppOptions {
                stream_logs: options.stream_logs && stream_logs,
                ..options
            };
            track_deploy(client, &options, handle, &mut shutdown).await
        }
        Command::Logs {
            target,
            filters,
            follow,
        } => show_logs(client, &options, target, filters, follow, &mut shutdown).await,
        _ => Err(AppError::Internal("not a remote command".to_string())),
    }
}

/// Track a deployment to its end, then optionally attach the live tail
///
/// Interrupting the tracking only detaches the terminal: the deployment keeps
/// running on the server.
pub async fn track_deploy<F>(
    client: Arc<HttpClient>,
    options: &AppOptions,
    handle: DeploymentHandle,
    shutdown: &mut F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Unpin,
{
    let mut console = ConsoleSink::stdout();
    let mut tracker = DeploymentTracker::new(handle.clone(), options.tracker.clone());

    let outcome = tokio::select! {
        outcome = tracker.run(client.as_ref(), &mut console, tokio::time::sleep) => outcome?,
        _ = &mut *shutdown => {
            info!("Stopped tracking deployment {}, it keeps running remotely", handle.id);
            return Ok(());
        }
    };

    let deployment = match outcome {
        TrackOutcome::Complete => {
            console.success("Done");
            return Ok(());
        }
        TrackOutcome::Deployed(deployment) => deployment,
    };

    match &deployment.deployment_url {
        Some(url) => console.success(format!("Squid deployed: {url}")),
        None => console.success("Squid deployed"),
    }

    if !options.stream_logs {
        return Ok(());
    }
    let Some(target) = deployment.log_target(&handle.org) else {
        debug!("Deployment {} has no squid to stream logs from", deployment.id);
        return Ok(());
    };

    let filters = LogFilters {
        since: Some(Utc::now()),
        ..Default::default()
    };
    if let Err(e) = follow(client, target, filters, shutdown).await {
        // The deployment itself succeeded
        console.warning(format!("Log streaming stopped: {e}"));
    }
    Ok(())
}

/// Print historical squid logs, then follow new ones when asked to
pub async fn show_logs<F>(
    client: Arc<HttpClient>,
    options: &AppOptions,
    target: SquidTarget,
    filters: LogFilters,
    follow_logs: bool,
    shutdown: &mut F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Unpin,
{
    let mut console = ConsoleSink::stdout();

    let printed = tokio::select! {
        printed = print_history(&client, options, &target, &filters, &mut console) => printed?,
        _ = &mut *shutdown => return Ok(()),
    };
    debug!("Printed {} historical log entries", printed);

    if !follow_logs {
        return Ok(());
    }

    let live_filters = LogFilters {
        since: Some(Utc::now()),
        limit: None,
        next_page: None,
        ..filters
    };
    follow(client, target, live_filters, shutdown).await
}

async fn print_history<P: ProgressSink>(
    client: &HttpClient,
    options: &AppOptions,
    target: &SquidTarget,
    filters: &LogFilters,
    sink: &mut P,
) -> Result<usize, AppError> {
    let limit = filters.limit.unwrap_or(options.history_limit) as usize;
    let mut page_filters = filters.clone();
    let mut printed = 0;

    while printed < limit {
        page_filters.limit = u32::try_from(limit - printed).ok();
        let page = client.fetch_logs(target, &page_filters).await?;

        let remaining = limit - printed;
        for entry in page.logs.iter().take(remaining) {
            sink.on_line(&format_entry(entry));
        }
        printed += page.logs.len().min(remaining);

        match page.next_page {
            Some(next) if !page.logs.is_empty() => page_filters.next_page = Some(next),
            _ => break,
        }
    }

    Ok(printed)
}

/// Stream live logs to stdout until `shutdown` resolves or the stream fails
async fn follow<F>(
    client: Arc<HttpClient>,
    target: SquidTarget,
    filters: LogFilters,
    shutdown: &mut F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Unpin,
{
    let abort = AbortHandle::new();
    let mut tail = LiveTail::new(client, target, filters, abort.clone());

    let mut task = tokio::spawn(async move {
        let mut console = ConsoleSink::stdout();
        let result = tail.run(&mut console).await;
        debug!("Live tail ended after {} connection attempts", tail.attempts());
        result
    });

    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = &mut *shutdown => {
            info!("Stopping live logs...");
            abort.abort();
            task.await
        }
    };

    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(TailError::StreamTransport(e))) => {
            warn!("Live log stream failed: {}", e);
            Err(TailError::StreamTransport(e).into())
        }
        Err(e) => Err(AppError::Internal(format!("Live tail task failed: {e}"))),
    }
}
