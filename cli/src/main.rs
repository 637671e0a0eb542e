//! sqdctl - Entry Point
//!
//! Follows squid deployments on the SQD cloud and streams their logs.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use sqdctl::app::command::{parse_args, Command, USAGE};
use sqdctl::app::options::AppOptions;
use sqdctl::app::run::run;
use sqdctl::errors::AppError;
use sqdctl::http::client::HttpClient;
use sqdctl::logs::{init_logging, LogOptions};
use sqdctl::storage::layout::StorageLayout;
use sqdctl::storage::settings::Settings;
use sqdctl::utils::version_info;

use colored::Colorize;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli_args = parse_args(env::args().skip(1));

    let command = match Command::from_args(&cli_args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{} {}\n\n{}", "✖".red(), e, USAGE);
            return ExitCode::FAILURE;
        }
    };

    match command {
        Command::Version => {
            return match serde_json::to_string_pretty(&version_info()) {
                Ok(version) => {
                    println!("{version}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{} {}", "✖".red(), e);
                    ExitCode::FAILURE
                }
            };
        }
        Command::Help => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    // Retrieve the settings file
    let layout = StorageLayout::default();
    let settings_file = layout.settings_file();
    let settings = match Settings::load(&settings_file).await {
        Ok(settings) => settings.with_env(|key| env::var(key).ok()),
        Err(e) => {
            eprintln!(
                "{} Unable to read settings file {}: {}",
                "✖".red(),
                settings_file.path().display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.json_logs,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }
    debug!("Settings loaded from {}", settings_file.path().display());

    let result = match command {
        Command::Auth { token } => {
            Settings::store_credentials(&settings_file, token).await.map(|_| {
                println!(
                    "{} Credentials saved to {}",
                    "✔".green(),
                    settings_file.path().display()
                );
            })
        }
        command => run_remote(&settings, command).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {:?}", e);
            eprintln!("{} {}", "✖".red(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run_remote(settings: &Settings, command: Command) -> Result<(), AppError> {
    let client = Arc::new(HttpClient::new(&settings.api_url, settings.token())?);
    let options = AppOptions::from_settings(settings);

    info!("Running against {}", client.base_url());
    run(client, options, command, await_shutdown_signal()).await
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Unable to listen for SIGTERM: {}", e);
                return wait_ctrl_c().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = wait_ctrl_c() => {}
        }
    }

    #[cfg(not(unix))]
    wait_ctrl_c().await;
}

async fn wait_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received, shutting down..."),
        Err(e) => {
            error!("Unable to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
