mod alert;
mod analysis;
mod collector;
mod config;
mod domain;
mod engine;
mod notification;
mod scanner;
mod storage;
mod venues;

use config::Config;
use scanner::{Scanner, ScannerConfig};
use std::env;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

fn parse_config_path() -> String {
    for arg in env::args().skip(1) {
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

fn init_tracing(log_level: Option<&str>) {
    let level = match log_level {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() {
    let config_path = parse_config_path();
    let run_once = env::args().any(|arg| arg == "--once");

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    init_tracing(config.app.log_level.as_deref());
    info!(config = %config_path, env = %config.app.env, "Configuration loaded");

    let scanner = match Scanner::new(ScannerConfig::new(config)).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, "Failed to create scanner");
            std::process::exit(1);
        }
    };

    if run_once {
        match scanner.run_tick().await {
            Ok(report) => info!(
                opportunities = report.opportunities,
                alerts = report.alerts,
                "Single tick finished"
            ),
            Err(e) => error!(error = %e, "Tick failed"),
        }
        scanner.close().await;
        return;
    }

    let runner = Arc::clone(&scanner);
    let handle = tokio::spawn(async move { runner.start().await });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
    }

    scanner.stop().await;
    match handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Scanner error"),
        Err(e) => error!(error = %e, "Scanner task failed"),
    }
}
