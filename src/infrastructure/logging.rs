//! Logging system configuration and initialization
//!
//! This module provides the logging setup with:
//! - Console output and optional daily-rolling file output
//! - Configuration based log level control with `RUST_LOG` override
//! - Structured JSON logging (optional)
//! - Cleanup of old log files

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "url-rewrite.log";

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// UTC timestamps with millisecond precision
struct UtcTimeFormatter;

impl FormatTime for UtcTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    // Suppress verbose SQL logs unless TRACE level is specifically requested
    if !config.level.to_lowercase().contains("trace") {
        filter = filter.add_directive("sqlx::query=warn".parse()?);
    }

    for (module, level) in &config.module_filters {
        let directive = format!("{module}={level}")
            .parse()
            .with_context(|| format!("Invalid log filter {module}={level}"))?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}

/// Initialize logging with custom configuration
///
/// `RUST_LOG` takes precedence over the configured level and module filters:
/// ```bash
/// RUST_LOG="debug,sqlx::query=debug" catalog-url-rewrite full
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(config)?;
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let log_dir = config.log_dir.clone().unwrap_or_else(get_log_directory);
    if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
        cleanup_old_logs(&log_dir, config.max_files)?;

        let (file_writer, file_guard) = non_blocking(rolling::daily(&log_dir, LOG_FILE_PREFIX));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);

        let file_layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(UtcTimeFormatter)
            .with_ansi(false);
        if config.json_format {
            layers.push(
                file_layer
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .boxed(),
            );
        } else {
            layers.push(file_layer.with_target(false).boxed());
        }
    }

    if config.console_output {
        let console_layer = fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(UtcTimeFormatter);
        if config.json_format {
            layers.push(console_layer.json().boxed());
        } else {
            layers.push(console_layer.with_target(false).boxed());
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("Logging already initialized")?;

    info!(
        level = %config.level,
        json = config.json_format,
        console = config.console_output,
        file = config.file_output,
        "Logging system initialized"
    );
    if config.file_output {
        info!("Log directory: {:?}", log_dir);
    }

    Ok(())
}

/// Remove the oldest log files so at most `max_files - 1` remain before a new one is opened
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut log_files = Vec::new();
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if is_log && path.is_file() {
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                log_files.push((path, modified));
            }
        }
    }

    // Sort by modification time (newest first)
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let keep = (max_files as usize).saturating_sub(1);
    let mut removed = 0;
    for (path, _) in log_files.iter().skip(keep) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove old log file {:?}: {}", path, e);
        } else {
            removed += 1;
        }
    }

    Ok(removed)
}
