//! Tracing setup for the command line tool
//!
//! - Human-readable console output on stderr (stdout carries command output)
//! - Optional JSON formatted logs to file, with size-based and daily rotation

use anyhow::{Context, Result};
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "indexden=info,indexden_rs=info";

/// Initialize tracing
///
/// When `log_dir` is set, the returned guard must be kept alive so that
/// buffered file logs are flushed.
pub fn init_telemetry(log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            std::fs::create_dir_all(log_dir)
                .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

            // indexden.log, rotated daily or at 10MB, keeping up to 9 old files
            let file_appender = RollingFileAppender::new(
                log_dir.join("indexden.log"),
                RollingConditionBasic::new()
                    .daily()
                    .max_size(10 * 1024 * 1024),
                9,
            )?;
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_current_span(true)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    if let Some(dir) = log_dir {
        tracing::debug!("File logging enabled in {}", dir);
    }

    Ok(guard)
}
