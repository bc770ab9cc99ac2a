//! Structured logging on top of `tracing`.
//!
//! `EUNOIA_LOG` takes precedence over the configured level and accepts the
//! usual `EnvFilter` directives (`eunoia_lib=debug,reqwest=warn`).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::AppError;

pub const LOG_ENV: &str = "EUNOIA_LOG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// stderr or file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file when `output = "file"`; defaults to the platform state dir.
    #[serde(default)]
    pub file: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-target overrides, e.g. `{ "eunoia_lib::data" = "debug" }`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

fn default_log_file() -> Result<PathBuf, AppError> {
    let dirs = directories::ProjectDirs::from("", "eunoia", "eunoia").ok_or_else(|| {
        AppError::Config("could not determine platform directories for log file".to_string())
    })?;
    let base = dirs
        .state_dir()
        .unwrap_or_else(|| dirs.data_local_dir())
        .to_path_buf();
    Ok(base.join("eunoia.log"))
}

fn build_writer(config: &LoggingConfig) -> Result<(BoxMakeWriter, bool), AppError> {
    match config.output.as_str() {
        "stderr" => Ok((BoxMakeWriter::new(std::io::stderr), config.color)),
        "file" => {
            let path = match &config.file {
                Some(p) if !p.as_os_str().is_empty() => p.clone(),
                _ => default_log_file()?,
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Config(format!("failed to create log directory: {e}"))
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| {
                    AppError::Config(format!("failed to open log file {}: {e}", path.display()))
                })?;
            Ok((BoxMakeWriter::new(std::sync::Mutex::new(file)), false))
        }
        other => Err(AppError::Config(format!("unknown log output: {other}"))),
    }
}

/// Directive string for `EnvFilter` built from the configured level and
/// per-module overrides.
pub fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = vec![config.level.clone()];
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();
    directives.extend(modules.into_iter().map(|(target, level)| format!("{target}={level}")));
    directives.join(",")
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, AppError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(filter_directives(config))
        .map_err(|e| AppError::Config(format!("invalid log filter: {e}")))
}

/// Install the global subscriber. A second call leaves the first subscriber
/// in place.
pub fn init_logging(config: &LoggingConfig) -> Result<(), AppError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let (writer, ansi) = build_writer(config)?;
    let registry = Registry::default().with(filter);

    let installed = match config.format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        "text" => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
        other => return Err(AppError::Config(format!("unknown log format: {other}"))),
    };

    if let Err(e) = installed {
        tracing::debug!(error = %e, "logging already initialised");
    }
    Ok(())
}
