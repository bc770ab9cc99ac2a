use std::path::{Component, Path, PathBuf};
use std::process::{Command, ExitStatus};

use async_trait::async_trait;

use crate::error::AppError;

/// Shows a path in the platform file manager.
#[async_trait]
pub trait Revealer: Send + Sync {
    async fn reveal(&self, path: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRevealer;

pub fn validate_reveal_target(path: &str) -> Result<PathBuf, AppError> {
    if path.trim().is_empty() {
        return Err(AppError::General("path is empty".to_string()));
    }
    let target = PathBuf::from(path);
    if !target.is_absolute() {
        return Err(AppError::General(format!("path is not absolute: {path}")));
    }
    if target.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(AppError::General(format!(
            "path contains parent traversal: {path}"
        )));
    }
    Ok(target)
}

fn ensure_command_success(status: ExitStatus, label: &str) -> Result<(), AppError> {
    if status.success() {
        Ok(())
    } else {
        Err(AppError::General(format!("{label} failed with status {status}")))
    }
}

#[cfg(target_os = "macos")]
fn reveal_native(path: &Path) -> Result<(), AppError> {
    let status = Command::new("open")
        .arg("-R")
        .arg(path)
        .status()
        .map_err(|e| AppError::General(format!("failed to reveal path: {e}")))?;
    ensure_command_success(status, "open -R")
}

#[cfg(target_os = "windows")]
fn reveal_native(path: &Path) -> Result<(), AppError> {
    // explorer exits non-zero even when the window opens.
    Command::new("explorer")
        .arg(format!("/select,{}", path.display()))
        .status()
        .map_err(|e| AppError::General(format!("failed to run explorer: {e}")))?;
    Ok(())
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn reveal_native(path: &Path) -> Result<(), AppError> {
    let parent = path.parent().unwrap_or(path);
    let status = Command::new("xdg-open")
        .arg(parent)
        .status()
        .map_err(|e| AppError::General(format!("failed to run xdg-open: {e}")))?;
    ensure_command_success(status, "xdg-open")
}

#[async_trait]
impl Revealer for SystemRevealer {
    async fn reveal(&self, path: &str) -> Result<(), AppError> {
        let target = validate_reveal_target(path)?;
        if !target.exists() {
            return Err(AppError::NotFound(path.to_string()));
        }
        tokio::task::spawn_blocking(move || reveal_native(&target))
            .await
            .map_err(|e| AppError::General(format!("reveal task failed: {e}")))?
    }
}
