use thiserror::Error;

use crate::config::settings::SettingsError;
use crate::config::source_registry::RegistryError;

/// Failures surfaced to callers of manual orchestrator operations.
///
/// Scheduled polling never returns these; it records per-source outcomes in
/// the cycle report and carries on.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("no source named '{0}'")]
    UnknownSource(String),
    #[error("source '{0}' is unreachable")]
    SourceUnreachable(String),
    #[error("capture from '{source_name}' failed: {reason}")]
    CaptureFailed { source_name: String, reason: String },
    #[error("failed to save frame from '{source_name}': {reason}")]
    Persist { source_name: String, reason: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("monitor loop is not running")]
    LoopClosed,
    #[error("monitor loop thread panicked")]
    LoopPanicked,
}
