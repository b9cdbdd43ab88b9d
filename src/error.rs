//! Error taxonomy for normalization, engine execution and dispatch.

use crate::artifacts::ArtifactKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while turning a `UiRequest` into an `ExecutionRequest`.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// No SMTP config path was supplied.
    #[error("SMTP config path is required")]
    ConfigMissing,
    /// The SMTP config path does not resolve on disk.
    #[error("SMTP config not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },
    /// Creating or writing a temporary artifact failed.
    #[error("failed to write temporary {kind}")]
    TempWriteFailed {
        kind: ArtifactKind,
        #[source]
        source: io::Error,
    },
}

/// Failures reported by the execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch {}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for {}", program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The engine ran and reported a failure; `message` is its own output.
    #[error("{message}")]
    Failed { message: String },
    #[error("execution cancelled")]
    Cancelled,
}

/// Errors surfaced by the dispatcher to its caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("scheduler task did not complete")]
    SchedulerJoin(#[from] tokio::task::JoinError),
}

impl DispatchError {
    /// Stable machine-readable code for the GUI.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Normalize(NormalizeError::ConfigMissing) => "config_missing",
            DispatchError::Normalize(NormalizeError::ConfigNotFound { .. }) => "config_not_found",
            DispatchError::Normalize(NormalizeError::TempWriteFailed { .. }) => "temp_write_failed",
            DispatchError::Engine(_) => "execution_engine_error",
            DispatchError::SchedulerJoin(_) => "scheduler_join",
        }
    }
}
