//! Scheduler daemon lifecycle.
//!
//! The daemon runs on a blocking task. Its handle goes back to the caller, who can watch its
//! events, stop it, or await its outcome. Dropping the handle does not stop the daemon.

use crate::engine::ExecutionEngine;
use crate::error::{DispatchError, EngineError};
use crate::model::ExecutionRequest;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// Lifecycle notifications emitted by a running scheduler daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    Started { db: PathBuf },
    /// The engine returned on its own.
    Exited,
    /// The engine stopped after `SchedulerHandle::stop`.
    Stopped,
    Failed { error: String },
}

impl SchedulerEvent {
    /// Render a human-readable line for terminal output.
    pub fn to_message(&self) -> String {
        match self {
            SchedulerEvent::Started { db } => format!("Scheduler started (db: {})", db.display()),
            SchedulerEvent::Exited => "Scheduler exited".to_string(),
            SchedulerEvent::Stopped => "Scheduler stopped".to_string(),
            SchedulerEvent::Failed { error } => format!("Scheduler failed: {error}"),
        }
    }
}

/// Handle to a scheduler daemon started by `Dispatcher::start_scheduler`.
pub struct SchedulerHandle {
    cancel: Arc<AtomicBool>,
    events: UnboundedReceiver<SchedulerEvent>,
    handle: JoinHandle<Result<(), DispatchError>>,
}

pub(super) fn spawn<E: ExecutionEngine>(engine: Arc<E>, db: PathBuf) -> SchedulerHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let (event_tx, events) = mpsc::unbounded_channel::<SchedulerEvent>();
    let cancel2 = cancel.clone();

    let handle = tokio::task::spawn_blocking(move || {
        let request = ExecutionRequest::scheduler_run(db.clone());
        let _ = event_tx.send(SchedulerEvent::Started { db });

        match engine.execute_cancellable(&request, &cancel2) {
            Ok(_) => {
                tracing::info!("scheduler exited");
                let _ = event_tx.send(SchedulerEvent::Exited);
                Ok(())
            }
            Err(EngineError::Cancelled) => {
                tracing::info!("scheduler stopped");
                let _ = event_tx.send(SchedulerEvent::Stopped);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "scheduler failed");
                let _ = event_tx.send(SchedulerEvent::Failed {
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    });

    SchedulerHandle {
        cancel,
        events,
        handle,
    }
}

impl SchedulerHandle {
    /// Ask the daemon to stop. Returns immediately; await `wait` for the outcome.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Next lifecycle event, or `None` once the daemon task is gone.
    pub async fn next_event(&mut self) -> Option<SchedulerEvent> {
        self.events.recv().await
    }

    /// Wait for the daemon to finish and return its outcome.
    pub async fn wait(self) -> Result<(), DispatchError> {
        self.handle.await?
    }
}
