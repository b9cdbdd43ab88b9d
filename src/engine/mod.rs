//! Seam to the campaign execution engine.
//!
//! The engine sends, previews, schedules, lists and cancels campaigns. This crate only ever
//! talks to it through `ExecutionEngine::execute`.

mod process;
#[cfg(test)]
pub(crate) mod testing;

pub use process::ProcessEngine;

use crate::error::EngineError;
use crate::model::ExecutionRequest;
use std::sync::atomic::AtomicBool;

/// What the engine printed while handling a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub stdout: String,
}

pub trait ExecutionEngine: Send + Sync + 'static {
    /// Handle `request` synchronously, returning once the engine is done with it.
    fn execute(&self, request: &ExecutionRequest) -> Result<EngineOutput, EngineError>;

    /// Like `execute`, but long-running modes should give up once `cancel` is set.
    ///
    /// Engines that cannot be interrupted keep the default, which ignores the flag.
    fn execute_cancellable(
        &self,
        request: &ExecutionRequest,
        cancel: &AtomicBool,
    ) -> Result<EngineOutput, EngineError> {
        let _ = cancel;
        self.execute(request)
    }
}
