//! In-memory engine used by dispatcher and scheduler tests.

use super::{EngineOutput, ExecutionEngine};
use crate::error::EngineError;
use crate::model::ExecutionRequest;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// A request as seen by the engine, with its file-backed sources read at execute time.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub request: ExecutionRequest,
    pub template: Option<String>,
    pub csv: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingEngine {
    calls: Mutex<Vec<Recorded>>,
    failure: Option<String>,
    stdout: String,
    block_until_cancelled: bool,
}

impl RecordingEngine {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn printing(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            ..Default::default()
        }
    }

    /// Engine whose cancellable runs only return once the cancel flag is raised.
    pub fn blocking() -> Self {
        Self {
            block_until_cancelled: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, request: &ExecutionRequest) {
        let read = |p: &Option<std::path::PathBuf>| {
            p.as_ref().and_then(|p| fs::read_to_string(p).ok())
        };
        let recorded = Recorded {
            request: request.clone(),
            template: read(&request.template_path),
            csv: read(&request.csv_path),
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(recorded);
        }
    }
}

impl ExecutionEngine for RecordingEngine {
    fn execute(&self, request: &ExecutionRequest) -> Result<EngineOutput, EngineError> {
        self.record(request);
        match &self.failure {
            Some(message) => Err(EngineError::Failed {
                message: message.clone(),
            }),
            None => Ok(EngineOutput {
                stdout: self.stdout.clone(),
            }),
        }
    }

    fn execute_cancellable(
        &self,
        request: &ExecutionRequest,
        cancel: &AtomicBool,
    ) -> Result<EngineOutput, EngineError> {
        if !self.block_until_cancelled {
            return self.execute(request);
        }
        self.record(request);
        while !cancel.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(5));
        }
        Err(EngineError::Cancelled)
    }
}
