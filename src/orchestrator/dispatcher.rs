//! Thin facade routing caller operations to the execution engine.

use super::scheduler::{self, SchedulerHandle};
use crate::defaults;
use crate::engine::{EngineOutput, ExecutionEngine};
use crate::error::DispatchError;
use crate::model::{ExecutionRequest, JobListing, JobRecord, UiRequest};
use crate::normalize::Normalizer;
use std::sync::Arc;

/// Operations exposed to the GUI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Run,
    Preview,
    Schedule,
    ListJobs,
    CancelJob,
    StartScheduler,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Run => "run",
            Operation::Preview => "preview",
            Operation::Schedule => "schedule",
            Operation::ListJobs => "list_jobs",
            Operation::CancelJob => "cancel_job",
            Operation::StartScheduler => "start_scheduler",
        }
    }

    /// Message shown to the user when the operation succeeds.
    pub fn success_message(self) -> &'static str {
        match self {
            Operation::Run => "Campaign executed successfully",
            Operation::Preview => "Preview server started",
            Operation::Schedule => "Campaign scheduled successfully",
            Operation::ListJobs => "Jobs listed",
            Operation::CancelJob => "Job cancelled successfully",
            Operation::StartScheduler => "Scheduler started",
        }
    }
}

pub struct Dispatcher<E> {
    engine: Arc<E>,
    normalizer: Normalizer,
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            normalizer: self.normalizer.clone(),
        }
    }
}

impl<E: ExecutionEngine> Dispatcher<E> {
    pub fn new(engine: E, normalizer: Normalizer) -> Self {
        Self {
            engine: Arc::new(engine),
            normalizer,
        }
    }

    #[cfg(test)]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Send the campaign described by `ui`.
    pub fn run(&self, ui: &UiRequest) -> Result<EngineOutput, DispatchError> {
        self.execute_campaign(Operation::Run, ui, false)
    }

    /// Start the engine's preview server, whatever the caller's preview flag says.
    pub fn preview(&self, ui: &UiRequest) -> Result<EngineOutput, DispatchError> {
        self.execute_campaign(Operation::Preview, ui, true)
    }

    /// Hand the campaign to the engine's scheduler.
    ///
    /// The scheduling fields travel on the request; the engine decides what they mean.
    pub fn schedule(&self, ui: &UiRequest) -> Result<EngineOutput, DispatchError> {
        self.execute_campaign(Operation::Schedule, ui, false)
    }

    /// List scheduled jobs in `db_path` (blank means the default job store).
    ///
    /// Engines that print a JSON array of jobs get structured records back. Anything else is
    /// returned as a text message with an empty job list.
    pub fn list_jobs(&self, db_path: &str) -> Result<JobListing, DispatchError> {
        let request = ExecutionRequest::list_jobs(defaults::scheduler_db_or_default(db_path));
        let output = self.execute(Operation::ListJobs, &request)?;
        Ok(parse_listing(&output.stdout))
    }

    /// Cancel a previously scheduled job; this never interrupts an in-flight call.
    pub fn cancel_job(&self, job_id: &str, db_path: &str) -> Result<EngineOutput, DispatchError> {
        let db = defaults::scheduler_db_or_default(db_path);
        let request = ExecutionRequest::cancel_job(job_id, db);
        self.execute(Operation::CancelJob, &request)
    }

    /// Launch the scheduler daemon on a background task and return its handle immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_scheduler(&self, db_path: &str) -> SchedulerHandle {
        let db = defaults::scheduler_db_or_default(db_path);
        tracing::info!(
            operation = Operation::StartScheduler.as_str(),
            db = %db.display(),
            "starting scheduler"
        );
        scheduler::spawn(Arc::clone(&self.engine), db)
    }

    fn execute_campaign(
        &self,
        operation: Operation,
        ui: &UiRequest,
        force_preview: bool,
    ) -> Result<EngineOutput, DispatchError> {
        let (request, mut artifacts) = self.normalizer.normalize(ui, force_preview).map_err(|e| {
            tracing::warn!(operation = operation.as_str(), error = %e, "request rejected");
            e
        })?;
        let outcome = self.execute(operation, &request);
        if !artifacts.is_empty() {
            tracing::debug!(
                operation = operation.as_str(),
                artifacts = artifacts.len(),
                "releasing temp artifacts"
            );
        }
        artifacts.release();
        outcome
    }

    fn execute(
        &self,
        operation: Operation,
        request: &ExecutionRequest,
    ) -> Result<EngineOutput, DispatchError> {
        tracing::info!(operation = operation.as_str(), "dispatching to execution engine");
        self.engine.execute(request).map_err(|e| {
            tracing::warn!(
                operation = operation.as_str(),
                error = %e,
                "execution engine reported failure"
            );
            DispatchError::from(e)
        })
    }
}

fn parse_listing(stdout: &str) -> JobListing {
    let trimmed = stdout.trim();
    match serde_json::from_str::<Vec<JobRecord>>(trimmed) {
        Ok(jobs) => JobListing { jobs, message: None },
        Err(_) => JobListing {
            jobs: Vec::new(),
            message: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        },
    }
}
