//! Execution engine backed by the external `mailgrid` executable.
//!
//! Each `ExecutionRequest` field maps onto one command-line flag. The child's stdout is returned
//! to the caller. When the child fails, its stderr becomes the error message unchanged.

use super::{EngineOutput, ExecutionEngine};
use crate::error::EngineError;
use crate::model::ExecutionRequest;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often a cancellable run checks its cancel flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: PathBuf,
    poll_interval: Duration,
}

impl ProcessEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn spawn(&self, request: &ExecutionRequest) -> Result<Child, EngineError> {
        let args = command_args(request);
        tracing::info!(
            program = %self.program.display(),
            args = args.len(),
            list_jobs = request.list_jobs,
            scheduler_run = request.scheduler_run,
            "launching execution engine"
        );
        Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Launch {
                program: self.program.clone(),
                source,
            })
    }

    fn run(
        &self,
        request: &ExecutionRequest,
        cancel: Option<&AtomicBool>,
    ) -> Result<EngineOutput, EngineError> {
        let mut child = self.spawn(request)?;
        // Drain both pipes off-thread so a chatty child never blocks on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let waited = match cancel {
            Some(flag) => self.wait_cancellable(&mut child, flag),
            None => child.wait().map(Some),
        };
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        let status = match waited {
            Ok(Some(status)) => status,
            Ok(None) => {
                tracing::info!(program = %self.program.display(), "execution engine cancelled");
                return Err(EngineError::Cancelled);
            }
            Err(source) => {
                return Err(EngineError::Wait {
                    program: self.program.clone(),
                    source,
                })
            }
        };

        if status.success() {
            tracing::debug!(program = %self.program.display(), "execution engine finished");
            return Ok(EngineOutput { stdout });
        }

        let message = failure_message(&self.program, status, &stderr);
        tracing::warn!(
            program = %self.program.display(),
            status = %status,
            "execution engine failed"
        );
        Err(EngineError::Failed { message })
    }

    /// Poll the child until it exits; `Ok(None)` means it was killed after a cancel.
    fn wait_cancellable(
        &self,
        child: &mut Child,
        cancel: &AtomicBool,
    ) -> std::io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if cancel.load(Ordering::Relaxed) {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl ExecutionEngine for ProcessEngine {
    fn execute(&self, request: &ExecutionRequest) -> Result<EngineOutput, EngineError> {
        self.run(request, None)
    }

    fn execute_cancellable(
        &self,
        request: &ExecutionRequest,
        cancel: &AtomicBool,
    ) -> Result<EngineOutput, EngineError> {
        self.run(request, Some(cancel))
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn failure_message(program: &Path, status: ExitStatus, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{} exited with {}", program.display(), status)
    } else {
        stderr.to_string()
    }
}

/// Translate a request into the engine's command-line flags.
pub(crate) fn command_args(req: &ExecutionRequest) -> Vec<OsString> {
    let mut args = CommandArgs::default();

    if req.list_jobs {
        args.flag("--jobs-list");
    }
    if let Some(id) = req.cancel_job_id.as_deref() {
        args.value("--jobs-cancel", id);
    }
    if req.scheduler_run {
        args.flag("--scheduler-run");
    }
    args.value("--scheduler-db", &req.scheduler_db);
    if req.list_jobs || req.cancel_job_id.is_some() || req.scheduler_run {
        return args.0;
    }

    if let Some(env) = req.env_path.as_deref() {
        args.value("--env", env);
    }
    if let Some(csv) = req.csv_path.as_deref() {
        args.value("--csv", csv);
    }
    if let Some(template) = req.template_path.as_deref() {
        args.value("--template", template);
    }
    args.non_empty("--sheet-url", &req.sheet_url);
    args.non_empty("--subject", &req.subject);
    args.non_empty("--text", &req.text);
    args.non_empty("--to", &req.to);
    args.non_empty("--cc", &req.cc);
    args.non_empty("--bcc", &req.bcc);
    for attachment in &req.attachments {
        args.value("--attach", attachment);
    }
    args.non_empty("--filter", &req.filter);
    if req.dry_run {
        args.flag("--dry-run");
    }
    if req.show_preview {
        args.flag("--preview");
    }
    args.value("--port", req.preview_port.to_string());
    args.value("--concurrency", req.concurrency.to_string());
    args.value("--retries", req.retry_limit.to_string());
    args.value("--batch-size", req.batch_size.to_string());

    args.non_empty("--schedule-at", &req.schedule_at);
    args.non_empty("--interval", &req.interval);
    args.non_empty("--cron", &req.cron);
    args.value("--job-retries", req.job_retries.to_string());
    args.value("--job-backoff", &req.job_backoff);

    args.0
}

#[derive(Default)]
struct CommandArgs(Vec<OsString>);

impl CommandArgs {
    fn flag(&mut self, name: &str) {
        self.0.push(name.into());
    }

    fn value(&mut self, name: &str, value: impl Into<OsString>) {
        self.0.push(name.into());
        self.0.push(value.into());
    }

    fn non_empty(&mut self, name: &str, value: &str) {
        if !value.trim().is_empty() {
            self.value(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn campaign() -> ExecutionRequest {
        ExecutionRequest {
            env_path: Some(PathBuf::from("/etc/mailgrid/smtp.json")),
            csv_path: Some(PathBuf::from("/tmp/mailgrid-ui-1.csv")),
            template_path: Some(PathBuf::from("/tmp/mailgrid-ui-2.html")),
            subject: "Hello".into(),
            attachments: vec![PathBuf::from("/a.pdf"), PathBuf::from("/b.png")],
            show_preview: true,
            preview_port: 8080,
            concurrency: 1,
            retry_limit: 1,
            batch_size: 1,
            job_retries: 3,
            job_backoff: "2s".into(),
            scheduler_db: PathBuf::from("mailgrid.db"),
            ..Default::default()
        }
    }

    #[test]
    fn campaign_fields_map_to_flags() {
        let args = strings(command_args(&campaign()));
        assert_eq!(
            args,
            vec![
                "--scheduler-db", "mailgrid.db",
                "--env", "/etc/mailgrid/smtp.json",
                "--csv", "/tmp/mailgrid-ui-1.csv",
                "--template", "/tmp/mailgrid-ui-2.html",
                "--subject", "Hello",
                "--attach", "/a.pdf",
                "--attach", "/b.png",
                "--preview",
                "--port", "8080",
                "--concurrency", "1",
                "--retries", "1",
                "--batch-size", "1",
                "--job-retries", "3",
                "--job-backoff", "2s",
            ]
        );
    }

    #[test]
    fn scheduling_fields_are_forwarded_when_set() {
        let req = ExecutionRequest {
            cron: "0 9 * * 1".into(),
            interval: "1h".into(),
            schedule_at: "2026-11-01T09:00:00Z".into(),
            dry_run: true,
            ..campaign()
        };
        let args = strings(command_args(&req));
        assert!(args.windows(2).any(|w| w == ["--cron", "0 9 * * 1"]));
        assert!(args.windows(2).any(|w| w == ["--interval", "1h"]));
        assert!(args.windows(2).any(|w| w == ["--schedule-at", "2026-11-01T09:00:00Z"]));
        assert!(args.iter().any(|a| a == "--dry-run"));
    }

    #[test]
    fn job_management_requests_are_minimal() {
        let list = strings(command_args(&ExecutionRequest::list_jobs("jobs.db".into())));
        assert_eq!(list, vec!["--jobs-list", "--scheduler-db", "jobs.db"]);

        let cancel = ExecutionRequest::cancel_job("j-42", "mailgrid.db".into());
        let cancel = strings(command_args(&cancel));
        assert_eq!(cancel, vec!["--jobs-cancel", "j-42", "--scheduler-db", "mailgrid.db"]);

        let daemon = strings(command_args(&ExecutionRequest::scheduler_run("mailgrid.db".into())));
        assert_eq!(daemon, vec!["--scheduler-run", "--scheduler-db", "mailgrid.db"]);
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let engine = ProcessEngine::new("/definitely/not/mailgrid");
        let res = engine.execute(&campaign());
        assert_matches!(res, Err(EngineError::Launch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        let engine = ProcessEngine::new("true");
        let out = engine.execute(&campaign()).unwrap();
        assert!(out.stdout.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_reports_status_when_stderr_is_empty() {
        let engine = ProcessEngine::new("false").with_poll_interval(Duration::from_millis(5));
        let cancel = AtomicBool::new(false);
        let res = engine.execute_cancellable(&campaign(), &cancel);
        assert_matches!(
            res,
            Err(EngineError::Failed { message }) if message.starts_with("false exited with")
        );
    }

    #[test]
    fn stderr_is_preferred_for_failure_messages() {
        #[cfg(unix)]
        let status = {
            use std::os::unix::process::ExitStatusExt;
            ExitStatus::from_raw(1 << 8)
        };
        #[cfg(windows)]
        let status = {
            use std::os::windows::process::ExitStatusExt;
            ExitStatus::from_raw(1)
        };
        let message = failure_message(Path::new("mailgrid"), status, "  smtp: dial tcp: refused\n");
        assert_eq!(message, "smtp: dial tcp: refused");
    }
}
