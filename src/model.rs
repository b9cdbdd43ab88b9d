use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Campaign description as submitted by the GUI.
///
/// Field names follow the front end's lowerCamelCase payload. Every field may be omitted;
/// numeric fields treat both a missing value and `0` as "use the default".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiRequest {
    pub env_path: String,
    pub csv_path: String,
    pub csv_content: String,
    pub sheet_url: String,
    pub template_path: String,
    #[serde(rename = "templateHTML")]
    pub template_html: String,
    pub subject: String,
    pub text: String,
    pub attachments: Vec<String>,
    pub cc: String,
    pub bcc: String,
    pub to: String,
    pub concurrency: Option<u32>,
    pub retry_limit: Option<u32>,
    pub batch_size: Option<u32>,
    pub filter: String,
    pub dry_run: bool,
    pub show_preview: bool,
    pub preview_port: Option<u16>,

    // Scheduling
    pub schedule_at: String,
    pub interval: String,
    pub cron: String,
    pub job_retries: Option<u32>,
    pub job_backoff: String,
    #[serde(rename = "schedulerDB")]
    pub scheduler_db: String,
}

/// Fully resolved request handed to the execution engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub env_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
    pub template_path: Option<PathBuf>,
    pub sheet_url: String,
    pub subject: String,
    pub text: String,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub attachments: Vec<PathBuf>,
    pub filter: String,
    pub dry_run: bool,
    pub show_preview: bool,
    pub preview_port: u16,
    pub concurrency: u32,
    pub retry_limit: u32,
    pub batch_size: u32,

    pub schedule_at: String,
    pub interval: String,
    pub cron: String,
    pub job_retries: u32,
    pub job_backoff: String,
    pub scheduler_db: PathBuf,

    // Mode flags
    pub list_jobs: bool,
    pub cancel_job_id: Option<String>,
    pub scheduler_run: bool,
}

impl ExecutionRequest {
    /// Minimal request asking the engine to list scheduled jobs.
    pub fn list_jobs(scheduler_db: PathBuf) -> Self {
        Self {
            list_jobs: true,
            scheduler_db,
            ..Default::default()
        }
    }

    /// Minimal request asking the engine to cancel a scheduled job.
    pub fn cancel_job(job_id: impl Into<String>, scheduler_db: PathBuf) -> Self {
        Self {
            cancel_job_id: Some(job_id.into()),
            scheduler_db,
            ..Default::default()
        }
    }

    /// Minimal request that runs the scheduler daemon against `scheduler_db`.
    pub fn scheduler_run(scheduler_db: PathBuf) -> Self {
        Self {
            scheduler_run: true,
            scheduler_db,
            ..Default::default()
        }
    }
}

/// A scheduled job as reported by the engine's job store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

/// Uniform result shape returned to the GUI for every operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error code, see `DispatchError::kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JobRecord>>,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: &crate::error::DispatchError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            kind: Some(error.kind().to_string()),
            ..Default::default()
        }
    }

    /// Map a dispatcher outcome onto the uniform shape, using `message` on success.
    pub fn from_outcome<T>(
        outcome: Result<T, crate::error::DispatchError>,
        message: &str,
    ) -> Self {
        match outcome {
            Ok(_) => Self::ok(message),
            Err(e) => Self::failed(&e),
        }
    }

    /// Job listings always carry a `jobs` array, empty on failure.
    pub fn from_listing(outcome: Result<JobListing, crate::error::DispatchError>) -> Self {
        match outcome {
            Ok(listing) => Self {
                success: true,
                message: listing.message,
                jobs: Some(listing.jobs),
                ..Default::default()
            },
            Err(e) => Self {
                jobs: Some(Vec::new()),
                ..Self::failed(&e)
            },
        }
    }
}

/// Result of a job listing: structured records when the engine emits them, raw text otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobListing {
    pub jobs: Vec<JobRecord>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_request_accepts_gui_payload() {
        let payload = serde_json::json!({
            "envPath": "/tmp/smtp.json",
            "templateHTML": "<p>Hi</p>",
            "csvContent": "email\na@b.com",
            "attachments": ["a.pdf"],
            "concurrency": 0,
            "previewPort": 9000,
            "schedulerDB": "jobs.db",
            "showPreview": true
        });
        let req: UiRequest = serde_json::from_value(payload).unwrap();
        assert_eq!(req.env_path, "/tmp/smtp.json");
        assert_eq!(req.template_html, "<p>Hi</p>");
        assert_eq!(req.csv_content, "email\na@b.com");
        assert_eq!(req.concurrency, Some(0));
        assert_eq!(req.preview_port, Some(9000));
        assert_eq!(req.scheduler_db, "jobs.db");
        assert!(req.show_preview);
        assert!(req.retry_limit.is_none());
        assert!(req.subject.is_empty());
    }

    #[test]
    fn operation_result_omits_absent_fields() {
        let value = serde_json::to_value(OperationResult::ok("done")).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "message": "done"}));
    }

    #[test]
    fn job_record_tolerates_sparse_rows() {
        let raw = r#"[{"id":"j1","status":"pending","runAt":"2026-01-01T00:00:00Z"}]"#;
        let rows: Vec<JobRecord> = serde_json::from_str(raw).unwrap();
        assert_eq!(rows[0].id, "j1");
        assert_eq!(rows[0].run_at.as_deref(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(rows[0].attempts, 0);
        assert!(rows[0].cron_expr.is_none());
    }
}
