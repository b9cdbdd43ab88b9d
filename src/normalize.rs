//! Translation of GUI requests into engine requests.
//!
//! Validation runs before anything touches the temp directory, so a rejected request never
//! leaves files behind. Artifacts created before a later step fails are dropped with the
//! `TempArtifacts` guard on the error path.

use crate::artifacts::{ArtifactKind, TempArtifacts};
use crate::defaults;
use crate::error::NormalizeError;
use crate::model::{ExecutionRequest, UiRequest};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Normalizer {
    temp_dir: PathBuf,
    #[cfg(test)]
    fail_kind: Option<ArtifactKind>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl Normalizer {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            #[cfg(test)]
            fail_kind: None,
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Resolve `ui` into an `ExecutionRequest` plus the temp files backing it.
    ///
    /// `force_preview` is OR-ed with the caller's own preview flag.
    pub fn normalize(
        &self,
        ui: &UiRequest,
        force_preview: bool,
    ) -> Result<(ExecutionRequest, TempArtifacts), NormalizeError> {
        let env_path = validate_env_path(&ui.env_path)?;
        let mut artifacts = TempArtifacts::new();

        let template_path = if !ui.template_html.trim().is_empty() {
            Some(self.write_artifact(&mut artifacts, ArtifactKind::Template, &ui.template_html)?)
        } else {
            non_blank_path(&ui.template_path)
        };

        // An explicit CSV path always wins over inline content.
        let csv_path = match non_blank_path(&ui.csv_path) {
            Some(path) => Some(path),
            None if !ui.csv_content.trim().is_empty() => Some(self.write_artifact(
                &mut artifacts,
                ArtifactKind::Recipients,
                &ui.csv_content,
            )?),
            None => None,
        };

        let attachments = normalize_attachments(&ui.attachments);

        tracing::debug!(
            template_inline = !ui.template_html.trim().is_empty(),
            csv_inline = ui.csv_path.trim().is_empty() && !ui.csv_content.trim().is_empty(),
            attachments = attachments.len(),
            artifacts = artifacts.len(),
            "normalized campaign request"
        );

        let request = ExecutionRequest {
            env_path: Some(env_path),
            csv_path,
            template_path,
            sheet_url: ui.sheet_url.clone(),
            subject: ui.subject.clone(),
            text: ui.text.clone(),
            to: ui.to.clone(),
            cc: ui.cc.clone(),
            bcc: ui.bcc.clone(),
            attachments,
            filter: ui.filter.clone(),
            dry_run: ui.dry_run,
            show_preview: force_preview || ui.show_preview,
            preview_port: defaults::positive_or(ui.preview_port, defaults::PREVIEW_PORT),
            concurrency: defaults::positive_or(ui.concurrency, defaults::CONCURRENCY),
            retry_limit: defaults::positive_or(ui.retry_limit, defaults::RETRY_LIMIT),
            batch_size: defaults::positive_or(ui.batch_size, defaults::BATCH_SIZE),
            schedule_at: ui.schedule_at.clone(),
            interval: ui.interval.clone(),
            cron: ui.cron.clone(),
            job_retries: defaults::positive_or(ui.job_retries, defaults::JOB_RETRIES),
            job_backoff: defaults::non_blank_or(&ui.job_backoff, defaults::JOB_BACKOFF),
            scheduler_db: defaults::scheduler_db_or_default(&ui.scheduler_db),
            list_jobs: false,
            cancel_job_id: None,
            scheduler_run: false,
        };

        Ok((request, artifacts))
    }

    fn write_artifact(
        &self,
        artifacts: &mut TempArtifacts,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<PathBuf, NormalizeError> {
        #[cfg(test)]
        let written = match self.fail_kind {
            Some(failing) if failing == kind => {
                Err(std::io::Error::other("no space left on device"))
            }
            _ => artifacts.materialize(&self.temp_dir, kind, content),
        };
        #[cfg(not(test))]
        let written = artifacts.materialize(&self.temp_dir, kind, content);

        written.map_err(|source| {
            tracing::warn!(kind = %kind, error = %source, "temp artifact write failed");
            NormalizeError::TempWriteFailed { kind, source }
        })
    }
}

fn validate_env_path(raw: &str) -> Result<PathBuf, NormalizeError> {
    if raw.trim().is_empty() {
        return Err(NormalizeError::ConfigMissing);
    }
    let path = PathBuf::from(raw);
    if std::fs::metadata(&path).is_err() {
        return Err(NormalizeError::ConfigNotFound { path });
    }
    Ok(path)
}

fn non_blank_path(raw: &str) -> Option<PathBuf> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(raw))
    }
}

/// Drop blanks, make relative entries absolute (best-effort) and dedupe in first-seen order.
///
/// Absolute entries are kept byte-for-byte. Dedupe compares the resulting strings, so
/// `/a//b` and `/a/b` stay distinct.
fn normalize_attachments(raw: &[String]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in raw {
        if entry.trim().is_empty() {
            continue;
        }
        let path = Path::new(entry);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::path::absolute(path)
                .map(|abs| clean_path(&abs))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        if seen.insert(resolved.as_os_str().to_os_string()) {
            out.push(resolved);
        }
    }
    out
}

/// Lexically fold `.` and `..` out of `path`.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let _ = out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
