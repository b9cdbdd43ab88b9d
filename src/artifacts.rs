//! Temporary on-disk artifacts created for one normalization call.
//!
//! The engine only accepts file paths, so inline template HTML and CSV text get written to
//! uniquely named temp files. `TempArtifacts` owns those files and removes them on `release` or
//! on drop, whichever comes first.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Name prefix for every materialized file, so stray artifacts are recognizable.
pub const ARTIFACT_PREFIX: &str = "mailgrid-ui-";

/// What a temporary artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Template,
    Recipients,
}

impl ArtifactKind {
    fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Template => ".html",
            ArtifactKind::Recipients => ".csv",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Template => f.write_str("template"),
            ArtifactKind::Recipients => f.write_str("CSV"),
        }
    }
}

/// Per-call set of temporary files, released exactly once.
#[derive(Debug, Default)]
pub struct TempArtifacts {
    paths: Vec<TempPath>,
}

impl TempArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `content` to a fresh temp file under `dir` and take ownership of it.
    ///
    /// A file that was created but could not be fully written is removed before the error
    /// is returned.
    pub fn materialize(
        &mut self,
        dir: &Path,
        kind: ArtifactKind,
        content: &str,
    ) -> io::Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(kind.suffix())
            .tempfile_in(dir)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        let temp_path = file.into_temp_path();
        let path = temp_path.to_path_buf();
        tracing::debug!(
            kind = %kind,
            path = %path.display(),
            bytes = content.len(),
            "materialized temp artifact"
        );
        self.paths.push(temp_path);
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Delete every artifact best-effort. Safe to call more than once.
    pub fn release(&mut self) {
        for temp_path in self.paths.drain(..) {
            let path = temp_path.to_path_buf();
            // Losing an ephemeral file is never an error for the caller.
            if let Err(e) = temp_path.close() {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove temp artifact"
                );
            }
        }
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        self.release();
    }
}
