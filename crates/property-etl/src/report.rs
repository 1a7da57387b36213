//! JSON run report.

use crate::cleaner::TransformSummary;
use crate::error::Result;
use crate::types::LoadReport;
use chrono::Local;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything one pipeline run did, from extraction to commit.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: String,
    pub input_file: PathBuf,
    pub duration_ms: u64,
    pub transform: TransformSummary,
    pub load: LoadReport,
}

impl RunReport {
    pub fn new(
        input_file: impl Into<PathBuf>,
        duration_ms: u64,
        transform: TransformSummary,
        load: LoadReport,
    ) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.into(),
            duration_ms,
            transform,
            load,
        }
    }

    /// True only when every table loaded and every key resolved.
    pub fn is_success(&self) -> bool {
        self.load.is_success()
    }

    /// Why a run did not succeed, or `None` for a successful run.
    pub fn failure_reason(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        let reason = self
            .load
            .first_failure()
            .map(|(table, error)| format!("table '{}' failed: {}", table, error.message))
            .unwrap_or_else(|| "some rows had unresolved keys".to_string());
        Some(format!("Load did not complete ({:?}): {}", self.load.status, reason))
    }

    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(path)?;
        file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;

        info!("Report saved: {}", path.display());
        Ok(())
    }
}
