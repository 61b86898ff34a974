//! JSON persistence for completed pipeline runs.

use super::types::BatchResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Errors raised while writing a run report to disk.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Report could not be serialized to JSON.
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Report file could not be created or written.
    #[error("Failed to write report file: {0}")]
    Io(#[from] std::io::Error),
}

/// Snapshot of one pipeline run, written as a single JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run.
    pub run_id: String,
    /// RFC 3339 timestamp taken when the report was assembled.
    pub generated_at: String,
    /// Identifier of the transcript source that was processed.
    pub source_id: String,
    /// Number of verified claims in the batch.
    pub total_claims: usize,
    /// Full batch output, claims ordered by chunk then extraction order.
    pub batch: BatchResult,
}

impl RunReport {
    /// Assemble a report for a finished batch.
    pub fn new(source_id: impl Into<String>, batch: BatchResult) -> Self {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            run_id: Uuid::new_v4().to_string(),
            generated_at,
            source_id: source_id.into(),
            total_claims: batch.claims.len(),
            batch,
        }
    }

    /// Write the report as pretty-printed JSON to the given path.
    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), claims = self.total_claims, "Report written");
        Ok(())
    }
}
