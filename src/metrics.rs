use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    runs_completed: AtomicU64,
    chunks_windowed: AtomicU64,
    claims_extracted: AtomicU64,
    claims_verified: AtomicU64,
    extraction_failures: AtomicU64,
    verification_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed end-to-end run and its stage totals.
    pub fn record_run(
        &self,
        chunks: u64,
        claims: u64,
        verified: u64,
        extraction_failures: u64,
        verification_failures: u64,
    ) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.chunks_windowed.fetch_add(chunks, Ordering::Relaxed);
        self.claims_extracted.fetch_add(claims, Ordering::Relaxed);
        self.claims_verified.fetch_add(verified, Ordering::Relaxed);
        self.extraction_failures
            .fetch_add(extraction_failures, Ordering::Relaxed);
        self.verification_failures
            .fetch_add(verification_failures, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            chunks_windowed: self.chunks_windowed.load(Ordering::Relaxed),
            claims_extracted: self.claims_extracted.load(Ordering::Relaxed),
            claims_verified: self.claims_verified.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            verification_failures: self.verification_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of transcripts processed end-to-end since startup.
    pub runs_completed: u64,
    /// Total chunk count produced across all runs.
    pub chunks_windowed: u64,
    /// Total claims produced by extraction across all runs.
    pub claims_extracted: u64,
    /// Total claims that received a verdict (including failure markers).
    pub claims_verified: u64,
    /// Chunks whose extraction task failed.
    pub extraction_failures: u64,
    /// Claims whose verification task failed.
    pub verification_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_runs_and_stage_totals() {
        let metrics = PipelineMetrics::new();
        metrics.record_run(4, 9, 9, 0, 1);
        metrics.record_run(2, 3, 3, 1, 0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.runs_completed, 2);
        assert_eq!(snapshot.chunks_windowed, 6);
        assert_eq!(snapshot.claims_extracted, 12);
        assert_eq!(snapshot.claims_verified, 12);
        assert_eq!(snapshot.extraction_failures, 1);
        assert_eq!(snapshot.verification_failures, 1);
    }

    #[test]
    fn snapshot_starts_at_zero() {
        let metrics = PipelineMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.runs_completed, 0);
        assert_eq!(snapshot.claims_extracted, 0);
    }
}
