//! Two-stage claim pipeline: windowing, extraction fan-out, verification fan-out.

use crate::{
    agents::{ClaimExtractor, ClaimVerifier, ExtractionError},
    config::Config,
    metrics::{MetricsSnapshot, PipelineMetrics},
    pipeline::{
        fanout::BoundedFanOut,
        types::{BatchResult, Claim, PipelineError, TranscriptFragment, VerdictOutcome, VerifiedClaim},
        windowing,
    },
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Tunables for one pipeline instance.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Target duration of a transcript window in seconds.
    pub target_span_s: f64,
    /// Maximum number of concurrent extraction tasks.
    pub extract_concurrency: usize,
    /// Maximum number of concurrent verification tasks.
    pub verify_concurrency: usize,
    /// Optional wall-clock budget applied to each extraction/verification task.
    pub task_timeout: Option<Duration>,
}

impl PipelineOptions {
    /// Derive options from the loaded server configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_span_s: config.chunk_span_seconds,
            extract_concurrency: config.extract_concurrency,
            verify_concurrency: config.verify_concurrency,
            task_timeout: config.task_timeout_seconds.map(Duration::from_secs),
        }
    }
}

/// Coordinates the full pipeline: windowing, claim extraction, and claim verification.
///
/// The orchestrator owns long-lived handles to the extraction and verification
/// collaborators plus a metrics registry, so the HTTP surface and the CLI share
/// the same components. Construct it once near process start and share it
/// through an `Arc`. There is no mutable state between runs; concurrent calls
/// to [`PipelineOrchestrator::process`] for different transcripts are safe.
pub struct PipelineOrchestrator {
    extractor: Arc<dyn ClaimExtractor>,
    verifier: Arc<dyn ClaimVerifier>,
    options: PipelineOptions,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Window the fragment stream, extract claims, and verify them.
    async fn process(
        &self,
        fragments: Vec<TranscriptFragment>,
    ) -> Result<BatchResult, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl PipelineOrchestrator {
    /// Build a new orchestrator around the given collaborators.
    pub fn new(
        extractor: Arc<dyn ClaimExtractor>,
        verifier: Arc<dyn ClaimVerifier>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            extractor,
            verifier,
            options,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Process a transcript end-to-end: window, extract, verify, aggregate.
    ///
    /// Bad configuration or an unusable fragment stream aborts immediately with
    /// no partial result. Per-chunk extraction failures and per-claim
    /// verification failures never abort the run; they surface as counters on
    /// the returned [`BatchResult`] (failed verifications keep their claim and
    /// carry a [`VerdictOutcome::Failed`] marker).
    pub async fn process(
        &self,
        fragments: Vec<TranscriptFragment>,
    ) -> Result<BatchResult, PipelineError> {
        let options = self.options;
        // Both bounds are checked before any task is scheduled.
        let extract_fanout = BoundedFanOut::new(options.extract_concurrency)
            .map_err(|_| PipelineError::InvalidConcurrency { stage: "extraction" })?
            .with_timeout(options.task_timeout);
        let verify_fanout = BoundedFanOut::new(options.verify_concurrency)
            .map_err(|_| PipelineError::InvalidConcurrency {
                stage: "verification",
            })?
            .with_timeout(options.task_timeout);

        tracing::info!(fragments = fragments.len(), "Processing transcript");
        let chunks = windowing::window(&fragments, options.target_span_s)?;
        if chunks.is_empty() {
            tracing::info!("Transcript produced no chunks; nothing to schedule");
            self.metrics.record_run(0, 0, 0, 0, 0);
            return Ok(BatchResult::empty());
        }
        tracing::debug!(
            chunks = chunks.len(),
            target_span_s = options.target_span_s,
            "Windowed transcript"
        );

        // Stage A: claim extraction, one task per chunk.
        let extractor = Arc::clone(&self.extractor);
        let extraction_results = extract_fanout
            .run(chunks.clone(), move |_, chunk| {
                let extractor = Arc::clone(&extractor);
                async move {
                    let mut claims = extractor.extract(&chunk).await?;
                    for claim in &mut claims {
                        if claim.has_sentinel_timing() {
                            // Data repair, not validation: unknown timing is
                            // replaced with the owning chunk's bounds.
                            claim.start_s = chunk.start_s;
                            claim.end_s = chunk.end_s;
                        }
                        claim.chunk_id = chunk.id;
                    }
                    Ok::<_, ExtractionError>(claims)
                }
            })
            .await;

        let mut claims_per_chunk: BTreeMap<usize, usize> = BTreeMap::new();
        let mut extraction_failures = 0usize;
        let mut all_claims: Vec<Claim> = Vec::new();
        for (chunk, result) in chunks.iter().zip(extraction_results) {
            match result {
                Ok(claims) => {
                    tracing::debug!(chunk_id = chunk.id, claims = claims.len(), "Chunk extracted");
                    claims_per_chunk.insert(chunk.id, claims.len());
                    all_claims.extend(claims);
                }
                Err(error) => {
                    tracing::warn!(chunk_id = chunk.id, error = %error, "Chunk extraction failed");
                    claims_per_chunk.insert(chunk.id, 0);
                    extraction_failures += 1;
                }
            }
        }
        tracing::info!(
            claims = all_claims.len(),
            chunks = chunks.len(),
            extraction_failures,
            "Extraction stage complete"
        );

        if all_claims.is_empty() {
            self.metrics
                .record_run(chunks.len() as u64, 0, 0, extraction_failures as u64, 0);
            return Ok(BatchResult {
                claims: Vec::new(),
                claims_per_chunk,
                extraction_failures,
                verification_failures: 0,
            });
        }

        // Stage B: verification, one task per claim. Verifier errors are folded
        // into the outcome inside the task so the claim itself is never lost.
        let verifier = Arc::clone(&self.verifier);
        let verification_results = verify_fanout
            .run(all_claims.clone(), move |_, claim| {
                let verifier = Arc::clone(&verifier);
                async move {
                    let started = Instant::now();
                    let verdict = match verifier.verify(&claim.text).await {
                        Ok(result) => VerdictOutcome::Verdict(result),
                        Err(error) => VerdictOutcome::Failed {
                            error: error.to_string(),
                        },
                    };
                    let elapsed_s = started.elapsed().as_secs_f64();
                    let chunk_id = claim.chunk_id;
                    Ok::<_, Infallible>(VerifiedClaim {
                        claim,
                        verdict,
                        elapsed_s,
                        chunk_id,
                    })
                }
            })
            .await;

        let mut verified_claims = Vec::with_capacity(all_claims.len());
        let mut verification_failures = 0usize;
        for (claim, result) in all_claims.into_iter().zip(verification_results) {
            let verified = match result {
                Ok(verified) => verified,
                // Timed-out or panicked verification task: keep the claim with
                // a failure marker, same as an in-task verifier error.
                Err(error) => {
                    let elapsed_s = options
                        .task_timeout
                        .map(|limit| limit.as_secs_f64())
                        .unwrap_or(0.0);
                    let chunk_id = claim.chunk_id;
                    VerifiedClaim {
                        claim,
                        verdict: VerdictOutcome::Failed {
                            error: error.to_string(),
                        },
                        elapsed_s,
                        chunk_id,
                    }
                }
            };
            if matches!(verified.verdict, VerdictOutcome::Failed { .. }) {
                verification_failures += 1;
            }
            verified_claims.push(verified);
        }

        let batch = BatchResult {
            claims: verified_claims,
            claims_per_chunk,
            extraction_failures,
            verification_failures,
        };

        self.metrics.record_run(
            chunks.len() as u64,
            batch.claims.len() as u64,
            batch.claims.len() as u64,
            extraction_failures as u64,
            verification_failures as u64,
        );
        tracing::info!(
            claims = batch.claims.len(),
            extraction_failures,
            verification_failures,
            average_verification_s = ?batch.average_verification_seconds(),
            "Pipeline run complete"
        );
        Ok(batch)
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl PipelineApi for PipelineOrchestrator {
    async fn process(
        &self,
        fragments: Vec<TranscriptFragment>,
    ) -> Result<BatchResult, PipelineError> {
        PipelineOrchestrator::process(self, fragments).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        PipelineOrchestrator::metrics_snapshot(self)
    }
}
