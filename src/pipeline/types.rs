//! Core data types and error definitions for the claim pipeline.

use crate::agents::VerdictResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A single time-stamped caption line from a transcript source.
///
/// Fragments are supplied in time order by the caller; the pipeline never
/// re-sorts them. `end_s` is always derived from `start_s + duration_s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    /// Raw caption text.
    pub text: String,
    /// Start offset in seconds from the beginning of the recording.
    pub start_s: f64,
    /// Duration of the fragment in seconds.
    pub duration_s: f64,
}

impl TranscriptFragment {
    /// End offset of the fragment in seconds.
    pub fn end_s(&self) -> f64 {
        self.start_s + self.duration_s
    }
}

/// A contiguous, time-bounded group of transcript fragments.
///
/// Chunks are immutable once the windower closes them. `id` is 0-based and
/// sequential; it survives into downstream claims for traceability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Sequential 0-based identifier assigned at windowing time.
    pub id: usize,
    /// Start bound in seconds (anchor of the first fragment).
    pub start_s: f64,
    /// End bound in seconds (running maximum over member fragments).
    pub end_s: f64,
    /// Space-joined text of the member fragments.
    pub text: String,
}

/// An atomic, externally verifiable statement extracted from a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Identifier of the transcript source (e.g. a video id).
    pub source_id: String,
    /// Start offset in seconds of the utterance containing the claim.
    pub start_s: f64,
    /// End offset in seconds of the utterance containing the claim.
    pub end_s: f64,
    /// Normalized claim text to verify.
    pub text: String,
    /// Chunk the claim was extracted from.
    pub chunk_id: usize,
}

impl Claim {
    /// Whether the extractor declared timing unknown.
    ///
    /// Extractors that cannot place a claim in time emit `start_s == end_s == 0.0`;
    /// the orchestrator backfills those bounds from the owning chunk.
    pub fn has_sentinel_timing(&self) -> bool {
        self.start_s == 0.0 && self.end_s == 0.0
    }
}

/// Outcome attached to a claim after the verification stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerdictOutcome {
    /// The verifier produced a verdict.
    Verdict(VerdictResult),
    /// The verification task failed; the claim is retained with the error.
    Failed {
        /// Description of the verification failure.
        error: String,
    },
}

/// A claim paired with its verification outcome. Terminal, write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaim {
    /// The extracted claim, timing backfilled where the extractor left it unknown.
    pub claim: Claim,
    /// Verdict or failure marker produced by the verification stage.
    pub verdict: VerdictOutcome,
    /// Wall-clock seconds spent inside the verifier call.
    pub elapsed_s: f64,
    /// Chunk the claim originated from.
    pub chunk_id: usize,
}

/// Aggregate snapshot of one end-to-end pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Verified claims ordered by chunk id, then extraction order within the chunk.
    pub claims: Vec<VerifiedClaim>,
    /// Number of claims each chunk contributed (failed chunks count 0).
    pub claims_per_chunk: BTreeMap<usize, usize>,
    /// Number of chunks whose extraction task failed.
    pub extraction_failures: usize,
    /// Number of claims whose verification task failed.
    pub verification_failures: usize,
}

impl BatchResult {
    /// An empty result carrying only failure counters.
    pub(crate) fn empty() -> Self {
        Self {
            claims: Vec::new(),
            claims_per_chunk: BTreeMap::new(),
            extraction_failures: 0,
            verification_failures: 0,
        }
    }

    /// Mean verification wall-clock time across all claims, if any.
    pub fn average_verification_seconds(&self) -> Option<f64> {
        if self.claims.is_empty() {
            return None;
        }
        let total: f64 = self.claims.iter().map(|claim| claim.elapsed_s).sum();
        Some(total / self.claims.len() as f64)
    }
}

/// Errors produced while windowing a fragment stream into chunks.
#[derive(Debug, Error)]
pub enum WindowError {
    /// Windowing configured an impossible target span.
    #[error("target span must be positive and finite, got {0}")]
    InvalidTargetSpan(f64),
    /// A fragment carried a timestamp the windower cannot order.
    #[error("fragment {index} has a non-finite timestamp (start={start_s}, duration={duration_s})")]
    NonFiniteTimestamp {
        /// Position of the offending fragment in the input stream.
        index: usize,
        /// Fragment start offset as supplied.
        start_s: f64,
        /// Fragment duration as supplied.
        duration_s: f64,
    },
    /// A fragment declared a negative duration.
    #[error("fragment {index} has negative duration {duration_s}")]
    NegativeDuration {
        /// Position of the offending fragment in the input stream.
        index: usize,
        /// Fragment duration as supplied.
        duration_s: f64,
    },
}

/// Errors emitted by the end-to-end claim pipeline.
///
/// Per-chunk extraction failures and per-claim verification failures are not
/// errors at this level; they are folded into [`BatchResult`] counters. Only
/// bad configuration or an unusable input stream aborts a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The fragment stream could not be windowed.
    #[error("Failed to window transcript: {0}")]
    Windowing(#[from] WindowError),
    /// A concurrency bound was not a positive number.
    #[error("{stage} concurrency must be positive")]
    InvalidConcurrency {
        /// Stage whose bound was rejected (`extraction` or `verification`).
        stage: &'static str,
    },
}
