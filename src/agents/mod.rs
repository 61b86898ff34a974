//! Collaborator seam for the claim pipeline.
//!
//! The orchestrator only ever talks to two narrow traits: a [`ClaimExtractor`]
//! that turns a chunk of transcript into zero or more claims, and a
//! [`ClaimVerifier`] that produces a verdict for one claim. LLM-backed,
//! search-backed, and test implementations all live behind these traits; the
//! pipeline core never learns which one it is driving.

use crate::pipeline::{Chunk, Claim};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by claim extractors.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Extractor was unable to produce claims for the supplied chunk.
    #[error("Failed to extract claims: {0}")]
    ExtractionFailed(String),
}

/// Errors raised by claim verifiers.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Verifier was unable to reach a verdict for the supplied claim.
    #[error("Failed to verify claim: {0}")]
    VerificationFailed(String),
}

/// Verdict payload produced by a verifier.
///
/// The pipeline core treats this as opaque: it is carried through to the
/// final result untouched. Concrete verifiers decide what `label` values
/// mean and how much supporting text to attach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictResult {
    /// Short verdict category (e.g. `supported`, `refuted`, `unverified`).
    pub label: String,
    /// Free-form verdict explanation.
    pub text: String,
}

/// Interface implemented by claim extraction backends.
#[async_trait]
pub trait ClaimExtractor: Send + Sync {
    /// Produce the claims found in one transcript chunk.
    ///
    /// Implementations that cannot place a claim in time should emit the
    /// sentinel timing `start_s == end_s == 0.0`; the orchestrator backfills
    /// those bounds from the owning chunk.
    async fn extract(&self, chunk: &Chunk) -> Result<Vec<Claim>, ExtractionError>;
}

/// Interface implemented by claim verification backends.
#[async_trait]
pub trait ClaimVerifier: Send + Sync {
    /// Produce a verdict for one claim.
    async fn verify(&self, claim_text: &str) -> Result<VerdictResult, VerificationError>;
}

/// Deterministic offline extractor for runs without model credentials.
///
/// Splits a chunk into sentences and keeps the ones that look externally
/// verifiable: anything carrying a digit or a comparative/quantitative cue
/// word. Crude, but deterministic, which makes it useful for demos and for
/// exercising the pipeline end-to-end in tests.
pub struct PatternExtractor {
    source_id: String,
}

/// Cue words that mark a sentence as plausibly verifiable without digits.
const VERIFIABLE_CUES: [&str; 6] = [
    "percent", "million", "billion", "largest", "smallest", "first",
];

impl PatternExtractor {
    /// Construct an extractor that stamps claims with the given source id.
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
        }
    }

    fn looks_verifiable(sentence: &str) -> bool {
        if sentence.chars().any(|c| c.is_ascii_digit()) {
            return true;
        }
        let lowered = sentence.to_lowercase();
        VERIFIABLE_CUES.iter().any(|cue| lowered.contains(cue))
    }

    fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
        text.split_inclusive(['.', '!', '?'])
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
    }
}

#[async_trait]
impl ClaimExtractor for PatternExtractor {
    async fn extract(&self, chunk: &Chunk) -> Result<Vec<Claim>, ExtractionError> {
        let claims = Self::split_sentences(&chunk.text)
            .filter(|sentence| Self::looks_verifiable(sentence))
            .map(|sentence| Claim {
                source_id: self.source_id.clone(),
                // Sentence-level timing is unknown here; the orchestrator
                // backfills the chunk bounds.
                start_s: 0.0,
                end_s: 0.0,
                text: sentence.trim_end_matches(['.', '!', '?']).to_string(),
                chunk_id: chunk.id,
            })
            .collect();
        Ok(claims)
    }
}

/// Verifier used when no verification backend is configured.
///
/// Always returns an `unverified` verdict so downstream consumers can tell
/// offline output apart from a real verification run.
pub struct OfflineVerifier;

impl OfflineVerifier {
    /// Construct a new offline verifier instance.
    pub const fn new() -> Self {
        Self
    }
}

impl Default for OfflineVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClaimVerifier for OfflineVerifier {
    async fn verify(&self, claim_text: &str) -> Result<VerdictResult, VerificationError> {
        if claim_text.trim().is_empty() {
            return Err(VerificationError::VerificationFailed(
                "empty claim text".to_string(),
            ));
        }
        Ok(VerdictResult {
            label: "unverified".to_string(),
            text: "No verification backend configured; claim recorded without a verdict."
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            id: 3,
            start_s: 10.0,
            end_s: 40.0,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn pattern_extractor_keeps_quantitative_sentences() {
        let extractor = PatternExtractor::new("vid-1");
        let claims = extractor
            .extract(&chunk(
                "I love my family. Unemployment is 4%. This is the largest factory in Europe.",
            ))
            .await
            .expect("extraction");

        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].text, "Unemployment is 4%");
        assert_eq!(claims[1].text, "This is the largest factory in Europe");
        assert!(claims.iter().all(|claim| claim.chunk_id == 3));
        assert!(claims.iter().all(Claim::has_sentinel_timing));
    }

    #[tokio::test]
    async fn pattern_extractor_yields_nothing_for_subjective_text() {
        let extractor = PatternExtractor::new("vid-1");
        let claims = extractor
            .extract(&chunk("I love pizza. What a lovely day!"))
            .await
            .expect("extraction");
        assert!(claims.is_empty());
    }

    #[tokio::test]
    async fn offline_verifier_labels_output_unverified() {
        let verifier = OfflineVerifier::new();
        let verdict = verifier
            .verify("Unemployment is 4%")
            .await
            .expect("verdict");
        assert_eq!(verdict.label, "unverified");
    }

    #[tokio::test]
    async fn offline_verifier_rejects_empty_claims() {
        let verifier = OfflineVerifier::new();
        assert!(verifier.verify("   ").await.is_err());
    }
}
