//! Time-based transcript windowing.
//!
//! Fragments arrive in time order and are folded into contiguous chunks of
//! roughly `target_span_s` seconds. The boundary policy is deliberately
//! simple and fully deterministic: a chunk closes only when the *next*
//! fragment would stretch it past the target span, so the first fragment in a
//! chunk is always accepted whole, however long it is. Downstream tests and
//! replays rely on the exact boundaries this produces.

use super::types::{Chunk, TranscriptFragment, WindowError};

/// Split a time-ordered fragment stream into chunks of roughly `target_span_s` seconds.
///
/// Rules:
/// - Whitespace-only fragments are skipped and never open or extend a chunk.
/// - A chunk is anchored at the `start_s` of its first fragment; it closes when
///   the next fragment's end would put the chunk past `target_span_s`.
/// - `end_s` is a running maximum over member fragments, so overlapping or
///   slightly out-of-order captions cannot shrink a chunk.
/// - Chunk text is the single-space join of member fragment texts.
///
/// The stream is validated up front; any non-finite timestamp or negative
/// duration aborts before a single chunk is produced.
pub fn window(
    fragments: &[TranscriptFragment],
    target_span_s: f64,
) -> Result<Vec<Chunk>, WindowError> {
    if !target_span_s.is_finite() || target_span_s <= 0.0 {
        return Err(WindowError::InvalidTargetSpan(target_span_s));
    }
    validate_stream(fragments)?;

    let mut chunks = Vec::new();
    let mut accumulator: Option<OpenChunk> = None;

    for fragment in fragments {
        let text = fragment.text.trim();
        if text.is_empty() {
            continue;
        }

        accumulator = match accumulator.take() {
            None => Some(OpenChunk::anchor(fragment, text)),
            Some(mut open) => {
                let prospective_span = fragment.end_s() - open.start_s;
                if prospective_span > target_span_s {
                    chunks.push(open.close(chunks.len()));
                    Some(OpenChunk::anchor(fragment, text))
                } else {
                    open.absorb(fragment, text);
                    Some(open)
                }
            }
        };
    }

    if let Some(open) = accumulator {
        chunks.push(open.close(chunks.len()));
    }

    tracing::debug!(
        fragments = fragments.len(),
        chunks = chunks.len(),
        target_span_s,
        "Windowed transcript"
    );
    Ok(chunks)
}

fn validate_stream(fragments: &[TranscriptFragment]) -> Result<(), WindowError> {
    for (index, fragment) in fragments.iter().enumerate() {
        if !fragment.start_s.is_finite() || !fragment.duration_s.is_finite() {
            return Err(WindowError::NonFiniteTimestamp {
                index,
                start_s: fragment.start_s,
                duration_s: fragment.duration_s,
            });
        }
        if fragment.duration_s < 0.0 {
            return Err(WindowError::NegativeDuration {
                index,
                duration_s: fragment.duration_s,
            });
        }
    }
    Ok(())
}

/// Accumulator for the chunk currently being filled.
struct OpenChunk {
    start_s: f64,
    end_s: f64,
    parts: Vec<String>,
}

impl OpenChunk {
    fn anchor(fragment: &TranscriptFragment, trimmed_text: &str) -> Self {
        Self {
            start_s: fragment.start_s,
            end_s: fragment.end_s(),
            parts: vec![trimmed_text.to_string()],
        }
    }

    fn absorb(&mut self, fragment: &TranscriptFragment, trimmed_text: &str) {
        self.parts.push(trimmed_text.to_string());
        // Running maximum: overlapping captions must not move the end backwards.
        self.end_s = self.end_s.max(fragment.end_s());
    }

    fn close(&self, id: usize) -> Chunk {
        Chunk {
            id,
            start_s: self.start_s,
            end_s: self.end_s,
            text: self.parts.join(" "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: &str, start_s: f64, duration_s: f64) -> TranscriptFragment {
        TranscriptFragment {
            text: text.to_string(),
            start_s,
            duration_s,
        }
    }

    #[test]
    fn empty_stream_yields_no_chunks() {
        let chunks = window(&[], 30.0).expect("windowing");
        assert!(chunks.is_empty());
    }

    #[test]
    fn short_fragments_share_one_chunk() {
        let fragments = vec![
            fragment("I love pizza", 0.0, 5.0),
            fragment("Unemployment is 4%", 5.0, 5.0),
        ];
        let chunks = window(&fragments, 30.0).expect("windowing");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, 0);
        assert_eq!(chunks[0].start_s, 0.0);
        assert_eq!(chunks[0].end_s, 10.0);
        assert_eq!(chunks[0].text, "I love pizza Unemployment is 4%");
    }

    #[test]
    fn long_fragments_split_one_per_chunk() {
        let fragments: Vec<_> = (0..10)
            .map(|i| fragment(&format!("segment {i}"), i as f64 * 40.0, 40.0))
            .collect();
        let chunks = window(&fragments, 30.0).expect("windowing");
        assert_eq!(chunks.len(), 10);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, i);
            assert_eq!(chunk.text, format!("segment {i}"));
            assert_eq!(chunk.start_s, i as f64 * 40.0);
            assert_eq!(chunk.end_s, i as f64 * 40.0 + 40.0);
        }
    }

    #[test]
    fn first_fragment_is_never_split_even_when_oversized() {
        let fragments = vec![
            fragment("a ninety second monologue", 0.0, 90.0),
            fragment("short reply", 90.0, 2.0),
        ];
        let chunks = window(&fragments, 30.0).expect("windowing");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].end_s, 90.0);
        assert_eq!(chunks[1].text, "short reply");
    }

    #[test]
    fn boundary_closes_only_when_span_exceeded() {
        // 0-10, 10-20, 20-30 all fit in a 30s window; 30-40 opens a new chunk.
        let fragments: Vec<_> = (0..4)
            .map(|i| fragment(&format!("f{i}"), i as f64 * 10.0, 10.0))
            .collect();
        let chunks = window(&fragments, 30.0).expect("windowing");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "f0 f1 f2");
        assert_eq!(chunks[1].text, "f3");
    }

    #[test]
    fn blank_fragments_are_skipped() {
        let fragments = vec![
            fragment("   ", 0.0, 5.0),
            fragment("spoken words", 5.0, 5.0),
            fragment("\n\t", 10.0, 5.0),
            fragment("more words", 15.0, 5.0),
        ];
        let chunks = window(&fragments, 60.0).expect("windowing");
        assert_eq!(chunks.len(), 1);
        // Anchor comes from the first non-empty fragment, not the blank one.
        assert_eq!(chunks[0].start_s, 5.0);
        assert_eq!(chunks[0].text, "spoken words more words");
    }

    #[test]
    fn end_is_running_maximum_over_overlapping_fragments() {
        let fragments = vec![
            fragment("speaker a", 0.0, 12.0),
            fragment("speaker b overlapping", 2.0, 4.0),
        ];
        let chunks = window(&fragments, 30.0).expect("windowing");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_s, 12.0);
    }

    #[test]
    fn chunk_bounds_are_ordered() {
        let fragments: Vec<_> = (0..7)
            .map(|i| fragment(&format!("f{i}"), i as f64 * 13.0, 13.0))
            .collect();
        for chunk in window(&fragments, 30.0).expect("windowing") {
            assert!(chunk.end_s >= chunk.start_s);
        }
    }

    #[test]
    fn rejects_invalid_target_span() {
        let fragments = vec![fragment("hello", 0.0, 5.0)];
        assert!(matches!(
            window(&fragments, 0.0),
            Err(WindowError::InvalidTargetSpan(_))
        ));
        assert!(window(&fragments, f64::NAN).is_err());
    }

    #[test]
    fn rejects_malformed_timestamps_before_producing_chunks() {
        let fragments = vec![
            fragment("fine", 0.0, 5.0),
            fragment("broken", f64::NAN, 5.0),
        ];
        assert!(matches!(
            window(&fragments, 30.0),
            Err(WindowError::NonFiniteTimestamp { index: 1, .. })
        ));

        let fragments = vec![fragment("negative", 0.0, -2.0)];
        assert!(matches!(
            window(&fragments, 30.0),
            Err(WindowError::NegativeDuration { index: 0, .. })
        ));
    }

    #[test]
    fn chunk_count_is_deterministic() {
        let fragments: Vec<_> = (0..25)
            .map(|i| fragment(&format!("f{i}"), i as f64 * 7.0, 7.0))
            .collect();
        let first = window(&fragments, 30.0).expect("windowing");
        let second = window(&fragments, 30.0).expect("windowing");
        assert_eq!(first, second);
    }
}
