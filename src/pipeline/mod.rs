//! Claim pipeline: transcript windowing, bounded fan-out, and orchestration.

pub mod fanout;
mod orchestrator;
pub mod report;
pub mod types;
pub mod windowing;

pub use fanout::{BoundedFanOut, FanOutError, TaskError};
pub use orchestrator::{PipelineApi, PipelineOptions, PipelineOrchestrator};
pub use types::{
    BatchResult, Chunk, Claim, PipelineError, TranscriptFragment, VerdictOutcome, VerifiedClaim,
    WindowError,
};
pub use windowing::window;
