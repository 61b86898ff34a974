#![deny(missing_docs)]

//! Core library for the Factline claim pipeline.

/// Extraction and verification collaborator traits and offline adapters.
pub mod agents;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline run metrics helpers.
pub mod metrics;
/// Transcript windowing and claim pipeline orchestration.
pub mod pipeline;
