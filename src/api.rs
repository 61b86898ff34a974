//! HTTP surface for Factline.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /process` – Window a raw transcript, extract claims from each chunk, and verify them.
//!   Accepts the caption-export shape (`[{ "text", "start", "duration" }, ...]`) and returns the
//!   verified claims plus per-chunk counts and failure counters.
//! - `GET /metrics` – Observe pipeline counters across all runs since startup.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The HTTP surface shares the same orchestrator with the CLI, so behavior is identical
//! across interfaces.

use crate::pipeline::{BatchResult, PipelineApi, PipelineError, TranscriptFragment};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the pipeline API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/process", post(process_transcript::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// One caption line as exported by transcript tooling.
///
/// Missing fields default to empty/zero, matching the loose caption-export
/// JSON this shape originates from.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFragment {
    /// Caption text; blank lines are dropped during windowing.
    #[serde(default)]
    pub text: String,
    /// Start offset in seconds.
    #[serde(default)]
    pub start: f64,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: f64,
}

impl From<RawFragment> for TranscriptFragment {
    fn from(raw: RawFragment) -> Self {
        Self {
            text: raw.text,
            start_s: raw.start,
            duration_s: raw.duration,
        }
    }
}

/// Request body for the `POST /process` endpoint.
#[derive(Deserialize)]
struct ProcessRequest {
    /// Time-ordered caption lines to run through the pipeline.
    fragments: Vec<RawFragment>,
}

/// Success response for the `POST /process` endpoint.
#[derive(Serialize)]
struct ProcessResponse {
    /// Number of verified claims in the batch.
    total_claims: usize,
    /// Full batch output.
    batch: BatchResult,
}

/// Run one transcript through the pipeline.
async fn process_transcript<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, AppError>
where
    S: PipelineApi,
{
    let fragments: Vec<TranscriptFragment> = request
        .fragments
        .into_iter()
        .map(TranscriptFragment::from)
        .collect();
    let batch = service.process(fragments).await?;
    tracing::info!(
        claims = batch.claims.len(),
        extraction_failures = batch.extraction_failures,
        verification_failures = batch.verification_failures,
        "Process request completed"
    );
    Ok(Json(ProcessResponse {
        total_claims: batch.claims.len(),
        batch,
    }))
}

/// Return pipeline counters across all runs since startup.
async fn get_metrics<S>(
    State(service): State<Arc<S>>,
) -> Json<crate::metrics::MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "process",
                method: "POST",
                path: "/process",
                description: "Window a transcript, extract claims from each chunk, and verify them. Response returns { \"total_claims\": number, \"batch\": {...} }.",
                request_example: Some(json!({
                    "fragments": [
                        { "text": "I love pizza", "start": 0.0, "duration": 5.0 },
                        { "text": "Unemployment is 4%", "start": 5.0, "duration": 5.0 }
                    ]
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(PipelineError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::Windowing(_) => StatusCode::BAD_REQUEST,
            PipelineError::InvalidConcurrency { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::metrics::MetricsSnapshot;
    use crate::pipeline::{
        BatchResult, PipelineApi, PipelineError, TranscriptFragment, WindowError,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_process_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let process = commands
            .iter()
            .find(|cmd| cmd.name == "process")
            .expect("process command present");

        assert_eq!(process.method, "POST");
        assert_eq!(process.path, "/process");
        assert!(process.description.to_lowercase().contains("claims"));
        assert!(commands.len() >= 2);
    }

    #[tokio::test]
    async fn process_route_converts_raw_fragments() {
        let service = Arc::new(StubPipeline::default());
        let app = create_router(service.clone());

        let payload = json!({
            "fragments": [
                { "text": "I love pizza", "start": 0.0, "duration": 5.0 },
                { "text": "Unemployment is 4%", "start": 5.0, "duration": 5.0 }
            ]
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/process")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["total_claims"], 0);

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[0][1].text, "Unemployment is 4%");
        assert_eq!(calls[0][1].start_s, 5.0);
        assert_eq!(calls[0][1].duration_s, 5.0);
    }

    #[tokio::test]
    async fn window_errors_map_to_bad_request() {
        let service = Arc::new(StubPipeline::failing());
        let app = create_router(service);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/process")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "fragments": [] }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[derive(Default)]
    struct StubPipeline {
        calls: Arc<Mutex<Vec<Vec<TranscriptFragment>>>>,
        fail: bool,
    }

    impl StubPipeline {
        fn failing() -> Self {
            Self {
                calls: Arc::default(),
                fail: true,
            }
        }

        async fn recorded_calls(&self) -> Vec<Vec<TranscriptFragment>> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl PipelineApi for StubPipeline {
        async fn process(
            &self,
            fragments: Vec<TranscriptFragment>,
        ) -> Result<BatchResult, PipelineError> {
            if self.fail {
                return Err(PipelineError::Windowing(WindowError::InvalidTargetSpan(
                    0.0,
                )));
            }
            self.calls.lock().await.push(fragments);
            Ok(BatchResult {
                claims: Vec::new(),
                claims_per_chunk: Default::default(),
                extraction_failures: 0,
                verification_failures: 0,
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                runs_completed: 0,
                chunks_windowed: 0,
                claims_extracted: 0,
                claims_verified: 0,
                extraction_failures: 0,
                verification_failures: 0,
            }
        }
    }
}
