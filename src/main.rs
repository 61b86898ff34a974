use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use factline::{
    agents::{OfflineVerifier, PatternExtractor},
    api,
    api::RawFragment,
    config,
    logging,
    pipeline::{PipelineOptions, PipelineOrchestrator, TranscriptFragment, report::RunReport},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "factline", about = "Transcript claim extraction and verification pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve,
    /// Process a transcript JSON file and write a run report.
    Run {
        /// Transcript file: a JSON array of { text, start, duration } objects.
        #[arg(long)]
        input: PathBuf,
        /// Destination for the JSON run report.
        #[arg(long)]
        output: PathBuf,
        /// Source identifier stamped on extracted claims.
        #[arg(long)]
        source_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing();

    match Cli::parse().command {
        Command::Serve => serve().await,
        Command::Run {
            input,
            output,
            source_id,
        } => run_file(input, output, source_id).await,
    }
}

fn build_orchestrator(source_id: &str) -> PipelineOrchestrator {
    let config = config::get_config();
    PipelineOrchestrator::new(
        Arc::new(PatternExtractor::new(source_id)),
        Arc::new(OfflineVerifier::new()),
        PipelineOptions::from_config(config),
    )
}

async fn serve() -> Result<()> {
    let config = config::get_config();
    let orchestrator = build_orchestrator(&config.default_source_id);
    let app = api::create_router(Arc::new(orchestrator));

    let (listener, port) = bind_listener().await.context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_file(input: PathBuf, output: PathBuf, source_id: Option<String>) -> Result<()> {
    let config = config::get_config();
    let source_id = source_id.unwrap_or_else(|| config.default_source_id.clone());

    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read transcript file {}", input.display()))?;
    let fragments: Vec<RawFragment> =
        serde_json::from_str(&raw).context("Transcript file is not a JSON fragment array")?;
    let fragments: Vec<TranscriptFragment> = fragments
        .into_iter()
        .map(TranscriptFragment::from)
        .collect();
    tracing::info!(
        fragments = fragments.len(),
        source_id = %source_id,
        "Loaded transcript"
    );

    let orchestrator = build_orchestrator(&source_id);
    let batch = orchestrator.process(fragments).await?;
    if let Some(average) = batch.average_verification_seconds() {
        tracing::info!(average_verification_s = average, "Verification timing");
    }

    let report = RunReport::new(source_id, batch);
    report.write_to(&output)?;
    Ok(())
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let config = config::get_config();
    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4200..=4299;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4200-4299",
    ))
}
