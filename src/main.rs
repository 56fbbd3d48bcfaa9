use anyhow::{Context, Result};
use clap::Parser;
use loqa_tutor::{
    AudioBackendFactory, AudioSource, Config, ConsoleRenderer, ElevenLabsSynthesizer,
    SessionConfig, SessionOrchestrator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Spoken English practice over a realtime conversation service
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/loqa-tutor")]
    config: String,

    /// Replay a 16-bit mono WAV file instead of using the microphone
    #[arg(long)]
    input: Option<PathBuf>,

    /// Print responses without speaking them
    #[arg(long)]
    no_voice: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Loqa Tutor v{}", env!("CARGO_PKG_VERSION"));
    info!("Model: {}", cfg.service.model);
    info!("Endpoint: {}", cfg.service.redacted_endpoint());

    let session_config = SessionConfig::from(&cfg);
    let renderer = Arc::new(ConsoleRenderer::new());
    let mut orchestrator = SessionOrchestrator::new(session_config.clone(), renderer);

    if args.no_voice {
        info!("Voice mode disabled by --no-voice");
    } else {
        match ElevenLabsSynthesizer::from_config(&cfg.voice) {
            Some(synth) => orchestrator = orchestrator.with_synthesizer(Arc::new(synth)),
            None => warn!("Voice mode disabled: ELEVENLABS_API_KEY not set"),
        }
    }

    let source = match args.input {
        Some(path) => AudioSource::File(path),
        None => AudioSource::Microphone,
    };
    let input = AudioBackendFactory::create(source, session_config.backend_config())
        .context("Failed to open audio input")?;

    let mut transport =
        SessionOrchestrator::connect(&cfg.service.endpoint(), cfg.service.proxy.as_deref())
            .await
            .context("Failed to connect to conversation service")?;

    orchestrator
        .run_handshake(&mut transport)
        .await
        .context("Session handshake failed")?;

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted; stopping session");
            cancel.cancel();
        }
    });

    let stats = orchestrator
        .run(transport, input)
        .await
        .context("Session terminated")?;

    info!(
        "Session {} finished after {:.1}s: {} frames sent, {} turns, {} playbacks",
        stats.session_id,
        stats.duration_secs,
        stats.frames_sent,
        stats.turns_completed,
        stats.playbacks
    );

    Ok(())
}
