use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::capture::run_capture_loop;
use super::config::SessionConfig;
use super::playback::PlaybackInvoker;
use super::receive::{run_receive_loop, TurnReactor};
use super::state::SharedState;
use super::stats::SessionStats;
use super::transmit::run_transmit_loop;
use super::turn::{AssemblerEvent, TurnAssembler};
use crate::audio::{audio_queue, AudioInput};
use crate::error::{Result, SessionError};
use crate::protocol::{self, ClientMessage, InboundFrame, Transport, HANDSHAKE_ACK_PREFIX};
use crate::render::{Progress, Renderer};
use crate::voice::SpeechSynthesizer;

/// The concurrently running parts of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Capture,
    Transmit,
    Receive,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Unit::Capture => "capture",
            Unit::Transmit => "transmit",
            Unit::Receive => "receive",
        };
        f.write_str(name)
    }
}

/// Owns a conversation session: transport, handshake and the supervised
/// capture / transmit / receive loops.
pub struct SessionOrchestrator {
    config: SessionConfig,
    renderer: Arc<dyn Renderer>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    shared: SharedState,
    cancel: CancellationToken,
}

impl SessionOrchestrator {
    pub fn new(config: SessionConfig, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            config,
            renderer,
            synthesizer: None,
            shared: SharedState::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Speak responses with `synthesizer`. Without one the session runs
    /// text-only.
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Pause gate, session step and counters shared by the loops
    pub fn shared_state(&self) -> SharedState {
        self.shared.clone()
    }

    /// Cancelling this token stops a running session
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Connect to the service, optionally through an HTTP proxy.
    pub async fn connect(endpoint: &str, proxy: Option<&str>) -> Result<Transport> {
        protocol::connect(endpoint, proxy).await
    }

    /// Configure the session and send the instructions, then wait for a
    /// completed turn starting with "OK". That turn is not rendered or played.
    ///
    /// Fails with a handshake timeout if the acknowledgement does not arrive
    /// in time, or a protocol error if the transport closes first.
    pub async fn run_handshake(&self, transport: &mut Transport) -> Result<()> {
        let deadline = self.config.handshake_timeout;
        match tokio::time::timeout(deadline, self.handshake_exchange(transport)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::HandshakeTimeout(deadline)),
        }
    }

    async fn handshake_exchange(&self, transport: &mut Transport) -> Result<()> {
        info!("Starting handshake for {}", self.config.session_id);

        transport
            .sink
            .send(&ClientMessage::setup(&self.config.model))
            .await?;

        let setup_reply = next_message(transport, "setup reply").await?;
        if !setup_reply.contains(&InboundFrame::SetupComplete) {
            warn!("First reply was not a setup acknowledgement; continuing");
        }

        transport
            .sink
            .send(&ClientMessage::user_text(&self.config.prompt))
            .await?;

        let mut assembler = TurnAssembler::new();
        let mut pending = setup_reply;
        loop {
            for frame in pending {
                if let Some(AssemblerEvent::Completed(turn)) = assembler.push(frame) {
                    if turn.text.starts_with(HANDSHAKE_ACK_PREFIX) {
                        info!("Handshake complete");
                        self.renderer.progress(Progress::HandshakeComplete);
                        return Ok(());
                    }
                    debug!("Discarding unacknowledged handshake turn: {:?}", turn.text);
                }
            }
            pending = next_message(transport, "handshake acknowledgement").await?;
        }
    }

    /// Run the capture, transmit and receive loops until the transport
    /// closes, the session is cancelled, or a loop fails.
    ///
    /// The first loop to fail cancels the others and its error is returned
    /// once every loop has stopped. A remote close or cancellation is a
    /// normal end and yields the session statistics.
    pub async fn run(
        &self,
        transport: Transport,
        input: Box<dyn AudioInput>,
    ) -> Result<SessionStats> {
        let started_at = Utc::now();
        let cancel = self.cancel.child_token();
        let shared = self.shared.clone();

        info!(
            "Session {} running (queue capacity {} frames)",
            self.config.session_id, self.config.queue_capacity
        );

        let (queue_tx, queue_rx) = audio_queue(self.config.queue_capacity);
        let Transport { sink, source } = transport;

        let playback = PlaybackInvoker::new(
            self.synthesizer.clone(),
            Arc::clone(&self.renderer),
            shared.clone(),
            cancel.clone(),
        );
        if !playback.is_enabled() {
            info!("Voice playback disabled");
        }
        let reactor = TurnReactor::new(shared.clone(), Arc::clone(&self.renderer), playback);

        let mut units = JoinSet::new();
        units.spawn(supervised(
            Unit::Capture,
            cancel.clone(),
            run_capture_loop(
                input,
                queue_tx,
                shared.clone(),
                Arc::clone(&self.renderer),
                self.config.voice_threshold,
            ),
        ));
        // Transmit watches the token itself so it can close the connection
        let transmit = run_transmit_loop(sink, queue_rx, shared.clone(), cancel.clone());
        units.spawn(async move { (Unit::Transmit, transmit.await) });
        units.spawn(supervised(
            Unit::Receive,
            cancel.clone(),
            run_receive_loop(source, reactor),
        ));

        let mut failure: Option<SessionError> = None;
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((unit, Ok(()))) => {
                    info!("{} loop finished; stopping session", unit);
                    cancel.cancel();
                }
                Ok((unit, Err(SessionError::Cancelled))) => {
                    debug!("{} loop cancelled", unit);
                }
                Ok((unit, Err(e))) if e.is_fatal() => {
                    error!("{} loop failed: {}", unit, e);
                    failure.get_or_insert(e);
                    cancel.cancel();
                }
                Ok((unit, Err(e))) => {
                    warn!("{} loop stopped: {}; ending session", unit, e);
                    cancel.cancel();
                }
                Err(e) => {
                    error!("Session loop panicked: {}", e);
                    failure.get_or_insert(SessionError::Internal(e.to_string()));
                    cancel.cancel();
                }
            }
        }

        let stats = shared
            .counters
            .snapshot(&self.config.session_id, started_at);

        match failure {
            Some(e) => Err(e),
            None => {
                info!(
                    "Session {} ended: {} frames sent, {} turns",
                    stats.session_id, stats.frames_sent, stats.turns_completed
                );
                Ok(stats)
            }
        }
    }
}

async fn next_message(transport: &mut Transport, waiting_for: &str) -> Result<Vec<InboundFrame>> {
    match transport.source.next_frames().await {
        Some(frames) => frames,
        None => Err(SessionError::Protocol(format!(
            "transport closed while waiting for {}",
            waiting_for
        ))),
    }
}

/// Run `work` until it finishes or `cancel` fires.
async fn supervised<F>(unit: Unit, cancel: CancellationToken, work: F) -> (Unit, Result<()>)
where
    F: Future<Output = Result<()>>,
{
    tokio::select! {
        _ = cancel.cancelled() => (unit, Err(SessionError::Cancelled)),
        result = work => (unit, result),
    }
}
