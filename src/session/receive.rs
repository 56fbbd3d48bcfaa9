use std::sync::Arc;

use tracing::{debug, info};

use super::control::{first_segment, ControlCommand};
use super::playback::PlaybackInvoker;
use super::state::{ResponseId, SharedState};
use super::stats::SessionCounters;
use super::turn::{AssemblerEvent, Turn, TurnAssembler};
use crate::error::Result;
use crate::protocol::FrameSource;
use crate::render::{Progress, Renderer};

/// Reacts to assembled turns: control commands, rendering, playback and the
/// step transitions that go with them.
pub struct TurnReactor {
    shared: SharedState,
    renderer: Arc<dyn Renderer>,
    playback: PlaybackInvoker,
    response: Option<ResponseId>,
}

impl TurnReactor {
    pub fn new(
        shared: SharedState,
        renderer: Arc<dyn Renderer>,
        playback: PlaybackInvoker,
    ) -> Self {
        Self {
            shared,
            renderer,
            playback,
            response: None,
        }
    }

    pub fn handle(&mut self, event: AssemblerEvent) {
        match event {
            AssemblerEvent::Started => {
                self.response = Some(self.shared.step.begin_response());
                self.renderer.progress(Progress::ResponseStarted);
                self.renderer.progress(Progress::Fragment);
            }
            AssemblerEvent::Appended => self.renderer.progress(Progress::Fragment),
            AssemblerEvent::Completed(turn) => self.complete(turn),
        }
    }

    fn complete(&mut self, turn: Turn) {
        SessionCounters::bump(&self.shared.counters.turns_completed);
        let gate = &self.shared.gate;

        match ControlCommand::detect(&turn.text, gate.is_paused()) {
            ControlCommand::Pause => {
                if gate.pause() {
                    SessionCounters::bump(&self.shared.counters.pauses);
                    info!("Session paused by control command");
                }
                self.renderer.progress(Progress::Paused);
            }
            ControlCommand::Resume => {
                gate.resume();
                info!("Session resumed by control command");
                self.renderer.progress(Progress::Resumed);
            }
            ControlCommand::None => {}
        }

        let paused = gate.is_paused();
        let response = self.response.take();
        let mut playing = false;

        if !turn.text.is_empty() {
            debug!("Turn complete: {} chars from {} fragments", turn.text.len(), turn.fragments);
            self.renderer.render_turn(&turn.text);

            if let (Some(id), false) = (response, paused) {
                let speech = first_segment(&turn.text);
                if !speech.is_empty() {
                    playing = self.playback.dispatch(speech.to_string(), id).is_some();
                }
            }
        }

        // While paused the step stays put; the loops that read it are suspended
        if !paused && !playing {
            match response {
                Some(id) => {
                    self.shared.step.finish_response(id);
                }
                None => self.shared.step.clear_local_speech(),
            }
        }
    }
}

/// Read inbound frames until the transport closes, assembling and reacting
/// to turns.
///
/// A partial turn left when the transport closes is dropped. Receive errors
/// end the loop with the error.
pub async fn run_receive_loop(
    mut source: Box<dyn FrameSource>,
    mut reactor: TurnReactor,
) -> Result<()> {
    info!("Receive loop started");
    let mut assembler = TurnAssembler::new();

    while let Some(frames) = source.next_frames().await {
        for frame in frames? {
            if let Some(event) = assembler.push(frame) {
                reactor.handle(event);
            }
        }
    }

    if assembler.is_active() {
        debug!("Transport closed mid-turn; dropping partial response");
    }
    info!("Receive loop stopped: transport closed");
    Ok(())
}
