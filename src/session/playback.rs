use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::state::{ResponseId, SharedState};
use super::stats::SessionCounters;
use crate::render::{Progress, Renderer};
use crate::voice::SpeechSynthesizer;

/// Speaks responses off the receive loop.
///
/// Each playback runs as its own task so the receive loop keeps reading.
/// Playbacks are serialized so consecutive responses never overlap, and
/// a failure is logged without touching the rest of the session. When a
/// playback ends, capture suppression for that response is lifted.
#[derive(Clone)]
pub struct PlaybackInvoker {
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    renderer: Arc<dyn Renderer>,
    shared: SharedState,
    cancel: CancellationToken,
    serial: Arc<Mutex<()>>,
}

impl PlaybackInvoker {
    pub fn new(
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        renderer: Arc<dyn Renderer>,
        shared: SharedState,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            synthesizer,
            renderer,
            shared,
            cancel,
            serial: Arc::new(Mutex::new(())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Speak `text` for `response` in the background.
    ///
    /// Returns `None` when no synthesizer is configured.
    pub fn dispatch(&self, text: String, response: ResponseId) -> Option<JoinHandle<()>> {
        let synthesizer = Arc::clone(self.synthesizer.as_ref()?);
        let renderer = Arc::clone(&self.renderer);
        let shared = self.shared.clone();
        let cancel = self.cancel.clone();
        let serial = Arc::clone(&self.serial);

        Some(tokio::spawn(async move {
            let _turn = serial.lock().await;

            renderer.progress(Progress::PlaybackStarted);
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Playback cancelled");
                    return;
                }
                result = synthesizer.speak(&text) => match result {
                    Ok(()) => {
                        SessionCounters::bump(&shared.counters.playbacks);
                        renderer.progress(Progress::PlaybackFinished);
                    }
                    Err(e) => {
                        warn!("{} playback failed: {}", synthesizer.name(), e);
                        renderer.progress(Progress::PlaybackFailed);
                    }
                }
            }

            shared.step.finish_response(response);
        }))
    }
}
