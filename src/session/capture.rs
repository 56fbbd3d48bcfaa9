use std::sync::Arc;

use tracing::{debug, info};

use super::state::SharedState;
use super::stats::SessionCounters;
use crate::audio::{mean_amplitude, pronunciation_score, AudioInput, AudioQueueSender};
use crate::error::{Result, SessionError};
use crate::render::{Progress, Renderer};

/// Read frames from the input device and queue them for transmission.
///
/// - Paused: no device reads at all until the gate reopens; whatever the
///   device buffered meanwhile is discarded on resume.
/// - Response streaming or playing: frames are read (keeping the device
///   buffer drained) and dropped.
/// - Otherwise frames are queued, waiting for room when the queue is full.
///
/// Device errors end the loop. Returns `Ok` if the transmit side goes away.
pub async fn run_capture_loop(
    mut input: Box<dyn AudioInput>,
    queue: AudioQueueSender,
    shared: SharedState,
    renderer: Arc<dyn Renderer>,
    voice_threshold: f32,
) -> Result<()> {
    info!("Audio capture loop started ({})", input.name());
    renderer.progress(Progress::Listening);

    let counters = Arc::clone(&shared.counters);

    loop {
        if shared.gate.is_paused() {
            shared.gate.wait_until_resumed().await;
            // Audio the device held through the pause is stale
            input.discard_backlog();
        }

        let (returned, read) = tokio::task::spawn_blocking(move || {
            let frame = input.read_frame();
            (input, frame)
        })
        .await
        .map_err(|e| SessionError::Device(format!("capture thread failed: {e}")))?;
        input = returned;
        let frame = read?;
        SessionCounters::bump(&counters.frames_captured);

        // Paused while the read was in flight
        if shared.gate.is_paused() {
            SessionCounters::bump(&counters.frames_discarded);
            continue;
        }

        if shared.step.is_streaming() {
            SessionCounters::bump(&counters.frames_discarded);
            continue;
        }

        if mean_amplitude(&frame.samples) > voice_threshold {
            if shared.step.mark_local_speech() {
                renderer.progress(Progress::SpeechDetected);
                debug!(
                    "Speech detected at {}ms (score {})",
                    frame.timestamp_ms,
                    pronunciation_score(&frame.to_pcm_bytes())
                );
            }
            renderer.progress(Progress::VoiceActivity);
        }

        if queue.send(frame).await.is_err() {
            info!("Audio queue closed; capture loop stopping");
            return Ok(());
        }
        SessionCounters::bump(&counters.frames_enqueued);
    }
}
