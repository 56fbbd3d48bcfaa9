use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::state::SharedState;
use super::stats::SessionCounters;
use crate::audio::{AudioFrame, AudioQueueReceiver};
use crate::error::{Result, SessionError};
use crate::protocol::{ClientMessage, FrameSink};

/// Upper bound on the closing handshake when the session ends
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Dequeue captured frames and stream them to the service.
///
/// Nothing is dequeued while paused. A failed send ends the loop with the
/// error; a broken transport is not retried. Returns `Ok` once the capture
/// side has gone and the queue is drained, or `Cancelled` when `cancel`
/// fires. In both cases the connection is closed first.
pub async fn run_transmit_loop(
    mut sink: Box<dyn FrameSink>,
    mut queue: AudioQueueReceiver,
    shared: SharedState,
    cancel: CancellationToken,
) -> Result<()> {
    info!("Audio transmit loop started");

    let outcome = loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Err(SessionError::Cancelled),
            frame = next_frame(&mut queue, &shared) => frame,
        };

        let Some(frame) = frame else {
            info!("Audio queue closed; transmit loop stopping");
            break Ok(());
        };

        let message = ClientMessage::audio(&frame);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break Err(SessionError::Cancelled),
            sent = sink.send(&message) => sent?,
        }
        SessionCounters::bump(&shared.counters.frames_sent);
    };

    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => debug!("Transport closed"),
        Ok(Err(e)) => debug!("Transport close failed: {}", e),
        Err(_) => debug!("Transport close timed out"),
    }

    outcome
}

/// The next frame once the gate is open. `None` when the queue is closed.
async fn next_frame(queue: &mut AudioQueueReceiver, shared: &SharedState) -> Option<AudioFrame> {
    loop {
        shared.gate.wait_until_resumed().await;

        tokio::select! {
            biased;
            _ = shared.gate.wait_until_paused() => continue,
            frame = queue.recv() => return frame,
        }
    }
}
