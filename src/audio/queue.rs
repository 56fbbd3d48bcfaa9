//! Bounded FIFO of captured frames between capture and transmission.
//!
//! Sending waits while the queue is full, so a slow transport throttles
//! capture instead of growing memory or dropping audio.

use tokio::sync::mpsc;

use super::backend::AudioFrame;

/// Create a queue holding at most `capacity` frames.
pub fn audio_queue(capacity: usize) -> (AudioQueueSender, AudioQueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (AudioQueueSender { tx }, AudioQueueReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct AudioQueueSender {
    tx: mpsc::Sender<AudioFrame>,
}

impl AudioQueueSender {
    /// Enqueue a frame, waiting for room. Returns the frame back if the
    /// receiving side is gone.
    pub async fn send(&self, frame: AudioFrame) -> Result<(), AudioFrame> {
        self.tx.send(frame).await.map_err(|e| e.0)
    }
}

#[derive(Debug)]
pub struct AudioQueueReceiver {
    rx: mpsc::Receiver<AudioFrame>,
}

impl AudioQueueReceiver {
    /// Dequeue the oldest frame, waiting if the queue is empty. `None` once
    /// every sender is dropped and the queue is drained.
    pub async fn recv(&mut self) -> Option<AudioFrame> {
        self.rx.recv().await
    }
}
