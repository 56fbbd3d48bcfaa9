use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Live counters updated by the session loops
#[derive(Debug, Default)]
pub struct SessionCounters {
    pub frames_captured: AtomicUsize,
    pub frames_discarded: AtomicUsize,
    pub frames_enqueued: AtomicUsize,
    pub frames_sent: AtomicUsize,
    pub turns_completed: AtomicUsize,
    pub playbacks: AtomicUsize,
    pub pauses: AtomicUsize,
}

impl SessionCounters {
    pub(crate) fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self, session_id: &str, started_at: DateTime<Utc>) -> SessionStats {
        let duration = Utc::now().signed_duration_since(started_at);

        SessionStats {
            session_id: session_id.to_string(),
            started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_captured: self.frames_captured.load(Ordering::SeqCst),
            frames_discarded: self.frames_discarded.load(Ordering::SeqCst),
            frames_enqueued: self.frames_enqueued.load(Ordering::SeqCst),
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            turns_completed: self.turns_completed.load(Ordering::SeqCst),
            playbacks: self.playbacks.load(Ordering::SeqCst),
            pauses: self.pauses.load(Ordering::SeqCst),
        }
    }
}

/// Statistics about a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    /// When the session loops started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Frames read from the input device
    pub frames_captured: usize,

    /// Frames read while a response was streaming or playing, then dropped
    pub frames_discarded: usize,

    /// Frames handed to the transmit queue
    pub frames_enqueued: usize,

    /// Frames sent to the service
    pub frames_sent: usize,

    /// Completed response turns (handshake excluded)
    pub turns_completed: usize,

    /// Responses spoken back
    pub playbacks: usize,

    /// Times the session was paused by a control command
    pub pauses: usize,
}
