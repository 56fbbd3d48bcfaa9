//! State shared by the capture, transmit and receive loops.
//!
//! | field        | writer                                   | readers        |
//! |--------------|------------------------------------------|----------------|
//! | `PauseGate`  | receive loop, on turn completion only    | all loops      |
//! | `SessionStep`| capture: Idle -> LocalSpeechDetected     | capture        |
//! |              | receive: -> ResponseStreaming, -> Idle   |                |
//! |              | playback: -> Idle for the response played|                |

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use super::stats::SessionCounters;

/// Session-wide pause flag.
///
/// While paused the capture and transmit loops suspend on
/// [`PauseGate::wait_until_resumed`]; the receive loop keeps running so a
/// resume command can still arrive.
#[derive(Debug, Clone)]
pub struct PauseGate {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_paused(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns true if the gate changed.
    pub fn pause(&self) -> bool {
        self.set(true)
    }

    /// Returns true if the gate changed.
    pub fn resume(&self) -> bool {
        self.set(false)
    }

    fn set(&self, paused: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == paused {
                false
            } else {
                *current = paused;
                true
            }
        })
    }

    /// Wait until the gate is open. Returns immediately if not paused.
    pub async fn wait_until_resumed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|paused| !*paused).await;
    }

    /// Wait until the gate is closed. Returns immediately if paused.
    pub async fn wait_until_paused(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|paused| *paused).await;
    }
}

/// Capture-suppression phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Idle,
    /// The user has started speaking (feedback only)
    LocalSpeechDetected,
    /// A response is being assembled or played; captured audio is dropped
    ResponseStreaming,
}

/// Identifies one response, so a late playback completion cannot clear the
/// step for a newer response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseId(u64);

#[derive(Debug)]
struct StepState {
    step: SessionStep,
    response: u64,
}

/// Guarded [`SessionStep`] with the transitions each loop may make.
#[derive(Debug, Clone)]
pub struct StepTracker {
    inner: Arc<Mutex<StepState>>,
}

impl Default for StepTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StepTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StepState {
                step: SessionStep::Idle,
                response: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StepState> {
        // Transitions are single assignments; a poisoned guard is still consistent
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> SessionStep {
        self.lock().step
    }

    pub fn is_streaming(&self) -> bool {
        self.current() == SessionStep::ResponseStreaming
    }

    /// Idle -> LocalSpeechDetected. Returns true on the transition.
    pub fn mark_local_speech(&self) -> bool {
        let mut state = self.lock();
        if state.step == SessionStep::Idle {
            state.step = SessionStep::LocalSpeechDetected;
            true
        } else {
            false
        }
    }

    /// Enter ResponseStreaming for a new response.
    pub fn begin_response(&self) -> ResponseId {
        let mut state = self.lock();
        state.response += 1;
        state.step = SessionStep::ResponseStreaming;
        ResponseId(state.response)
    }

    /// ResponseStreaming -> Idle, only if `id` is still the latest response.
    /// Returns true on the transition.
    pub fn finish_response(&self, id: ResponseId) -> bool {
        let mut state = self.lock();
        if state.response == id.0 && state.step == SessionStep::ResponseStreaming {
            state.step = SessionStep::Idle;
            true
        } else {
            false
        }
    }

    /// LocalSpeechDetected -> Idle, used when a turn completes without text.
    pub fn clear_local_speech(&self) {
        let mut state = self.lock();
        if state.step == SessionStep::LocalSpeechDetected {
            state.step = SessionStep::Idle;
        }
    }
}

/// Everything the three loops share.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    pub gate: PauseGate,
    pub step: StepTracker,
    pub counters: Arc<SessionCounters>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }
}
