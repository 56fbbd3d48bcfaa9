//! Conversation session management
//!
//! This module provides the `SessionOrchestrator` and the three loops it
//! supervises:
//! - capture: microphone -> bounded audio queue
//! - transmit: audio queue -> service
//! - receive: service -> turns -> control commands, rendering, playback

mod capture;
mod config;
mod control;
mod orchestrator;
mod playback;
mod receive;
mod state;
mod stats;
mod transmit;
mod turn;

pub use capture::run_capture_loop;
pub use config::SessionConfig;
pub use control::{first_segment, ControlCommand};
pub use orchestrator::SessionOrchestrator;
pub use playback::PlaybackInvoker;
pub use receive::{run_receive_loop, TurnReactor};
pub use state::{PauseGate, ResponseId, SessionStep, SharedState, StepTracker};
pub use stats::{SessionCounters, SessionStats};
pub use transmit::run_transmit_loop;
pub use turn::{AssemblerEvent, Turn, TurnAssembler};
