pub mod audio;
pub mod config;
pub mod error;
pub mod protocol;
pub mod render;
pub mod session;
pub mod voice;

pub use audio::{
    AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioInput, AudioSource,
    FileInput,
};
pub use config::Config;
pub use error::{Result, SessionError};
pub use protocol::{ClientMessage, FrameSink, FrameSource, InboundFrame, Transport};
pub use render::{ConsoleRenderer, Progress, Renderer};
pub use session::{
    ControlCommand, PauseGate, SessionConfig, SessionOrchestrator, SessionStats, SessionStep,
    SharedState,
};
pub use voice::{ElevenLabsSynthesizer, SpeechSynthesizer};
