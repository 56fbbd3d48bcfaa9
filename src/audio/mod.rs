pub mod backend;
pub mod file;
pub mod level;
pub mod microphone;
pub mod queue;

pub use backend::{AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioInput, AudioSource};
pub use file::{AudioFile, FileInput};
pub use level::{mean_amplitude, pronunciation_score, DEFAULT_SCORE};
pub use microphone::MicrophoneInput;
pub use queue::{audio_queue, AudioQueueReceiver, AudioQueueSender};
