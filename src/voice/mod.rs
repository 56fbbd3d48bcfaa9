//! Speech synthesis and playback of responses.

pub mod elevenlabs;
pub mod player;

use async_trait::async_trait;

use crate::error::Result;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use player::play_pcm_stream;

/// Turns text into audio and plays it.
///
/// Failures are reported as playback errors and never end the session.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and play it to completion.
    async fn speak(&self, text: &str) -> Result<()>;

    /// Synthesizer name for logging
    fn name(&self) -> &str;
}
