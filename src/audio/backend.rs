use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// One fixed-size chunk of captured audio (16-bit PCM, mono)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, mono)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Little-endian PCM bytes, the layout the service expects.
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Configuration for audio input devices
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Sample rate delivered to the session
    pub sample_rate: u32,
    /// Samples per frame
    pub chunk_size: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz mono is what the service ingests
            chunk_size: 512,    // 32ms frames
        }
    }
}

impl AudioBackendConfig {
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(self.chunk_size as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Audio input device
///
/// `read_frame` blocks until a full frame is available; callers on the async
/// runtime run it through `spawn_blocking`. A read should complete within
/// roughly one frame duration.
pub trait AudioInput: Send + 'static {
    /// Read the next frame, blocking the calling thread
    fn read_frame(&mut self) -> Result<AudioFrame>;

    /// Drop audio the device buffered while nobody was reading, so the next
    /// read returns live input. Must not block.
    fn discard_backlog(&mut self) {}

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Default microphone
    Microphone,
    /// Replay a WAV file as if it were a microphone
    File(PathBuf),
}

/// Audio input factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Open the input device for `source`.
    ///
    /// Fails with a device error when the device cannot be opened; this is
    /// fatal at session startup.
    pub fn create(source: AudioSource, config: AudioBackendConfig) -> Result<Box<dyn AudioInput>> {
        match source {
            AudioSource::Microphone => {
                let input = super::microphone::MicrophoneInput::open(config)?;
                Ok(Box::new(input))
            }
            AudioSource::File(path) => {
                let input = super::file::FileInput::open(&path, config)?;
                Ok(Box::new(input))
            }
        }
    }
}
