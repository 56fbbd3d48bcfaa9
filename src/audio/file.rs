use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use super::backend::{AudioBackendConfig, AudioFrame, AudioInput};
use crate::error::SessionError;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            anyhow::bail!(
                "Expected 16-bit integer PCM, got {} bits {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Mono samples at `sample_rate`, averaging channels when needed.
    pub fn mono_samples(&self, sample_rate: u32) -> Result<Vec<i16>> {
        if self.sample_rate != sample_rate {
            anyhow::bail!(
                "Resampling not supported. Expected {}Hz, got {}Hz",
                sample_rate,
                self.sample_rate
            );
        }

        if self.channels <= 1 {
            return Ok(self.samples.clone());
        }

        let channels = self.channels as usize;
        Ok(self
            .samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect())
    }
}

/// Input device that replays a WAV file at real-time pace.
///
/// Once the file is exhausted it keeps delivering silence, like a muted
/// microphone, so the session stays alive for the remaining responses.
pub struct FileInput {
    name: String,
    samples: Vec<i16>,
    position: usize,
    config: AudioBackendConfig,
    frames_read: u64,
    started: Option<Instant>,
    paced: bool,
}

impl FileInput {
    pub fn open(path: &Path, config: AudioBackendConfig) -> Result<Self, SessionError> {
        let file = AudioFile::open(path).map_err(|e| SessionError::Device(format!("{e:#}")))?;
        let samples = file
            .mono_samples(config.sample_rate)
            .map_err(|e| SessionError::Device(format!("{e:#}")))?;

        let mut input = Self::from_samples(samples, config);
        input.name = file.path;
        Ok(input)
    }

    pub fn from_samples(samples: Vec<i16>, config: AudioBackendConfig) -> Self {
        Self {
            name: "memory".to_string(),
            samples,
            position: 0,
            config,
            frames_read: 0,
            started: None,
            paced: true,
        }
    }

    /// Deliver frames as fast as they are read.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    fn wait_for_frame(&mut self) {
        if !self.paced {
            return;
        }
        let started = *self.started.get_or_insert_with(Instant::now);
        let due = started + self.config.frame_duration().mul_f64((self.frames_read + 1) as f64);
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
    }
}

impl AudioInput for FileInput {
    fn read_frame(&mut self) -> Result<AudioFrame, SessionError> {
        self.wait_for_frame();

        let chunk = self.config.chunk_size;
        let mut samples = vec![0i16; chunk];
        let end = (self.position + chunk).min(self.samples.len());
        if self.position < end {
            samples[..end - self.position].copy_from_slice(&self.samples[self.position..end]);
            self.position = end;
        }

        let timestamp_ms =
            (self.config.frame_duration() * self.frames_read as u32).as_millis() as u64;
        self.frames_read += 1;

        Ok(AudioFrame {
            samples,
            sample_rate: self.config.sample_rate,
            timestamp_ms,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
