// Microphone input via cpal
//
// cpal delivers audio on its own callback thread at the device's native
// format. The callback downmixes to mono i16 and hands buffers over a bounded
// channel; `read_frame` resamples them to the session rate and cuts fixed-size
// frames. If the reader falls behind the channel fills and the callback drops
// buffers, the same as a hardware buffer overrun.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::time::Duration;
use tracing::{debug, error, info};

use super::backend::{AudioBackendConfig, AudioFrame, AudioInput};
use crate::error::{Result, SessionError};

/// Device buffers held between the callback and the reader
const DEVICE_BUFFER_DEPTH: usize = 64;

/// How long a read waits for the device before giving up
const READ_TIMEOUT: Duration = Duration::from_secs(2);

pub struct MicrophoneInput {
    name: String,
    config: AudioBackendConfig,
    native_rate: u32,
    samples_rx: Receiver<Vec<i16>>,
    pending: VecDeque<i16>,
    frames_read: u64,
    // Dropping this wakes the stream thread, which then drops the stream
    _stop_tx: Sender<()>,
}

impl MicrophoneInput {
    /// Open the default input device.
    ///
    /// The cpal stream is not `Send` on every platform, so it lives on a
    /// dedicated thread for the lifetime of this input.
    pub fn open(config: AudioBackendConfig) -> Result<Self> {
        let (samples_tx, samples_rx) = mpsc::sync_channel(DEVICE_BUFFER_DEPTH);
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(String, u32)>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || match start_stream(samples_tx) {
                Ok((stream, name, rate)) => {
                    let _ = ready_tx.send(Ok((name, rate)));
                    // Blocks until the input is dropped
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| SessionError::Device(format!("failed to spawn capture thread: {e}")))?;

        let (name, native_rate) = ready_rx
            .recv()
            .map_err(|_| SessionError::Device("capture thread exited".to_string()))??;

        info!(
            "Microphone opened: {} ({}Hz native, {}Hz session, {} samples/frame)",
            name, native_rate, config.sample_rate, config.chunk_size
        );

        Ok(Self {
            name,
            config,
            native_rate,
            samples_rx,
            pending: VecDeque::new(),
            frames_read: 0,
            _stop_tx: stop_tx,
        })
    }
}

impl AudioInput for MicrophoneInput {
    fn read_frame(&mut self) -> Result<AudioFrame> {
        while self.pending.len() < self.config.chunk_size {
            match self.samples_rx.recv_timeout(READ_TIMEOUT) {
                Ok(buffer) => {
                    let resampled =
                        resample_linear(&buffer, self.native_rate, self.config.sample_rate);
                    self.pending.extend(resampled);
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(SessionError::Device(format!(
                        "no audio from {} for {:?}",
                        self.name, READ_TIMEOUT
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SessionError::Device(format!("{} stream closed", self.name)));
                }
            }
        }

        let samples: Vec<i16> = self.pending.drain(..self.config.chunk_size).collect();
        let timestamp_ms =
            (self.config.frame_duration().as_secs_f64() * self.frames_read as f64 * 1000.0) as u64;
        self.frames_read += 1;

        Ok(AudioFrame {
            samples,
            sample_rate: self.config.sample_rate,
            timestamp_ms,
        })
    }

    fn discard_backlog(&mut self) {
        let mut buffers = 0;
        while self.samples_rx.try_recv().is_ok() {
            buffers += 1;
        }
        if buffers > 0 || !self.pending.is_empty() {
            debug!(
                "Discarded {} buffered device chunks and {} pending samples",
                buffers,
                self.pending.len()
            );
        }
        self.pending.clear();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn start_stream(samples_tx: SyncSender<Vec<i16>>) -> Result<(cpal::Stream, String, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| SessionError::Device("no input device found".to_string()))?;
    let name = device.name().unwrap_or_else(|_| "default input".to_string());

    let supported = device
        .default_input_config()
        .map_err(|e| SessionError::Device(format!("failed to query input config: {e}")))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let rate = config.sample_rate.0;

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, samples_tx),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, samples_tx),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, samples_tx),
        other => {
            return Err(SessionError::Device(format!(
                "unsupported sample format {other:?}"
            )))
        }
    }
    .map_err(|e| SessionError::Device(format!("failed to build input stream: {e}")))?;

    stream
        .play()
        .map_err(|e| SessionError::Device(format!("failed to start input stream: {e}")))?;

    Ok((stream, name, rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples_tx: SyncSender<Vec<i16>>,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
    i16: cpal::FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mono: Vec<i16> = data
                .chunks(channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s.to_sample::<i16>() as i32).sum();
                    (sum / frame.len() as i32) as i16
                })
                .collect();
            // Full channel: drop the buffer rather than block the audio thread
            let _ = samples_tx.try_send(mono);
        },
        |err: cpal::StreamError| {
            error!("Input stream error: {}", err);
        },
        None,
    )
}

/// Linear-interpolation resampler for mono i16 buffers.
pub(crate) fn resample_linear(input: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || input.is_empty() || from_rate == 0 || to_rate == 0 {
        return input.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((input.len() as f64) / ratio).floor() as usize;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = pos - idx as f64;
            let a = input[idx] as f64;
            let b = input.get(idx + 1).copied().unwrap_or(input[idx]) as f64;
            (a + (b - a) * frac).round() as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_with(buffers: &[Vec<i16>]) -> (MicrophoneInput, SyncSender<Vec<i16>>) {
        let (samples_tx, samples_rx) = mpsc::sync_channel(DEVICE_BUFFER_DEPTH);
        let (stop_tx, _stop_rx) = mpsc::channel();
        for buffer in buffers {
            samples_tx.try_send(buffer.clone()).unwrap();
        }
        let input = MicrophoneInput {
            name: "test mic".to_string(),
            config: AudioBackendConfig {
                sample_rate: 16000,
                chunk_size: 4,
            },
            native_rate: 16000,
            samples_rx,
            pending: VecDeque::new(),
            frames_read: 0,
            _stop_tx: stop_tx,
        };
        (input, samples_tx)
    }

    #[test]
    fn reads_fixed_size_frames_across_buffers() {
        let (mut input, _tx) = input_with(&[vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(input.read_frame().unwrap().samples, vec![1, 2, 3, 4]);
        assert_eq!(input.pending.len(), 2);
    }

    #[test]
    fn discard_backlog_drops_buffered_audio() {
        let (mut input, tx) = input_with(&[vec![1, 2, 3], vec![4, 5, 6], vec![7, 8]]);
        input.read_frame().unwrap();

        input.discard_backlog();
        assert!(input.pending.is_empty());

        tx.try_send(vec![40, 41, 42, 43]).unwrap();
        assert_eq!(input.read_frame().unwrap().samples, vec![40, 41, 42, 43]);
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let input = vec![1, 2, 3, 4];
        assert_eq!(resample_linear(&input, 16000, 16000), input);
    }

    #[test]
    fn resample_down_by_three() {
        let input: Vec<i16> = (0..48).collect();
        let out = resample_linear(&input, 48000, 16000);
        assert_eq!(out.len(), 16);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 3);
        assert_eq!(out[15], 45);
    }

    #[test]
    fn resample_up_interpolates() {
        let out = resample_linear(&[0, 100], 8000, 16000);
        assert_eq!(out, vec![0, 50, 100, 100]);
    }
}
