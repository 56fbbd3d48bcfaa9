use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::audio::microphone::resample_linear;
use crate::error::{Result, SessionError};

/// Give up when the device stops asking for audio for this long
const PLAYBACK_GRACE: Duration = Duration::from_secs(2);

/// Let the device drain its last buffer before the stream is dropped
const DRAIN_DELAY: Duration = Duration::from_millis(150);

/// Play mono 16-bit PCM chunks on the default output device as they arrive.
///
/// Blocks until `chunks` is disconnected and everything received has been
/// played. The device plays silence while waiting for the next chunk.
pub fn play_pcm_stream(chunks: Receiver<Vec<i16>>, sample_rate: u32) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| SessionError::Playback("no output device found".to_string()))?;

    let supported = device
        .default_output_config()
        .map_err(|e| SessionError::Playback(format!("failed to query output config: {e}")))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let feed = PcmFeed {
        chunks,
        source_rate: sample_rate,
        device_rate: config.sample_rate.0,
        pending: VecDeque::new(),
        finished: false,
    };
    let callbacks = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = mpsc::channel();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => {
            build_output::<f32>(&device, &config, feed, callbacks.clone(), done_tx)
        }
        cpal::SampleFormat::I16 => {
            build_output::<i16>(&device, &config, feed, callbacks.clone(), done_tx)
        }
        cpal::SampleFormat::U16 => {
            build_output::<u16>(&device, &config, feed, callbacks.clone(), done_tx)
        }
        other => {
            return Err(SessionError::Playback(format!(
                "unsupported sample format {other:?}"
            )))
        }
    }
    .map_err(|e| SessionError::Playback(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| SessionError::Playback(format!("failed to start output stream: {e}")))?;

    let mut seen = 0;
    loop {
        match done_rx.recv_timeout(PLAYBACK_GRACE) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                let now = callbacks.load(Ordering::Relaxed);
                if now == seen {
                    warn!("Output device stopped requesting audio; abandoning playback");
                    break;
                }
                seen = now;
            }
        }
    }
    std::thread::sleep(DRAIN_DELAY);
    debug!("Playback finished");

    Ok(())
}

/// Device-rate samples pulled from the chunk channel on demand.
struct PcmFeed {
    chunks: Receiver<Vec<i16>>,
    source_rate: u32,
    device_rate: u32,
    pending: VecDeque<i16>,
    finished: bool,
}

impl PcmFeed {
    /// Next sample, or silence when nothing has arrived yet.
    fn next_sample(&mut self) -> i16 {
        while self.pending.is_empty() && !self.finished {
            match self.chunks.try_recv() {
                Ok(chunk) => self.pending.extend(resample_linear(
                    &chunk,
                    self.source_rate,
                    self.device_rate,
                )),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.finished = true,
            }
        }
        self.pending.pop_front().unwrap_or(0)
    }

    fn is_drained(&self) -> bool {
        self.finished && self.pending.is_empty()
    }
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut feed: PcmFeed,
    callbacks: Arc<AtomicUsize>,
    done_tx: Sender<()>,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let channels = config.channels.max(1) as usize;
    let mut done_tx = Some(done_tx);

    device.build_output_stream(
        config,
        move |out: &mut [T], _: &cpal::OutputCallbackInfo| {
            callbacks.fetch_add(1, Ordering::Relaxed);
            for frame in out.chunks_mut(channels) {
                let sample = feed.next_sample();
                for slot in frame.iter_mut() {
                    *slot = sample.to_sample::<T>();
                }
            }
            if feed.is_drained() {
                if let Some(tx) = done_tx.take() {
                    let _ = tx.send(());
                }
            }
        },
        |err: cpal::StreamError| {
            error!("Output stream error: {}", err);
        },
        None,
    )
}
