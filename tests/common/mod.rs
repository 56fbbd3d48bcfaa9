// Shared fakes for session tests: scripted transport, synthetic microphone,
// recording renderer and synthesizer.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use loqa_tutor::error::{Result, SessionError};
use loqa_tutor::protocol::{ClientMessage, FrameSink, FrameSource, InboundFrame, Transport};
use loqa_tutor::render::{Progress, Renderer};
use loqa_tutor::voice::SpeechSynthesizer;
use loqa_tutor::{AudioFrame, AudioInput};
use std::sync::atomic::{AtomicBool, AtomicI16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub type Inbound = mpsc::UnboundedSender<Result<Vec<InboundFrame>>>;

pub struct ScriptedSource {
    rx: mpsc::UnboundedReceiver<Result<Vec<InboundFrame>>>,
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn next_frames(&mut self) -> Option<Result<Vec<InboundFrame>>> {
        self.rx.recv().await
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    pub sent: Arc<Mutex<Vec<ClientMessage>>>,
    /// Fail every send once this many messages have gone out
    pub fail_after: Option<usize>,
    pub closed: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<ClientMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn audio_count(&self) -> usize {
        self.messages()
            .iter()
            .filter(|m| matches!(m, ClientMessage::RealtimeInput(_)))
            .count()
    }

    /// First sample of every audio message, in send order
    pub fn audio_sequence(&self) -> Vec<i16> {
        self.messages()
            .iter()
            .filter_map(|m| match m {
                ClientMessage::RealtimeInput(input) => {
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(&input.media_chunks[0].data)
                        .unwrap();
                    Some(i16::from_le_bytes([bytes[0], bytes[1]]))
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        let mut sent = self.sent.lock().unwrap();
        if let Some(limit) = self.fail_after {
            if sent.len() >= limit {
                return Err(SessionError::Transport("connection reset".to_string()));
            }
        }
        sent.push(message.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A transport whose inbound side is fed by the returned sender. Dropping
/// the sender closes the transport.
pub fn scripted_transport(sink: RecordingSink) -> (Transport, Inbound) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Transport::new(Box::new(sink), Box::new(ScriptedSource { rx })),
        tx,
    )
}

pub fn text(fragment: &str) -> Result<Vec<InboundFrame>> {
    Ok(vec![InboundFrame::TextFragment(fragment.to_string())])
}

pub fn complete() -> Result<Vec<InboundFrame>> {
    Ok(vec![InboundFrame::TurnComplete])
}

pub fn setup_complete() -> Result<Vec<InboundFrame>> {
    Ok(vec![InboundFrame::SetupComplete])
}

/// Feed the handshake acknowledgement.
pub fn acknowledge(inbound: &Inbound) {
    inbound.send(setup_complete()).unwrap();
    inbound.send(text("OK")).unwrap();
    inbound.send(complete()).unwrap();
}

/// Send a whole turn as one fragment plus a completion marker.
pub fn turn(inbound: &Inbound, body: &str) {
    inbound.send(text(body)).unwrap();
    inbound.send(complete()).unwrap();
}

/// Microphone stand-in. Sample 0 of each frame carries a sequence number;
/// the rest alternate +/- `amplitude`.
#[derive(Clone)]
pub struct SyntheticMic {
    pub reads: Arc<AtomicUsize>,
    pub backlog_discards: Arc<AtomicUsize>,
    pub amplitude: Arc<AtomicI16>,
    pub interval: Duration,
    pub chunk_size: usize,
}

impl SyntheticMic {
    pub fn new(amplitude: i16) -> Self {
        Self {
            reads: Arc::new(AtomicUsize::new(0)),
            backlog_discards: Arc::new(AtomicUsize::new(0)),
            amplitude: Arc::new(AtomicI16::new(amplitude)),
            interval: Duration::from_millis(2),
            chunk_size: 64,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn backlog_discards(&self) -> usize {
        self.backlog_discards.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Box<dyn AudioInput> {
        Box::new(self.clone())
    }
}

impl AudioInput for SyntheticMic {
    fn read_frame(&mut self) -> Result<AudioFrame> {
        std::thread::sleep(self.interval);
        let seq = self.reads.fetch_add(1, Ordering::SeqCst);
        let amp = self.amplitude.load(Ordering::SeqCst);
        let mut samples: Vec<i16> = (0..self.chunk_size)
            .map(|i| if i % 2 == 0 { amp } else { -amp })
            .collect();
        samples[0] = seq as i16;
        Ok(AudioFrame {
            samples,
            sample_rate: 16000,
            timestamp_ms: seq as u64 * 4,
        })
    }

    fn discard_backlog(&mut self) {
        self.backlog_discards.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub markers: Mutex<Vec<Progress>>,
    pub turns: Mutex<Vec<String>>,
}

impl RecordingRenderer {
    pub fn turns(&self) -> Vec<String> {
        self.turns.lock().unwrap().clone()
    }

    pub fn saw(&self, marker: Progress) -> bool {
        self.markers.lock().unwrap().contains(&marker)
    }
}

impl Renderer for RecordingRenderer {
    fn progress(&self, marker: Progress) {
        self.markers.lock().unwrap().push(marker);
    }

    fn render_turn(&self, text: &str) {
        self.turns.lock().unwrap().push(text.to_string());
    }
}

#[derive(Default)]
pub struct RecordingSynth {
    pub spoken: Mutex<Vec<String>>,
    pub fail: bool,
    pub delay: Duration,
}

impl RecordingSynth {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynth {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        tokio::time::sleep(self.delay).await;
        if self.fail {
            Err(SessionError::Playback("speaker unplugged".to_string()))
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Poll `condition` every few milliseconds until it holds or `limit` passes.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
