//! User-facing presentation of the session.
//!
//! Progress markers and responses go to a [`Renderer`], separate from the
//! `tracing` log stream.

use std::io::Write;

/// Cosmetic markers emitted while the session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    HandshakeComplete,
    /// Capture started; the user may speak
    Listening,
    /// First loud frame since the last response
    SpeechDetected,
    /// Any loud frame
    VoiceActivity,
    /// First fragment of a response arrived
    ResponseStarted,
    /// Another fragment arrived
    Fragment,
    Paused,
    Resumed,
    PlaybackStarted,
    PlaybackFinished,
    PlaybackFailed,
}

pub trait Renderer: Send + Sync {
    fn progress(&self, marker: Progress);

    /// Present a completed response (all language segments).
    fn render_turn(&self, text: &str);
}

/// Renders to stdout.
#[derive(Debug, Default)]
pub struct ConsoleRenderer;

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for ConsoleRenderer {
    fn progress(&self, marker: Progress) {
        let text = match marker {
            Progress::HandshakeComplete => "Session ready ✅\n",
            Progress::Listening => "🎤 Please speak English\n",
            Progress::SpeechDetected => "🎤 :",
            Progress::VoiceActivity => "*",
            Progress::ResponseStarted => "\n♻️ Processing: ",
            Progress::Fragment => "-",
            Progress::Paused => "\n⏸️ Session paused. Say \"OK let's continue\" to resume\n",
            Progress::Resumed => "\n▶️ Session resumed\n",
            Progress::PlaybackStarted => "🙎 Playing response...\n",
            Progress::PlaybackFinished => "🙎 Playback finished\n",
            Progress::PlaybackFailed => "🙎 Playback failed\n",
        };
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn render_turn(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "\n🤖 =============================================");
        let _ = writeln!(out, "{}", text.trim_end());
        let _ = out.flush();
    }
}
