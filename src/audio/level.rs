//! Coarse signal heuristics over raw PCM.
//!
//! None of this is speech recognition. `mean_amplitude` drives the
//! "you are speaking" feedback and `pronunciation_score` is a rough 0-100
//! figure derived from energy and zero crossings.

use tracing::warn;

use crate::error::{Result, SessionError};

/// Score returned when a buffer cannot be scored.
pub const DEFAULT_SCORE: u8 = 70;

/// Mean absolute sample value of a frame.
pub fn mean_amplitude(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let total: u64 = samples.iter().map(|&s| (s as i32).unsigned_abs() as u64).sum();
    total as f32 / samples.len() as f32
}

/// Score little-endian 16-bit PCM bytes, falling back to [`DEFAULT_SCORE`].
pub fn pronunciation_score(pcm: &[u8]) -> u8 {
    match try_pronunciation_score(pcm) {
        Ok(score) => score,
        Err(e) => {
            warn!("{}", e);
            DEFAULT_SCORE
        }
    }
}

/// Score little-endian 16-bit PCM bytes.
pub fn try_pronunciation_score(pcm: &[u8]) -> Result<u8> {
    if pcm.is_empty() {
        return Err(SessionError::Scoring("empty audio buffer".to_string()));
    }
    if pcm.len() % 2 != 0 {
        return Err(SessionError::Scoring(format!(
            "buffer length {} is not a whole number of 16-bit samples",
            pcm.len()
        )));
    }

    let samples: Vec<i16> = pcm
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();

    let energy = mean_amplitude(&samples) as f64;
    let zero_crossings = samples
        .windows(2)
        .filter(|w| (w[0] < 0) != (w[1] < 0))
        .count() as f64;

    let energy_score = (energy / 1000.0).min(100.0);
    let rhythm_score = (zero_crossings / 100.0).min(100.0);

    let score = (0.6 * energy_score + 0.4 * rhythm_score) as i64;
    Ok(score.clamp(0, 100) as u8)
}
