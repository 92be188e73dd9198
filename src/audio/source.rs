//! Decoded stereo audio and playback clocks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::loader::AudioData;

/// Planar stereo samples ready for window extraction.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl StereoBuffer {
    pub fn new(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        let len = left.len().min(right.len());
        let (mut left, mut right) = (left, right);
        left.truncate(len);
        right.truncate(len);
        Self {
            left,
            right,
            sample_rate,
        }
    }

    /// Split interleaved samples into two channels.
    ///
    /// Mono input feeds both channels; channels past the second are ignored.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for frame in samples.chunks_exact(channels) {
            left.push(frame[0]);
            right.push(if channels > 1 { frame[1] } else { frame[0] });
        }
        Self {
            left,
            right,
            sample_rate,
        }
    }

    /// Number of complete stereo frames; a longer channel's tail is ignored.
    pub fn len(&self) -> usize {
        self.left.len().min(self.right.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }
}

impl From<AudioData> for StereoBuffer {
    fn from(audio: AudioData) -> Self {
        Self::from_interleaved(&audio.samples, audio.channels, audio.sample_rate)
    }
}

/// Playback position of the audio being visualized.
pub trait PlaybackClock {
    /// Current playback time in seconds.
    fn current_time(&self) -> f64;
}

/// Clock driven explicitly by the caller. Clones share the same position.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.current_time() + seconds);
    }
}

impl PlaybackClock for ManualClock {
    fn current_time(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Wall-clock playback starting when the clock is created.
#[derive(Debug, Clone)]
pub struct WallClock {
    started: Instant,
}

impl WallClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl PlaybackClock for WallClock {
    fn current_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interleaved_stereo() {
        let buffer = StereoBuffer::from_interleaved(&[0.1, 0.2, 0.3, 0.4], 2, 48_000);
        assert_eq!(buffer.left, vec![0.1, 0.3]);
        assert_eq!(buffer.right, vec![0.2, 0.4]);
    }

    #[test]
    fn test_from_interleaved_mono_duplicates() {
        let buffer = StereoBuffer::from_interleaved(&[0.5, -0.5], 1, 48_000);
        assert_eq!(buffer.left, buffer.right);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_from_interleaved_drops_extra_channels() {
        let buffer = StereoBuffer::from_interleaved(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 48_000);
        assert_eq!(buffer.left, vec![1.0, 4.0]);
        assert_eq!(buffer.right, vec![2.0, 5.0]);
    }

    #[test]
    fn test_duration() {
        let buffer = StereoBuffer::new(vec![0.0; 24_000], vec![0.0; 24_000], 48_000);
        assert!((buffer.duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let view = clock.clone();
        clock.set(1.5);
        view.advance(0.5);
        assert_eq!(clock.current_time(), 2.0);
    }
}
