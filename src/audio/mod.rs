//! Audio sources for the scope.
//!
//! This module provides:
//! - Audio decoding via Symphonia (WAV, MP3, FLAC, AAC, Ogg Vorbis)
//! - Background loading with byte progress, from files or HTTP (`http` feature)
//! - Planar stereo buffers and playback clocks
//! - Live capture feeds and the audio platform boundary
//! - cpal input capture (`live-input` feature)

pub mod capture;
#[cfg(feature = "live-input")]
pub mod cpal_input;
#[cfg(feature = "http")]
pub mod fetch;
pub mod job;
pub mod loader;
pub mod platform;
pub mod source;
pub mod synth;

pub use capture::{AnalyserFeed, CaptureFeed, CaptureKind, StreamingFeed};
#[cfg(feature = "live-input")]
pub use cpal_input::CpalPlatform;
pub use job::{LoadJob, TransferProgress};
pub use loader::{load_audio, AudioData, AudioError};
pub use platform::{
    AttachOptions, AudioPlatform, CaptureError, CaptureSource, LiveSession, PlatformCapabilities,
};
pub use source::{ManualClock, PlaybackClock, StereoBuffer, WallClock};
pub use synth::{generate_circle, generate_lissajous, generate_sine, generate_white_noise};
