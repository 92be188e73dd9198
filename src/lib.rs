//! Phobz Scope Core
//!
//! GPU X/Y oscilloscope renderer for stereo audio.
//!
//! # Features
//!
//! - Audio loading (WAV, MP3, FLAC, AAC, Ogg Vorbis) via Symphonia, from files or
//!   HTTP (`http` feature), with byte progress
//! - Live capture through a pluggable audio platform, with cpal input
//!   (`live-input` feature)
//! - Analytic Gaussian-beam line rendering with afterglow via wgpu
//! - Optional bloom: mipmapped downsample, separable blur, additive composite
//! - Window surfaces or headless targets with pixel readback
//!
//! # Example
//!
//! ```no_run
//! use phobz_scope::{generate_circle, AudioInput, ManualClock, Scope, ScopeCallbacks, ScopeConfig, TargetSpec};
//!
//! # async fn run() -> Result<(), phobz_scope::ScopeError> {
//! let input = AudioInput::Decoded {
//!     buffer: generate_circle(220.0, 48_000, 2.0, 0.8),
//!     clock: Box::new(ManualClock::new()),
//! };
//! let scope = Scope::new(
//!     TargetSpec::headless(512, 512),
//!     input,
//!     ScopeConfig::default(),
//!     ScopeCallbacks::new().on_error(|message| eprintln!("{message}")),
//! )
//! .await?;
//! scope.tick();
//! let pixels = scope.read_pixels()?;
//! # let _ = pixels;
//! scope.destroy();
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod gpu;
pub mod pipeline;
pub mod scope;

// Re-export commonly used types
pub use audio::{
    generate_circle, generate_lissajous, load_audio, AudioData, AudioError, AudioPlatform,
    CaptureError, CaptureSource, LoadJob, ManualClock, PlatformCapabilities, PlaybackClock,
    StereoBuffer, WallClock,
};
pub use gpu::{GpuContext, GpuError, TargetSpec};
pub use pipeline::{
    AudioInput, Color, FrameLoop, FrameTask, Lifecycle, LiveMode, OptionsPatch, Scope,
    ScopeCallbacks, ScopeConfig, ScopeError, Tick,
};
pub use scope::{Afterglow, Routing, SegmentGeometry, WindowExtractor};
