//! Audio platform boundary for live capture.
//!
//! The platform owns the audio graph. A scope attaches a capture feed to a
//! [`CaptureSource`] for as long as it runs live, and on teardown detaches it,
//! reconnecting the source straight to the audio output so playback keeps going.
//! The source handle is move-only: a platform allows one tap per source, so the
//! handle is handed from one scope to the next instead of being duplicated.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::capture::{CaptureFeed, CaptureKind};

/// Errors raised by an audio platform while wiring live capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Live capture unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to attach capture: {0}")]
    Attach(String),
    #[error("Failed to detach capture: {0}")]
    Detach(String),
}

/// What a platform can do, reported up front instead of guessed from its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Pull-based snapshots of the latest samples are supported.
    pub analyser_snapshots: bool,
    /// A unity-gain stage must sit between the source and the capture tap,
    /// otherwise the tap receives silence.
    pub needs_gain_passthrough: bool,
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self {
            analyser_snapshots: true,
            needs_gain_passthrough: false,
        }
    }
}

/// Handle to an upstream audio source that can be tapped for live capture.
///
/// Deliberately neither `Clone` nor `Copy`.
pub struct CaptureSource {
    id: u64,
    label: String,
}

impl CaptureSource {
    pub fn new(id: u64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaptureSource({}, {:?})", self.id, self.label)
    }
}

/// How a capture tap is inserted into the audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachOptions {
    pub kind: CaptureKind,
    /// Insert a unity-gain stage in front of the tap.
    pub gain_passthrough: bool,
}

/// Audio graph operations needed for live mode.
pub trait AudioPlatform {
    fn capabilities(&self) -> PlatformCapabilities;

    /// Sample rate of captured audio in Hz.
    fn sample_rate(&self) -> u32;

    /// Route `source` through a tap that pushes into `feed`, keeping it audible.
    fn attach(
        &mut self,
        source: &CaptureSource,
        feed: Arc<dyn CaptureFeed>,
        options: AttachOptions,
    ) -> Result<(), CaptureError>;

    /// Remove the tap and reconnect `source` directly to the output.
    fn detach(&mut self, source: &CaptureSource) -> Result<(), CaptureError>;
}

/// An attached capture tap. Releasing it hands the source back.
pub struct LiveSession {
    platform: Box<dyn AudioPlatform>,
    source: Option<CaptureSource>,
    feed: Arc<dyn CaptureFeed>,
}

impl LiveSession {
    /// Probe the platform, create a feed of `capacity` frames and attach it.
    pub fn start(
        mut platform: Box<dyn AudioPlatform>,
        source: CaptureSource,
        kind: CaptureKind,
        capacity: usize,
    ) -> Result<Self, CaptureError> {
        let caps = platform.capabilities();
        let feed = kind.create_feed(capacity);
        let options = AttachOptions {
            kind,
            gain_passthrough: caps.needs_gain_passthrough,
        };
        platform.attach(&source, Arc::clone(&feed), options)?;
        log::info!(
            "Live capture attached to {} ({:?}, gain passthrough: {})",
            source.label(),
            kind,
            options.gain_passthrough
        );
        Ok(Self {
            platform,
            source: Some(source),
            feed,
        })
    }

    pub fn feed(&self) -> &dyn CaptureFeed {
        self.feed.as_ref()
    }

    pub fn sample_rate(&self) -> u32 {
        self.platform.sample_rate()
    }

    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }

    /// Detach the tap and return the source. Later calls return `None`.
    pub fn release(&mut self) -> Option<CaptureSource> {
        let source = self.source.take()?;
        if let Err(e) = self.platform.detach(&source) {
            log::warn!("Detaching live capture from {} failed: {e}", source.label());
        }
        Some(source)
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.release();
    }
}
