//! Sample window extraction and channel routing.
//!
//! Each frame reads a rolling window of stereo pairs, either by seeking into
//! a decoded buffer with the playback time or by snapshotting a live capture
//! feed, then routes the channels onto the X and Y axes.

use crate::audio::{CaptureFeed, StereoBuffer};

/// Default look-back compensating for audio output latency, in seconds.
pub const DEFAULT_LOOKBACK: f64 = 1.0 / 120.0;

/// First sample index of the window for a playback position.
pub fn window_start(position: f64, sample_rate: u32, lookback: f64) -> usize {
    let seconds = (position - lookback).max(0.0);
    (seconds * sample_rate as f64).floor() as usize
}

/// Where the current window comes from.
pub enum WindowSource<'a> {
    /// Decoded buffer seeked by playback time in seconds.
    Buffer {
        buffer: &'a StereoBuffer,
        position: f64,
    },
    /// Most recent samples of a live capture feed.
    Live(&'a dyn CaptureFeed),
}

/// Left/right sample slices of the current window. Both have the same length.
#[derive(Debug, Clone, Copy)]
pub struct SampleWindow<'a> {
    pub left: &'a [f32],
    pub right: &'a [f32],
}

impl SampleWindow<'_> {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Extracts windows of at most `max_len` pairs.
pub struct WindowExtractor {
    max_len: usize,
    lookback: f64,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl WindowExtractor {
    pub fn new(max_len: usize, lookback: f64) -> Self {
        Self {
            max_len,
            lookback,
            left: Vec::with_capacity(max_len),
            right: Vec::with_capacity(max_len),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Extract the window for this frame.
    ///
    /// Buffer windows borrow the buffer directly; live windows are copied into
    /// scratch storage owned by the extractor.
    pub fn extract<'a>(&'a mut self, source: WindowSource<'a>) -> SampleWindow<'a> {
        match source {
            WindowSource::Buffer { buffer, position } => {
                let start = window_start(position, buffer.sample_rate, self.lookback);
                let total = buffer.len();
                let start = start.min(total);
                let end = (start + self.max_len).min(total);
                SampleWindow {
                    left: &buffer.left[start..end],
                    right: &buffer.right[start..end],
                }
            }
            WindowSource::Live(feed) => {
                let len = feed.snapshot(self.max_len, &mut self.left, &mut self.right);
                SampleWindow {
                    left: &self.left[..len],
                    right: &self.right[..len],
                }
            }
        }
    }
}

/// Channel routing flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Routing {
    /// Exchange the left and right channel roles.
    pub swap: bool,
    /// Replace the X axis with a linear time ramp.
    pub sweep: bool,
}

/// Linear ramp from -1 to 1, regenerated only when the window length changes.
#[derive(Debug, Default, Clone)]
pub struct SweepRamp {
    values: Vec<f32>,
}

impl SweepRamp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ramp of exactly `len` values, monotonically increasing from -1 to 1.
    pub fn for_len(&mut self, len: usize) -> &[f32] {
        if self.values.len() != len {
            self.values.clear();
            match len {
                0 => {}
                1 => self.values.push(-1.0),
                _ => {
                    let last = (len - 1) as f64;
                    self.values
                        .extend((0..len).map(|i| (-1.0 + 2.0 * i as f64 / last) as f32));
                    self.values[len - 1] = 1.0;
                }
            }
        }
        &self.values
    }
}

/// One X/Y axis pair to draw.
#[derive(Debug, Clone, Copy)]
pub struct Trace<'a> {
    pub x: &'a [f32],
    pub y: &'a [f32],
}

impl Trace<'_> {
    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Routed window: a primary trace and, for sweep with swap, a secondary trace.
#[derive(Debug, Clone, Copy)]
pub struct RoutedWindow<'a> {
    pub primary: Trace<'a>,
    pub secondary: Option<Trace<'a>>,
}

impl<'a> RoutedWindow<'a> {
    /// Route a window onto the axes.
    ///
    /// Without sweep the window plots as `(left, right)`, or `(right, left)`
    /// when swapped. Sweep plots the left channel against `ramp`; adding swap
    /// also plots the right channel against `ramp` as the secondary trace.
    pub fn route(window: SampleWindow<'a>, routing: Routing, ramp: &'a [f32]) -> Self {
        match (routing.sweep, routing.swap) {
            (true, swap) => Self {
                primary: Trace {
                    x: ramp,
                    y: window.left,
                },
                secondary: swap.then_some(Trace {
                    x: ramp,
                    y: window.right,
                }),
            },
            (false, false) => Self {
                primary: Trace {
                    x: window.left,
                    y: window.right,
                },
                secondary: None,
            },
            (false, true) => Self {
                primary: Trace {
                    x: window.right,
                    y: window.left,
                },
                secondary: None,
            },
        }
    }

    pub fn traces(&self) -> impl Iterator<Item = Trace<'a>> + '_ {
        std::iter::once(self.primary).chain(self.secondary)
    }
}
