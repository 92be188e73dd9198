//! Live capture feeds.
//!
//! A capture callback running outside the frame loop pushes blocks of stereo
//! samples into a feed; the frame loop takes non-destructive snapshots of the
//! most recent samples. Two strategies share the [`CaptureFeed`] interface:
//!
//! - [`AnalyserFeed`]: the callback only enqueues frames on a lock-free queue
//!   and the frame loop pulls them into its history when it snapshots.
//! - [`StreamingFeed`]: the callback shifts a fixed-size buffer forward on
//!   every block, for platforms without pull-based snapshots.

use std::sync::{Arc, Mutex};

use crossbeam::queue::ArrayQueue;

use super::platform::PlatformCapabilities;
use crate::pipeline::LiveMode;

/// Capture strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Analyser,
    Streaming,
}

impl CaptureKind {
    /// Pick a strategy for the requested live mode from what the platform supports.
    ///
    /// Returns `None` when live capture is off. An explicit analyser request on a
    /// platform without analyser snapshots falls back to streaming.
    pub fn probe(mode: LiveMode, caps: &PlatformCapabilities) -> Option<Self> {
        match mode {
            LiveMode::Off => None,
            LiveMode::Streaming => Some(Self::Streaming),
            LiveMode::Auto | LiveMode::Analyser if caps.analyser_snapshots => Some(Self::Analyser),
            LiveMode::Analyser => {
                log::warn!("Analyser capture not supported by this platform, using streaming");
                Some(Self::Streaming)
            }
            LiveMode::Auto => Some(Self::Streaming),
        }
    }

    /// Create an empty feed of this kind holding `capacity` frames.
    pub fn create_feed(self, capacity: usize) -> Arc<dyn CaptureFeed> {
        match self {
            Self::Analyser => Arc::new(AnalyserFeed::new(capacity)),
            Self::Streaming => Arc::new(StreamingFeed::new(capacity)),
        }
    }
}

/// Rolling sample feed written by a capture callback and read by the frame loop.
pub trait CaptureFeed: Send + Sync {
    fn kind(&self) -> CaptureKind;

    /// Number of frames a snapshot can hold.
    fn capacity(&self) -> usize;

    /// Append one block of planar samples. Called from the capture callback.
    fn push_block(&self, left: &[f32], right: &[f32]);

    /// Copy the most recent `min(max_len, capacity)` frames, oldest first,
    /// into `left` and `right`. Returns the number of frames copied.
    fn snapshot(&self, max_len: usize, left: &mut Vec<f32>, right: &mut Vec<f32>) -> usize;
}

/// Fixed-length stereo history, oldest sample first.
struct History {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl History {
    fn silent(capacity: usize) -> Self {
        Self {
            left: vec![0.0; capacity],
            right: vec![0.0; capacity],
        }
    }

    /// Shift forward by `left.len()` samples, dropping the oldest.
    fn shift_in(&mut self, left: &[f32], right: &[f32]) {
        let capacity = self.left.len();
        let n = left.len().min(right.len());
        let (left, right) = (&left[n.saturating_sub(capacity)..n], &right[n.saturating_sub(capacity)..n]);
        let keep = capacity - left.len();
        self.left.copy_within(capacity - keep.., 0);
        self.right.copy_within(capacity - keep.., 0);
        self.left[keep..].copy_from_slice(left);
        self.right[keep..].copy_from_slice(right);
    }

    fn copy_latest(&self, max_len: usize, left: &mut Vec<f32>, right: &mut Vec<f32>) -> usize {
        let len = max_len.min(self.left.len());
        let from = self.left.len() - len;
        left.clear();
        right.clear();
        left.extend_from_slice(&self.left[from..]);
        right.extend_from_slice(&self.right[from..]);
        len
    }
}

/// Pull-based feed. The capture side never takes a lock.
pub struct AnalyserFeed {
    queue: ArrayQueue<[f32; 2]>,
    history: Mutex<History>,
}

impl AnalyserFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: ArrayQueue::new(capacity),
            history: Mutex::new(History::silent(capacity)),
        }
    }
}

impl CaptureFeed for AnalyserFeed {
    fn kind(&self) -> CaptureKind {
        CaptureKind::Analyser
    }

    fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    fn push_block(&self, left: &[f32], right: &[f32]) {
        for (&l, &r) in left.iter().zip(right) {
            // Overwrite the oldest pending frame when the reader falls behind
            self.queue.force_push([l, r]);
        }
    }

    fn snapshot(&self, max_len: usize, left: &mut Vec<f32>, right: &mut Vec<f32>) -> usize {
        let Ok(mut history) = self.history.lock() else {
            return 0;
        };
        let mut pending_left = Vec::with_capacity(self.queue.len());
        let mut pending_right = Vec::with_capacity(self.queue.len());
        while let Some([l, r]) = self.queue.pop() {
            pending_left.push(l);
            pending_right.push(r);
        }
        history.shift_in(&pending_left, &pending_right);
        history.copy_latest(max_len, left, right)
    }
}

/// Push-based feed shifted forward by every capture callback.
pub struct StreamingFeed {
    capacity: usize,
    history: Mutex<History>,
}

impl StreamingFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: Mutex::new(History::silent(capacity)),
        }
    }
}

impl CaptureFeed for StreamingFeed {
    fn kind(&self) -> CaptureKind {
        CaptureKind::Streaming
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn push_block(&self, left: &[f32], right: &[f32]) {
        if let Ok(mut history) = self.history.lock() {
            history.shift_in(left, right);
        }
    }

    fn snapshot(&self, max_len: usize, left: &mut Vec<f32>, right: &mut Vec<f32>) -> usize {
        match self.history.lock() {
            Ok(history) => history.copy_latest(max_len, left, right),
            Err(_) => 0,
        }
    }
}
