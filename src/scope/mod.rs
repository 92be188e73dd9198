//! CPU side of the scope renderer.
//!
//! - Sample window extraction and channel routing
//! - Segment quad geometry
//! - Beam intensity and afterglow model (mirrors the line shader)

pub mod beam;
pub mod segments;
pub mod window;

pub use beam::{erf_approx, segment_intensity, Afterglow, SEGMENT_EPSILON};
pub use segments::{
    corner_indices, quad_indices, segment_count, Corner, SegmentGeometry, SegmentVertex,
};
pub use window::{
    window_start, RoutedWindow, Routing, SampleWindow, SweepRamp, Trace, WindowExtractor,
    WindowSource, DEFAULT_LOOKBACK,
};
