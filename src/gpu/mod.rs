//! GPU rendering using wgpu.
//!
//! Draws the beam lines, the bloom chain and the loading bar into a window
//! surface or a headless texture. Metal on macOS, Vulkan or GL elsewhere.

pub mod context;
pub mod layouts;
pub mod line;
pub mod mipmap;
pub mod pipelines;
pub mod postprocess;
pub mod progress;
pub mod renderer;
pub mod surface;
pub mod textures;

pub use context::{gpu_unavailable, validate_wgsl, GpuContext, GpuError, REQUIRE_GPU_ENV};
pub use line::{LineRenderer, LineStyle, LineUniforms, MAX_TRACES};
pub use postprocess::{BloomCompositor, BloomPlan, BLOOM_SIZE};
pub use progress::{progress_coverage, ProgressRenderer};
pub use renderer::{clear_color, ScopeRenderer};
pub use surface::{FrameTarget, TargetSpec};
pub use textures::ReadbackError;

/// WGSL sources compiled at runtime, by label.
pub const SHADERS: [(&str, &str); 3] = [
    ("line", include_str!("shaders/line.wgsl")),
    ("blit", include_str!("shaders/blit.wgsl")),
    ("progress", include_str!("shaders/progress.wgsl")),
];
