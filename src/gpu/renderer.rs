//! Frame sequencing for the scope.
//!
//! `ScopeRenderer` owns every GPU resource of one scope instance: the target,
//! the line renderer, the bloom layers and the progress bar. Each call draws
//! and presents exactly one frame.

use super::context::{GpuContext, GpuError};
use super::line::{LineRenderer, LineStyle, LineTarget, MAX_TRACES};
use super::postprocess::BloomCompositor;
use super::progress::ProgressRenderer;
use super::surface::{FrameTarget, TargetSpec};
use super::textures::ReadbackError;
use crate::scope::{SegmentGeometry, Trace};

/// Convert an RGBA color to a clear value.
pub fn clear_color(rgba: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: rgba[0] as f64,
        g: rgba[1] as f64,
        b: rgba[2] as f64,
        a: rgba[3] as f64,
    }
}

/// GPU side of one scope.
pub struct ScopeRenderer {
    ctx: GpuContext,
    target: FrameTarget,
    lines: LineRenderer,
    bloom: BloomCompositor,
    progress: ProgressRenderer,
    geometry: Vec<SegmentGeometry>,
    released: bool,
}

impl ScopeRenderer {
    /// Create the context, target and all passes for windows of up to
    /// `max_len` samples. Shader errors surface here.
    pub async fn new(spec: TargetSpec, max_len: usize, bar_color: [f32; 4]) -> Result<Self, GpuError> {
        let (ctx, target) = FrameTarget::create(spec).await?;
        let format = target.format();
        let (width, height) = target.size();

        let lines = LineRenderer::new(&ctx, max_len, format)?;
        let bloom = BloomCompositor::new(&ctx, format, width, height)?;
        let progress = ProgressRenderer::new(&ctx, format, bar_color)?;
        let geometry = (0..MAX_TRACES).map(|_| SegmentGeometry::new(max_len)).collect();

        Ok(Self {
            ctx,
            target,
            lines,
            bloom,
            progress,
            geometry,
            released: false,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    pub fn size(&self) -> (u32, u32) {
        self.target.size()
    }

    /// Maximum segments per trace.
    pub fn capacity(&self) -> usize {
        self.lines.capacity()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Weight of the blurred layer in bloom frames.
    pub fn set_glow_alpha(&mut self, alpha: f32) {
        if self.released {
            return;
        }
        self.bloom.set_glow_alpha(&self.ctx.queue, alpha);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.released {
            return;
        }
        self.target.resize(&self.ctx.device, width, height);
        let (width, height) = self.target.size();
        self.bloom.resize(&self.ctx.queue, width, height);
    }

    /// Draw the loading bar. Returns `false` when the frame was skipped.
    pub fn draw_progress(
        &mut self,
        fraction: f32,
        color: [f32; 4],
        background: [f32; 4],
    ) -> Result<bool, GpuError> {
        if self.released {
            return Ok(false);
        }
        let Some(frame) = self.target.acquire(&self.ctx.device)? else {
            return Ok(false);
        };
        let mut encoder = self.encoder("progress_encoder");
        self.progress.set_color(color);
        self.progress.encode(
            &self.ctx.queue,
            &mut encoder,
            frame.view(),
            clear_color(background),
            fraction,
        );
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(true)
    }

    /// Build, upload and draw up to two traces. Returns `false` when the frame
    /// was skipped.
    pub fn draw_traces(
        &mut self,
        traces: &[(Trace<'_>, LineStyle)],
        bloom: bool,
        background: [f32; 4],
    ) -> Result<bool, GpuError> {
        if self.released {
            return Ok(false);
        }
        self.lines.reset();
        for (slot, ((trace, style), geometry)) in
            traces.iter().zip(self.geometry.iter_mut()).enumerate()
        {
            geometry.build(trace.x, trace.y);
            self.lines.upload(&self.ctx.queue, slot, geometry, style);
        }

        let Some(frame) = self.target.acquire(&self.ctx.device)? else {
            return Ok(false);
        };
        let mut encoder = self.encoder("scope_encoder");
        if bloom {
            self.bloom
                .encode(&mut encoder, &self.lines, frame.view(), clear_color(background));
        } else {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("line_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.view(),
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(background)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.lines.draw(&mut pass, LineTarget::Surface);
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(true)
    }

    /// Segments drawn for each active trace in the last frame.
    pub fn segment_counts(&self) -> Vec<usize> {
        self.geometry
            .iter()
            .take(self.lines.active_traces())
            .map(SegmentGeometry::segment_count)
            .collect()
    }

    /// Read the last headless frame as tightly packed RGBA rows.
    pub fn read_pixels(&self) -> Option<Result<Vec<u8>, ReadbackError>> {
        if self.released {
            return None;
        }
        self.target.read_pixels(&self.ctx.device, &self.ctx.queue)
    }

    /// Destroy every buffer and texture, then the device. Idempotent.
    pub fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        self.lines.destroy();
        self.bloom.destroy();
        self.progress.destroy();
        self.target.destroy();
        self.ctx.release();
        log::debug!("Scope GPU resources released");
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }
}

impl Drop for ScopeRenderer {
    fn drop(&mut self) {
        self.release();
    }
}
