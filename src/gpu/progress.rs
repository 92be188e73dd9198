//! Loading progress bar.

use wgpu::util::DeviceExt;
use wgpu::{BindGroup, Buffer, CommandEncoder, Queue, RenderPipeline, TextureFormat, TextureView};

use super::context::{GpuContext, GpuError};
use super::layouts::{create_uniform_bind_group, create_uniform_layout};
use super::pipelines::{create_fullscreen_pipeline, create_pipeline_layout, ADDITIVE};

/// Side of the square the bar is laid out in.
pub const DESIGN_SIZE: f32 = 800.0;
/// Half the length of the fill at 100%.
pub const BAR_HALF_WIDTH: f32 = 300.0;

/// Uniform block matching `ProgressUniforms` in `progress.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ProgressUniforms {
    pub color: [f32; 4],
    pub progress: f32,
    _padding: [f32; 3],
}

impl ProgressUniforms {
    pub fn new(color: [f32; 4], progress: f32) -> Self {
        Self {
            color,
            progress,
            _padding: [0.0; 3],
        }
    }
}

fn rect(p: [f32; 2], half: [f32; 2]) -> f32 {
    (p[0].abs() - half[0]).max(p[1].abs() - half[1])
}

/// CPU mirror of the fragment shader: coverage at `p`, in design-space
/// pixels relative to the center, for a bar filled to `progress`.
pub fn progress_coverage(p: [f32; 2], progress: f32) -> f32 {
    let fill = progress.clamp(0.0, 1.0);
    let hw = BAR_HALF_WIDTH;
    let ring = rect(p, [hw + 5.0, 25.0]).min(-rect(p, [hw + 10.0, 30.0]));
    let bar = -rect([p[0] - hw * (fill - 1.0), p[1]], [hw * fill, 20.0]);
    ring.max(bar).clamp(0.0, 1.0)
}

/// Draws the progress bar over a cleared background.
pub struct ProgressRenderer {
    pipeline: RenderPipeline,
    uniforms: Buffer,
    bind_group: BindGroup,
    color: [f32; 4],
    last_progress: Option<f32>,
}

impl ProgressRenderer {
    pub fn new(ctx: &GpuContext, format: TextureFormat, color: [f32; 4]) -> Result<Self, GpuError> {
        let device = &ctx.device;
        let shader = ctx.create_shader("progress_shader", include_str!("shaders/progress.wgsl"))?;
        let layout = create_uniform_layout::<ProgressUniforms>(
            device,
            "progress_bind_group_layout",
            wgpu::ShaderStages::FRAGMENT,
        );
        let pipeline_layout = create_pipeline_layout(device, "progress_pipeline_layout", &[&layout]);
        let pipeline = create_fullscreen_pipeline(
            device,
            "progress_pipeline",
            &pipeline_layout,
            &shader,
            ("vs_main", "fs_main"),
            format,
            ADDITIVE,
        );
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("progress_uniforms"),
            contents: bytemuck::bytes_of(&ProgressUniforms::new(color, 0.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = create_uniform_bind_group(device, "progress_bind_group", &layout, &uniforms);

        Ok(Self {
            pipeline,
            uniforms,
            bind_group,
            color,
            last_progress: None,
        })
    }

    /// Change the bar color.
    pub fn set_color(&mut self, color: [f32; 4]) {
        if self.color != color {
            self.color = color;
            self.last_progress = None;
        }
    }

    /// Record a pass that clears `output` to `background` and draws the bar.
    pub fn encode(
        &mut self,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        output: &TextureView,
        background: wgpu::Color,
        progress: f32,
    ) {
        let progress = progress.clamp(0.0, 1.0);
        if self.last_progress != Some(progress) {
            queue.write_buffer(
                &self.uniforms,
                0,
                bytemuck::bytes_of(&ProgressUniforms::new(self.color, progress)),
            );
            self.last_progress = Some(progress);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("progress_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(background),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    pub fn destroy(&self) {
        self.uniforms.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_uniforms_size() {
        assert_eq!(std::mem::size_of::<ProgressUniforms>(), 32);
    }

    #[test]
    fn test_half_filled_bar() {
        assert_eq!(progress_coverage([-150.0, 0.0], 0.5), 1.0);
        assert_eq!(progress_coverage([150.0, 0.0], 0.5), 0.0);
    }

    #[test]
    fn test_outline_always_drawn() {
        assert_eq!(progress_coverage([307.5, 0.0], 0.0), 1.0);
        assert_eq!(progress_coverage([0.0, 27.5], 0.0), 1.0);
        assert_eq!(progress_coverage([0.0, 100.0], 0.0), 0.0);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(progress_coverage([250.0, 0.0], 2.0), 1.0);
        assert_eq!(progress_coverage([-250.0, 0.0], -1.0), 0.0);
    }
}
