//! Mip chain generation for the bloom line layer.
//!
//! Each level is rendered from the one above it with the linear blit, so the
//! downsample pass can read a pre-filtered level instead of aliasing.

use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, CommandEncoder, Device, RenderPipeline, Sampler, TextureView};

use super::layouts::create_blit_bind_group;
use super::postprocess::BlitUniforms;
use super::textures::RenderTarget;

struct MipLevel {
    target: TextureView,
    bind_group: BindGroup,
}

/// Pre-built passes that fill levels `1..n` of a render target.
pub struct MipmapGenerator {
    uniforms: Buffer,
    levels: Vec<MipLevel>,
}

impl MipmapGenerator {
    pub fn new(
        device: &Device,
        layout: &BindGroupLayout,
        sampler: &Sampler,
        target: &RenderTarget,
    ) -> Self {
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mip_uniforms"),
            contents: bytemuck::bytes_of(&BlitUniforms::new([1.0, 1.0], 1.0)),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let levels = (1..target.mip_level_count())
            .map(|level| {
                let source = target.mip_view(level - 1);
                MipLevel {
                    target: target.mip_view(level),
                    bind_group: create_blit_bind_group(
                        device,
                        "mip_bind_group",
                        layout,
                        &uniforms,
                        &source,
                        sampler,
                    ),
                }
            })
            .collect();

        Self { uniforms, levels }
    }

    /// Number of levels written by [`MipmapGenerator::encode`].
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Record one pass per level. `pipeline` must be the plain blit.
    pub fn encode(&self, encoder: &mut CommandEncoder, pipeline: &RenderPipeline) {
        for level in &self.levels {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mip_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &level.target,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &level.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }

    pub fn destroy(&self) {
        self.uniforms.destroy();
    }
}
