//! Bloom compositor.
//!
//! Lines are drawn into a fixed 1024x1024 layer, mipmapped, downsampled to
//! half size, blurred along both axes and finally added onto the surface
//! together with the sharp layer:
//!
//! 1. lines -> L (viewport w x h), then generate L's mip chain
//! 2. L -> A (viewport w/2 x h/2)
//! 3. A -> B blurred along x, written transposed
//! 4. B -> A blurred along the other axis, transposed back
//! 5. surface = background + L + glow * A, with glow 0.5 unless overridden

use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, CommandEncoder, Queue, RenderPipeline, Sampler,
    TextureFormat, TextureView,
};

use super::context::{GpuContext, GpuError};
use super::layouts::{create_blit_bind_group, create_blit_layout};
use super::line::{LineRenderer, LineTarget};
use super::mipmap::MipmapGenerator;
use super::pipelines::{create_fullscreen_pipeline, create_pipeline_layout, ADDITIVE};
use super::textures::{full_mip_chain, RenderTarget, OFFSCREEN_FORMAT};

/// Edge length of every bloom texture.
pub const BLOOM_SIZE: u32 = 1024;
/// Default weight of the blurred layer in the composite.
pub const GLOW_ALPHA: f32 = 0.5;

/// Uniform block matching `BlitUniforms` in `blit.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlitUniforms {
    pub region: [f32; 2],
    pub alpha: f32,
    pub texel: f32,
}

impl BlitUniforms {
    pub fn new(region: [f32; 2], alpha: f32) -> Self {
        Self {
            region,
            alpha,
            texel: 1.0 / BLOOM_SIZE as f32,
        }
    }
}

/// Pixel rectangle a pass renders into, anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    fn apply(self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
    }
}

/// Viewports and sampling regions for one canvas size.
///
/// Canvases larger than the bloom layer are clamped to it; the composite then
/// stretches the layer over the whole surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomPlan {
    width: u32,
    height: u32,
}

impl BloomPlan {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(1, BLOOM_SIZE),
            height: height.clamp(1, BLOOM_SIZE),
        }
    }

    fn half(value: u32) -> u32 {
        (value / 2).max(1)
    }

    fn fraction(value: u32) -> f32 {
        value as f32 / BLOOM_SIZE as f32
    }

    pub fn line_viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
        }
    }

    pub fn downsample_viewport(&self) -> Viewport {
        Viewport {
            width: Self::half(self.width),
            height: Self::half(self.height),
        }
    }

    /// The first blur writes its output transposed.
    pub fn horizontal_viewport(&self) -> Viewport {
        Viewport {
            width: Self::half(self.height),
            height: Self::half(self.width),
        }
    }

    pub fn vertical_viewport(&self) -> Viewport {
        self.downsample_viewport()
    }

    /// Part of L covered by the line pass.
    pub fn sharp_region(&self) -> [f32; 2] {
        [Self::fraction(self.width), Self::fraction(self.height)]
    }

    /// Part of A covered by the downsample.
    pub fn glow_region(&self) -> [f32; 2] {
        [
            Self::fraction(Self::half(self.width)),
            Self::fraction(Self::half(self.height)),
        ]
    }

    /// Part of B covered by the first blur.
    pub fn transposed_region(&self) -> [f32; 2] {
        [
            Self::fraction(Self::half(self.height)),
            Self::fraction(Self::half(self.width)),
        ]
    }
}

struct BlitStep {
    uniforms: Buffer,
    bind_group: BindGroup,
}

impl BlitStep {
    fn new(
        device: &wgpu::Device,
        label: &str,
        layout: &BindGroupLayout,
        source: &TextureView,
        sampler: &Sampler,
        uniforms: BlitUniforms,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = create_blit_bind_group(device, label, layout, &buffer, source, sampler);
        Self {
            uniforms: buffer,
            bind_group,
        }
    }

    fn write(&self, queue: &Queue, uniforms: BlitUniforms) {
        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));
    }
}

/// Owns the bloom textures and passes.
pub struct BloomCompositor {
    plan: BloomPlan,
    glow_alpha: f32,
    lines: RenderTarget,
    /// Level 0 of `lines`; a render attachment must cover a single mip.
    line_attachment: TextureView,
    depth: RenderTarget,
    glow_a: RenderTarget,
    glow_b: RenderTarget,
    copy_pipeline: RenderPipeline,
    blur_pipeline: RenderPipeline,
    composite_pipeline: RenderPipeline,
    mipmaps: MipmapGenerator,
    downsample: BlitStep,
    blur_horizontal: BlitStep,
    blur_vertical: BlitStep,
    sharp: BlitStep,
    glow: BlitStep,
}

impl BloomCompositor {
    /// Create the bloom layers for a `width` x `height` canvas that is
    /// presented in `surface_format`.
    pub fn new(
        ctx: &GpuContext,
        surface_format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let device = &ctx.device;
        let shader = ctx.create_shader("blit_shader", include_str!("shaders/blit.wgsl"))?;
        let plan = BloomPlan::new(width, height);

        let lines = RenderTarget::for_scene(
            device,
            "bloom_lines",
            BLOOM_SIZE,
            BLOOM_SIZE,
            full_mip_chain(BLOOM_SIZE),
            OFFSCREEN_FORMAT,
        );
        let line_attachment = lines.mip_view(0);
        let depth = RenderTarget::depth(device, "bloom_depth", BLOOM_SIZE, BLOOM_SIZE);
        let glow_a =
            RenderTarget::for_scene(device, "bloom_glow_a", BLOOM_SIZE, BLOOM_SIZE, 1, OFFSCREEN_FORMAT);
        let glow_b =
            RenderTarget::for_scene(device, "bloom_glow_b", BLOOM_SIZE, BLOOM_SIZE, 1, OFFSCREEN_FORMAT);

        // Mirrored addressing keeps the blur taps inside the drawn region
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("bloom_sampler"),
            address_mode_u: wgpu::AddressMode::MirrorRepeat,
            address_mode_v: wgpu::AddressMode::MirrorRepeat,
            address_mode_w: wgpu::AddressMode::MirrorRepeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        let layout = create_blit_layout::<BlitUniforms>(device, "blit_bind_group_layout");
        let pipeline_layout = create_pipeline_layout(device, "blit_pipeline_layout", &[&layout]);

        let copy_pipeline = create_fullscreen_pipeline(
            device,
            "bloom_copy_pipeline",
            &pipeline_layout,
            &shader,
            ("vs_main", "fs_main"),
            OFFSCREEN_FORMAT,
            wgpu::BlendState::REPLACE,
        );
        let blur_pipeline = create_fullscreen_pipeline(
            device,
            "bloom_blur_pipeline",
            &pipeline_layout,
            &shader,
            ("vs_transpose", "fs_blur"),
            OFFSCREEN_FORMAT,
            wgpu::BlendState::REPLACE,
        );
        let composite_pipeline = create_fullscreen_pipeline(
            device,
            "bloom_composite_pipeline",
            &pipeline_layout,
            &shader,
            ("vs_main", "fs_main"),
            surface_format,
            ADDITIVE,
        );

        let mipmaps = MipmapGenerator::new(device, &layout, &sampler, &lines);
        let downsample = BlitStep::new(
            device,
            "bloom_downsample",
            &layout,
            lines.view(),
            &sampler,
            BlitUniforms::new(plan.sharp_region(), 1.0),
        );
        let blur_horizontal = BlitStep::new(
            device,
            "bloom_blur_horizontal",
            &layout,
            glow_a.view(),
            &sampler,
            BlitUniforms::new(plan.glow_region(), 1.0),
        );
        let blur_vertical = BlitStep::new(
            device,
            "bloom_blur_vertical",
            &layout,
            glow_b.view(),
            &sampler,
            BlitUniforms::new(plan.transposed_region(), 1.0),
        );
        let sharp = BlitStep::new(
            device,
            "bloom_sharp",
            &layout,
            lines.view(),
            &sampler,
            BlitUniforms::new(plan.sharp_region(), 1.0),
        );
        let glow = BlitStep::new(
            device,
            "bloom_glow",
            &layout,
            glow_a.view(),
            &sampler,
            BlitUniforms::new(plan.glow_region(), GLOW_ALPHA),
        );

        log::debug!(
            "Bloom layers ready ({} mip levels, canvas {}x{})",
            lines.mip_level_count(),
            plan.width,
            plan.height
        );

        Ok(Self {
            plan,
            glow_alpha: GLOW_ALPHA,
            lines,
            line_attachment,
            depth,
            glow_a,
            glow_b,
            copy_pipeline,
            blur_pipeline,
            composite_pipeline,
            mipmaps,
            downsample,
            blur_horizontal,
            blur_vertical,
            sharp,
            glow,
        })
    }

    pub fn plan(&self) -> BloomPlan {
        self.plan
    }

    pub fn glow_alpha(&self) -> f32 {
        self.glow_alpha
    }

    /// Change the weight of the blurred layer. Zero leaves only the sharp
    /// lines on the background.
    pub fn set_glow_alpha(&mut self, queue: &Queue, alpha: f32) {
        let alpha = alpha.max(0.0);
        if alpha == self.glow_alpha {
            return;
        }
        self.glow_alpha = alpha;
        self.glow
            .write(queue, BlitUniforms::new(self.plan.glow_region(), alpha));
    }

    /// Recompute the sampling regions for a new canvas size.
    pub fn resize(&mut self, queue: &Queue, width: u32, height: u32) {
        let plan = BloomPlan::new(width, height);
        if plan == self.plan {
            return;
        }
        self.plan = plan;
        self.downsample
            .write(queue, BlitUniforms::new(plan.sharp_region(), 1.0));
        self.blur_horizontal
            .write(queue, BlitUniforms::new(plan.glow_region(), 1.0));
        self.blur_vertical
            .write(queue, BlitUniforms::new(plan.transposed_region(), 1.0));
        self.sharp.write(queue, BlitUniforms::new(plan.sharp_region(), 1.0));
        self.glow
            .write(queue, BlitUniforms::new(plan.glow_region(), self.glow_alpha));
    }

    /// Record the full bloom chain, ending with the composite into `output`.
    pub fn encode(
        &self,
        encoder: &mut CommandEncoder,
        lines: &LineRenderer,
        output: &TextureView,
        background: wgpu::Color,
    ) {
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("bloom_line_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.line_attachment,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Discard,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.plan.line_viewport().apply(&mut pass);
            lines.draw(&mut pass, LineTarget::Offscreen);
        }

        self.mipmaps.encode(encoder, &self.copy_pipeline);

        self.offscreen_pass(
            encoder,
            "bloom_downsample_pass",
            self.glow_a.view(),
            &self.copy_pipeline,
            &self.downsample,
            self.plan.downsample_viewport(),
        );
        self.offscreen_pass(
            encoder,
            "bloom_blur_horizontal_pass",
            self.glow_b.view(),
            &self.blur_pipeline,
            &self.blur_horizontal,
            self.plan.horizontal_viewport(),
        );
        self.offscreen_pass(
            encoder,
            "bloom_blur_vertical_pass",
            self.glow_a.view(),
            &self.blur_pipeline,
            &self.blur_vertical,
            self.plan.vertical_viewport(),
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("bloom_composite_pass"),
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
        pass.set_pipeline(&self.composite_pipeline);
        for step in [&self.sharp, &self.glow] {
            pass.set_bind_group(0, &step.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }

    fn offscreen_pass(
        &self,
        encoder: &mut CommandEncoder,
        label: &str,
        target: &TextureView,
        pipeline: &RenderPipeline,
        step: &BlitStep,
        viewport: Viewport,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
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
        viewport.apply(&mut pass);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &step.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Free the textures and uniform buffers.
    pub fn destroy(&self) {
        for target in [&self.lines, &self.depth, &self.glow_a, &self.glow_b] {
            target.destroy();
        }
        for step in [
            &self.downsample,
            &self.blur_horizontal,
            &self.blur_vertical,
            &self.sharp,
            &self.glow,
        ] {
            step.uniforms.destroy();
        }
        self.mipmaps.destroy();
    }
}
