//! Beam line renderer.
//!
//! Draws one or two traces of segment quads with the analytic beam shader.
//! The corner and index buffers are built once for the maximum window; per
//! frame only the segment records and uniforms are written.

use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, Queue, RenderPass, RenderPipeline, TextureFormat};

use super::context::{GpuContext, GpuError};
use super::layouts::{create_uniform_bind_group, create_uniform_layout};
use super::pipelines::{create_pipeline_layout, RenderPipelineBuilder, ADDITIVE_ALPHA};
use super::textures::OFFSCREEN_FORMAT;
use crate::scope::{corner_indices, quad_indices, Afterglow, SegmentGeometry, SegmentVertex};

/// Primary trace plus the second sweep trace.
pub const MAX_TRACES: usize = 2;

/// Appearance of one trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: [f32; 4],
    pub half_width: f32,
    pub intensity: f32,
    pub invert: bool,
    pub afterglow: Afterglow,
}

/// Uniform block matching `LineUniforms` in `line.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineUniforms {
    pub color: [f32; 4],
    pub half_width: f32,
    pub invert: f32,
    pub intensity: f32,
    pub segment_count: f32,
    pub capacity: f32,
    pub glow_full: f32,
    pub glow_horizon: f32,
    _padding: f32,
}

impl LineUniforms {
    pub fn new(style: &LineStyle, segment_count: usize, capacity: usize) -> Self {
        Self {
            color: style.color,
            half_width: style.half_width,
            invert: if style.invert { -1.0 } else { 1.0 },
            intensity: style.intensity,
            segment_count: segment_count as f32,
            capacity: capacity as f32,
            glow_full: style.afterglow.full,
            glow_horizon: style.afterglow.horizon,
            _padding: 0.0,
        }
    }
}

/// Which framebuffer the lines are drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTarget {
    /// Straight onto the visible surface.
    Surface,
    /// Into the bloom line layer, which carries a depth/stencil attachment.
    Offscreen,
}

struct TraceSlot {
    vertices: Buffer,
    uniforms: Buffer,
    bind_group: BindGroup,
    index_count: u32,
    last_uniforms: Option<LineUniforms>,
}

/// Draws segment geometry with additive beam blending.
pub struct LineRenderer {
    capacity: usize,
    corners: Buffer,
    indices: Buffer,
    surface_pipeline: RenderPipeline,
    offscreen_pipeline: RenderPipeline,
    slots: Vec<TraceSlot>,
    active: usize,
}

fn vertex_layouts() -> Vec<wgpu::VertexBufferLayout<'static>> {
    const SEGMENT_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
    const CORNER_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Uint32];
    vec![
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SegmentVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &SEGMENT_ATTRIBUTES,
        },
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<u32>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &CORNER_ATTRIBUTES,
        },
    ]
}

impl LineRenderer {
    /// Create a renderer for windows of up to `max_len` samples.
    pub fn new(
        ctx: &GpuContext,
        max_len: usize,
        surface_format: TextureFormat,
    ) -> Result<Self, GpuError> {
        let device = &ctx.device;
        let shader = ctx.create_shader("line_shader", include_str!("shaders/line.wgsl"))?;
        let capacity = crate::scope::segment_count(max_len);

        let corners = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("line_corners"),
            contents: bytemuck::cast_slice(&corner_indices(capacity)),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("line_indices"),
            contents: bytemuck::cast_slice(&quad_indices(capacity)),
            usage: wgpu::BufferUsages::INDEX,
        });

        let layout: BindGroupLayout = create_uniform_layout::<LineUniforms>(
            device,
            "line_bind_group_layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );
        let pipeline_layout = create_pipeline_layout(device, "line_pipeline_layout", &[&layout]);

        let surface_pipeline = RenderPipelineBuilder::new("line_surface_pipeline", &shader)
            .layout(&pipeline_layout)
            .vertex_buffers(vertex_layouts())
            .format(surface_format)
            .blend(ADDITIVE_ALPHA)
            .build(device);
        let offscreen_pipeline = RenderPipelineBuilder::new("line_offscreen_pipeline", &shader)
            .layout(&pipeline_layout)
            .vertex_buffers(vertex_layouts())
            .format(OFFSCREEN_FORMAT)
            .blend(ADDITIVE_ALPHA)
            .with_depth()
            .build(device);

        let vertex_bytes = (capacity.max(1) * crate::scope::segments::VERTICES_PER_SEGMENT
            * std::mem::size_of::<SegmentVertex>()) as u64;
        let slots = (0..MAX_TRACES)
            .map(|i| {
                let vertices = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("line_vertices_{i}")),
                    size: vertex_bytes,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("line_uniforms_{i}")),
                    size: std::mem::size_of::<LineUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group =
                    create_uniform_bind_group(device, "line_bind_group", &layout, &uniforms);
                TraceSlot {
                    vertices,
                    uniforms,
                    bind_group,
                    index_count: 0,
                    last_uniforms: None,
                }
            })
            .collect();

        Ok(Self {
            capacity,
            corners,
            indices,
            surface_pipeline,
            offscreen_pipeline,
            slots,
            active: 0,
        })
    }

    /// Maximum segments per trace.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of traces drawn by [`LineRenderer::draw`].
    pub fn active_traces(&self) -> usize {
        self.active
    }

    /// Disable all traces until the next upload.
    pub fn reset(&mut self) {
        self.active = 0;
    }

    /// Write one trace's geometry and style. Traces past `slot` are disabled.
    pub fn upload(&mut self, queue: &Queue, slot: usize, geometry: &SegmentGeometry, style: &LineStyle) {
        let Some(trace) = self.slots.get_mut(slot) else {
            log::warn!("Ignoring trace {slot}, only {MAX_TRACES} are supported");
            return;
        };
        let count = geometry.segment_count().min(self.capacity);
        if count > 0 {
            let vertex_count = count * crate::scope::segments::VERTICES_PER_SEGMENT;
            queue.write_buffer(
                &trace.vertices,
                0,
                bytemuck::cast_slice(&geometry.vertices()[..vertex_count]),
            );
        }
        let uniforms = LineUniforms::new(style, count, self.capacity);
        if trace.last_uniforms != Some(uniforms) {
            queue.write_buffer(&trace.uniforms, 0, bytemuck::bytes_of(&uniforms));
            trace.last_uniforms = Some(uniforms);
        }
        trace.index_count = (count * crate::scope::segments::INDICES_PER_SEGMENT) as u32;
        self.active = slot + 1;
    }

    /// Uniforms last written for `slot`.
    pub fn uniforms(&self, slot: usize) -> Option<LineUniforms> {
        self.slots.get(slot).and_then(|trace| trace.last_uniforms)
    }

    /// Record the draw calls for all active traces.
    pub fn draw(&self, pass: &mut RenderPass<'_>, target: LineTarget) {
        let pipeline = match target {
            LineTarget::Surface => &self.surface_pipeline,
            LineTarget::Offscreen => &self.offscreen_pipeline,
        };
        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(1, self.corners.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        for trace in self.slots.iter().take(self.active) {
            if trace.index_count == 0 {
                continue;
            }
            pass.set_bind_group(0, &trace.bind_group, &[]);
            pass.set_vertex_buffer(0, trace.vertices.slice(..));
            pass.draw_indexed(0..trace.index_count, 0, 0..1);
        }
    }

    /// Free all GPU buffers.
    pub fn destroy(&self) {
        self.corners.destroy();
        self.indices.destroy();
        for trace in &self.slots {
            trace.vertices.destroy();
            trace.uniforms.destroy();
        }
    }
}
