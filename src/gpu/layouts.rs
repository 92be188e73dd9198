//! Bind group layouts and bind groups shared by the scope passes.

use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutEntry, BindingType, Buffer, Device, Sampler,
    ShaderStages, TextureView,
};

/// Builder for bind group layouts.
pub struct BindGroupLayoutBuilder {
    label: &'static str,
    entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutBuilder {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: Vec::new(),
        }
    }

    fn entry(mut self, binding: u32, visibility: ShaderStages, ty: BindingType) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty,
            count: None,
        });
        self
    }

    /// Add a uniform block holding a `T`. The size is checked at bind time.
    pub fn uniform<T: bytemuck::Pod>(self, binding: u32, visibility: ShaderStages) -> Self {
        self.entry(
            binding,
            visibility,
            BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
            },
        )
    }

    /// Add a filterable 2D float texture.
    pub fn texture_2d(self, binding: u32, visibility: ShaderStages) -> Self {
        self.entry(
            binding,
            visibility,
            BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
        )
    }

    /// Add a filtering sampler.
    pub fn sampler(self, binding: u32, visibility: ShaderStages) -> Self {
        self.entry(
            binding,
            visibility,
            BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        )
    }

    pub fn build(self, device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(self.label),
            entries: &self.entries,
        })
    }
}

/// Layout for a single uniform block `T` visible to `visibility`.
pub fn create_uniform_layout<T: bytemuck::Pod>(
    device: &Device,
    label: &'static str,
    visibility: ShaderStages,
) -> BindGroupLayout {
    BindGroupLayoutBuilder::new(label)
        .uniform::<T>(0, visibility)
        .build(device)
}

/// Layout for textured fullscreen passes: uniforms `T`, source texture, sampler.
pub fn create_blit_layout<T: bytemuck::Pod>(device: &Device, label: &'static str) -> BindGroupLayout {
    BindGroupLayoutBuilder::new(label)
        .uniform::<T>(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT)
        .texture_2d(1, ShaderStages::FRAGMENT)
        .sampler(2, ShaderStages::FRAGMENT)
        .build(device)
}

/// Bind group with a single uniform buffer at binding 0.
pub fn create_uniform_bind_group(
    device: &Device,
    label: &str,
    layout: &BindGroupLayout,
    uniforms: &Buffer,
) -> BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.as_entire_binding(),
        }],
    })
}

/// Bind group matching [`create_blit_layout`].
pub fn create_blit_bind_group(
    device: &Device,
    label: &str,
    layout: &BindGroupLayout,
    uniforms: &Buffer,
    source: &TextureView,
    sampler: &Sampler,
) -> BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(source),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
