//! Render targets and CPU readback.

use wgpu::{CommandEncoder, Device, Texture, TextureFormat, TextureUsages, TextureView};

/// Format of every offscreen color target.
pub const OFFSCREEN_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
/// Format of the line-layer depth/stencil attachment.
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24PlusStencil8;

/// Number of mip levels in a full chain for a square texture of `size`.
pub fn full_mip_chain(size: u32) -> u32 {
    u32::BITS - size.max(1).leading_zeros()
}

/// A render target that owns both texture and view.
/// The texture must outlive its view, so we keep them together.
pub struct RenderTarget {
    texture: Texture,
    view: TextureView,
}

impl RenderTarget {
    /// Create a new render target with the specified usage flags.
    pub fn new(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        mip_level_count: u32,
        format: TextureFormat,
        usage: TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Create a target that can be rendered to and sampled by later passes.
    pub fn for_scene(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        mip_level_count: u32,
        format: TextureFormat,
    ) -> Self {
        Self::new(
            device,
            label,
            width,
            height,
            mip_level_count,
            format,
            TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
        )
    }

    /// Create a target for final output (can be copied to CPU).
    pub fn for_output(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        Self::new(
            device,
            label,
            width,
            height,
            1,
            format,
            TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
        )
    }

    /// Create a depth/stencil attachment.
    pub fn depth(device: &Device, label: &str, width: u32, height: u32) -> Self {
        Self::new(
            device,
            label,
            width,
            height,
            1,
            DEPTH_FORMAT,
            TextureUsages::RENDER_ATTACHMENT,
        )
    }

    /// View over all mip levels.
    pub fn view(&self) -> &TextureView {
        &self.view
    }

    /// View over a single mip level, for rendering into it.
    pub fn mip_view(&self, level: u32) -> TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("mip_view"),
            base_mip_level: level,
            mip_level_count: Some(1),
            ..Default::default()
        })
    }

    /// Get the underlying texture (for copy operations).
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    pub fn mip_level_count(&self) -> u32 {
        self.texture.mip_level_count()
    }

    /// Free the texture memory now rather than when the handle drops.
    pub fn destroy(&self) {
        self.texture.destroy();
    }
}

/// Errors while reading a texture back to the CPU.
#[derive(Debug, thiserror::Error)]
pub enum ReadbackError {
    #[error("Failed to wait for GPU: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("Failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error("Readback callback dropped")]
    Cancelled,
}

/// Readback buffer for copying GPU texture data to CPU.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row_bytes: u32,
    unpadded_row_bytes: u32,
}

impl ReadbackBuffer {
    /// Create a new readback buffer sized for the given dimensions.
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let bytes_per_pixel = 4u32;
        let unpadded_row_bytes = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_bytes = unpadded_row_bytes.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: (padded_row_bytes * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            width,
            height,
            padded_row_bytes,
            unpadded_row_bytes,
        }
    }

    /// Get the padded bytes per row (for texture copy).
    pub fn padded_row_bytes(&self) -> u32 {
        self.padded_row_bytes
    }

    /// Record a copy of `target` into this buffer.
    pub fn copy_from(&self, encoder: &mut CommandEncoder, target: &RenderTarget) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: target.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Read RGBA pixels from the buffer, removing row padding.
    ///
    /// Blocks until the GPU has finished the copy. The buffer is unmapped
    /// again afterwards so it can be reused next frame.
    pub fn read_pixels(&self, device: &Device) -> Result<Vec<u8>, ReadbackError> {
        let buffer_slice = self.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::PollType::wait_indefinitely())?;
        receiver.recv().map_err(|_| ReadbackError::Cancelled)??;

        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in 0..self.height {
                let start = (row * self.padded_row_bytes) as usize;
                let end = start + self.unpadded_row_bytes as usize;
                pixels.extend_from_slice(&data[start..end]);
            }
        }
        self.buffer.unmap();
        Ok(pixels)
    }

    pub fn destroy(&self) {
        self.buffer.destroy();
    }
}
