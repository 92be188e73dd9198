//! Where frames end up: a window surface or an offscreen texture.

use wgpu::{Device, Queue, Surface, SurfaceConfiguration, SurfaceTexture, TextureFormat, TextureView};

use super::context::{GpuContext, GpuError};
use super::textures::{ReadbackBuffer, ReadbackError, RenderTarget, OFFSCREEN_FORMAT};

/// Description of the drawing surface handed to the scope.
pub enum TargetSpec {
    /// Present into a window, e.g. `Arc<winit::window::Window>`.
    Window {
        target: wgpu::SurfaceTarget<'static>,
        width: u32,
        height: u32,
    },
    /// Render into a texture that can be read back.
    Headless { width: u32, height: u32 },
}

impl TargetSpec {
    pub fn headless(width: u32, height: u32) -> Self {
        Self::Headless { width, height }
    }

    pub fn window(target: impl Into<wgpu::SurfaceTarget<'static>>, width: u32, height: u32) -> Self {
        Self::Window {
            target: target.into(),
            width,
            height,
        }
    }
}

/// One acquired frame.
pub struct Frame {
    view: TextureView,
    surface_texture: Option<SurfaceTexture>,
}

impl Frame {
    pub fn view(&self) -> &TextureView {
        &self.view
    }

    /// Show the frame. Headless frames stay in their texture.
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

/// The live drawing surface.
pub enum FrameTarget {
    Surface {
        surface: Surface<'static>,
        config: SurfaceConfiguration,
    },
    Headless {
        output: RenderTarget,
        readback: ReadbackBuffer,
    },
}

/// Prefer a linear format; the beam shader writes display values directly.
fn pick_format(formats: &[TextureFormat]) -> Option<TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|format| !format.is_srgb())
        .or_else(|| formats.first().copied())
}

impl FrameTarget {
    /// Create the GPU context together with a target matching `spec`.
    pub async fn create(spec: TargetSpec) -> Result<(GpuContext, Self), GpuError> {
        match spec {
            TargetSpec::Headless { width, height } => {
                let ctx = GpuContext::new().await?;
                let target = Self::headless(&ctx.device, width, height);
                Ok((ctx, target))
            }
            TargetSpec::Window {
                target,
                width,
                height,
            } => {
                let (ctx, surface) = GpuContext::with_surface(target).await?;
                let capabilities = surface.get_capabilities(&ctx.adapter);
                let format =
                    pick_format(&capabilities.formats).ok_or(GpuError::UnsupportedSurface)?;
                let mut config = surface
                    .get_default_config(&ctx.adapter, width.max(1), height.max(1))
                    .ok_or(GpuError::UnsupportedSurface)?;
                config.format = format;
                config.present_mode = wgpu::PresentMode::Fifo;
                surface.configure(&ctx.device, &config);
                log::debug!("Configured surface {width}x{height} as {format:?}");
                Ok((ctx, Self::Surface { surface, config }))
            }
        }
    }

    fn headless(device: &Device, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self::Headless {
            output: RenderTarget::for_output(device, "scope_output", width, height, OFFSCREEN_FORMAT),
            readback: ReadbackBuffer::new(device, width, height),
        }
    }

    pub fn format(&self) -> TextureFormat {
        match self {
            Self::Surface { config, .. } => config.format,
            Self::Headless { .. } => OFFSCREEN_FORMAT,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            Self::Surface { config, .. } => (config.width, config.height),
            Self::Headless { output, .. } => (output.width(), output.height()),
        }
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if self.size() == (width, height) {
            return;
        }
        match self {
            Self::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(device, config);
            }
            Self::Headless { output, readback } => {
                output.destroy();
                readback.destroy();
                *self = Self::headless(device, width, height);
            }
        }
    }

    /// Get the texture to draw into this frame.
    ///
    /// A lost or outdated surface is reconfigured and `Ok(None)` is returned;
    /// the caller skips the frame.
    pub fn acquire(&mut self, device: &Device) -> Result<Option<Frame>, GpuError> {
        match self {
            Self::Headless { output, .. } => Ok(Some(Frame {
                view: output.texture().create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: None,
            })),
            Self::Surface { surface, config } => match surface.get_current_texture() {
                Ok(texture) => {
                    let view = texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    Ok(Some(Frame {
                        view,
                        surface_texture: Some(texture),
                    }))
                }
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    log::debug!("Surface lost, reconfiguring");
                    surface.configure(device, config);
                    Ok(None)
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    log::warn!("Timed out waiting for surface texture");
                    Ok(None)
                }
                Err(e) => Err(GpuError::Frame(e)),
            },
        }
    }

    /// Copy the last frame to the CPU. Only headless targets can be read.
    pub fn read_pixels(
        &self,
        device: &Device,
        queue: &Queue,
    ) -> Option<Result<Vec<u8>, ReadbackError>> {
        let Self::Headless { output, readback } = self else {
            return None;
        };
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
        readback.copy_from(&mut encoder, output);
        queue.submit(std::iter::once(encoder.finish()));
        Some(readback.read_pixels(device))
    }

    pub fn is_headless(&self) -> bool {
        matches!(self, Self::Headless { .. })
    }

    /// Release the offscreen texture. Surfaces are released when dropped.
    pub fn destroy(&self) {
        if let Self::Headless { output, readback } = self {
            output.destroy();
            readback.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::gpu_unavailable;

    #[test]
    fn test_prefers_linear_format() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(pick_format(&formats), Some(TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn test_falls_back_to_first_format() {
        let formats = [TextureFormat::Rgba8UnormSrgb];
        assert_eq!(pick_format(&formats), Some(TextureFormat::Rgba8UnormSrgb));
        assert_eq!(pick_format(&[]), None);
    }

    #[tokio::test]
    async fn test_headless_target_resize() {
        let (ctx, mut target) = match FrameTarget::create(TargetSpec::headless(64, 32)).await {
            Ok(pair) => pair,
            Err(e) if gpu_unavailable(&e) => return,
            Err(e) => panic!("GPU setup failed: {e}"),
        };
        assert!(target.is_headless());
        assert_eq!(target.size(), (64, 32));
        target.resize(&ctx.device, 16, 16);
        assert_eq!(target.size(), (16, 16));
        assert!(target.acquire(&ctx.device).unwrap().is_some());
    }
}
