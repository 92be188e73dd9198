//! GPU context initialization and management.

use std::sync::Arc;
use wgpu::{naga, Adapter, Device, Instance, Queue, ShaderModule, Surface};

/// Errors that can occur during GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("Failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("Surface is not supported by the selected adapter")]
    UnsupportedSurface,
    #[error("Failed to acquire surface texture: {0}")]
    Frame(#[from] wgpu::SurfaceError),
    #[error("Shader '{label}' failed to compile:\n{diagnostic}")]
    ShaderCompilation { label: String, diagnostic: String },
}

/// GPU context holding device and queue for rendering.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
}

fn create_instance() -> Instance {
    Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::METAL | wgpu::Backends::VULKAN | wgpu::Backends::GL,
        ..Default::default()
    })
}

impl GpuContext {
    /// Create a new GPU context for headless rendering.
    ///
    /// Prefers Metal on macOS, falls back to other backends.
    pub async fn new() -> Result<Self, GpuError> {
        Self::with_instance(create_instance(), None).await
    }

    /// Create a GPU context able to present to `target`, e.g. an `Arc<Window>`.
    pub async fn with_surface(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
    ) -> Result<(Self, Surface<'static>), GpuError> {
        let instance = create_instance();
        let surface = instance.create_surface(target)?;
        let ctx = Self::with_instance(instance, Some(&surface)).await?;
        Ok((ctx, surface))
    }

    async fn with_instance(
        instance: Instance,
        compatible_surface: Option<&Surface<'_>>,
    ) -> Result<Self, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("phobz-scope"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        device.set_device_lost_callback(|reason, message| match reason {
            wgpu::DeviceLostReason::Destroyed => log::debug!("GPU device released"),
            _ => log::error!("GPU device lost ({reason:?}): {message}"),
        });

        let info = adapter.get_info();
        log::info!("Using GPU adapter {} ({:?})", info.name, info.backend);

        Ok(Self {
            instance,
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Get info about the GPU adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Validate and compile a WGSL shader.
    ///
    /// Validation runs before the module reaches the device so a broken shader
    /// surfaces as [`GpuError::ShaderCompilation`] with the compiler's message.
    pub fn create_shader(&self, label: &str, source: &str) -> Result<ShaderModule, GpuError> {
        validate_wgsl(label, source)?;
        Ok(self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            }))
    }

    /// Force the device to release its memory. Later GPU calls become no-ops.
    pub fn release(&self) {
        self.device.destroy();
    }
}

/// Set to make GPU tests fail instead of skipping when no adapter is found.
pub const REQUIRE_GPU_ENV: &str = "PHOBZ_REQUIRE_GPU";

/// Whether a GPU test may skip after `err`.
///
/// Only a missing adapter qualifies, and only while [`REQUIRE_GPU_ENV`] is
/// unset. Any other error means the rendering code itself is broken.
pub fn gpu_unavailable(err: &GpuError) -> bool {
    matches!(err, GpuError::NoAdapter) && std::env::var_os(REQUIRE_GPU_ENV).is_none()
}

/// Parse and validate WGSL source, rendering any error as diagnostic text.
pub fn validate_wgsl(label: &str, source: &str) -> Result<(), GpuError> {
    let compile_error = |diagnostic: String| GpuError::ShaderCompilation {
        label: label.to_string(),
        diagnostic,
    };
    let module =
        naga::front::wgsl::parse_str(source).map_err(|e| compile_error(e.emit_to_string(source)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| compile_error(e.into_inner().to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gpu_context_creation() {
        match GpuContext::new().await {
            Ok(ctx) => assert!(!ctx.adapter_info().name.is_empty()),
            Err(e) if gpu_unavailable(&e) => eprintln!("Skipping test - GPU not available"),
            Err(e) => panic!("context creation failed: {e}"),
        }
    }

    #[test]
    fn test_only_missing_adapter_is_skippable() {
        let compile = GpuError::ShaderCompilation {
            label: "line".into(),
            diagnostic: String::new(),
        };
        assert!(!gpu_unavailable(&compile));
        assert!(!gpu_unavailable(&GpuError::UnsupportedSurface));
        assert_eq!(
            gpu_unavailable(&GpuError::NoAdapter),
            std::env::var_os(REQUIRE_GPU_ENV).is_none()
        );
    }

    #[test]
    fn test_invalid_wgsl_reports_diagnostic() {
        let source = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0; }";
        let err = validate_wgsl("broken", source).unwrap_err();
        match err {
            GpuError::ShaderCompilation { label, diagnostic } => {
                assert_eq!(label, "broken");
                assert!(!diagnostic.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error_reports_diagnostic() {
        let err = validate_wgsl("syntax", "fn main( {").unwrap_err();
        assert!(err.to_string().contains("syntax"));
    }
}
