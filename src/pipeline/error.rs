//! Errors surfaced by the scope controller.

use crate::audio::{AudioError, CaptureError};
use crate::gpu::{GpuError, ReadbackError};

use super::config::ConfigError;

/// Errors that can occur while creating or driving a scope.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Readback error: {0}")]
    Readback(#[from] ReadbackError),
    #[error("Live mode '{0}' needs a capture source")]
    MissingCaptureSource(String),
    #[error("Only headless scopes can be read back")]
    NotHeadless,
    #[error("Scope has been destroyed")]
    Destroyed,
}
