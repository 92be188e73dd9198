//! Scope lifecycle.

use std::fmt;

/// Where a scope is in its life.
///
/// `Loading` moves to `Ready` or `Failed`; any state moves to `Destroyed`.
/// `Failed` and `Destroyed` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    /// Audio is still being fetched or decoded; the progress bar is drawn.
    Loading { progress: f32 },
    /// Frames show the sample window.
    Ready,
    /// A fatal error stopped the scope.
    Failed(String),
    /// Resources were released.
    Destroyed,
}

impl Lifecycle {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// No further frames will be drawn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Destroyed)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading { progress } => write!(f, "loading ({:.0}%)", progress * 100.0),
            Self::Ready => f.write_str("ready"),
            Self::Failed(message) => write!(f, "failed: {message}"),
            Self::Destroyed => f.write_str("destroyed"),
        }
    }
}
