//! Error types shared across SnapBooth crates.

use std::path::PathBuf;

/// Top-level error type for SnapBooth operations.
#[derive(Debug, thiserror::Error)]
pub enum BoothError {
    #[error("Media access error: {message}")]
    MediaAccess { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Surface is tainted by cross-origin media and cannot be exported")]
    TaintedSurface,

    #[error("Layout error: {message}")]
    Layout { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using BoothError.
pub type BoothResult<T> = Result<T, BoothError>;

impl BoothError {
    pub fn media_access(msg: impl Into<String>) -> Self {
        Self::MediaAccess {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout {
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the session can continue after this error without a reset.
    ///
    /// Transport hiccups only affect the connectivity indicator; everything
    /// else leaves the current shot or artifact unusable.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Protocol { .. })
    }
}
