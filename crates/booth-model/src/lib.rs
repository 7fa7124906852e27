//! SnapBooth Model
//!
//! Defines the core data contracts shared by both booths of a pair:
//! - **Layout:** the strip arrangement and its slot geometry table
//! - **Settings:** filter, paper and border colors, caption
//! - **Message:** the closed set of messages exchanged over the peer link
//!
//! All geometry is in output pixels of the composed strip.

pub mod layout;
pub mod message;
pub mod settings;

pub use layout::*;
pub use message::*;
pub use settings::*;

/// Errors raised while parsing or validating model values.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid layout geometry: {message}")]
    InvalidGeometry { message: String },

    #[error("Unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Invalid color {value:?}: expected #rrggbb")]
    InvalidColor { value: String },
}
