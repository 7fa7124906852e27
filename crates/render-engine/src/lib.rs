//! SnapBooth Render Engine
//!
//! Owns the shared drawing surface of a session and turns it into the
//! final strip.
//!
//! # Pipeline Architecture
//!
//! ```text
//! local frame ──┐
//!               ├── Center square crop ── Scale ── Filter ── Mirror (local only)
//! remote frame ─┘                                              │
//!                                                              ├── Composite into slot
//!                                                              ├── Border stroke
//!                                                              ▼
//!                                                      Surface (per shot)
//!                                                              │
//!                                         Grain texture ── Caption ── PNG encode
//!                                                              │
//!                                                              ▼
//!                                                        Artifact (.png)
//! ```

pub mod compositor;
pub mod export;
pub mod filter;

pub use compositor::*;
pub use export::*;
pub use filter::apply_filter;

/// Re-exported so callers can build frames without depending on `image`
/// directly.
pub use image::{Rgba, RgbaImage};
