//! SnapBooth Capture Engine
//!
//! Runs a booth session: admits shots through a single-slot guard, drives
//! the countdown and drawing pass for each shot, and keeps the paired booth
//! in lockstep over a peer link.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 BoothController                   │
//! │  local commands ──┐          ┌── PeerLink events  │
//! │                   ▼          ▼                    │
//! │              ┌──────────────────┐                 │
//! │              │   BoothSession   │ ◄── ShotGuard   │
//! │              └────────┬─────────┘                 │
//! │                       ▼                           │
//! │  ┌────────────────────────────────────────────┐   │
//! │  │ CapturePipeline                            │   │
//! │  │  countdown ─ flash ─ compose ─ thumbnails  │   │
//! │  │  (local + remote FrameSource)              │   │
//! │  └────────────────────┬───────────────────────┘   │
//! │                       ▼                           │
//! │         finalize ─► Artifact (.png)               │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod controller;
pub mod guard;
pub mod link;
pub mod observer;
pub mod pipeline;
pub mod session;
pub mod source;

pub use controller::*;
pub use guard::{ShotGuard, ShotPermit};
pub use link::{ChannelLink, PeerEvent, PeerLink, TcpLink};
pub use observer::*;
pub use pipeline::*;
pub use session::*;
pub use source::*;
