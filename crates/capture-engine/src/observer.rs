//! Booth event observer.
//!
//! The controller reports everything a front end would show (countdown,
//! flash, progress thumbnails, connectivity, errors) through this trait.
//! All methods default to no-ops.

use snapbooth_common::error::BoothError;
use snapbooth_model::layout::LayoutKind;
use snapbooth_model::settings::SettingKey;
use snapbooth_render_engine::Artifact;

use crate::session::{IgnoreReason, ShotRecord};

/// Connectivity indicator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    Connected,
    Disconnected,
    /// A transport or protocol problem; the link may still be usable.
    Error,
}

/// Who asked for a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOrigin {
    Local,
    Remote,
}

pub trait BoothObserver: Send + Sync {
    /// One countdown tick; `remaining` runs down to 1.
    fn on_countdown(&self, _shot: usize, _remaining: u32, _sound: bool) {}

    fn on_flash(&self, _shot: usize) {}

    /// A shot was drawn and counted.
    fn on_shot(&self, _record: &ShotRecord, _total: usize) {}

    fn on_ignored(&self, _origin: TriggerOrigin, _reason: IgnoreReason) {}

    fn on_finalized(&self, _artifact: &Artifact) {}

    fn on_error(&self, _error: &BoothError) {}

    fn on_peer_status(&self, _status: PeerStatus) {}

    fn on_reset(&self, _layout: LayoutKind) {}

    fn on_setting(&self, _key: SettingKey, _value: &str, _origin: TriggerOrigin) {}
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BoothObserver for NoopObserver {}
