//! Terminal front end for booth events.

use std::io::Write;
use std::path::PathBuf;

use snapbooth_capture_engine::{BoothObserver, IgnoreReason, PeerStatus, ShotRecord, TriggerOrigin};
use snapbooth_common::error::BoothError;
use snapbooth_model::layout::LayoutKind;
use snapbooth_model::settings::SettingKey;
use snapbooth_render_engine::Artifact;

/// Prints progress and saves finished strips into `output_dir`.
pub struct ConsoleObserver {
    output_dir: PathBuf,
}

impl ConsoleObserver {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

impl BoothObserver for ConsoleObserver {
    fn on_countdown(&self, _shot: usize, remaining: u32, sound: bool) {
        if sound {
            print!("\x07");
        }
        print!("  {remaining}... ");
        std::io::stdout().flush().ok();
    }

    fn on_flash(&self, _shot: usize) {
        println!("*click*");
    }

    fn on_shot(&self, record: &ShotRecord, total: usize) {
        let placeholder = match record.live {
            (true, true) => "",
            (false, true) => " (no local frame)",
            (true, false) => " (no remote frame)",
            (false, false) => " (no frames)",
        };
        println!("Shot {}/{total} captured{placeholder}", record.index + 1);
    }

    fn on_ignored(&self, origin: TriggerOrigin, reason: IgnoreReason) {
        let who = match origin {
            TriggerOrigin::Local => "Snap",
            TriggerOrigin::Remote => "Peer snap",
        };
        match reason {
            IgnoreReason::Busy => println!("{who} ignored: a shot is already running"),
            IgnoreReason::SessionComplete => {
                println!("{who} ignored: strip is complete, type `reset` to start over")
            }
        }
    }

    fn on_finalized(&self, artifact: &Artifact) {
        println!("Strip finished: {}x{} \"{}\"", artifact.width, artifact.height, artifact.caption);
        if !artifact.caption_rendered {
            println!("  (caption not drawn: no font available)");
        }
        match artifact.save_to(&self.output_dir) {
            Ok(path) => println!("  Saved to {}", path.display()),
            Err(e) => eprintln!("  Could not save strip: {e}"),
        }
    }

    fn on_error(&self, error: &BoothError) {
        match error {
            BoothError::TaintedSurface => {
                eprintln!("Cannot export: {error}. Type `reset` to start a new strip.")
            }
            _ => eprintln!("Error: {error}"),
        }
    }

    fn on_peer_status(&self, status: PeerStatus) {
        match status {
            PeerStatus::Connected => println!("[peer] connected"),
            PeerStatus::Disconnected => println!("[peer] disconnected"),
            PeerStatus::Error => println!("[peer] unreachable"),
        }
    }

    fn on_reset(&self, layout: LayoutKind) {
        println!("Ready: {layout} layout, {} shot(s)", layout.shot_count());
    }

    fn on_setting(&self, key: SettingKey, value: &str, origin: TriggerOrigin) {
        let who = match origin {
            TriggerOrigin::Local => "you",
            TriggerOrigin::Remote => "peer",
        };
        println!("{key} = {value:?} (set by {who})");
    }
}
