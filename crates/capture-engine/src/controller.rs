//! Booth controller: owns the session and dispatches every trigger.
//!
//! Local commands and peer events both funnel into one controller. While a
//! shot is in flight the controller keeps draining both inboxes: further
//! triggers are dropped, setting changes apply to the next shot, and a
//! reset (or layout change) waits until the running shot returns.

use std::sync::Arc;

use snapbooth_common::clock::{caption_date, unix_millis};
use snapbooth_common::config::BoothDefaults;
use snapbooth_common::error::{BoothError, BoothResult};
use snapbooth_model::layout::LayoutTable;
use snapbooth_model::message::PeerMessage;
use snapbooth_model::settings::{BoothSettings, SettingKey};
use snapbooth_render_engine::{CaptionFont, FinishOptions};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::link::{PeerEvent, PeerLink};
use crate::observer::{BoothObserver, NoopObserver, PeerStatus, TriggerOrigin};
use crate::pipeline::{CapturePipeline, ShotStyle};
use crate::session::{BoothSession, IgnoreReason, ShotCompletion};
use crate::source::FrameSource;

/// A request from the local operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalCommand {
    Snap,
    Set { key: SettingKey, value: String },
    Reset,
    Quit,
}

/// What became of one shot request.
#[derive(Debug)]
pub enum ShotOutcome {
    /// Shot `index` drawn and counted; more to go.
    Captured { index: usize },
    /// The last shot was drawn and the strip finalized.
    Finished,
    /// Dropped without touching the session.
    Ignored(IgnoreReason),
    /// A reset arrived during the shot; it was thrown away.
    Discarded,
    /// Capture or finalization failed. A failed capture leaves the shot
    /// uncounted; a failed finalization leaves the session done until reset.
    Failed(BoothError),
}

/// Finalization inputs that do not change per shot.
#[derive(Debug, Clone)]
pub struct FinishConfig {
    /// Default caption is `"{caption_prefix} // {date}"`.
    pub caption_prefix: String,
    pub file_prefix: String,
    pub grain_opacity: f32,
}

impl Default for FinishConfig {
    fn default() -> Self {
        Self {
            caption_prefix: "SNAPBOOTH".to_string(),
            file_prefix: "SnapBooth".to_string(),
            grain_opacity: 0.05,
        }
    }
}

impl FinishConfig {
    pub fn from_defaults(defaults: &BoothDefaults) -> Self {
        Self {
            caption_prefix: defaults.caption_prefix.clone(),
            file_prefix: defaults.file_prefix.clone(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct Deferred {
    reset: bool,
    quit: bool,
}

pub struct BoothController {
    session: BoothSession,
    settings: BoothSettings,
    pipeline: CapturePipeline,
    local: Box<dyn FrameSource>,
    remote: Box<dyn FrameSource>,
    link: Option<Box<dyn PeerLink>>,
    observer: Arc<dyn BoothObserver>,
    font: Option<CaptionFont>,
    finish: FinishConfig,
    peer_status: PeerStatus,
    deferred: Deferred,
}

impl BoothController {
    pub fn new(
        table: Arc<LayoutTable>,
        settings: BoothSettings,
        pipeline: CapturePipeline,
        local: Box<dyn FrameSource>,
        remote: Box<dyn FrameSource>,
    ) -> Self {
        Self {
            session: BoothSession::new(table, settings.layout),
            settings,
            pipeline,
            local,
            remote,
            link: None,
            observer: Arc::new(NoopObserver),
            font: None,
            finish: FinishConfig::default(),
            peer_status: PeerStatus::Disconnected,
            deferred: Deferred::default(),
        }
    }

    pub fn with_link(mut self, link: Box<dyn PeerLink>) -> Self {
        self.link = Some(link);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn BoothObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_font(mut self, font: Option<CaptionFont>) -> Self {
        self.font = font;
        self
    }

    pub fn with_finish(mut self, finish: FinishConfig) -> Self {
        self.finish = finish;
        self
    }

    pub fn session(&self) -> &BoothSession {
        &self.session
    }

    pub fn settings(&self) -> &BoothSettings {
        &self.settings
    }

    pub fn peer_status(&self) -> PeerStatus {
        self.peer_status
    }

    /// Run one shot if the session admits it.
    pub async fn request_shot(&mut self, origin: TriggerOrigin) -> ShotOutcome {
        self.run_shot(origin, None).await
    }

    /// Change a setting locally and mirror it to the peer.
    ///
    /// A layout change resets the session. Returns whether anything changed.
    pub async fn set_setting(&mut self, key: SettingKey, value: &str) -> BoothResult<bool> {
        let changed = apply_setting(
            &mut self.settings,
            self.observer.as_ref(),
            key,
            value,
            TriggerOrigin::Local,
        )
        .map_err(BoothError::config)?;
        if changed {
            let message = PeerMessage::settings(key, self.settings.value_of(key));
            if let Some(status) = send_to_peer(&mut self.link, &message).await {
                self.set_peer_status(status);
            }
            if key == SettingKey::Layout {
                self.reset();
            }
        }
        Ok(changed)
    }

    /// Back to shot 0 under the current layout.
    pub fn reset(&mut self) {
        let layout = self.settings.layout;
        self.session.reset(layout);
        self.deferred.reset = false;
        tracing::info!(%layout, shots = layout.shot_count(), "Booth reset");
        self.observer.on_reset(layout);
    }

    /// React to one event from the peer link.
    pub async fn handle_peer_event(&mut self, event: PeerEvent) -> Option<ShotOutcome> {
        self.dispatch_peer_event(event, None).await
    }

    /// Event loop: serve local commands and peer events until `Quit`, the
    /// command channel closing, or a deferred quit.
    pub async fn run(&mut self, mut commands: UnboundedReceiver<LocalCommand>) -> BoothResult<()> {
        tracing::info!(layout = %self.session.layout(), linked = self.link.is_some(), "Booth ready");
        self.observer.on_reset(self.session.layout());

        while !self.deferred.quit {
            tokio::select! {
                event = next_peer_event(&mut self.link) => match event {
                    Some(event) => {
                        self.dispatch_peer_event(event, Some(&mut commands)).await;
                    }
                    None => self.link_closed(),
                },
                command = commands.recv() => match command {
                    None | Some(LocalCommand::Quit) => break,
                    Some(LocalCommand::Snap) => {
                        self.run_shot(TriggerOrigin::Local, Some(&mut commands)).await;
                    }
                    Some(LocalCommand::Set { key, value }) => {
                        if let Err(e) = self.set_setting(key, &value).await {
                            tracing::warn!(error = %e, "Setting rejected");
                            self.observer.on_error(&e);
                        }
                    }
                    Some(LocalCommand::Reset) => self.reset(),
                },
            }
        }

        tracing::info!("Booth stopped");
        Ok(())
    }

    async fn dispatch_peer_event(
        &mut self,
        event: PeerEvent,
        commands: Option<&mut UnboundedReceiver<LocalCommand>>,
    ) -> Option<ShotOutcome> {
        match event {
            PeerEvent::Connected { peer } => {
                tracing::info!(%peer, "Peer connected");
                self.set_peer_status(PeerStatus::Connected);
                None
            }
            PeerEvent::StreamReceived { peer } => {
                tracing::info!(%peer, "Peer stream received");
                self.reset();
                None
            }
            PeerEvent::Closed => {
                self.link_closed();
                None
            }
            PeerEvent::Message(PeerMessage::ShotTrigger) => {
                Some(self.run_shot(TriggerOrigin::Remote, commands).await)
            }
            PeerEvent::Message(PeerMessage::SettingsUpdate { key, value }) => {
                match apply_setting(
                    &mut self.settings,
                    self.observer.as_ref(),
                    key,
                    &value,
                    TriggerOrigin::Remote,
                ) {
                    Ok(true) if key == SettingKey::Layout => self.reset(),
                    Ok(_) => {}
                    Err(message) => self.reject_remote(message),
                }
                None
            }
        }
    }

    async fn run_shot(
        &mut self,
        origin: TriggerOrigin,
        mut commands: Option<&mut UnboundedReceiver<LocalCommand>>,
    ) -> ShotOutcome {
        let ticket = match self.session.begin_shot() {
            Ok(ticket) => ticket,
            Err(reason) => {
                tracing::debug!(?origin, ?reason, "Shot request ignored");
                self.observer.on_ignored(origin, reason);
                return ShotOutcome::Ignored(reason);
            }
        };

        if origin == TriggerOrigin::Local {
            if let Some(status) = send_to_peer(&mut self.link, &PeerMessage::ShotTrigger).await {
                self.set_peer_status(status);
            }
        }

        let style = ShotStyle::from(&self.settings);
        let total = self.session.total_shots();
        let mut status_change = None;

        let result = {
            let Self {
                session,
                settings,
                pipeline,
                local,
                remote,
                link,
                observer,
                deferred,
                ..
            } = self;
            let observer: &dyn BoothObserver = &**observer;

            let capture = pipeline.run(session, &ticket, style, &**local, &**remote, observer);
            tokio::pin!(capture);

            loop {
                tokio::select! {
                    result = &mut capture => break result,
                    event = next_peer_event(link) => match event {
                        Some(PeerEvent::Message(PeerMessage::ShotTrigger)) => {
                            observer.on_ignored(TriggerOrigin::Remote, IgnoreReason::Busy);
                        }
                        Some(PeerEvent::Message(PeerMessage::SettingsUpdate { key, value })) => {
                            match apply_setting(settings, observer, key, &value, TriggerOrigin::Remote) {
                                Ok(true) if key == SettingKey::Layout => deferred.reset = true,
                                Ok(_) => {}
                                Err(message) => {
                                    tracing::warn!(%key, %value, %message, "Invalid setting from peer");
                                    observer.on_error(&BoothError::protocol(message));
                                }
                            }
                        }
                        Some(PeerEvent::StreamReceived { .. }) => deferred.reset = true,
                        Some(PeerEvent::Connected { peer }) => {
                            tracing::info!(%peer, "Peer connected");
                            status_change = Some(PeerStatus::Connected);
                        }
                        Some(PeerEvent::Closed) | None => {
                            tracing::warn!("Peer link closed during shot");
                            *link = None;
                            status_change = Some(PeerStatus::Disconnected);
                        }
                    },
                    command = next_command(&mut commands) => match command {
                        Some(LocalCommand::Snap) => {
                            observer.on_ignored(TriggerOrigin::Local, IgnoreReason::Busy);
                        }
                        Some(LocalCommand::Set { key, value }) => {
                            match apply_setting(settings, observer, key, &value, TriggerOrigin::Local) {
                                Ok(true) => {
                                    let message = PeerMessage::settings(key, settings.value_of(key));
                                    if let Some(status) = send_to_peer(link, &message).await {
                                        status_change = Some(status);
                                    }
                                    if key == SettingKey::Layout {
                                        deferred.reset = true;
                                    }
                                }
                                Ok(false) => {}
                                Err(message) => observer.on_error(&BoothError::config(message)),
                            }
                        }
                        Some(LocalCommand::Reset) => deferred.reset = true,
                        Some(LocalCommand::Quit) => deferred.quit = true,
                        None => {
                            commands = None;
                            deferred.quit = true;
                        }
                    },
                }
            }
        };

        if let Some(status) = status_change {
            self.set_peer_status(status);
        }

        if self.deferred.reset {
            self.session.abort_shot(ticket);
            tracing::info!("Reset requested during shot; shot discarded");
            self.reset();
            return ShotOutcome::Discarded;
        }

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, shot = ticket.index(), "Shot failed");
                self.session.abort_shot(ticket);
                self.observer.on_error(&e);
                return ShotOutcome::Failed(e);
            }
        };

        let index = record.index;
        self.observer.on_shot(&record, total);
        match self.session.complete_shot(ticket, record) {
            ShotCompletion::Continue { next } => {
                tracing::info!(shot = index, next, total, "Shot captured");
                ShotOutcome::Captured { index }
            }
            ShotCompletion::Final => {
                tracing::info!(shot = index, total, "Final shot captured");
                match self.finish_session() {
                    Ok(()) => ShotOutcome::Finished,
                    Err(e) => {
                        tracing::error!(error = %e, "Finalization failed");
                        self.observer.on_error(&e);
                        ShotOutcome::Failed(e)
                    }
                }
            }
            ShotCompletion::Stale => ShotOutcome::Discarded,
        }
    }

    fn finish_session(&mut self) -> BoothResult<()> {
        let caption = self
            .settings
            .caption
            .clone()
            .unwrap_or_else(|| format!("{} // {}", self.finish.caption_prefix, caption_date()));
        let options = FinishOptions {
            caption,
            caption_margin: self.session.table().caption_margin,
            paper: self.settings.paper,
            grain_opacity: self.finish.grain_opacity,
            font: self.font.as_ref(),
            file_prefix: self.finish.file_prefix.clone(),
            timestamp_millis: unix_millis(),
        };
        let artifact = self.session.finalize(&options, &mut rand::thread_rng())?;
        self.observer.on_finalized(artifact);
        Ok(())
    }

    fn reject_remote(&self, message: String) {
        tracing::warn!(%message, "Invalid setting from peer");
        self.observer.on_error(&BoothError::protocol(message));
    }

    fn link_closed(&mut self) {
        if self.link.take().is_some() {
            tracing::warn!("Peer link closed");
        }
        self.set_peer_status(PeerStatus::Disconnected);
    }

    fn set_peer_status(&mut self, status: PeerStatus) {
        if self.peer_status != status {
            self.peer_status = status;
            self.observer.on_peer_status(status);
        }
    }
}

fn apply_setting(
    settings: &mut BoothSettings,
    observer: &dyn BoothObserver,
    key: SettingKey,
    value: &str,
    origin: TriggerOrigin,
) -> Result<bool, String> {
    let changed = settings.apply(key, value).map_err(|e| e.to_string())?;
    if changed {
        let value = settings.value_of(key);
        tracing::debug!(%key, %value, ?origin, "Setting changed");
        observer.on_setting(key, &value, origin);
    }
    Ok(changed)
}

/// Best-effort send. A transport failure is never fatal; it comes back as
/// the peer status to show.
async fn send_to_peer(
    link: &mut Option<Box<dyn PeerLink>>,
    message: &PeerMessage,
) -> Option<PeerStatus> {
    let link = link.as_mut()?;
    match link.send(message).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reach peer");
            Some(PeerStatus::Error)
        }
    }
}

async fn next_peer_event(link: &mut Option<Box<dyn PeerLink>>) -> Option<PeerEvent> {
    match link {
        Some(link) => link.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_command(
    commands: &mut Option<&mut UnboundedReceiver<LocalCommand>>,
) -> Option<LocalCommand> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl std::fmt::Debug for BoothController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoothController")
            .field("session", &self.session)
            .field("settings", &self.settings)
            .field("local", &self.local.label())
            .field("remote", &self.remote.label())
            .field("linked", &self.link.is_some())
            .field("peer_status", &self.peer_status)
            .finish()
    }
}
