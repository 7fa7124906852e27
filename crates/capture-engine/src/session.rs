//! Booth session state.
//!
//! One `BoothSession` covers the lifecycle from the first shot to the
//! finalized strip. It is owned by the controller and handed to the
//! pipeline by reference; nothing else mutates it.

use std::sync::Arc;

use rand::Rng;
use snapbooth_common::clock::SessionClock;
use snapbooth_common::error::{BoothError, BoothResult};
use snapbooth_model::layout::{LayoutKind, LayoutTable, ShotSlot};
use snapbooth_model::settings::{Color, Filter};
use snapbooth_render_engine::{finalize, Artifact, FinishOptions, RgbaImage, Surface};

use crate::guard::{ShotGuard, ShotPermit};

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the next shot.
    Ready,
    /// A shot is in flight.
    Capturing,
    /// All shots taken; terminal until reset.
    Done,
}

/// Why a shot request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Another shot holds the guard.
    Busy,
    /// The layout's shot count has been reached.
    SessionComplete,
}

/// One captured row of the strip.
#[derive(Debug, Clone)]
pub struct ShotRecord {
    pub index: usize,
    pub slot: ShotSlot,
    pub filter: Filter,
    pub border: Color,
    /// Progress thumbnails of the local and remote squares.
    pub thumbnails: (RgbaImage, RgbaImage),
    /// Whether each side drew a live frame (`false` = placeholder).
    pub live: (bool, bool),
}

/// Admission to run one shot. Holds the guard until consumed or dropped.
#[derive(Debug)]
pub struct ShotTicket {
    slot: ShotSlot,
    epoch: u64,
    _permit: ShotPermit,
}

impl ShotTicket {
    pub fn slot(&self) -> ShotSlot {
        self.slot
    }

    pub fn index(&self) -> usize {
        self.slot.index
    }
}

/// Result of handing a finished shot back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotCompletion {
    /// More shots to go; `next` is the upcoming index.
    Continue { next: usize },
    /// That was the last shot; finalize now.
    Final,
    /// The session was reset while the shot was in flight; discarded.
    Stale,
}

/// Mutable state of one booth session.
#[derive(Debug)]
pub struct BoothSession {
    table: Arc<LayoutTable>,
    layout: LayoutKind,
    shot_index: usize,
    guard: ShotGuard,
    epoch: u64,
    surface: Option<Surface>,
    shots: Vec<ShotRecord>,
    finalized: bool,
    artifact: Option<Artifact>,
    clock: SessionClock,
}

impl BoothSession {
    /// A fresh session. `table` must already be validated.
    pub fn new(table: Arc<LayoutTable>, layout: LayoutKind) -> Self {
        Self {
            table,
            layout,
            shot_index: 0,
            guard: ShotGuard::new(),
            epoch: 0,
            surface: None,
            shots: Vec::new(),
            finalized: false,
            artifact: None,
            clock: SessionClock::start(),
        }
    }

    pub fn layout(&self) -> LayoutKind {
        self.layout
    }

    pub fn table(&self) -> &LayoutTable {
        &self.table
    }

    pub fn shot_index(&self) -> usize {
        self.shot_index
    }

    pub fn total_shots(&self) -> usize {
        self.layout.shot_count()
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_held()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.shot_index >= self.total_shots() {
            SessionPhase::Done
        } else if self.is_busy() {
            SessionPhase::Capturing
        } else {
            SessionPhase::Ready
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn shots(&self) -> &[ShotRecord] {
        &self.shots
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Admit the next shot, or say why not.
    pub fn begin_shot(&self) -> Result<ShotTicket, IgnoreReason> {
        if self.shot_index >= self.total_shots() {
            return Err(IgnoreReason::SessionComplete);
        }
        let permit = self.guard.try_acquire().ok_or(IgnoreReason::Busy)?;
        let slot = self
            .table
            .slot(self.layout, self.shot_index)
            .ok_or(IgnoreReason::SessionComplete)?;
        Ok(ShotTicket {
            slot,
            epoch: self.epoch,
            _permit: permit,
        })
    }

    /// The surface to draw `ticket`'s shot on. The first shot of a session
    /// sizes the surface for the layout and fills it with `paper`.
    pub fn prepare_surface(&mut self, ticket: &ShotTicket, paper: Color) -> &mut Surface {
        let geometry = self.table.geometry(self.layout);
        let (width, height) = (geometry.canvas_width, geometry.canvas_height);
        if ticket.index() == 0 || self.surface.is_none() {
            tracing::debug!(layout = %self.layout, width, height, %paper, "Initializing surface");
            self.surface = Some(Surface::new(width, height, paper));
        }
        self.surface.get_or_insert_with(|| Surface::new(width, height, paper))
    }

    /// Record a captured shot and advance.
    pub fn complete_shot(&mut self, ticket: ShotTicket, record: ShotRecord) -> ShotCompletion {
        if ticket.epoch != self.epoch {
            tracing::debug!(index = ticket.index(), "Discarding shot from before reset");
            return ShotCompletion::Stale;
        }
        self.shots.push(record);
        self.shot_index += 1;
        drop(ticket);

        if self.shot_index >= self.total_shots() {
            ShotCompletion::Final
        } else {
            ShotCompletion::Continue {
                next: self.shot_index,
            }
        }
    }

    /// Give up on a shot; it stays uncounted and the guard is freed.
    pub fn abort_shot(&mut self, ticket: ShotTicket) {
        tracing::debug!(index = ticket.index(), "Shot aborted");
        drop(ticket);
    }

    /// Run finalization. Only the first call after the last shot does any
    /// work; later calls fail until the session is reset.
    pub fn finalize(
        &mut self,
        options: &FinishOptions<'_>,
        rng: &mut impl Rng,
    ) -> BoothResult<&Artifact> {
        if self.shot_index < self.total_shots() {
            return Err(BoothError::render(format!(
                "cannot finalize after {} of {} shots",
                self.shot_index,
                self.total_shots()
            )));
        }
        if self.finalized {
            return Err(BoothError::render("session already finalized"));
        }
        self.finalized = true;

        let surface = self
            .surface
            .as_mut()
            .ok_or_else(|| BoothError::render("no surface to finalize"))?;
        let artifact = finalize(surface, options, rng)?;
        tracing::info!(
            layout = %self.layout,
            shots = self.shots.len(),
            started = %self.clock.epoch_wall(),
            elapsed_secs = self.clock.elapsed_secs(),
            "Session finalized"
        );
        Ok(self.artifact.insert(artifact))
    }

    /// Back to shot 0 with `layout`, dropping all drawn state. Frees the
    /// guard even if a shot is in flight; that shot will come back stale.
    pub fn reset(&mut self, layout: LayoutKind) {
        self.layout = layout;
        self.shot_index = 0;
        self.epoch += 1;
        self.guard.force_release();
        self.surface = None;
        self.shots.clear();
        self.finalized = false;
        self.artifact = None;
        self.clock = SessionClock::start();
        tracing::debug!(%layout, epoch = self.epoch, "Session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(layout: LayoutKind) -> BoothSession {
        BoothSession::new(Arc::new(LayoutTable::default()), layout)
    }

    fn record(ticket: &ShotTicket) -> ShotRecord {
        ShotRecord {
            index: ticket.index(),
            slot: ticket.slot(),
            filter: Filter::None,
            border: Color::WHITE,
            thumbnails: (RgbaImage::new(1, 1), RgbaImage::new(1, 1)),
            live: (true, true),
        }
    }

    #[test]
    fn busy_session_refuses_second_ticket() {
        let s = session(LayoutKind::TwoRow);
        let ticket = s.begin_shot().unwrap();
        assert_eq!(s.phase(), SessionPhase::Capturing);
        assert_eq!(s.begin_shot().unwrap_err(), IgnoreReason::Busy);
        drop(ticket);
        assert_eq!(s.phase(), SessionPhase::Ready);
    }

    #[test]
    fn completes_into_done() {
        let mut s = session(LayoutKind::TwoRow);
        let t = s.begin_shot().unwrap();
        let r = record(&t);
        assert_eq!(s.complete_shot(t, r), ShotCompletion::Continue { next: 1 });
        assert!(!s.is_busy());

        let t = s.begin_shot().unwrap();
        assert_eq!(t.slot().left.y, 365);
        let r = record(&t);
        assert_eq!(s.complete_shot(t, r), ShotCompletion::Final);
        assert_eq!(s.phase(), SessionPhase::Done);
        assert_eq!(s.begin_shot().unwrap_err(), IgnoreReason::SessionComplete);
    }

    #[test]
    fn aborted_shot_is_not_counted() {
        let mut s = session(LayoutKind::Single);
        let t = s.begin_shot().unwrap();
        s.abort_shot(t);
        assert_eq!(s.shot_index(), 0);
        assert_eq!(s.phase(), SessionPhase::Ready);
    }

    #[test]
    fn reset_discards_in_flight_shot() {
        let mut s = session(LayoutKind::ThreeRow);
        let t = s.begin_shot().unwrap();
        let r = record(&t);
        s.reset(LayoutKind::Single);
        assert!(!s.is_busy());

        assert_eq!(s.complete_shot(t, r), ShotCompletion::Stale);
        assert_eq!(s.shot_index(), 0);
        assert_eq!(s.total_shots(), 1);
    }

    #[test]
    fn surface_is_created_on_first_shot_only() {
        let mut s = session(LayoutKind::TwoRow);
        let t = s.begin_shot().unwrap();
        let surface = s.prepare_surface(&t, Color::rgb(1, 2, 3));
        assert_eq!(surface.dimensions(), (700, 800));
        surface.mark_tainted();
        let r = record(&t);
        s.complete_shot(t, r);

        let t = s.begin_shot().unwrap();
        assert!(s.prepare_surface(&t, Color::WHITE).is_tainted());
    }

    #[test]
    fn finalize_requires_all_shots_and_runs_once() {
        let mut s = session(LayoutKind::Single);
        let options = FinishOptions {
            caption: "test".into(),
            caption_margin: 40,
            paper: Color::WHITE,
            grain_opacity: 0.0,
            font: None,
            file_prefix: "SnapBooth".into(),
            timestamp_millis: 1,
        };
        let mut rng = rand::thread_rng();
        assert!(s.finalize(&options, &mut rng).is_err());

        let t = s.begin_shot().unwrap();
        s.prepare_surface(&t, Color::WHITE);
        let r = record(&t);
        s.complete_shot(t, r);

        assert!(s.finalize(&options, &mut rng).is_ok());
        assert!(s.finalize(&options, &mut rng).is_err());
        assert!(s.artifact().is_some());

        s.reset(LayoutKind::Single);
        assert!(s.artifact().is_none());
        assert!(!s.is_finalized());
    }
}
