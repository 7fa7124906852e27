//! The per-shot capture/composite pipeline.
//!
//! One run produces one row of the strip: countdown, flash, a single
//! synchronous drawing pass over both sources, thumbnails, then the
//! post-flash pause. The run is never cancelled once started.

use std::time::Duration;

use snapbooth_common::config::BoothDefaults;
use snapbooth_common::error::BoothResult;
use snapbooth_model::layout::{ShotSlot, SquareRect};
use snapbooth_model::settings::{BoothSettings, Color, Filter};
use snapbooth_render_engine::{SquareStyle, Surface, PLACEHOLDER_COLOR};

use crate::observer::BoothObserver;
use crate::session::{BoothSession, ShotRecord, ShotTicket};
use crate::source::FrameSource;

/// Timing and output knobs of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub countdown_ticks: u32,
    pub tick: Duration,
    /// Pause after the flash before the next shot may start.
    pub flash: Duration,
    /// Passed through with each countdown tick.
    pub sound: bool,
    /// Edge of the progress thumbnails; 0 keeps full slot size.
    pub thumbnail_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            tick: Duration::from_secs(1),
            flash: Duration::from_millis(400),
            sound: false,
            thumbnail_size: 96,
        }
    }
}

impl PipelineConfig {
    pub fn from_defaults(defaults: &BoothDefaults) -> Self {
        Self {
            countdown_ticks: defaults.countdown_ticks,
            tick: Duration::from_millis(defaults.tick_ms),
            flash: Duration::from_millis(defaults.flash_ms),
            sound: defaults.sound,
            thumbnail_size: defaults.thumbnail_size,
        }
    }

    /// No waiting at all; for tests and batch runs.
    pub fn instant() -> Self {
        Self {
            tick: Duration::ZERO,
            flash: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Settings snapshot a shot is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotStyle {
    pub filter: Filter,
    pub paper: Color,
    pub border: Color,
    pub border_width: u32,
}

impl From<&BoothSettings> for ShotStyle {
    fn from(settings: &BoothSettings) -> Self {
        Self {
            filter: settings.filter,
            paper: settings.paper,
            border: settings.border,
            border_width: settings.border_width,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapturePipeline {
    config: PipelineConfig,
}

impl CapturePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the shot admitted by `ticket` against `session`'s surface.
    ///
    /// The caller keeps the ticket and hands it back to the session with
    /// the returned record (or aborts it on error).
    pub async fn run(
        &self,
        session: &mut BoothSession,
        ticket: &ShotTicket,
        style: ShotStyle,
        local: &dyn FrameSource,
        remote: &dyn FrameSource,
        observer: &dyn BoothObserver,
    ) -> BoothResult<ShotRecord> {
        let index = ticket.index();
        tracing::info!(shot = index, total = session.total_shots(), "Shot countdown started");

        for remaining in (1..=self.config.countdown_ticks).rev() {
            observer.on_countdown(index, remaining, self.config.sound);
            tokio::time::sleep(self.config.tick).await;
        }
        observer.on_flash(index);

        let surface = session.prepare_surface(ticket, style.paper);
        let record = compose_shot(
            surface,
            ticket.slot(),
            style,
            local,
            remote,
            self.config.thumbnail_size,
        )?;

        tokio::time::sleep(self.config.flash).await;
        Ok(record)
    }
}

/// The synchronous drawing pass of one shot.
pub fn compose_shot(
    surface: &mut Surface,
    slot: ShotSlot,
    style: ShotStyle,
    local: &dyn FrameSource,
    remote: &dyn FrameSource,
    thumbnail_size: u32,
) -> BoothResult<ShotRecord> {
    let local_live = draw_source(surface, slot.left, local, true, style.filter)?;
    let remote_live = draw_source(surface, slot.right, remote, false, style.filter)?;

    for square in [slot.left, slot.right] {
        surface.stroke_square(square, style.border_width, style.border)?;
    }

    let thumbnails = (
        surface.extract(slot.left, thumbnail_size)?,
        surface.extract(slot.right, thumbnail_size)?,
    );

    tracing::debug!(
        shot = slot.index,
        local_live,
        remote_live,
        filter = %style.filter,
        "Shot composed"
    );

    Ok(ShotRecord {
        index: slot.index,
        slot,
        filter: style.filter,
        border: style.border,
        thumbnails,
        live: (local_live, remote_live),
    })
}

/// Draw one source into `square`. Returns whether a live frame was used.
fn draw_source(
    surface: &mut Surface,
    square: SquareRect,
    source: &dyn FrameSource,
    mirror: bool,
    filter: Filter,
) -> BoothResult<bool> {
    match source.current_frame()? {
        Some(frame) if frame.width() > 0 && frame.height() > 0 => {
            surface.draw_square_crop(&frame, square, SquareStyle { mirror, filter })?;
            if source.taints_surface() {
                tracing::warn!(source = source.label(), "Cross-origin frame drawn; surface tainted");
                surface.mark_tainted();
            }
            Ok(true)
        }
        _ => {
            tracing::debug!(source = source.label(), "No frame yet; drawing placeholder");
            surface.fill_square(square, PLACEHOLDER_COLOR)?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use snapbooth_common::error::BoothError;
    use snapbooth_model::layout::LayoutTable;
    use snapbooth_render_engine::{rgba, Rgba, RgbaImage};

    use super::*;
    use crate::source::{FrameSlot, StillSource};

    fn style() -> ShotStyle {
        ShotStyle {
            filter: Filter::None,
            paper: Color::WHITE,
            border: Color::rgb(255, 0, 0),
            border_width: 2,
        }
    }

    fn slot() -> ShotSlot {
        LayoutTable::default()
            .slot(snapbooth_model::layout::LayoutKind::Single, 0)
            .unwrap()
    }

    /// Left half black, right half white.
    fn split_frame() -> RgbaImage {
        RgbaImage::from_fn(40, 40, |x, _| {
            if x < 20 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }

    struct FailingSource;

    impl FrameSource for FailingSource {
        fn label(&self) -> &str {
            "failing"
        }

        fn current_frame(&self) -> BoothResult<Option<RgbaImage>> {
            Err(BoothError::capture("device lost"))
        }
    }

    #[test]
    fn local_is_mirrored_and_remote_is_not() {
        let mut surface = Surface::new(800, 650, Color::WHITE);
        let source = StillSource::new("cam", split_frame());
        let slot = slot();
        compose_shot(&mut surface, slot, style(), &source, &source, 0).unwrap();

        let probe_y = slot.left.y + slot.left.size / 2;
        let left_edge = surface.canvas().get_pixel(slot.left.x + 10, probe_y);
        let right_edge = surface.canvas().get_pixel(slot.right.x + 10, probe_y);
        assert_eq!(left_edge.0, [255, 255, 255, 255]);
        assert_eq!(right_edge.0, [0, 0, 0, 255]);
    }

    #[test]
    fn missing_frame_gets_placeholder_and_border() {
        let mut surface = Surface::new(800, 650, Color::WHITE);
        let local = StillSource::new("cam", split_frame());
        let (remote, _feed) = FrameSlot::new("peer");
        let slot = slot();
        let record = compose_shot(&mut surface, slot, style(), &local, &remote, 0).unwrap();

        assert_eq!(record.live, (true, false));
        let center = slot.right.size / 2;
        assert_eq!(
            *surface.canvas().get_pixel(slot.right.x + center, slot.right.y + center),
            rgba(PLACEHOLDER_COLOR)
        );
        assert_eq!(
            surface.canvas().get_pixel(slot.right.x, slot.right.y).0,
            [255, 0, 0, 255]
        );
    }

    #[test]
    fn thumbnails_are_downscaled() {
        let mut surface = Surface::new(800, 650, Color::WHITE);
        let source = StillSource::new("cam", split_frame());
        let record = compose_shot(&mut surface, slot(), style(), &source, &source, 48).unwrap();
        assert_eq!(record.thumbnails.0.dimensions(), (48, 48));
        assert_eq!(record.thumbnails.1.dimensions(), (48, 48));
    }

    #[test]
    fn cross_origin_frames_taint_the_surface() {
        let mut surface = Surface::new(800, 650, Color::WHITE);
        let local = StillSource::new("cam", split_frame());
        let (remote, feed) = FrameSlot::new("peer");
        let remote = remote.cross_origin(true);

        compose_shot(&mut surface, slot(), style(), &local, &remote, 0).unwrap();
        assert!(!surface.is_tainted(), "placeholder must not taint");

        feed.publish(split_frame());
        compose_shot(&mut surface, slot(), style(), &local, &remote, 0).unwrap();
        assert!(surface.is_tainted());
    }

    #[test]
    fn source_error_aborts_compose() {
        let mut surface = Surface::new(800, 650, Color::WHITE);
        let local = StillSource::new("cam", split_frame());
        let err = compose_shot(&mut surface, slot(), style(), &local, &FailingSource, 0).unwrap_err();
        assert!(matches!(err, BoothError::Capture { .. }));
    }

    #[derive(Default)]
    struct Ticks(Mutex<Vec<(u32, tokio::time::Instant)>>);

    impl BoothObserver for Ticks {
        fn on_countdown(&self, _shot: usize, remaining: u32, _sound: bool) {
            self.0.lock().unwrap().push((remaining, tokio::time::Instant::now()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_one_second_apart() {
        use std::sync::Arc;

        let mut session = BoothSession::new(
            Arc::new(LayoutTable::default()),
            snapbooth_model::layout::LayoutKind::Single,
        );
        let ticket = session.begin_shot().unwrap();
        let source = StillSource::new("cam", split_frame());
        let ticks = Ticks::default();
        let pipeline = CapturePipeline::new(PipelineConfig::default());

        let started = tokio::time::Instant::now();
        pipeline
            .run(&mut session, &ticket, style(), &source, &source, &ticks)
            .await
            .unwrap();

        let ticks = ticks.0.into_inner().unwrap();
        let remaining: Vec<u32> = ticks.iter().map(|(r, _)| *r).collect();
        assert_eq!(remaining, vec![3, 2, 1]);
        for (i, (_, at)) in ticks.iter().enumerate() {
            assert_eq!(*at - started, Duration::from_secs(i as u64));
        }
        assert_eq!(started.elapsed(), Duration::from_millis(3400));
    }
}
