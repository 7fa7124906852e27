//! Frame sources: where the local and remote squares get their pixels.
//!
//! Live media delivery is outside this crate. A source only has to answer
//! "what is the current frame, if any"; live producers push into a
//! [`FrameSlot`] through its [`FrameFeed`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use snapbooth_common::error::{BoothError, BoothResult};

/// A video source the pipeline can sample.
pub trait FrameSource: Send + Sync {
    /// Human-readable name for logs.
    fn label(&self) -> &str;

    /// The most recent frame, or `None` while the source is not producing.
    fn current_frame(&self) -> BoothResult<Option<RgbaImage>>;

    /// Whether pixels from this source make the surface unexportable.
    fn taints_surface(&self) -> bool {
        false
    }
}

/// A fixed image, e.g. a photo loaded from disk.
#[derive(Debug, Clone)]
pub struct StillSource {
    label: String,
    frame: RgbaImage,
}

impl StillSource {
    pub fn new(label: impl Into<String>, frame: RgbaImage) -> Self {
        Self {
            label: label.into(),
            frame,
        }
    }

    /// Load an image file. Any failure is a media-access error.
    pub fn open(label: impl Into<String>, path: impl AsRef<Path>) -> BoothResult<Self> {
        let path = path.as_ref();
        let frame = image::open(path)
            .map_err(|e| BoothError::media_access(format!("{}: {e}", path.display())))?
            .to_rgba8();
        tracing::debug!(path = %path.display(), width = frame.width(), height = frame.height(), "Still source loaded");
        Ok(Self::new(label, frame))
    }
}

impl FrameSource for StillSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn current_frame(&self) -> BoothResult<Option<RgbaImage>> {
        Ok(Some(self.frame.clone()))
    }
}

/// Generated test card with a marker in its upper-left quadrant, so
/// mirroring and cropping are visible in the output.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    label: String,
    frame: RgbaImage,
}

impl SyntheticSource {
    pub fn new(label: impl Into<String>, width: u32, height: u32, tint: [u8; 3]) -> Self {
        let mut frame = RgbaImage::from_fn(width, height, |x, y| {
            let fx = x as f32 / width.max(1) as f32;
            let fy = y as f32 / height.max(1) as f32;
            Rgba([
                (tint[0] as f32 * (0.5 + 0.5 * fx)) as u8,
                (tint[1] as f32 * (0.5 + 0.5 * fy)) as u8,
                tint[2],
                255,
            ])
        });

        let side = width.min(height);
        if side >= 8 {
            let quarter = (side / 4) as i32;
            let cx = (width / 2) as i32 - quarter;
            let cy = (height / 2) as i32 - quarter;
            draw_filled_circle_mut(&mut frame, (cx, cy), quarter / 2, Rgba([255, 255, 255, 255]));
            draw_filled_rect_mut(
                &mut frame,
                Rect::at(0, (height - height / 10) as i32).of_size(width, (height / 10).max(1)),
                Rgba([20, 20, 20, 255]),
            );
        }

        Self {
            label: label.into(),
            frame,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn current_frame(&self) -> BoothResult<Option<RgbaImage>> {
        Ok(Some(self.frame.clone()))
    }
}

/// Latest-frame mailbox fed by an external producer.
#[derive(Debug, Clone)]
pub struct FrameSlot {
    label: String,
    latest: Arc<Mutex<Option<RgbaImage>>>,
    cross_origin: bool,
}

/// Producer side of a [`FrameSlot`].
#[derive(Debug, Clone)]
pub struct FrameFeed {
    latest: Arc<Mutex<Option<RgbaImage>>>,
}

impl FrameSlot {
    /// An empty slot and its feed.
    pub fn new(label: impl Into<String>) -> (Self, FrameFeed) {
        let latest = Arc::new(Mutex::new(None));
        (
            Self {
                label: label.into(),
                latest: Arc::clone(&latest),
                cross_origin: false,
            },
            FrameFeed { latest },
        )
    }

    /// Mark frames from this slot as cross-origin.
    pub fn cross_origin(mut self, cross_origin: bool) -> Self {
        self.cross_origin = cross_origin;
        self
    }
}

impl FrameSource for FrameSlot {
    fn label(&self) -> &str {
        &self.label
    }

    fn current_frame(&self) -> BoothResult<Option<RgbaImage>> {
        let latest = self
            .latest
            .lock()
            .map_err(|_| BoothError::capture(format!("{} frame slot poisoned", self.label)))?;
        Ok(latest.clone())
    }

    fn taints_surface(&self) -> bool {
        self.cross_origin
    }
}

impl FrameFeed {
    /// Replace the current frame.
    pub fn publish(&self, frame: RgbaImage) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(frame);
        }
    }

    /// Mark the stream as stopped; readers fall back to a placeholder.
    pub fn clear(&self) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = None;
        }
    }
}

/// Build a source from a command-line style spec:
/// `none`, `synthetic`, `synthetic:WIDTHxHEIGHT`, or an image path.
pub fn open_source(label: &str, spec: &str, tint: [u8; 3]) -> BoothResult<Box<dyn FrameSource>> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("none") {
        let (slot, _feed) = FrameSlot::new(label);
        return Ok(Box::new(slot));
    }
    if let Some(rest) = spec.strip_prefix("synthetic") {
        let (width, height) = match rest.strip_prefix(':') {
            None if rest.is_empty() => (1280, 720),
            Some(dims) => parse_dimensions(dims)?,
            None => return Err(BoothError::media_access(format!("unknown source {spec:?}"))),
        };
        return Ok(Box::new(SyntheticSource::new(label, width, height, tint)));
    }
    Ok(Box::new(StillSource::open(label, spec)?))
}

fn parse_dimensions(dims: &str) -> BoothResult<(u32, u32)> {
    let invalid = || BoothError::media_access(format!("invalid dimensions {dims:?}, expected WIDTHxHEIGHT"));
    let (w, h) = dims.split_once('x').ok_or_else(invalid)?;
    let width: u32 = w.parse().map_err(|_| invalid())?;
    let height: u32 = h.parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_slot_starts_empty_and_follows_feed() {
        let (slot, feed) = FrameSlot::new("remote");
        assert!(slot.current_frame().unwrap().is_none());

        feed.publish(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])));
        let frame = slot.current_frame().unwrap().unwrap();
        assert_eq!(frame.dimensions(), (3, 2));

        feed.clear();
        assert!(slot.current_frame().unwrap().is_none());
    }

    #[test]
    fn cross_origin_slot_taints() {
        let (slot, _feed) = FrameSlot::new("remote");
        assert!(!slot.taints_surface());
        assert!(slot.cross_origin(true).taints_surface());
    }

    #[test]
    fn synthetic_spec_parses_dimensions() {
        let source = open_source("local", "synthetic:320x240", [200, 80, 80]).unwrap();
        let frame = source.current_frame().unwrap().unwrap();
        assert_eq!(frame.dimensions(), (320, 240));

        let default = open_source("local", "synthetic", [200, 80, 80]).unwrap();
        assert_eq!(default.current_frame().unwrap().unwrap().dimensions(), (1280, 720));
    }

    #[test]
    fn none_spec_yields_no_frames() {
        let source = open_source("remote", "none", [0, 0, 0]).unwrap();
        assert!(source.current_frame().unwrap().is_none());
    }

    #[test]
    fn bad_specs_are_media_access_errors() {
        for spec in ["synthetic:0x10", "synthetic:abc", "synthetics", "/no/such/photo.png"] {
            let err = open_source("local", spec, [0, 0, 0]).err().expect(spec);
            assert!(matches!(err, BoothError::MediaAccess { .. }), "{spec}: {err}");
        }
    }
}
