//! The shared drawing surface a session composes its strip on.
//!
//! Every operation addresses the surface through [`SquareRect`]s taken from
//! the layout table; an operation on a square that does not fit the canvas
//! is a render error rather than a silent clip.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use snapbooth_common::error::{BoothError, BoothResult};
use snapbooth_model::layout::SquareRect;
use snapbooth_model::settings::{Color, Filter};

use crate::filter::apply_filter;

/// Fill used for a square whose source has no frame yet.
pub const PLACEHOLDER_COLOR: Color = Color::rgb(0x2b, 0x2b, 0x2b);

pub fn rgba(color: Color) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, 255])
}

/// Centered square crop of a `width` x `height` frame: `(sx, sy, side)`.
pub fn center_square_crop(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height);
    ((width - side) / 2, (height - side) / 2, side)
}

/// How a frame is placed into a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareStyle {
    /// Flip horizontally about the square's vertical centerline.
    pub mirror: bool,
    pub filter: Filter,
}

/// An RGBA canvas plus the taint bit inherited from drawn sources.
#[derive(Debug, Clone)]
pub struct Surface {
    canvas: RgbaImage,
    tainted: bool,
}

impl Surface {
    /// A `width` x `height` surface filled with `paper`.
    pub fn new(width: u32, height: u32, paper: Color) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, rgba(paper)),
            tainted: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub(crate) fn canvas_mut(&mut self) -> &mut RgbaImage {
        &mut self.canvas
    }

    /// Record that cross-origin pixels reached this surface.
    pub fn mark_tainted(&mut self) {
        self.tainted = true;
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    fn check_fits(&self, target: SquareRect) -> BoothResult<()> {
        if target.size == 0 || !target.fits_within(self.width(), self.height()) {
            return Err(BoothError::render(format!(
                "square {target:?} does not fit {}x{} surface",
                self.width(),
                self.height()
            )));
        }
        Ok(())
    }

    /// Crop `frame` to its centered square, scale it to `target`, style it,
    /// and composite it at `target`.
    pub fn draw_square_crop(
        &mut self,
        frame: &RgbaImage,
        target: SquareRect,
        style: SquareStyle,
    ) -> BoothResult<()> {
        self.check_fits(target)?;
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(BoothError::render("cannot crop an empty frame"));
        }

        let (sx, sy, side) = center_square_crop(width, height);
        let cropped = imageops::crop_imm(frame, sx, sy, side, side).to_image();
        let mut square = if side == target.size {
            cropped
        } else {
            imageops::resize(&cropped, target.size, target.size, FilterType::Triangle)
        };

        apply_filter(&mut square, style.filter);
        if style.mirror {
            imageops::flip_horizontal_in_place(&mut square);
        }

        imageops::replace(&mut self.canvas, &square, target.x as i64, target.y as i64);
        Ok(())
    }

    /// Fill `target` with a solid color.
    pub fn fill_square(&mut self, target: SquareRect, color: Color) -> BoothResult<()> {
        self.check_fits(target)?;
        draw_filled_rect_mut(
            &mut self.canvas,
            Rect::at(target.x as i32, target.y as i32).of_size(target.size, target.size),
            rgba(color),
        );
        Ok(())
    }

    /// Stroke a `width`-pixel border along the inside edge of `target`.
    pub fn stroke_square(&mut self, target: SquareRect, width: u32, color: Color) -> BoothResult<()> {
        self.check_fits(target)?;
        let color = rgba(color);
        for inset in 0..width.min(target.size.div_ceil(2)) {
            let side = target.size - 2 * inset;
            draw_hollow_rect_mut(
                &mut self.canvas,
                Rect::at((target.x + inset) as i32, (target.y + inset) as i32).of_size(side, side),
                color,
            );
        }
        Ok(())
    }

    /// Copy of the pixels under `target`, optionally downscaled to
    /// `thumb_size` (0 keeps the original size).
    pub fn extract(&self, target: SquareRect, thumb_size: u32) -> BoothResult<RgbaImage> {
        self.check_fits(target)?;
        let square =
            imageops::crop_imm(&self.canvas, target.x, target.y, target.size, target.size).to_image();
        if thumb_size == 0 || thumb_size >= target.size {
            return Ok(square);
        }
        Ok(imageops::resize(&square, thumb_size, thumb_size, FilterType::Triangle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: Color = Color::rgb(250, 250, 250);

    /// 8x4 frame: left half red, right half blue, with a 2px green margin
    /// column at each side that the center crop must discard.
    fn banded_frame() -> RgbaImage {
        RgbaImage::from_fn(8, 4, |x, _| match x {
            0 | 1 | 6 | 7 => Rgba([0, 255, 0, 255]),
            2 | 3 => Rgba([255, 0, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        })
    }

    fn plain() -> SquareStyle {
        SquareStyle {
            mirror: false,
            filter: Filter::None,
        }
    }

    #[test]
    fn crop_takes_centered_square() {
        assert_eq!(center_square_crop(1280, 720), (280, 0, 720));
        assert_eq!(center_square_crop(480, 640), (0, 80, 480));
        assert_eq!(center_square_crop(300, 300), (0, 0, 300));
    }

    #[test]
    fn new_surface_is_paper_filled() {
        let surface = Surface::new(20, 10, PAPER);
        assert_eq!(surface.dimensions(), (20, 10));
        assert!(surface.canvas().pixels().all(|p| *p == rgba(PAPER)));
        assert!(!surface.is_tainted());
    }

    #[test]
    fn unmirrored_draw_keeps_orientation_and_drops_margins() {
        let mut surface = Surface::new(10, 10, PAPER);
        surface
            .draw_square_crop(&banded_frame(), SquareRect::new(2, 2, 4), plain())
            .unwrap();

        assert_eq!(surface.canvas().get_pixel(2, 3).0, [255, 0, 0, 255]);
        assert_eq!(surface.canvas().get_pixel(5, 3).0, [0, 0, 255, 255]);
        assert!(surface.canvas().pixels().all(|p| p.0 != [0, 255, 0, 255]));
        assert_eq!(*surface.canvas().get_pixel(1, 1), rgba(PAPER));
        assert_eq!(*surface.canvas().get_pixel(6, 6), rgba(PAPER));
    }

    #[test]
    fn mirrored_draw_flips_about_square_center() {
        let mut surface = Surface::new(10, 10, PAPER);
        let style = SquareStyle {
            mirror: true,
            filter: Filter::None,
        };
        surface
            .draw_square_crop(&banded_frame(), SquareRect::new(2, 2, 4), style)
            .unwrap();

        assert_eq!(surface.canvas().get_pixel(2, 3).0, [0, 0, 255, 255]);
        assert_eq!(surface.canvas().get_pixel(5, 3).0, [255, 0, 0, 255]);
    }

    #[test]
    fn draw_scales_to_target_size() {
        let frame = RgbaImage::from_pixel(64, 48, Rgba([9, 9, 9, 255]));
        let mut surface = Surface::new(40, 40, PAPER);
        surface
            .draw_square_crop(&frame, SquareRect::new(5, 5, 30), plain())
            .unwrap();
        assert_eq!(surface.canvas().get_pixel(5, 5).0, [9, 9, 9, 255]);
        assert_eq!(surface.canvas().get_pixel(34, 34).0, [9, 9, 9, 255]);
        assert_eq!(*surface.canvas().get_pixel(35, 35), rgba(PAPER));
    }

    #[test]
    fn out_of_bounds_square_is_an_error() {
        let mut surface = Surface::new(10, 10, PAPER);
        let frame = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let err = surface
            .draw_square_crop(&frame, SquareRect::new(8, 8, 4), plain())
            .unwrap_err();
        assert!(matches!(err, BoothError::Render { .. }));
        assert!(surface.fill_square(SquareRect::new(0, 0, 11), PAPER).is_err());
    }

    #[test]
    fn empty_frame_is_an_error() {
        let mut surface = Surface::new(10, 10, PAPER);
        let frame = RgbaImage::new(0, 0);
        assert!(surface
            .draw_square_crop(&frame, SquareRect::new(0, 0, 4), plain())
            .is_err());
    }

    #[test]
    fn stroke_stays_inside_square() {
        let mut surface = Surface::new(12, 12, PAPER);
        let target = SquareRect::new(2, 2, 8);
        surface.fill_square(target, Color::rgb(0, 0, 0)).unwrap();
        surface.stroke_square(target, 2, Color::rgb(255, 0, 0)).unwrap();

        let red = [255, 0, 0, 255];
        assert_eq!(surface.canvas().get_pixel(2, 2).0, red);
        assert_eq!(surface.canvas().get_pixel(3, 5).0, red);
        assert_eq!(surface.canvas().get_pixel(9, 9).0, red);
        assert_eq!(surface.canvas().get_pixel(4, 4).0, [0, 0, 0, 255]);
        assert_eq!(*surface.canvas().get_pixel(1, 1), rgba(PAPER));
        assert_eq!(*surface.canvas().get_pixel(10, 10), rgba(PAPER));
    }

    #[test]
    fn extract_returns_square_and_thumbnail() {
        let mut surface = Surface::new(20, 20, PAPER);
        let target = SquareRect::new(4, 4, 10);
        surface.fill_square(target, Color::rgb(10, 20, 30)).unwrap();

        let full = surface.extract(target, 0).unwrap();
        assert_eq!(full.dimensions(), (10, 10));
        assert!(full.pixels().all(|p| p.0 == [10, 20, 30, 255]));

        let thumb = surface.extract(target, 5).unwrap();
        assert_eq!(thumb.dimensions(), (5, 5));
    }
}
