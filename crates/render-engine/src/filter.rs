//! Per-pixel photo filters.

use image::{imageops, RgbaImage};
use snapbooth_model::settings::Filter;

/// Apply `filter` to `img` in place. Alpha is left untouched.
pub fn apply_filter(img: &mut RgbaImage, filter: Filter) {
    match filter {
        Filter::None => {}
        Filter::Grayscale => grayscale(img),
        Filter::Sepia => sepia(img),
        Filter::Contrast => *img = imageops::contrast(&*img, 35.0),
        Filter::Bright => *img = imageops::brighten(&*img, 30),
        Filter::Invert => imageops::invert(img),
        Filter::Vintage => {
            sepia(img);
            *img = imageops::contrast(&*img, 15.0);
            *img = imageops::brighten(&*img, -12);
        }
    }
}

fn grayscale(img: &mut RgbaImage) {
    for px in img.pixels_mut() {
        let [r, g, b, _] = px.0;
        let luma = 0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32;
        let v = luma.round().clamp(0.0, 255.0) as u8;
        px.0[0] = v;
        px.0[1] = v;
        px.0[2] = v;
    }
}

fn sepia(img: &mut RgbaImage) {
    for px in img.pixels_mut() {
        let [r, g, b, _] = px.0;
        let (r, g, b) = (r as f32, g as f32, b as f32);
        px.0[0] = (0.393 * r + 0.769 * g + 0.189 * b).min(255.0) as u8;
        px.0[1] = (0.349 * r + 0.686 * g + 0.168 * b).min(255.0) as u8;
        px.0[2] = (0.272 * r + 0.534 * g + 0.131 * b).min(255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn solid(color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba(color))
    }

    #[test]
    fn none_is_identity() {
        let mut img = solid([10, 120, 200, 255]);
        apply_filter(&mut img, Filter::None);
        assert_eq!(img.get_pixel(0, 0).0, [10, 120, 200, 255]);
    }

    #[test]
    fn grayscale_equalizes_channels() {
        let mut img = solid([200, 40, 90, 255]);
        apply_filter(&mut img, Filter::Grayscale);
        let [r, g, b, a] = img.get_pixel(2, 2).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
    }

    #[test]
    fn sepia_warms_gray() {
        let mut img = solid([128, 128, 128, 255]);
        apply_filter(&mut img, Filter::Sepia);
        let [r, g, b, _] = img.get_pixel(0, 0).0;
        assert!(r > g && g > b);
    }

    #[test]
    fn invert_flips_channels() {
        let mut img = solid([0, 100, 255, 255]);
        apply_filter(&mut img, Filter::Invert);
        assert_eq!(img.get_pixel(0, 0).0, [255, 155, 0, 255]);
    }

    #[test]
    fn bright_never_darkens() {
        let mut img = solid([50, 60, 70, 255]);
        apply_filter(&mut img, Filter::Bright);
        let [r, g, b, _] = img.get_pixel(0, 0).0;
        assert!(r >= 50 && g >= 60 && b >= 70);
    }

    #[test]
    fn every_filter_preserves_dimensions() {
        for filter in Filter::ALL {
            let mut img = RgbaImage::from_pixel(7, 3, Rgba([90, 90, 90, 255]));
            apply_filter(&mut img, filter);
            assert_eq!(img.dimensions(), (7, 3), "{filter}");
        }
    }
}
