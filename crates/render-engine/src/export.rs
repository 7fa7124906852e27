//! Finalization: grain, caption, and PNG export of a finished surface.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, ImageFormat};
use imageproc::drawing::{draw_text_mut, text_size};
use rand::Rng;
use snapbooth_common::error::{BoothError, BoothResult};
use snapbooth_model::settings::Color;

use crate::compositor::{rgba, Surface};

/// Caption glyph height in pixels.
pub const CAPTION_PX: f32 = 18.0;

/// System fonts tried when no caption font is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A TrueType font used to draw captions.
pub struct CaptionFont {
    font: FontVec,
    source: PathBuf,
}

impl std::fmt::Debug for CaptionFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionFont")
            .field("source", &self.source)
            .finish()
    }
}

impl CaptionFont {
    pub fn load(path: impl AsRef<Path>) -> BoothResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BoothError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| BoothError::config(format!("invalid font {}: {e}", path.display())))?;
        Ok(Self {
            font,
            source: path.to_path_buf(),
        })
    }

    /// The configured font if it loads, else the first system font found.
    pub fn discover(configured: Option<&Path>) -> Option<Self> {
        if let Some(path) = configured {
            match Self::load(path) {
                Ok(font) => return Some(font),
                Err(e) => tracing::warn!(error = %e, "Configured caption font unusable"),
            }
        }
        FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .filter(|p| p.exists())
            .find_map(|p| Self::load(p).ok())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Everything finalization needs besides the surface.
#[derive(Debug)]
pub struct FinishOptions<'a> {
    /// Caption text, already resolved (user text or default label).
    pub caption: String,
    /// Distance from the bottom edge to the caption baseline.
    pub caption_margin: u32,
    /// Paper color; decides the caption color.
    pub paper: Color,
    /// Opacity of the grain texture, `0.0` disables it.
    pub grain_opacity: f32,
    pub font: Option<&'a CaptionFont>,
    /// File name prefix; the artifact is `{prefix}-{unix_millis}.png`.
    pub file_prefix: String,
    pub timestamp_millis: i64,
}

/// The finished strip.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub file_name: String,
    pub caption: String,
    /// Whether caption glyphs made it onto the image.
    pub caption_rendered: bool,
}

impl Artifact {
    /// Write the PNG into `dir` under its file name.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> BoothResult<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.png)?;
        tracing::info!(path = %path.display(), bytes = self.png.len(), "Strip saved");
        Ok(path)
    }
}

/// Turn a completed surface into an [`Artifact`].
///
/// Fails with [`BoothError::TaintedSurface`] before touching the pixels if
/// cross-origin media was ever drawn.
pub fn finalize(
    surface: &mut Surface,
    options: &FinishOptions<'_>,
    rng: &mut impl Rng,
) -> BoothResult<Artifact> {
    if surface.is_tainted() {
        return Err(BoothError::TaintedSurface);
    }

    apply_grain(surface, options.grain_opacity, rng);

    let caption_rendered = match options.font {
        Some(font) => {
            draw_caption(surface, font, &options.caption, options.paper, options.caption_margin);
            true
        }
        None => {
            tracing::warn!(caption = %options.caption, "No caption font available; caption not drawn");
            false
        }
    };

    let png = encode_png(surface)?;
    let (width, height) = surface.dimensions();
    let file_name = snapbooth_common::clock::artifact_file_name(
        &options.file_prefix,
        options.timestamp_millis,
    );

    tracing::info!(width, height, bytes = png.len(), %file_name, "Strip finalized");

    Ok(Artifact {
        png,
        width,
        height,
        file_name,
        caption: options.caption.clone(),
        caption_rendered,
    })
}

/// Blend random gray noise over every pixel at `opacity`.
pub fn apply_grain(surface: &mut Surface, opacity: f32, rng: &mut impl Rng) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity == 0.0 {
        return;
    }
    for px in surface.canvas_mut().pixels_mut() {
        let noise: f32 = rng.gen_range(0.0..=255.0);
        for channel in &mut px.0[..3] {
            let blended = *channel as f32 * (1.0 - opacity) + noise * opacity;
            *channel = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn draw_caption(surface: &mut Surface, font: &CaptionFont, text: &str, paper: Color, margin: u32) {
    let scale = PxScale::from(CAPTION_PX);
    let (text_w, text_h) = text_size(scale, &font.font, text);
    let (width, height) = surface.dimensions();
    let x = (width as i32 - text_w as i32) / 2;
    let y = height as i32 - margin as i32 - text_h as i32;
    let color = rgba(paper.contrasting_text());
    draw_text_mut(surface.canvas_mut(), color, x, y, scale, &font.font, text);
}

/// Encode the surface as PNG bytes.
pub fn encode_png(surface: &Surface) -> BoothResult<Vec<u8>> {
    if surface.is_tainted() {
        return Err(BoothError::TaintedSurface);
    }
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(surface.canvas().clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| BoothError::render(format!("PNG encoding failed: {e}")))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn options<'a>(paper: Color) -> FinishOptions<'a> {
        FinishOptions {
            caption: "SNAPBOOTH // 2026-10-18".to_string(),
            caption_margin: 10,
            paper,
            grain_opacity: 0.05,
            font: None,
            file_prefix: "SnapBooth".to_string(),
            timestamp_millis: 42,
        }
    }

    #[test]
    fn finalize_produces_decodable_png() {
        let mut surface = Surface::new(30, 20, Color::WHITE);
        let mut rng = StdRng::seed_from_u64(7);
        let artifact = finalize(&mut surface, &options(Color::WHITE), &mut rng).unwrap();

        assert_eq!(artifact.file_name, "SnapBooth-42.png");
        assert_eq!((artifact.width, artifact.height), (30, 20));
        assert!(!artifact.caption_rendered);

        let decoded = image::load_from_memory(&artifact.png).unwrap();
        assert_eq!(decoded.width(), 30);
        assert_eq!(decoded.height(), 20);
    }

    #[test]
    fn tainted_surface_cannot_be_exported() {
        let mut surface = Surface::new(10, 10, Color::WHITE);
        surface.mark_tainted();
        let mut rng = StdRng::seed_from_u64(1);
        let err = finalize(&mut surface, &options(Color::WHITE), &mut rng).unwrap_err();
        assert!(matches!(err, BoothError::TaintedSurface));
        // Pixels are untouched by the failed attempt.
        assert!(surface.canvas().pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn grain_is_subtle() {
        let mut surface = Surface::new(16, 16, Color::rgb(128, 128, 128));
        let mut rng = StdRng::seed_from_u64(3);
        apply_grain(&mut surface, 0.05, &mut rng);

        assert!(surface
            .canvas()
            .pixels()
            .all(|p| p.0[..3].iter().all(|&c| (115..=141).contains(&c)) && p.0[3] == 255));
        assert!(surface.canvas().pixels().any(|p| p.0[0] != 128));
    }

    #[test]
    fn zero_grain_is_identity() {
        let mut surface = Surface::new(4, 4, Color::rgb(1, 2, 3));
        let mut rng = StdRng::seed_from_u64(3);
        apply_grain(&mut surface, 0.0, &mut rng);
        assert!(surface.canvas().pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn save_writes_named_file() {
        let mut surface = Surface::new(8, 8, Color::WHITE);
        let mut rng = StdRng::seed_from_u64(9);
        let artifact = finalize(&mut surface, &options(Color::WHITE), &mut rng).unwrap();

        let dir = std::env::temp_dir().join(format!("snapbooth-export-{}", std::process::id()));
        let path = artifact.save_to(&dir).unwrap();
        assert!(path.ends_with("SnapBooth-42.png"));
        assert_eq!(std::fs::read(&path).unwrap(), artifact.png);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_font_path_is_reported() {
        let err = CaptionFont::load("/definitely/not/a/font.ttf").unwrap_err();
        assert!(matches!(err, BoothError::FileNotFound { .. }));
    }

    #[test]
    fn caption_is_drawn_when_a_system_font_exists() {
        let Some(font) = CaptionFont::discover(None) else {
            return;
        };
        let mut surface = Surface::new(300, 80, Color::rgb(0x1a, 0x1a, 0x1a));
        let mut opts = options(Color::rgb(0x1a, 0x1a, 0x1a));
        opts.grain_opacity = 0.0;
        opts.font = Some(&font);
        let mut rng = StdRng::seed_from_u64(5);
        let artifact = finalize(&mut surface, &opts, &mut rng).unwrap();

        assert!(artifact.caption_rendered);
        // Light text on dark paper.
        assert!(surface.canvas().pixels().any(|p| p.0[0] > 200));
    }
}
