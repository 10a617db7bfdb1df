use std::path::PathBuf;

use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{MatchcutError, MatchcutResult};

/// Blur transform applied to the background during the reveal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurMode {
    Radial,
    Gaussian,
    None,
}

/// Background of every frame: a flat color or a texture image covering the
/// canvas.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    Solid(Rgba8),
    Texture(PathBuf),
}

impl Background {
    /// Parse a background reference string: `solid:#RRGGBB` or a texture file
    /// path.
    pub fn parse(s: &str) -> MatchcutResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MatchcutError::config("background reference is empty"));
        }
        if let Some(hex) = s.strip_prefix("solid:") {
            return Ok(Self::Solid(Rgba8::parse_hex(hex)?));
        }
        Ok(Self::Texture(PathBuf::from(s)))
    }

    /// Color the encoder flattens alpha over; textures flatten over black.
    pub fn flatten_color(&self) -> Rgba8 {
        match self {
            Self::Solid(c) => *c,
            Self::Texture(_) => Rgba8::BLACK,
        }
    }
}

/// Highlight band drawn behind the text, fading in with the reveal.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HighlightStyle {
    pub color: Rgba8,
    /// Padding around the text bounds, as a fraction of the font size.
    #[serde(default = "default_highlight_padding")]
    pub padding_frac: f32,
}

fn default_highlight_padding() -> f32 {
    0.10
}

/// Immutable per-job style parameters.
///
/// Created once per render request and validated through [`StyleConfig::validate`]
/// before any frame work begins; every downstream component reads from it and
/// never mutates it.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StyleConfig {
    /// Text to reveal. Must be non-empty after trimming.
    pub text: String,
    /// Path to a loadable `.ttf`/`.otf` font file.
    pub font_path: PathBuf,
    /// Font size in pixels. Defaults to 5% of canvas height when absent.
    #[serde(default)]
    pub font_size_px: Option<f32>,
    pub text_color: Rgba8,
    pub background: Background,
    pub canvas: Canvas,
    pub duration_secs: f64,
    pub fps: u32,
    pub blur_mode: BlurMode,
    /// Blur intensity at frame 0. Gaussian sigma in pixels; for radial blur the
    /// sigma of the fully-blurred periphery before the 1.5x boost.
    pub max_blur_intensity: f32,
    #[serde(default)]
    pub highlight: Option<HighlightStyle>,
}

impl StyleConfig {
    /// Single validation entry point; returns a `Config` error for the first
    /// violated constraint.
    pub fn validate(&self) -> MatchcutResult<()> {
        if self.text.trim().is_empty() {
            return Err(MatchcutError::config("text must be non-empty"));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(MatchcutError::config("canvas width/height must be > 0"));
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(MatchcutError::config("duration_secs must be > 0"));
        }
        if self.fps == 0 {
            return Err(MatchcutError::config("fps must be > 0"));
        }
        if !self.max_blur_intensity.is_finite() || self.max_blur_intensity < 0.0 {
            return Err(MatchcutError::config(
                "max_blur_intensity must be finite and >= 0",
            ));
        }
        if let Some(size) = self.font_size_px
            && (!size.is_finite() || size <= 0.0)
        {
            return Err(MatchcutError::config(
                "font_size_px must be finite and > 0 when set",
            ));
        }
        if let Some(hl) = &self.highlight
            && (!hl.padding_frac.is_finite() || hl.padding_frac < 0.0)
        {
            return Err(MatchcutError::config(
                "highlight padding_frac must be finite and >= 0",
            ));
        }
        Ok(())
    }

    /// Total frame count: `round(duration * fps)`, never below 1.
    ///
    /// Duration and fps fully determine the count; no independent frame count
    /// exists anywhere in the pipeline.
    pub fn total_frames(&self) -> u64 {
        ((self.duration_secs * f64::from(self.fps)).round() as u64).max(1)
    }

    /// Effective font size in pixels.
    pub fn effective_font_size(&self) -> f32 {
        self.font_size_px
            .unwrap_or((self.canvas.height as f32) * 0.05)
            .max(1.0)
    }
}
