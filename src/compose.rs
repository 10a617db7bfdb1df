//! Per-frame composition: background, blur, then sharp text on top.
//!
//! A composer is built once per job from the immutable style and layout, and
//! `compose` is callable from any worker thread; no state mutates between
//! frames.

use std::path::Path;

use anyhow::Context as _;

use crate::blur;
use crate::foundation::core::{Canvas, FrameRgba, Rgba8};
use crate::foundation::error::{MatchcutError, MatchcutResult};
use crate::layout::LayoutResult;
use crate::schedule::TimelineFrame;
use crate::style::{Background, BlurMode, StyleConfig};

/// Canvas-sized premultiplied RGBA8 background, prepared once per job.
#[derive(Clone, Debug)]
pub struct PreparedBackground {
    data: Vec<u8>,
}

impl PreparedBackground {
    /// Resolve the style's background reference into a canvas-sized buffer.
    ///
    /// Solid colors become a paper-textured fill: the base color with seeded
    /// grain and a subtle vignette. Textures are decoded, cover-resized
    /// preserving aspect ratio, and center-cropped to the canvas.
    pub fn prepare(style: &StyleConfig) -> MatchcutResult<Self> {
        let canvas = style.canvas;
        let data = match &style.background {
            Background::Solid(color) => paper_fill(canvas, *color),
            Background::Texture(path) => texture_fill(canvas, path)?,
        };
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Fraction of grain noise blended over the base color.
const PAPER_NOISE_BLEND: f32 = 0.10;
/// Spread of the triangular grain distribution around mid-gray.
const PAPER_NOISE_SPREAD: f32 = 0.245;
/// Maximum darkening of the vignette at the canvas edge.
const PAPER_VIGNETTE_STRENGTH: f32 = 0.30;
/// Vignette band width as a fraction of the smaller canvas dimension.
const PAPER_VIGNETTE_BAND: f32 = 0.25;
const PAPER_SEED: u64 = 0xC0FF_EE11_2357_BD1E;

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn hash01(seed: u64, x: u64) -> f32 {
    let v = splitmix64(seed ^ x.wrapping_mul(0xD6E8_FEB8_6659_FD93));
    ((v >> 40) as f32) * (1.0 / ((1u64 << 24) as f32))
}

/// Paper-like fill: the base color with per-pixel grain and a quadratic
/// vignette toward the edges. Fully deterministic for a given canvas and
/// color, so every frame of a job (and repeated runs) sees identical bytes.
fn paper_fill(canvas: Canvas, color: Rgba8) -> Vec<u8> {
    let w = canvas.width;
    let h = canvas.height;
    let band = ((w.min(h) as f32) * PAPER_VIGNETTE_BAND).max(1.0);
    let base = [
        f32::from(color.r) / 255.0,
        f32::from(color.g) / 255.0,
        f32::from(color.b) / 255.0,
    ];

    let mut rgba = Vec::with_capacity(canvas.rgba8_len());
    for y in 0..h {
        let edge_y = y.min(h - 1 - y) as f32;
        for x in 0..w {
            let cell = u64::from(y) * u64::from(w) + u64::from(x);
            let edge = (x.min(w - 1 - x) as f32).min(edge_y);
            let t = (edge / band).min(1.0);
            let vignette = 1.0 - PAPER_VIGNETTE_STRENGTH * (1.0 - t) * (1.0 - t);

            for (c, &base_c) in base.iter().enumerate() {
                let u0 = hash01(PAPER_SEED, cell * 6 + c as u64);
                let u1 = hash01(PAPER_SEED, cell * 6 + 3 + c as u64);
                // Triangular grain centered on mid-gray.
                let grain = (0.5 + (u0 + u1 - 1.0) * PAPER_NOISE_SPREAD).clamp(0.0, 1.0);
                let v = (base_c * (1.0 - PAPER_NOISE_BLEND) + grain * PAPER_NOISE_BLEND) * vignette;
                rgba.push((v * 255.0 + 0.5) as u8);
            }
            rgba.push(color.a);
        }
    }
    premultiply_rgba8_in_place(&mut rgba);
    rgba
}

fn texture_fill(canvas: Canvas, path: &Path) -> MatchcutResult<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|e| {
        MatchcutError::asset(format!(
            "failed to read background texture '{}': {e}",
            path.display()
        ))
    })?;
    let dyn_img = image::load_from_memory(&bytes)
        .with_context(|| format!("decode background texture '{}'", path.display()))
        .map_err(|e| MatchcutError::asset(format!("{e:#}")))?;

    let filled = dyn_img.resize_to_fill(
        canvas.width,
        canvas.height,
        image::imageops::FilterType::Lanczos3,
    );
    let mut rgba = filled.to_rgba8().into_raw();
    premultiply_rgba8_in_place(&mut rgba);
    Ok(rgba)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Composes one raster frame from the shared job state and a scheduled
/// [`TimelineFrame`].
pub struct FrameComposer {
    style: StyleConfig,
    layout: LayoutResult,
    background: PreparedBackground,
}

impl FrameComposer {
    pub fn new(
        style: StyleConfig,
        layout: LayoutResult,
        background: PreparedBackground,
    ) -> MatchcutResult<Self> {
        let expected = style.canvas.rgba8_len();
        if background.as_bytes().len() != expected {
            return Err(MatchcutError::render(
                "prepared background does not match canvas dimensions",
            ));
        }
        Ok(Self {
            style,
            layout,
            background,
        })
    }

    pub fn layout(&self) -> &LayoutResult {
        &self.layout
    }

    /// Compose the frame described by `tf`.
    ///
    /// Order-independent: composing frame 0 after frame N-1 yields the same
    /// pixels as composing them in order.
    pub fn compose(&self, tf: &TimelineFrame) -> MatchcutResult<FrameRgba> {
        let canvas = self.style.canvas;

        let base = self.blurred_background(tf.blur_intensity)?;
        let mut frame = base;

        let overlay = self.render_text_layer(tf.highlight_progress)?;
        over_in_place(&mut frame, &overlay)?;

        FrameRgba::new(canvas.width, canvas.height, frame)
    }

    /// Background with the frame's blur applied. Zero intensity (or blur mode
    /// `none`) returns a pixel-identical copy of the base background.
    fn blurred_background(&self, intensity: f32) -> MatchcutResult<Vec<u8>> {
        let canvas = self.style.canvas;
        let src = self.background.as_bytes();
        match self.style.blur_mode {
            BlurMode::None => Ok(src.to_vec()),
            BlurMode::Gaussian => blur::gaussian_blur(src, canvas.width, canvas.height, intensity),
            BlurMode::Radial => {
                let center = (canvas.width as f32 / 2.0, canvas.height as f32 / 2.0);
                blur::radial_blur(src, canvas.width, canvas.height, center, intensity)
            }
        }
    }

    /// Rasterize the highlight band and glyph runs into a transparent
    /// canvas-sized premultiplied layer.
    fn render_text_layer(&self, highlight_progress: f32) -> MatchcutResult<Vec<u8>> {
        let canvas = self.style.canvas;
        let w: u16 = canvas
            .width
            .try_into()
            .map_err(|_| MatchcutError::render("canvas width exceeds u16"))?;
        let h: u16 = canvas
            .height
            .try_into()
            .map_err(|_| MatchcutError::render("canvas height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        if let Some(hl) = &self.style.highlight {
            let strength = highlight_progress.clamp(0.0, 1.0);
            if strength > 0.0 {
                let alpha = ((f32::from(hl.color.a) * strength).round() as u16).min(255) as u8;
                let pad = self.layout.font_size * hl.padding_frac;
                ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    hl.color.r, hl.color.g, hl.color.b, alpha,
                ));
                for line in &self.layout.lines {
                    let [x0, y0, x1, y1] = line.bbox;
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                        f64::from(x0 - pad),
                        f64::from(y0 - pad),
                        f64::from(x1 + pad),
                        f64::from(y1 + pad),
                    ));
                }
            }
        }

        let (ox, oy) = self.layout.origin;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(ox),
            f64::from(oy),
        )));
        for line in self.layout.layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&self.layout.font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        Ok(pixmap.data_as_u8_slice().to_vec())
    }
}

/// Premultiplied source-over composite of `src` onto `dst`.
fn over_in_place(dst: &mut [u8], src: &[u8]) -> MatchcutResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(MatchcutError::render(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = u16::from(s[3]);
        if sa == 0 {
            continue;
        }
        if sa == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - sa;
        for c in 0..4 {
            let dc = ((u16::from(d[c]) * inv + 127) / 255) as u8;
            d[c] = s[c].saturating_add(dc);
        }
    }
    Ok(())
}
