//! Text shaping and placement via Parley.
//!
//! Layout depends only on (text, font bytes, canvas, options) and is computed
//! once per render job; every frame reuses the same placements.

use std::sync::Arc;

use crate::foundation::core::Canvas;
use crate::foundation::error::{MatchcutError, MatchcutResult};

/// RGBA8 brush color carried through Parley styles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Layout fitting knobs.
#[derive(Clone, Copy, Debug)]
pub struct LayoutOptions {
    /// Margin kept clear on every canvas edge, in pixels.
    pub margin_px: f32,
    /// Smallest font size the shrink-to-fit pass will try before truncating.
    pub min_font_size: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            margin_px: 24.0,
            min_font_size: 12.0,
        }
    }
}

/// Placement of one laid-out line, in canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinePlacement {
    /// Bounding box `[x0, y0, x1, y1]`.
    pub bbox: [f32; 4],
    /// Baseline y position.
    pub baseline_y: f32,
}

/// Immutable result of laying out the job's text. Shared read-only across all
/// frames.
#[derive(Clone)]
pub struct LayoutResult {
    /// Shaped Parley layout, positioned in block-local space.
    pub layout: Arc<parley::Layout<TextBrush>>,
    /// Font blob handed to the rasterizer.
    pub font: vello_cpu::peniko::FontData,
    /// Font size actually used after shrink-to-fit.
    pub font_size: f32,
    /// Offset from layout space to canvas coordinates.
    pub origin: (f32, f32),
    /// Block extent in pixels.
    pub block_size: (f32, f32),
    /// Per-line placements in canvas coordinates.
    pub lines: Vec<LinePlacement>,
    /// True when the text was truncated with an ellipsis to fit.
    pub truncated: bool,
}

impl std::fmt::Debug for LayoutResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutResult")
            .field("font_size", &self.font_size)
            .field("origin", &self.origin)
            .field("block_size", &self.block_size)
            .field("lines", &self.lines.len())
            .field("truncated", &self.truncated)
            .finish()
    }
}

/// Stateful helper owning the Parley font and layout contexts.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Lay out `text` so it fits the canvas inside the configured margins.
    ///
    /// Wraps at the available width; when the wrapped block is still taller
    /// than the available height, or an unbreakable run is wider than it,
    /// retries at progressively smaller font sizes down to `min_font_size`,
    /// then truncates trailing characters with an ellipsis rather than
    /// overflowing the canvas.
    pub fn layout(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        font_size: f32,
        brush: TextBrush,
        canvas: Canvas,
        opts: &LayoutOptions,
    ) -> MatchcutResult<LayoutResult> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MatchcutError::layout("text must be non-empty"));
        }
        if !font_size.is_finite() || font_size <= 0.0 {
            return Err(MatchcutError::layout("font size must be finite and > 0"));
        }

        let avail_w = canvas.width as f32 - 2.0 * opts.margin_px;
        let avail_h = canvas.height as f32 - 2.0 * opts.margin_px;
        if avail_w <= 0.0 || avail_h <= 0.0 {
            return Err(MatchcutError::layout(
                "canvas is smaller than the layout margins",
            ));
        }

        let family_name = self.register_family(font_bytes)?;

        // Shrink-to-fit: walk the size down in 10% steps until the wrapped
        // block fits both dimensions or the minimum size is reached. Width
        // matters too: an unbreakable run wider than the wrap limit overflows
        // its line instead of wrapping.
        let min_size = opts.min_font_size.min(font_size);
        let mut size = font_size.max(min_size);
        let mut layout = loop {
            let candidate = self.build_layout(text, &family_name, size, brush, avail_w);
            if fits(&candidate, avail_w, avail_h) || size <= min_size {
                break candidate;
            }
            size = (size * 0.9).max(min_size);
        };

        // Last resort: drop trailing characters until the block fits.
        let mut truncated = false;
        if !fits(&layout, avail_w, avail_h) {
            let mut chars: Vec<char> = text.chars().collect();
            loop {
                let keep = chars.len().saturating_sub((chars.len() / 10).max(1));
                if keep == 0 {
                    return Err(MatchcutError::layout(
                        "text cannot be laid out within the canvas even after truncation",
                    ));
                }
                chars.truncate(keep);
                let candidate_text: String =
                    chars.iter().collect::<String>().trim_end().to_string() + "\u{2026}";
                let candidate = self.build_layout(&candidate_text, &family_name, size, brush, avail_w);
                if fits(&candidate, avail_w, avail_h) {
                    truncated = true;
                    layout = candidate;
                    break;
                }
            }
        }

        let (block_w, block_h) = measure(&layout);
        let origin_y = opts.margin_px + (avail_h - block_h).max(0.0) * 0.5;

        // Glyph x positions already carry per-line centering inside the wrap
        // width, so the canvas-space offset is the margin alone.
        let mut lines = Vec::new();
        let mut y = origin_y;
        for line in layout.lines() {
            let m = line.metrics();
            let line_h = m.ascent + m.descent + m.leading;
            let x0 = opts.margin_px + (avail_w - m.advance).max(0.0) * 0.5;
            lines.push(LinePlacement {
                bbox: [x0, y, x0 + m.advance, y + line_h],
                baseline_y: y + m.leading * 0.5 + m.ascent,
            });
            y += line_h;
        }
        if lines.is_empty() {
            return Err(MatchcutError::layout("layout produced no lines"));
        }

        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font_bytes.to_vec()),
            0,
        );

        tracing::debug!(
            font_size = size,
            lines = lines.len(),
            truncated,
            "text layout complete"
        );

        Ok(LayoutResult {
            layout: Arc::new(layout),
            font,
            font_size: size,
            origin: (opts.margin_px, origin_y),
            block_size: (block_w, block_h),
            lines,
            truncated,
        })
    }

    fn register_family(&mut self, font_bytes: &[u8]) -> MatchcutResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| MatchcutError::layout("no font families registered from font bytes"))?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| MatchcutError::layout("registered font family has no name"))?
            .to_string();
        Ok(name)
    }

    fn build_layout(
        &mut self,
        text: &str,
        family_name: &str,
        size_px: f32,
        brush: TextBrush,
        max_width: f32,
    ) -> parley::Layout<TextBrush> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name.to_string())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(Some(max_width));
        layout.align(
            Some(max_width),
            parley::Alignment::Center,
            parley::AlignmentOptions::default(),
        );
        layout
    }
}

fn fits(layout: &parley::Layout<TextBrush>, avail_w: f32, avail_h: f32) -> bool {
    let (w, h) = measure(layout);
    w <= avail_w && h <= avail_h
}

/// Block extent of a shaped layout from its line metrics.
fn measure(layout: &parley::Layout<TextBrush>) -> (f32, f32) {
    let mut w = 0.0f32;
    let mut h = 0.0f32;
    for line in layout.lines() {
        let m = line.metrics();
        w = w.max(m.advance);
        h += m.ascent + m.descent + m.leading;
    }
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_a_layout_error() {
        let mut engine = TextLayoutEngine::new();
        let err = engine
            .layout(
                "   ",
                &[],
                32.0,
                TextBrush::default(),
                Canvas {
                    width: 640,
                    height: 360,
                },
                &LayoutOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), "layout");
    }

    #[test]
    fn garbage_font_bytes_are_a_layout_error() {
        let mut engine = TextLayoutEngine::new();
        let err = engine
            .layout(
                "HELLO",
                b"not a font",
                32.0,
                TextBrush::default(),
                Canvas {
                    width: 640,
                    height: 360,
                },
                &LayoutOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), "layout");
    }
}
