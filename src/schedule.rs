//! Maps frame indices to interpolated per-frame parameters.
//!
//! The blur curve is the core visual guarantee of a match cut: intensity is
//! monotonically non-increasing across the frame sequence, so the reveal never
//! flickers or reverses. The easing curve is fixed to [`Ease::OutCubic`] and is
//! part of the output contract; changing it changes every rendered frame.

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{MatchcutError, MatchcutResult};
use crate::style::StyleConfig;

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    OutCubic,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// Easing applied to the reveal. Fixed contract, not configurable per call.
pub const REVEAL_EASE: Ease = Ease::OutCubic;

/// Interpolated parameters for a single frame. Produced here, consumed by the
/// composer, never persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineFrame {
    pub index: FrameIndex,
    /// Normalized position within the duration: 0.0 at the first frame, 1.0 at
    /// the last.
    pub fraction: f64,
    /// Blur intensity for this frame; max at frame 0, zero at the final frame.
    pub blur_intensity: f32,
    /// Highlight overlay strength: 0.0 at frame 0, 1.0 at the final frame.
    pub highlight_progress: f32,
}

/// Pure function of `(index, total_frames, style)`; repeated calls with equal
/// inputs produce bit-identical results.
///
/// A single-frame timeline uses the final sharp state, not the initial blurred
/// one.
pub fn schedule_frame(
    index: FrameIndex,
    total_frames: u64,
    style: &StyleConfig,
) -> MatchcutResult<TimelineFrame> {
    if total_frames == 0 {
        return Err(MatchcutError::config("total_frames must be >= 1"));
    }
    if index.0 >= total_frames {
        return Err(MatchcutError::render(format!(
            "frame index {} out of range (total {total_frames})",
            index.0
        )));
    }

    let fraction = if total_frames == 1 {
        1.0
    } else {
        (index.0 as f64) / ((total_frames - 1) as f64)
    };

    let eased = REVEAL_EASE.apply(fraction);
    let blur_intensity = (f64::from(style.max_blur_intensity) * (1.0 - eased)) as f32;

    Ok(TimelineFrame {
        index,
        fraction,
        blur_intensity,
        highlight_progress: eased as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{Canvas, Rgba8};
    use crate::style::{Background, BlurMode};

    fn style() -> StyleConfig {
        StyleConfig {
            text: "HELLO".to_string(),
            font_path: "fonts/test.ttf".into(),
            font_size_px: None,
            text_color: Rgba8::BLACK,
            background: Background::Solid(Rgba8::WHITE),
            canvas: Canvas {
                width: 640,
                height: 360,
            },
            duration_secs: 2.0,
            fps: 10,
            blur_mode: BlurMode::Gaussian,
            max_blur_intensity: 8.0,
            highlight: None,
        }
    }

    #[test]
    fn ease_endpoints_are_stable() {
        for ease in [
            Ease::Linear,
            Ease::InQuad,
            Ease::OutQuad,
            Ease::InOutQuad,
            Ease::OutCubic,
        ] {
            assert_eq!(ease.apply(0.0), 0.0);
            assert_eq!(ease.apply(1.0), 1.0);
        }
    }

    #[test]
    fn first_frame_has_max_blur_and_last_has_none() {
        let s = style();
        let total = s.total_frames();
        let first = schedule_frame(FrameIndex(0), total, &s).unwrap();
        let last = schedule_frame(FrameIndex(total - 1), total, &s).unwrap();

        assert_eq!(first.blur_intensity, s.max_blur_intensity);
        assert_eq!(first.highlight_progress, 0.0);
        assert_eq!(last.blur_intensity, 0.0);
        assert_eq!(last.highlight_progress, 1.0);
        assert_eq!(last.fraction, 1.0);
    }

    #[test]
    fn intensity_is_monotonically_non_increasing() {
        let s = style();
        let total = 120;
        let mut prev = f32::INFINITY;
        for i in 0..total {
            let tf = schedule_frame(FrameIndex(i), total, &s).unwrap();
            assert!(
                tf.blur_intensity <= prev,
                "intensity increased at frame {i}"
            );
            prev = tf.blur_intensity;
        }
    }

    #[test]
    fn schedule_is_deterministic() {
        let s = style();
        for i in [0u64, 3, 9, 19] {
            let a = schedule_frame(FrameIndex(i), 20, &s).unwrap();
            let b = schedule_frame(FrameIndex(i), 20, &s).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn single_frame_uses_final_sharp_state() {
        let s = style();
        let tf = schedule_frame(FrameIndex(0), 1, &s).unwrap();
        assert_eq!(tf.blur_intensity, 0.0);
        assert_eq!(tf.fraction, 1.0);
        assert_eq!(tf.highlight_progress, 1.0);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let s = style();
        assert!(schedule_frame(FrameIndex(20), 20, &s).is_err());
        assert!(schedule_frame(FrameIndex(0), 0, &s).is_err());
    }
}
