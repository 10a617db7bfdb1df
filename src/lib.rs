//! Match-cut text reveal renderer.
//!
//! Given an immutable [`StyleConfig`], the pipeline schedules a blur-to-sharp
//! transition across `round(duration * fps)` frames, composes each frame on
//! the CPU (background, blur, Parley-shaped text), and streams the ordered
//! frame sequence into an ffmpeg-backed MP4 sink.

#![forbid(unsafe_code)]

pub mod assemble;
pub mod blur;
pub mod compose;
pub mod encode;
pub mod foundation;
pub mod layout;
pub mod provider;
pub mod schedule;
pub mod style;

pub use assemble::{AssembleOpts, CancelToken, RenderOutput, assemble, assemble_to_sink};
pub use compose::{FrameComposer, PreparedBackground};
pub use encode::ffmpeg::{EncodeConfig, FfmpegEncoder, is_ffmpeg_on_path};
pub use encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use foundation::core::{Canvas, FrameIndex, FrameRgba, Rgba8};
pub use foundation::error::{MatchcutError, MatchcutResult};
pub use layout::{LayoutOptions, LayoutResult, TextBrush, TextLayoutEngine};
pub use provider::{PromptHints, TextProvider, resolve_text};
pub use schedule::{Ease, REVEAL_EASE, TimelineFrame, schedule_frame};
pub use style::{Background, BlurMode, HighlightStyle, StyleConfig};
