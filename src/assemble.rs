//! Job orchestration: schedule every frame, compose them (optionally in
//! parallel), and hand them to a sink in strictly increasing index order.
//!
//! This is the single aggregation point for errors: lower-level components
//! raise narrow errors, and the assembler attaches the failing frame index,
//! guarantees encoder shutdown, and removes partial output on every exit path.

use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use rayon::prelude::*;

use crate::compose::{FrameComposer, PreparedBackground};
use crate::encode::ffmpeg::{EncodeConfig, FfmpegEncoder};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{FrameIndex, FrameRgba};
use crate::foundation::error::{MatchcutError, MatchcutResult};
use crate::layout::{LayoutOptions, TextBrush, TextLayoutEngine};
use crate::schedule::schedule_frame;
use crate::style::StyleConfig;

/// Shared cancellation flag for a render job.
///
/// Cancellation is checked between chunks and before each frame composition;
/// a cancelled job produces no output file.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}

/// Threading and lifecycle controls for a render job.
#[derive(Clone, Debug)]
pub struct AssembleOpts {
    /// Compose frames on a rayon pool when `true`.
    pub parallel: bool,
    /// Frames per scheduling chunk; bounds peak frame memory.
    pub chunk_size: usize,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
    /// Whether to overwrite an existing output file.
    pub overwrite: bool,
    pub cancel: CancelToken,
}

impl Default for AssembleOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            chunk_size: 32,
            threads: None,
            overwrite: true,
            cancel: CancelToken::new(),
        }
    }
}

/// Successful render result.
#[derive(Clone, Debug)]
pub struct RenderOutput {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub frame_count: u64,
}

/// Render `style` to an MP4 at `out_path` by invoking the system `ffmpeg`
/// binary.
///
/// On any failure or cancellation the partial output file is removed; a file
/// at `out_path` exists only for a fully finished job.
pub fn assemble(
    style: &StyleConfig,
    out_path: impl Into<PathBuf>,
    opts: &AssembleOpts,
) -> MatchcutResult<RenderOutput> {
    style.validate()?;
    let out_path = out_path.into();

    let cfg = EncodeConfig {
        width: style.canvas.width,
        height: style.canvas.height,
        fps: style.fps,
        out_path: out_path.clone(),
        overwrite: opts.overwrite,
    };
    let mut enc = FfmpegEncoder::new(cfg, style.background.flatten_color())?;

    match assemble_to_sink(style, &mut enc, opts) {
        Ok(frame_count) => {
            let duration_secs = frame_count as f64 / f64::from(style.fps);
            tracing::info!(
                path = %out_path.display(),
                frame_count,
                duration_secs,
                "render job finished"
            );
            Ok(RenderOutput {
                path: out_path,
                duration_secs,
                frame_count,
            })
        }
        Err(e) => {
            enc.abort();
            if out_path.exists() {
                let _ = std::fs::remove_file(&out_path);
            }
            Err(e)
        }
    }
}

/// Render `style` into an arbitrary [`FrameSink`].
///
/// Frames are delivered in strictly increasing index order even when
/// composition is parallel. Returns the number of frames pushed.
pub fn assemble_to_sink(
    style: &StyleConfig,
    sink: &mut dyn FrameSink,
    opts: &AssembleOpts,
) -> MatchcutResult<u64> {
    style.validate()?;
    let total_frames = style.total_frames();

    let composer = build_composer(style)?;

    tracing::info!(
        total_frames,
        width = style.canvas.width,
        height = style.canvas.height,
        fps = style.fps,
        blur_mode = ?style.blur_mode,
        parallel = opts.parallel,
        "starting render job"
    );

    sink.begin(SinkConfig {
        width: style.canvas.width,
        height: style.canvas.height,
        fps: style.fps,
    })?;

    let pool = if opts.parallel {
        Some(build_thread_pool(opts.threads)?)
    } else {
        None
    };
    let chunk_size = (opts.chunk_size.max(1)) as u64;

    let mut chunk_start = 0u64;
    while chunk_start < total_frames {
        if opts.cancel.is_cancelled() {
            return Err(MatchcutError::Cancelled);
        }
        let chunk_end = (chunk_start + chunk_size).min(total_frames);

        let frames = match &pool {
            Some(pool) => compose_chunk_parallel(
                &composer,
                style,
                chunk_start..chunk_end,
                total_frames,
                &opts.cancel,
                pool,
            )?,
            None => compose_chunk_sequential(
                &composer,
                style,
                chunk_start..chunk_end,
                total_frames,
                &opts.cancel,
            )?,
        };

        for (offset, frame) in frames.into_iter().enumerate() {
            let idx = FrameIndex(chunk_start + offset as u64);
            sink.push_frame(idx, &frame)?;
        }
        tracing::debug!(chunk_start, chunk_end, "chunk encoded");
        chunk_start = chunk_end;
    }

    sink.end()?;
    Ok(total_frames)
}

fn build_composer(style: &StyleConfig) -> MatchcutResult<FrameComposer> {
    let font_bytes = std::fs::read(&style.font_path).map_err(|e| {
        MatchcutError::asset(format!(
            "failed to read font '{}': {e}",
            style.font_path.display()
        ))
    })?;

    let brush = TextBrush {
        r: style.text_color.r,
        g: style.text_color.g,
        b: style.text_color.b,
        a: style.text_color.a,
    };
    let mut engine = TextLayoutEngine::new();
    let layout = engine.layout(
        &style.text,
        &font_bytes,
        style.effective_font_size(),
        brush,
        style.canvas,
        &LayoutOptions::default(),
    )?;

    let background = PreparedBackground::prepare(style)?;
    FrameComposer::new(style.clone(), layout, background)
}

fn compose_one(
    composer: &FrameComposer,
    style: &StyleConfig,
    index: u64,
    total_frames: u64,
) -> MatchcutResult<FrameRgba> {
    let tf = schedule_frame(FrameIndex(index), total_frames, style)?;
    composer.compose(&tf).inspect_err(|e| {
        tracing::error!(frame = index, error = %e, "frame composition failed");
    })
}

fn compose_chunk_sequential(
    composer: &FrameComposer,
    style: &StyleConfig,
    range: std::ops::Range<u64>,
    total_frames: u64,
    cancel: &CancelToken,
) -> MatchcutResult<Vec<FrameRgba>> {
    let mut out = Vec::with_capacity((range.end - range.start) as usize);
    for i in range {
        if cancel.is_cancelled() {
            return Err(MatchcutError::Cancelled);
        }
        out.push(compose_one(composer, style, i, total_frames)?);
    }
    Ok(out)
}

fn compose_chunk_parallel(
    composer: &FrameComposer,
    style: &StyleConfig,
    range: std::ops::Range<u64>,
    total_frames: u64,
    cancel: &CancelToken,
    pool: &rayon::ThreadPool,
) -> MatchcutResult<Vec<FrameRgba>> {
    // Collecting from an ordered range preserves index order, so delivery to
    // the sink stays strictly increasing no matter how workers interleave.
    let results: Vec<MatchcutResult<FrameRgba>> = pool.install(|| {
        range
            .collect::<Vec<u64>>()
            .par_iter()
            .map(|&i| {
                if cancel.is_cancelled() {
                    return Err(MatchcutError::Cancelled);
                }
                compose_one(composer, style, i, total_frames)
            })
            .collect()
    });

    let mut out = Vec::with_capacity(results.len());
    for r in results {
        out.push(r?);
    }
    Ok(out)
}

fn build_thread_pool(threads: Option<usize>) -> MatchcutResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(MatchcutError::config(
            "assemble 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| MatchcutError::render(format!("failed to build rayon thread pool: {e}")))
}

/// Deterministic default output file name for a job.
pub fn default_output_name(job_id: u64) -> String {
    format!("text_match_cut_{job_id:08}.mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(build_thread_pool(Some(0)).is_err());
    }

    #[test]
    fn default_output_name_is_stable() {
        assert_eq!(default_output_name(7), "text_match_cut_00000007.mp4");
    }
}
