//! MP4 encoding through the system `ffmpeg` binary.
//!
//! Frames stream as rawvideo RGBA over the child's stdin and come out as
//! libx264 yuv420p. Using the system binary avoids native FFmpeg dev
//! header/lib requirements.

use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{FrameIndex, FrameRgba, Rgba8};
use crate::foundation::error::{MatchcutError, MatchcutResult};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
}

impl EncodeConfig {
    pub fn validate(&self) -> MatchcutResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MatchcutError::config(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(MatchcutError::config("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // Default settings target yuv420p output for maximum compatibility.
            return Err(MatchcutError::config(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> MatchcutResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// One encoder session per job; never shared across jobs.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    bg_rgba: Rgba8,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    scratch: Vec<u8>,
}

impl FfmpegEncoder {
    /// Spawn an ffmpeg process configured for this job.
    ///
    /// `bg_rgba` is the color premultiplied alpha is flattened over before
    /// bytes hit the encoder; mp4 output carries no alpha channel.
    pub fn new(cfg: EncodeConfig, bg_rgba: Rgba8) -> MatchcutResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(MatchcutError::encode(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(MatchcutError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if cfg.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            MatchcutError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MatchcutError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MatchcutError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        // Drain stderr on its own thread; a chatty ffmpeg that fills the pipe
        // would otherwise stop reading stdin and deadlock our frame writes.
        let stderr_drain = std::thread::spawn(move || {
            use std::io::Read as _;
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(out = %cfg.out_path.display(), fps = cfg.fps, "ffmpeg encoder session started");

        Ok(Self {
            scratch: vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4],
            cfg,
            bg_rgba,
            child: Some(child),
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
        })
    }

    fn write_frame(&mut self, frame: &FrameRgba) -> MatchcutResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(MatchcutError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(MatchcutError::encode(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_to_opaque_rgba8(&mut self.scratch, &frame.data, self.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(MatchcutError::encode("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            MatchcutError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        Ok(())
    }

    fn finish(&mut self) -> MatchcutResult<()> {
        drop(self.stdin.take());

        let Some(mut child) = self.child.take() else {
            return Err(MatchcutError::encode("ffmpeg encoder is already finalized"));
        };

        let status = child.wait().map_err(|e| {
            MatchcutError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = self.join_stderr_drain()?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(MatchcutError::encode(format!(
                "ffmpeg exited with status {status}: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn join_stderr_drain(&mut self) -> MatchcutResult<Vec<u8>> {
        match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| MatchcutError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| MatchcutError::encode(format!("ffmpeg stderr read failed: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    /// Abort the session, killing the child process. The caller removes any
    /// partial output file.
    pub fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        // Killing the child closes its stderr, so the drain thread is done;
        // keep whatever diagnostics it collected visible.
        if let Some(handle) = self.stderr_drain.take()
            && let Ok(Ok(bytes)) = handle.join()
            && !bytes.is_empty()
        {
            let stderr = String::from_utf8_lossy(&bytes);
            tracing::warn!(stderr = %stderr.trim(), "ffmpeg session aborted");
        }
    }
}

impl FrameSink for FfmpegEncoder {
    fn begin(&mut self, cfg: SinkConfig) -> MatchcutResult<()> {
        if cfg.width != self.cfg.width || cfg.height != self.cfg.height || cfg.fps != self.cfg.fps {
            return Err(MatchcutError::encode(
                "sink config does not match encoder session config",
            ));
        }
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, frame: &FrameRgba) -> MatchcutResult<()> {
        self.write_frame(frame)
    }

    fn end(&mut self) -> MatchcutResult<()> {
        self.finish()
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        // Normal completion takes the child in finish(); anything left here is
        // an abandoned session.
        self.abort();
    }
}

fn flatten_to_opaque_rgba8(dst: &mut [u8], src: &[u8], bg: Rgba8) -> MatchcutResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(MatchcutError::encode(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = u16::from(bg.r);
    let bg_g = u16::from(bg.g);
    let bg_b = u16::from(bg.b);

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            d[3] = 255;
            continue;
        }

        // Source is premultiplied; add the background scaled by inverse alpha.
        let inv = 255u16 - a;
        d[0] = (u16::from(s[0]) + mul_div255(bg_r, inv)).min(255) as u8;
        d[1] = (u16::from(s[1]) + mul_div255(bg_g, inv)).min(255) as u8;
        d[2] = (u16::from(s[2]) + mul_div255(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u16
}
