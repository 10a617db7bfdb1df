mod common;

use matchcut::{
    AssembleOpts, CancelToken, EncodeConfig, FfmpegEncoder, FrameSink, Rgba8, assemble,
    is_ffmpeg_on_path,
};

#[test]
fn renders_a_playable_mp4_via_system_ffmpeg() {
    if !is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not found on PATH");
        return;
    }
    let Some(font) = common::find_system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let style = common::test_style(font);

    let dir = std::env::temp_dir().join(format!("matchcut_mp4_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let out_path = dir.join("reveal.mp4");

    let out = assemble(&style, &out_path, &AssembleOpts::default()).unwrap();
    assert_eq!(out.frame_count, 20);
    assert!((out.duration_secs - 2.0).abs() < 1e-9);

    let meta = std::fs::metadata(&out_path).unwrap();
    assert!(meta.len() > 0, "mp4 output is empty");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cancelled_render_leaves_no_output_file() {
    if !is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not found on PATH");
        return;
    }
    let Some(font) = common::find_system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let style = common::test_style(font);

    let dir = std::env::temp_dir().join(format!("matchcut_cancel_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let out_path = dir.join("cancelled.mp4");

    let cancel = CancelToken::new();
    cancel.cancel();
    let opts = AssembleOpts {
        cancel,
        ..Default::default()
    };

    assert!(assemble(&style, &out_path, &opts).is_err());
    assert!(
        !out_path.exists(),
        "cancelled job must not leave a partial file"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn encoder_failure_surfaces_ffmpeg_diagnostics() {
    if !is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not found on PATH");
        return;
    }

    let dir = std::env::temp_dir().join(format!("matchcut_diag_{}", std::process::id()));
    // The output path is a directory, so ffmpeg fails when opening its output
    // and reports why on stderr.
    let out_path = dir.join("out.mp4");
    std::fs::create_dir_all(&out_path).unwrap();

    let cfg = EncodeConfig {
        width: 64,
        height: 64,
        fps: 10,
        out_path,
        overwrite: true,
    };
    let mut enc = FfmpegEncoder::new(cfg, Rgba8::WHITE).unwrap();

    let err = enc.end().unwrap_err();
    assert_eq!(err.kind(), "encode");
    assert!(
        err.to_string().contains("ffmpeg exited with status"),
        "error should carry ffmpeg's exit diagnostics: {err}"
    );

    let _ = std::fs::remove_dir_all(&dir);
}
