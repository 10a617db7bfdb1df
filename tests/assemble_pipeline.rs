mod common;

use matchcut::{
    AssembleOpts, BlurMode, CancelToken, FrameIndex, HighlightStyle, InMemorySink, MatchcutError,
    Rgba8, assemble_to_sink, schedule_frame,
};

#[test]
fn example_scenario_two_seconds_at_ten_fps_is_twenty_frames() {
    let Some(font) = common::find_system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let style = common::test_style(font);
    assert_eq!(style.total_frames(), 20);

    let mut sink = InMemorySink::new();
    let opts = AssembleOpts {
        parallel: false,
        ..Default::default()
    };
    let count = assemble_to_sink(&style, &mut sink, &opts).unwrap();

    assert_eq!(count, 20);
    assert_eq!(sink.frames().len(), 20);
    assert!(sink.ended());

    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height, cfg.fps), (128, 96, 10));

    // Endpoint blur states come straight from the scheduler contract.
    let first = schedule_frame(FrameIndex(0), 20, &style).unwrap();
    let last = schedule_frame(FrameIndex(19), 20, &style).unwrap();
    assert_eq!(first.blur_intensity, style.max_blur_intensity);
    assert_eq!(last.blur_intensity, 0.0);
}

#[test]
fn frames_are_delivered_in_strictly_increasing_order_under_parallelism() {
    let Some(font) = common::find_system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let style = common::test_style(font);

    let mut sink = InMemorySink::new();
    let opts = AssembleOpts {
        parallel: true,
        chunk_size: 4,
        threads: Some(4),
        ..Default::default()
    };
    assemble_to_sink(&style, &mut sink, &opts).unwrap();

    for (expected, (idx, _)) in sink.frames().iter().enumerate() {
        assert_eq!(idx.0, expected as u64);
    }
}

#[test]
fn parallel_and_sequential_renders_are_frame_for_frame_identical() {
    let Some(font) = common::find_system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let style = common::test_style(font);

    let mut seq_sink = InMemorySink::new();
    let seq_opts = AssembleOpts {
        parallel: false,
        ..Default::default()
    };
    assemble_to_sink(&style, &mut seq_sink, &seq_opts).unwrap();

    let mut par_sink = InMemorySink::new();
    let par_opts = AssembleOpts {
        parallel: true,
        chunk_size: 3,
        threads: Some(3),
        ..Default::default()
    };
    assemble_to_sink(&style, &mut par_sink, &par_opts).unwrap();

    assert_eq!(seq_sink.frames().len(), par_sink.frames().len());
    for ((ia, fa), (ib, fb)) in seq_sink.frames().iter().zip(par_sink.frames().iter()) {
        assert_eq!(ia, ib);
        assert_eq!(fa, fb, "frame {} differs between runs", ia.0);
    }
}

#[test]
fn blur_mode_none_without_highlight_makes_every_frame_identical() {
    let Some(font) = common::find_system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let mut style = common::test_style(font);
    style.blur_mode = BlurMode::None;
    style.background = matchcut::Background::Solid(Rgba8::BLACK);
    style.text_color = Rgba8::WHITE;
    style.highlight = None;

    let mut sink = InMemorySink::new();
    let opts = AssembleOpts {
        parallel: false,
        ..Default::default()
    };
    assemble_to_sink(&style, &mut sink, &opts).unwrap();

    let frames = sink.frames();
    let (_, first) = &frames[0];
    for (idx, frame) in frames {
        assert_eq!(frame, first, "frame {} drifted with blur disabled", idx.0);
    }
}

#[test]
fn highlight_progress_changes_frames_when_blur_is_disabled() {
    let Some(font) = common::find_system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let mut style = common::test_style(font);
    style.blur_mode = BlurMode::None;
    style.highlight = Some(HighlightStyle {
        color: Rgba8::opaque(255, 230, 90),
        padding_frac: 0.1,
    });

    let mut sink = InMemorySink::new();
    let opts = AssembleOpts {
        parallel: false,
        ..Default::default()
    };
    assemble_to_sink(&style, &mut sink, &opts).unwrap();

    let frames = sink.frames();
    let (_, first) = &frames[0];
    let (_, last) = &frames[frames.len() - 1];
    assert_ne!(first, last, "highlight overlay should fade in");
}

#[test]
fn single_frame_job_matches_final_frame_of_longer_job() {
    let Some(font) = common::find_system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let style = common::test_style(font.clone());

    let mut long_sink = InMemorySink::new();
    let opts = AssembleOpts {
        parallel: false,
        ..Default::default()
    };
    assemble_to_sink(&style, &mut long_sink, &opts).unwrap();
    let (_, final_frame) = long_sink.frames().last().unwrap().clone();

    let mut single = common::test_style(font);
    single.duration_secs = 0.05;
    single.fps = 1;
    assert_eq!(single.total_frames(), 1);

    let mut single_sink = InMemorySink::new();
    assemble_to_sink(&single, &mut single_sink, &opts).unwrap();
    assert_eq!(single_sink.frames().len(), 1);

    // A one-frame timeline lands on the sharp final state, so its pixels match
    // the last frame of the 20-frame job.
    let (_, only) = &single_sink.frames()[0];
    assert_eq!(only, &final_frame);
}

#[test]
fn cancelled_job_stops_without_pushing_all_frames() {
    let Some(font) = common::find_system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let style = common::test_style(font);

    let cancel = CancelToken::new();
    cancel.cancel();

    let mut sink = InMemorySink::new();
    let opts = AssembleOpts {
        parallel: false,
        cancel,
        ..Default::default()
    };
    let err = assemble_to_sink(&style, &mut sink, &opts).unwrap_err();
    assert!(matches!(err, MatchcutError::Cancelled));
    assert!(!sink.ended());
    assert!(sink.frames().is_empty());
}

#[test]
fn missing_font_is_an_asset_error_before_any_frames() {
    let style = common::test_style("definitely/not/a/font.ttf".into());
    let mut sink = InMemorySink::new();
    let err = assemble_to_sink(&style, &mut sink, &AssembleOpts::default()).unwrap_err();
    assert_eq!(err.kind(), "asset");
    assert!(sink.frames().is_empty());
}

#[test]
fn invalid_style_is_a_config_error_before_any_frames() {
    let mut style = common::test_style("x.ttf".into());
    style.fps = 0;
    let mut sink = InMemorySink::new();
    let err = assemble_to_sink(&style, &mut sink, &AssembleOpts::default()).unwrap_err();
    assert_eq!(err.kind(), "config");
}
