use std::path::{Path, PathBuf};

use matchcut::{Background, BlurMode, Canvas, Rgba8, StyleConfig};

/// Locate any usable TrueType/OpenType font on the host.
///
/// Tests that need real glyph shaping skip (early return) when this comes back
/// `None`, the same way ffmpeg-dependent tests skip without ffmpeg.
pub fn find_system_font() -> Option<PathBuf> {
    let roots = [
        "/usr/share/fonts",
        "/usr/local/share/fonts",
        "/System/Library/Fonts",
        "C:\\Windows\\Fonts",
    ];
    for root in roots {
        if let Some(found) = find_font_under(Path::new(root)) {
            return Some(found);
        }
    }
    None
}

fn find_font_under(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if matches!(ext.as_deref(), Some("ttf") | Some("otf")) {
            return Some(path);
        }
    }
    subdirs.into_iter().find_map(|d| find_font_under(&d))
}

/// Baseline style used across integration tests.
pub fn test_style(font_path: PathBuf) -> StyleConfig {
    StyleConfig {
        text: "HELLO".to_string(),
        font_path,
        font_size_px: Some(16.0),
        text_color: Rgba8::BLACK,
        background: Background::Solid(Rgba8::WHITE),
        canvas: Canvas {
            width: 128,
            height: 96,
        },
        duration_secs: 2.0,
        fps: 10,
        blur_mode: BlurMode::Gaussian,
        max_blur_intensity: 4.0,
        highlight: None,
    }
}
