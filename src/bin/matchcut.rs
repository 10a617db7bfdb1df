use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "matchcut", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame as a PNG for inspection.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input style JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Compose frames sequentially instead of on a worker pool.
    #[arg(long)]
    sequential: bool,

    /// Worker thread count (defaults to rayon's choice).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input style JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn read_style_json(path: &Path) -> anyhow::Result<matchcut::StyleConfig> {
    let f = File::open(path).with_context(|| format!("open style '{}'", path.display()))?;
    let r = BufReader::new(f);
    let style: matchcut::StyleConfig =
        serde_json::from_reader(r).with_context(|| "parse style JSON")?;
    Ok(style)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let style = read_style_json(&args.in_path)?;

    let opts = matchcut::AssembleOpts {
        parallel: !args.sequential,
        threads: args.threads,
        ..Default::default()
    };

    let out = matchcut::assemble(&style, &args.out, &opts)
        .map_err(|e| anyhow::anyhow!("render failed ({}): {e}", e.kind()))?;
    println!(
        "wrote {} ({} frames, {:.2}s)",
        out.path.display(),
        out.frame_count,
        out.duration_secs
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let style = read_style_json(&args.in_path)?;

    let mut sink = matchcut::InMemorySink::new();
    let opts = matchcut::AssembleOpts {
        parallel: false,
        ..Default::default()
    };
    matchcut::assemble_to_sink(&style, &mut sink, &opts)
        .map_err(|e| anyhow::anyhow!("frame render failed ({}): {e}", e.kind()))?;

    let frame = sink
        .frames()
        .iter()
        .find(|(idx, _)| idx.0 == args.frame)
        .map(|(_, f)| f.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "frame {} out of range (total {})",
                args.frame,
                sink.frames().len()
            )
        })?;

    let img = image::RgbaImage::from_raw(frame.width, frame.height, unpremultiply(&frame.data))
        .ok_or_else(|| anyhow::anyhow!("frame buffer does not match dimensions"))?;
    img.save(&args.out)
        .with_context(|| format!("write PNG '{}'", args.out.display()))?;
    println!("wrote {}", args.out.display());
    Ok(())
}

fn unpremultiply(premul: &[u8]) -> Vec<u8> {
    let mut out = premul.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        for c in 0..3 {
            px[c] = ((u16::from(px[c]) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}
