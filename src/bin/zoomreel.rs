use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "zoomreel", version, about = "Turn a still image into a zoom-in video")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the zoom video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame of the zoom as a PNG.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct EffectArgs {
    /// JSON file with `duration_sec`, `fps` and `zoom_factor`; flags override its values.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Video length in seconds [default: 5].
    #[arg(long)]
    duration: Option<f64>,

    /// Frames per second [default: 30].
    #[arg(long)]
    fps: Option<u32>,

    /// Magnification at the last frame [default: 1.05].
    #[arg(long)]
    zoom: Option<f64>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output video path (the extension selects the container). Missing directories are created.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    effect: EffectArgs,

    /// Video compression format.
    #[arg(long, value_enum, default_value_t = CodecChoice::Mp4v)]
    codec: CodecChoice,

    /// Fail instead of replacing an existing output file.
    #[arg(long)]
    no_overwrite: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path. Missing directories are created.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    effect: EffectArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CodecChoice {
    Mp4v,
    H264,
}

impl From<CodecChoice> for zoomreel::VideoCodec {
    fn from(choice: CodecChoice) -> Self {
        match choice {
            CodecChoice::Mp4v => Self::Mp4v,
            CodecChoice::H264 => Self::H264,
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_params_json(path: &Path) -> anyhow::Result<zoomreel::ZoomParams> {
    let f = File::open(path).with_context(|| format!("open params '{}'", path.display()))?;
    let r = BufReader::new(f);
    let params: zoomreel::ZoomParams = serde_json::from_reader(r)
        .with_context(|| format!("parse params JSON '{}'", path.display()))?;
    Ok(params)
}

fn resolve_params(args: &EffectArgs) -> anyhow::Result<zoomreel::ZoomParams> {
    let mut params = match &args.params {
        Some(path) => read_params_json(path)?,
        None => zoomreel::ZoomParams::default(),
    };
    if let Some(d) = args.duration {
        params.duration_sec = d;
    }
    if let Some(fps) = args.fps {
        params.fps = fps;
    }
    if let Some(z) = args.zoom {
        params.zoom_factor = z;
    }
    params.validate()?;
    Ok(params)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let params = resolve_params(&args.effect)?;

    let mut opts = zoomreel::FfmpegSinkOpts::new(&args.out);
    opts.codec = args.codec.into();
    opts.overwrite = !args.no_overwrite;

    let stats = zoomreel::generate_with_opts(&args.in_path, &params, opts)?;

    eprintln!(
        "wrote {} ({} frames, {}x{})",
        args.out.display(),
        stats.frames_written,
        stats.canvas.width,
        stats.canvas.height
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let params = resolve_params(&args.effect)?;
    let source = zoomreel::load_source_image(&args.in_path)?;
    let frame = zoomreel::render_frame(&source, &params, zoomreel::FrameIndex(args.frame))?;

    zoomreel::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        frame.as_raw(),
        frame.width(),
        frame.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
