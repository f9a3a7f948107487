use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "holdframe", version)]
struct Cli {
    /// Optional JSON config; defaults are used for anything it omits.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the halo offsets for a halo size as JSON.
    Halo(HaloArgs),
    /// Filter synthetic frames and write the last composite as a PNG.
    Frame(FrameArgs),
    /// Record a synthetic session to MP4 + WAV (requires `ffmpeg` on PATH).
    Record(RecordArgs),
}

#[derive(Parser, Debug)]
struct HaloArgs {
    /// Halo size.
    #[arg(
        long,
        value_parser = clap::value_parser!(i32).range(..=i64::from(holdframe::MAX_HALO_SIZE))
    )]
    size: i32,
}

#[derive(Parser, Debug)]
struct SourceArgs {
    /// Color frame width.
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Color frame height.
    #[arg(long, default_value_t = 480)]
    height: u32,
    /// Depth frame width.
    #[arg(long, default_value_t = 320)]
    depth_width: u32,
    /// Depth frame height.
    #[arg(long, default_value_t = 240)]
    depth_height: u32,
    /// Seed for the synthetic source.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Number of frames to generate.
    #[arg(long, default_value_t = 30)]
    frames: u64,
    /// Backend override.
    #[arg(long, value_enum)]
    backend: Option<BackendChoice>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RecordArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Output MP4 path; audio goes to the same path with a `.wav` extension.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Cpu,
    Gpu,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => holdframe::HoldframeConfig::from_path(path)?,
        None => holdframe::HoldframeConfig::default(),
    };
    match cli.cmd {
        Command::Halo(args) => cmd_halo(args),
        Command::Frame(args) => cmd_frame(&cfg, args),
        Command::Record(args) => cmd_record(&cfg, args),
    }
}

fn cmd_halo(args: HaloArgs) -> anyhow::Result<()> {
    let halo = holdframe::generate_halo(args.size);
    println!("{}", serde_json::to_string(halo.as_slice())?);
    Ok(())
}

fn make_source(
    args: &SourceArgs,
    cfg: &holdframe::HoldframeConfig,
) -> anyhow::Result<holdframe::SyntheticSource> {
    let color = holdframe::FrameSize::new(args.width, args.height)?;
    let depth = holdframe::FrameSize::new(args.depth_width, args.depth_height)?;
    Ok(
        holdframe::SyntheticSource::new(color, depth, cfg.recording.fps, args.seed)
            .with_audio_format(cfg.recording.audio),
    )
}

fn make_coordinator(
    args: &SourceArgs,
    cfg: &holdframe::HoldframeConfig,
) -> anyhow::Result<holdframe::CaptureCoordinator> {
    let kind = match args.backend {
        Some(BackendChoice::Cpu) => holdframe::BackendKind::Cpu,
        Some(BackendChoice::Gpu) => holdframe::BackendKind::Gpu,
        None => cfg.filter.backend,
    };
    let backend = holdframe::create_backend(kind, cfg.backend_policy())?;
    let engine = holdframe::CompositingFilterEngine::new(backend);
    tracing::info!(backend = %engine.backend_kind(), "compositing backend selected");
    let mut coordinator = holdframe::CaptureCoordinator::new(engine, cfg.filter_params());
    if let Some(auto) = cfg.auto_threshold()? {
        coordinator = coordinator.with_auto_threshold(auto);
    }
    Ok(coordinator)
}

fn cmd_frame(cfg: &holdframe::HoldframeConfig, args: FrameArgs) -> anyhow::Result<()> {
    let mut source = make_source(&args.source, cfg)?;
    let mut coordinator = make_coordinator(&args.source, cfg)?;

    let started = Instant::now();
    let mut last = None;
    for _ in 0..args.source.frames {
        if let Some(out) = coordinator.on_frame(source.next_frame(), Instant::now())? {
            last = Some(out);
        }
    }
    let frame = last.context("no frames were filtered (use --frames > 0)")?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let size = frame.size();
    image::save_buffer_with_format(
        &args.out,
        &frame.to_rgba8(),
        size.width,
        size.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    let stats = coordinator.stats();
    println!(
        "filtered {} frames in {:.1} ms, wrote {}",
        stats.composites,
        started.elapsed().as_secs_f64() * 1000.0,
        args.out.display()
    );
    Ok(())
}

fn cmd_record(cfg: &holdframe::HoldframeConfig, args: RecordArgs) -> anyhow::Result<()> {
    let mut source = make_source(&args.source, cfg)?;
    let recorder = Arc::new(holdframe::RecordingPipeline::new(cfg.recording_opts()));
    let coordinator = make_coordinator(&args.source, cfg)?.with_recorder(recorder.clone());

    let sink_cfg = holdframe::SinkConfig {
        size: source.color_size(),
        fps: cfg.recording.fps,
        audio: Some(cfg.recording.audio),
    };
    let opts = holdframe::FfmpegSinkOpts::new(&args.out);
    recorder.activate(sink_cfg, move || {
        Ok(Box::new(holdframe::FfmpegSink::new(opts)) as Box<dyn holdframe::EncoderSink>)
    })?;

    // Audio per video frame at the configured rate.
    let fps = cfg.recording.fps;
    let audio_frames = (u64::from(cfg.recording.audio.sample_rate) * u64::from(fps.den)
        / u64::from(fps.num)) as usize;

    let handle = holdframe::spawn_coordinator(coordinator, 4, |_| {})?;
    for _ in 0..args.source.frames {
        handle.submit_audio(source.next_audio(audio_frames));
        handle.submit_blocking(source.next_frame());
    }
    let coordinator = handle.finish()?;
    let stats = recorder.deactivate()?;

    println!(
        "recorded {} of {} frames ({} with audio) to {}",
        stats.paired + stats.video_only,
        coordinator.stats().composites,
        stats.paired,
        args.out.display()
    );
    Ok(())
}
