use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use lyrisync::{
    CaptureOpts, CapturePipeline, CodecVariant, ExportRequest, FfmpegEncoderProbe,
    FfmpegSinkFactory, ManualClock, Player, PlayerOpts, Project,
};

#[derive(Parser, Debug)]
#[command(name = "lyrisync", version)]
struct Cli {
    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Print the draw plan of a single frame as JSON.
    Plan(PlanArgs),
    /// Play the whole project and record it to a video file (requires `ffmpeg` on PATH).
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct ProjectArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Seconds to wait for backgrounds to load.
    #[arg(long, default_value_t = 30.0)]
    load_timeout: f64,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Playback time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Print the session font family.
    #[arg(long)]
    dump_font: bool,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Playback time in seconds.
    #[arg(long)]
    time: f64,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Directory the video is written to.
    #[arg(long)]
    out_dir: PathBuf,

    /// Leave the project audio out.
    #[arg(long)]
    no_audio: bool,

    /// Force a codec (vp9, vp8 or h264) instead of picking the best available.
    #[arg(long)]
    codec: Option<CodecVariant>,

    /// Replace an existing file with the same name.
    #[arg(long)]
    overwrite: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn open_session(args: &ProjectArgs) -> anyhow::Result<(Project, Player)> {
    let project = Project::from_path(&args.in_path)?;
    project
        .validate()
        .with_context(|| format!("validate project '{}'", args.in_path.display()))?;
    let base = project_dir(&args.in_path);
    let mut player = Player::open(&project, base, PlayerOpts::default())?;

    player.preload();
    let timeout = Duration::try_from_secs_f64(args.load_timeout.max(0.0))
        .context("load timeout out of range")?;
    if !player.cache_mut().wait_idle(timeout) {
        tracing::warn!(
            pending = player.cache().in_flight(),
            "backgrounds still loading; rendering without them"
        );
    }
    Ok((project, player))
}

fn project_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (_project, mut player) = open_session(&args.project)?;
    if args.dump_font {
        dump_font_diagnostics(&args.project.in_path)?;
    }

    let frame = player.render_at(args.time)?;
    let rgba = frame.to_straight_rgba8();

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &rgba,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let (_project, mut player) = open_session(&args.project)?;
    let plan = player.plan_at(args.time);
    let json = serde_json::to_string_pretty(&plan).context("serialize frame plan")?;
    println!("{json}");
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let (project, mut player) = open_session(&args.project)?;
    let base = project_dir(&args.project.in_path);

    let mut opts = CaptureOpts::new(&args.out_dir);
    opts.overwrite = args.overwrite;
    if let Some(codec) = args.codec {
        opts.codecs = vec![codec];
    }
    let settle = opts.settle;
    let mut capture = CapturePipeline::new(
        opts,
        Box::new(FfmpegEncoderProbe),
        Box::new(FfmpegSinkFactory::default()),
    );

    let canvas = project.canvas();
    let req = ExportRequest {
        title: project.title.clone(),
        width: canvas.width,
        height: canvas.height,
        fps: project.fps,
        audio: if args.no_audio {
            None
        } else {
            project.audio_path(base)
        },
    };

    let duration = project.duration_secs();
    let mut clock = ManualClock::new(duration);
    let started = Instant::now();
    capture.request_export(&req, started, &mut clock)?;
    // Offline playback: the settle delay elapses in clock time, not wall time.
    capture.poll(started + settle, &mut clock);
    player.start(&mut clock);

    let artifact =
        player.record_offline(&mut capture, &mut clock, project.fps.frame_duration_secs());
    player.teardown();

    let artifact = artifact?.context("export produced no output")?;
    eprintln!(
        "wrote {} ({} frames, {:.2}s, {}) in {:.1}s",
        artifact.path.display(),
        artifact.frames,
        artifact.duration_secs,
        artifact.codec,
        started.elapsed().as_secs_f64()
    );
    println!("{}", artifact.path.display());
    Ok(())
}

fn dump_font_diagnostics(in_path: &Path) -> anyhow::Result<()> {
    let project = Project::from_path(in_path)?;
    eprintln!("font diagnostics:");
    match project.font_path(project_dir(in_path)) {
        Some(path) => {
            let bytes =
                std::fs::read(&path).with_context(|| format!("read font '{}'", path.display()))?;
            let engine = lyrisync::TextLayoutEngine::with_font_bytes(bytes)?;
            eprintln!("  source: {}", path.display());
            eprintln!("  family: {}", engine.family_name().unwrap_or("<unnamed>"));
            eprintln!(
                "  bytes:  {}",
                engine.font_bytes().map_or(0, |b| b.len())
            );
        }
        None => eprintln!("  no font configured; text is not drawn"),
    }
    Ok(())
}
