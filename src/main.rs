use clap::{Parser, Subcommand};
use gif_rotate::assemble::EncodeSpeed;
use gif_rotate::store::FrameStore;
use gif_rotate::{config, optimize, output, pipeline, source};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gif-rotate")]
#[command(about = "Spin an image in 3D and save it as an animated GIF")]
#[command(long_about = "\
Spin an image in 3D and save it as an animated GIF

Every degree of the sweep is rendered through a perspective projection.
One frame in every four (by default) goes into the animation, which plays
at 50 ms per frame and loops forever. The result is then optimized toward
a target size with gifsicle, or with the built-in rescaler when gifsicle
is not installed.

Rotation types:
  y    spin about the vertical axis, with a small camera offset
  yz   spin about the vertical axis while rolling
  Anything else falls back to y.

Settings are layered: built-in defaults, then --config, then flags.
Run 'gif-rotate gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the rotation and write the animated GIF
    Render(RenderArgs),
    /// Print a stock config file with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Image to rotate
    #[arg(short, long)]
    input: PathBuf,

    /// Animated GIF to write
    #[arg(short, long)]
    output: PathBuf,

    /// Directory for the numbered frame files.
    /// Its contents are removed after the run unless --keep-frames is set.
    #[arg(short = 'd', long)]
    frames_dir: Option<PathBuf>,

    /// Number of one-degree rotation steps [default: 360]
    #[arg(short = 'r', long)]
    angles: Option<u32>,

    /// Ideal width; only used together with --height
    #[arg(short = 'w', long)]
    width: Option<u32>,

    /// Ideal height; only used together with --width
    #[arg(short = 'g', long)]
    height: Option<u32>,

    /// Rotation type: y or yz [default: y]
    #[arg(short = 't', long = "type")]
    axis: Option<String>,

    /// Keep one frame in every STRIDE [default: 4]
    #[arg(long)]
    stride: Option<u32>,

    /// Resize factor of the first optimization pass [default: 0.7]
    #[arg(long)]
    scale: Option<f32>,

    /// Size to optimize toward, in bytes [default: 131072]
    #[arg(long)]
    target_bytes: Option<usize>,

    /// Optimizer backend
    #[arg(long, value_parser = ["auto", "gifsicle", "builtin", "none"])]
    optimizer: Option<String>,

    /// Leave the frame files in place after the run
    #[arg(long)]
    keep_frames: bool,

    /// Config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Render(args) => render(&args)?,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn render(args: &RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let file_overlay = args
        .config
        .as_deref()
        .map(config::load_raw_config)
        .transpose()?;
    let config = config::resolve_config(file_overlay.into_iter().chain([cli_overlay(args)]))?;
    init_thread_pool(&config.processing);

    let ideal = source::ideal_size(args.width, args.height);
    let image = source::load_source(&args.input, ideal)?;
    println!(
        "==> Source: {} ({}x{})",
        args.input.display(),
        image.width(),
        image.height()
    );

    let store = args
        .frames_dir
        .as_ref()
        .map(|dir| FrameStore::create(dir, config.frames.format, config.sweep.angles))
        .transpose()?;
    let optimizer = optimize::select_optimizer(
        config.optimize.backend,
        EncodeSpeed::new(config.animation.encode_speed),
    );

    let result = run_and_write(args, &image, &config, optimizer.as_deref(), store.as_ref());

    // Clean up even when the run failed
    if let Some(store) = &store {
        if !config.frames.keep {
            let removed = store.clear()?;
            println!("==> Cleaned up {} files in {}", removed, store.dir().display());
        }
    }

    let run = result?;
    output::print_report(&run.report);
    Ok(())
}

/// Run the pipeline with progress printing, then write the GIF and report.
fn run_and_write(
    args: &RenderArgs,
    image: &image::DynamicImage,
    config: &config::RotateConfig,
    optimizer: Option<&dyn optimize::Optimizer>,
    store: Option<&FrameStore>,
) -> Result<pipeline::RunOutput, Box<dyn std::error::Error>> {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = pipeline::run(image, config, optimizer, store, None, Some(tx));
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let run = result?;

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.output, run.artifact.bytes())?;
    println!("==> GIF written: {}", args.output.display());

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&run.report)?;
        std::fs::write(report_path, json)?;
    }
    Ok(run)
}

/// Command-line flags as a sparse TOML overlay for [`config::resolve_config`].
fn cli_overlay(args: &RenderArgs) -> toml::Value {
    let mut root = toml::Table::new();
    if let Some(angles) = args.angles {
        set(&mut root, "sweep", "angles", i64::from(angles));
    }
    if let Some(axis) = &args.axis {
        set(&mut root, "sweep", "axis", axis.as_str());
    }
    if let Some(stride) = args.stride {
        set(&mut root, "sampling", "stride", i64::from(stride));
    }
    if let Some(scale) = args.scale {
        set(&mut root, "optimize", "scale", f64::from(scale));
    }
    if let Some(target) = args.target_bytes {
        set(
            &mut root,
            "optimize",
            "target_bytes",
            i64::try_from(target).unwrap_or(i64::MAX),
        );
    }
    if let Some(optimizer) = &args.optimizer {
        set(&mut root, "optimize", "backend", optimizer.as_str());
    }
    if args.keep_frames {
        set(&mut root, "frames", "keep", true);
    }
    toml::Value::Table(root)
}

fn set(root: &mut toml::Table, section: &str, key: &str, value: impl Into<toml::Value>) {
    if let toml::Value::Table(table) = root
        .entry(section)
        .or_insert_with(|| toml::Value::Table(toml::Table::new()))
    {
        table.insert(key.to_string(), value.into());
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
