use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use luma_math::Random;
use luma_renderer::{RenderConfig, Renderer, SampleScene, SceneBuilder};

/// Option file read when `--options` is not given.
const DEFAULT_OPTIONS: &str = "data/options.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SceneChoice {
    Cornell,
    MeshCornell,
    Test,
}

impl From<SceneChoice> for SampleScene {
    fn from(choice: SceneChoice) -> Self {
        match choice {
            SceneChoice::Cornell => SampleScene::Cornell,
            SceneChoice::MeshCornell => SampleScene::MeshCornell,
            SceneChoice::Test => SampleScene::Test,
        }
    }
}

/// Luma - progressive CPU path tracer
#[derive(Parser, Debug)]
#[command(name = "luma", version, about, args_override_self = true)]
struct Args {
    /// Image size as WIDTH:HEIGHT
    #[arg(short, long, value_parser = parse_size, default_value = "320:240")]
    size: (usize, usize),

    /// Sub-samples per pixel edge
    #[arg(long = "ss", default_value_t = 1)]
    sub_samples: usize,

    /// Samples per sub-pixel per pass
    #[arg(long, default_value_t = 8)]
    spp: usize,

    /// Bounces before Russian roulette
    #[arg(long = "mind", default_value_t = 1)]
    min_depth: usize,

    /// Maximum depth; only enforced with --hard-depth-cap
    #[arg(long = "maxd", default_value_t = 4)]
    max_depth: usize,

    /// Enforce --maxd as a hard bounce limit
    #[arg(long)]
    hard_depth_cap: bool,

    /// Lower bound of the roulette termination probability
    #[arg(long, default_value_t = 0.005)]
    rr_cutoff: f64,

    /// Tile size in pixels
    #[arg(long = "ts", default_value_t = 64)]
    tile_size: usize,

    /// Stop starting new passes after this many seconds
    #[arg(long, value_parser = parse_seconds, default_value_t = 121.0)]
    time_limit: f64,

    /// Seconds between progress images
    #[arg(long, value_parser = parse_seconds, default_value_t = 15.0)]
    progress_interval: f64,

    /// No progress images
    #[arg(short, long)]
    quiet: bool,

    /// Render exactly one pass
    #[arg(short, long)]
    wait: bool,

    /// Built-in scene to render
    #[arg(long, value_enum, default_value_t = SceneChoice::MeshCornell)]
    scene: SceneChoice,

    /// Output image; an empty string skips saving
    #[arg(short, long, default_value = "output.png")]
    output: String,

    /// Base seed; taken from the clock when absent
    #[arg(long)]
    seed: Option<u64>,

    /// Deal shuffled pixels to tiles instead of rectangles
    #[arg(long)]
    scrambled: bool,

    /// Lat-long environment image replacing the scene background
    #[arg(long)]
    environment: Option<PathBuf>,

    /// JSON array of extra arguments, applied before the command line
    #[arg(long)]
    options: Option<PathBuf>,
}

impl Args {
    fn render_config(&self) -> RenderConfig {
        RenderConfig {
            width: self.size.0,
            height: self.size.1,
            pixel_sub_samples: self.sub_samples,
            samples_per_pixel: self.spp,
            min_depth: self.min_depth,
            max_depth: self.max_depth,
            hard_depth_cap: self.hard_depth_cap,
            min_rr_cutoff: self.rr_cutoff,
            tile_size: self.tile_size,
            time_limit: Duration::from_secs_f64(self.time_limit),
            progress_interval: Duration::from_secs_f64(self.progress_interval),
            quiet_progress: self.quiet,
            wait_to_finish: self.wait,
            output_image: self.output.clone(),
            seed: self.seed,
            scrambled_tiles: self.scrambled,
        }
    }
}

fn parse_size(s: &str) -> Result<(usize, usize), String> {
    let (w, h) = s
        .split_once(':')
        .ok_or_else(|| format!("expected WIDTH:HEIGHT, got '{}'", s))?;
    let w: usize = w.trim().parse().map_err(|e| format!("bad width '{}': {}", w, e))?;
    let h: usize = h.trim().parse().map_err(|e| format!("bad height '{}': {}", h, e))?;
    if w == 0 || h == 0 {
        return Err(format!("image size must be positive, got {}:{}", w, h));
    }
    Ok((w, h))
}

/// Seconds for a `Duration`: finite and not negative.
fn parse_seconds(s: &str) -> Result<f64, String> {
    let secs: f64 = s.trim().parse().map_err(|e| format!("bad seconds '{}': {}", s, e))?;
    if !secs.is_finite() || secs < 0.0 || secs >= u64::MAX as f64 {
        return Err(format!("seconds must be a finite, non-negative number, got '{}'", s));
    }
    Ok(secs)
}

/// Arguments stored in an option file, a JSON array of strings.
fn load_option_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read option file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Option file {} is not a JSON array of strings", path.display()))
}

/// Parse the command line, with option file arguments in front of it.
fn parse_args() -> Result<Args> {
    let argv: Vec<String> = std::env::args().collect();
    let first = Args::parse_from(&argv);

    let path = match &first.options {
        Some(path) => path.clone(),
        None if Path::new(DEFAULT_OPTIONS).exists() => PathBuf::from(DEFAULT_OPTIONS),
        None => return Ok(first),
    };

    let extra = load_option_file(&path)?;
    log::info!("Options from {}: {}", path.display(), extra.join(" "));

    let merged = argv
        .iter()
        .take(1)
        .chain(extra.iter())
        .chain(argv.iter().skip(1))
        .cloned();
    Ok(Args::parse_from(merged))
}

fn validate(config: &RenderConfig) -> Result<()> {
    if config.pixel_sub_samples == 0 || config.samples_per_pixel == 0 {
        bail!("--ss and --spp must be at least 1");
    }
    if config.tile_size == 0 {
        bail!("--ts must be at least 1");
    }
    if !(0.0..1.0).contains(&config.min_rr_cutoff) {
        bail!("--rr-cutoff must be in [0, 1), got {}", config.min_rr_cutoff);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let start = Instant::now();
    let args = parse_args()?;
    let mut config = args.render_config();
    validate(&config)?;
    let seed = config.resolve_seed();
    config.seed = Some(seed);

    log::info!("Starting Luma");
    log::info!(
        "Render size {}x{}, tile size {}, output '{}'",
        config.width,
        config.height,
        config.tile_size,
        config.output_image
    );
    log::info!(
        "Samples: {} sub x {} per pixel = {} per pass; depth min {} max {}{}",
        config.pixel_sub_samples * config.pixel_sub_samples,
        config.samples_per_pixel,
        config.samples_per_pass(),
        config.min_depth,
        config.max_depth,
        if config.hard_depth_cap { " (hard cap)" } else { " (not enforced)" }
    );
    log::info!("Seed {}", seed);

    let sample: SampleScene = args.scene.into();
    let desc = sample.build();

    let mut builder = SceneBuilder::new();
    if let Some(path) = &args.environment {
        builder = builder.with_environment(path);
    }
    let mut scene = builder
        .build(&desc)
        .with_context(|| format!("Failed to build scene '{}'", sample))?;

    config.fit_camera(&mut scene.camera);
    scene.preprocess(&mut Random::new(seed));
    log::info!("Setup done in {:.2?}", start.elapsed());

    let mut renderer = Renderer::new(config.clone(), &scene);
    let mut progress_count = 0;
    renderer.render(|film, stats| {
        let name = format!("{:05}.png", progress_count);
        match film.save(&name) {
            Ok(()) => log::info!("Saved progress image {} after pass {}", name, stats.pass),
            Err(e) => log::warn!("Failed to save progress image {}: {}", name, e),
        }
        progress_count += 1;
    });

    if config.output_image.is_empty() {
        log::info!("No output image requested");
    } else {
        renderer
            .film()
            .save(&config.output_image)
            .with_context(|| format!("Failed to save {}", config.output_image))?;
        log::info!("Saved {}", config.output_image);
    }

    log::info!("Finished in {:.2?}", start.elapsed());
    Ok(())
}
