//! hueform-bench: CLI tool for tuning shape detection and collecting
//! diagnostics.
//!
//! Runs the shape pipeline on a still image with configurable
//! parameters, printing the recognized shapes and per-stage
//! diagnostics. Useful for:
//!
//! - Tuning the binarization threshold and hue bands for a scene
//! - Checking which contours the region size filter throws away
//! - Measuring per-stage durations against a frame budget
//! - Dumping the mask, hue and band images for inspection
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin hueform-bench -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Set `RUST_LOG=hueform_pipeline=debug` to see why contours are skipped.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use hueform_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use hueform_pipeline::{
    Artifact, ArtifactImage, BufferPool, DebugViews, FrameArtifacts, FrameResult, HueRange,
    MaxRegionSize, PipelineConfig, RetrievalMode,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Shape and color recognition diagnostics for hueform.
///
/// Runs the pipeline on a given image with configurable parameters and
/// prints the recognized shapes plus per-stage timing and counts.
#[derive(Parser)]
#[command(name = "hueform-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Luminance cut level; pixels at or above it are background.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD_LOW)]
    threshold_low: u8,

    /// Value written for the light class before inversion.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD_HIGH)]
    threshold_high: u8,

    /// Red band hue range as LOW,HIGH on the 0-180 scale.
    #[arg(long, value_parser = parse_hue_range, default_value = "0,10")]
    red_hue: HueRange,

    /// Green band hue range as LOW,HIGH on the 0-180 scale.
    #[arg(long, value_parser = parse_hue_range, default_value = "40,80")]
    green_hue: HueRange,

    /// Blue band hue range as LOW,HIGH on the 0-180 scale.
    #[arg(long, value_parser = parse_hue_range, default_value = "100,130")]
    blue_hue: HueRange,

    /// Which contours to keep.
    #[arg(long, value_enum, default_value_t = Retrieval::External)]
    retrieval: Retrieval,

    /// RDP tolerance as a fraction of contour perimeter.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_EPSILON_FACTOR)]
    epsilon_factor: f64,

    /// Region size limit: `half`, `none`, or WIDTHxHEIGHT in pixels.
    #[arg(long, value_parser = parse_max_region, default_value = "half")]
    max_region: MaxRegionSize,

    /// Compute shapes but do not report them.
    #[arg(long)]
    hide_shapes: bool,

    /// Write the mask, hue and band images as PNG into this directory.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Contour retrieval selection.
#[derive(Clone, Copy, ValueEnum)]
enum Retrieval {
    /// Outermost boundaries only.
    External,
    /// Every boundary, holes included.
    List,
}

fn parse_hue_range(s: &str) -> Result<HueRange, String> {
    let (low, high) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LOW,HIGH, got {s:?}"))?;
    let low = low.trim().parse::<u8>().map_err(|e| format!("bad low hue: {e}"))?;
    let high = high.trim().parse::<u8>().map_err(|e| format!("bad high hue: {e}"))?;
    let range = HueRange::new(low, high);
    range.validate("hue").map_err(|e| e.to_string())?;
    Ok(range)
}

fn parse_max_region(s: &str) -> Result<MaxRegionSize, String> {
    match s {
        "half" => Ok(MaxRegionSize::HalfFrame),
        "none" => Ok(MaxRegionSize::Unlimited),
        _ => {
            let (w, h) = s
                .split_once('x')
                .ok_or_else(|| format!("expected half, none or WIDTHxHEIGHT, got {s:?}"))?;
            Ok(MaxRegionSize::Fixed {
                width: w.parse().map_err(|e| format!("bad width: {e}"))?,
                height: h.parse().map_err(|e| format!("bad height: {e}"))?,
            })
        }
    }
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. `--dump-dir` always turns
/// on every debug view.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    let mut config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        PipelineConfig {
            threshold_low: cli.threshold_low,
            threshold_high: cli.threshold_high,
            red_hue: cli.red_hue,
            green_hue: cli.green_hue,
            blue_hue: cli.blue_hue,
            retrieval_mode: match cli.retrieval {
                Retrieval::External => RetrievalMode::External,
                Retrieval::List => RetrievalMode::List,
            },
            epsilon_factor: cli.epsilon_factor,
            max_region_size: cli.max_region,
            show_shapes: !cli.hide_shapes,
            ..PipelineConfig::default()
        }
    };
    if cli.dump_dir.is_some() {
        config.debug_views = DebugViews::ALL;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let frame = match hueform_pipeline::decode_frame(&image_bytes) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("Error decoding {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    info!(
        path = %cli.image_path.display(),
        bytes = image_bytes.len(),
        width = frame.dimensions().width,
        height = frame.dimensions().height,
        runs = cli.runs,
        "loaded image"
    );
    eprintln!("Config: {config:#?}");
    eprintln!();

    let pool = BufferPool::new();
    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match hueform_pipeline::diagnostics::process_with_diagnostics(
            frame.clone(),
            &config,
            &pool,
            &StdClock,
        ) {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Shapes and dumps are identical across runs.
                if run == 0 {
                    if !cli.json {
                        print_shapes(&result);
                    }
                    if let Some(ref dir) = cli.dump_dir {
                        dump_artifacts(dir, &result.artifacts);
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

fn print_shapes(result: &FrameResult) {
    println!();
    println!("Shapes ({})", result.shapes.len());
    println!("{}", "-".repeat(60));
    for (i, shape) in result.shapes.iter().enumerate() {
        let c = shape.color;
        let vertices: Vec<String> = shape
            .points
            .points()
            .iter()
            .map(|p| format!("({},{})", p.x, p.y))
            .collect();
        println!(
            "{i:>3}  {:<9} rgb({:>3},{:>3},{:>3})  {}",
            shape.kind.to_string(),
            c.r,
            c.g,
            c.b,
            vertices.join(" "),
        );
    }
}

/// Write every kept artifact as `<name>.png` under `dir`.
///
/// Failures are logged and skipped; a dump never fails the run.
fn dump_artifacts(dir: &Path, artifacts: &FrameArtifacts) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "cannot create dump directory");
        return;
    }
    for artifact in Artifact::ALL {
        let Some(image) = artifacts.get(artifact) else {
            continue;
        };
        let path = dir.join(format!("{artifact}.png"));
        let saved = match image {
            ArtifactImage::Gray(gray) => gray.save(&path),
            // Channels are written as-is: H, S, V in R, G, B.
            ArtifactImage::Hue(hue) => {
                let dims = hue.dimensions();
                match image::RgbImage::from_raw(dims.width, dims.height, hue.as_raw().to_vec()) {
                    Some(rgb) => rgb.save(&path),
                    None => continue,
                }
            }
        };
        match saved {
            Ok(()) => info!(path = %path.display(), "wrote artifact"),
            Err(e) => warn!(path = %path.display(), error = %e, "cannot write artifact"),
        }
    }
}

/// Min, mean and max of a series of milliseconds.
#[allow(clippy::cast_precision_loss)]
fn spread(values: impl Iterator<Item = f64>) -> Option<(f64, f64, f64)> {
    let (mut lo, mut hi, mut sum, mut n) = (f64::INFINITY, f64::NEG_INFINITY, 0.0, 0usize);
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
        sum += v;
        n += 1;
    }
    (n > 0).then(|| (lo, sum / n as f64, hi))
}

/// Per-stage timing spread across all runs.
fn print_multi_run_summary(runs: &[PipelineDiagnostics]) {
    println!();
    println!("Across {} runs (ms)", runs.len());
    println!("{:<24} {:>10} {:>10} {:>10}", "", "min", "mean", "max");
    println!("{}", "-".repeat(57));

    let Some(first) = runs.first() else {
        return;
    };
    for (index, (name, _)) in first.stages().into_iter().enumerate() {
        let series = runs
            .iter()
            .map(|d| d.stages()[index].1.duration.as_secs_f64() * 1000.0);
        if let Some((lo, mean, hi)) = spread(series) {
            println!("{name:<24} {lo:>10.3} {mean:>10.3} {hi:>10.3}");
        }
    }
    let totals = runs.iter().map(|d| d.total_duration.as_secs_f64() * 1000.0);
    if let Some((lo, mean, hi)) = spread(totals) {
        println!("{:<24} {lo:>10.3} {mean:>10.3} {hi:>10.3}", "Total");
    }
}
