use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use ride_merge::export::write_outputs;
use ride_merge::{format_duration, run, source_for_path, AnalyticsSource, PipelineConfig, PipelineOutput, SampleSource};

/// Merge overlapping FIT/GPX recordings of one trip into a single track
#[derive(Parser, Debug)]
#[command(name = "ride-merge", version, about)]
struct Args {
    /// Folder scanned recursively for .fit and .gpx files
    #[arg(default_value = "input_files")]
    input: PathBuf,

    /// Where the merged GPX, CSV and JSON files are written
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// TOML configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simplification tolerance in meters
    #[arg(long)]
    tolerance: Option<f64>,

    /// Gap that starts a new day segment, in hours
    #[arg(long)]
    gap_hours: Option<f64>,

    /// Elevation noise floor in meters
    #[arg(long)]
    noise_floor: Option<f64>,

    /// Compute stats on the simplified track instead of the merged one
    #[arg(long)]
    stats_on_simplified: bool,

    /// Track name written into the GPX
    #[arg(long, default_value = "Merged Ride")]
    name: String,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(tol) = args.tolerance {
        config.simplification_tolerance_m = tol;
    }
    if let Some(hours) = args.gap_hours {
        config.segment_gap_threshold_s = (hours * 3600.0).round() as i64;
    }
    if let Some(floor) = args.noise_floor {
        config.elevation_noise_floor_m = floor;
    }
    if args.stats_on_simplified {
        config.analytics.source = AnalyticsSource::Simplified;
    }
    config.validate()?;
    Ok(config)
}

/// Every supported file under `folder`, sorted by path so source order (and
/// with it the duplicate tie-break) does not depend on directory listing order.
fn collect_sources(folder: &Path) -> Result<Vec<Box<dyn SampleSource>>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(folder) {
        let entry = entry.with_context(|| format!("scanning {}", folder.display()))?;
        if entry.file_type().is_file() {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths.iter().filter_map(|p| source_for_path(p)).collect())
}

fn print_report(output: &PipelineOutput) {
    let stats = &output.stats;
    println!("\n🚴 TRIP STATS");
    println!("=============");
    println!("Sources merged:    {}", output.merged.sources_used.join(", "));
    println!(
        "Points:            {} raw → {} merged ({} duplicates) → {} simplified ({:.1}% smaller)",
        output.merged.input_samples,
        output.merged.track.len(),
        output.merged.duplicates_dropped,
        output.simplified.track.len(),
        output.simplified.reduction_percent()
    );
    println!("Distance:          {:.1} km", stats.total_distance_m / 1000.0);
    println!("Moving distance:   {:.1} km", stats.moving_distance_m / 1000.0);
    println!("Moving time:       {}", format_duration(stats.moving_time_s));
    println!("Trip span:         {}", format_duration(output.merged.track.span_s()));
    println!("Avg moving speed:  {:.1} km/h", stats.average_moving_speed_kmh());
    println!("Climb:             {:.0} m", stats.elevation_gain_m);
    if let Some(center) = output.merged.track.center() {
        println!("Center:            {:.5}, {:.5}", center.y(), center.x());
    }
    if let Some(bounds) = output.merged.track.bounds() {
        println!(
            "Bounds:            {:.5}, {:.5} → {:.5}, {:.5}",
            bounds.min().y,
            bounds.min().x,
            bounds.max().y,
            bounds.max().x
        );
    }
    println!("Segments:          {}", stats.segment_count);
    for seg in &output.segmentation.segments {
        println!("  • {} ({} points)", seg.label(), seg.samples.len());
    }
    println!(
        "\n⚙️  tolerance {:.1} m | gap {} s | stopped < {:.2} m/s | noise floor {:.1} m | stats on {:?} track",
        output.simplified.tolerance_m,
        stats.filters.segment_gap_threshold_s,
        stats.filters.stopped_speed_threshold_mps,
        stats.filters.elevation_noise_floor_m,
        stats.filters.source
    );
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(?config, "configuration loaded");

    if !args.input.exists() {
        bail!("input folder {} does not exist", args.input.display());
    }
    let sources = collect_sources(&args.input)?;
    if sources.is_empty() {
        warn!(folder = %args.input.display(), "no .fit or .gpx files found");
        bail!("no .fit or .gpx files in {}", args.input.display());
    }
    println!("🔍 Found {} files in {}", sources.len(), args.input.display());

    let output = run(&sources, &config).context("merge pipeline failed")?;
    let written = write_outputs(&args.output, &args.name, &output).context("writing outputs")?;

    print_report(&output);
    println!("\n📁 Outputs:");
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}
