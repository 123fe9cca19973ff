//! glacis CLI - multi-modal glacier change studies

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use glacis_cloud::{
    Collection, DateRange, ImageryProvider, ImageryRequest, LocalArchive, SceneFilter, StacCatalog,
    StacProvider, StacProviderOptions,
};
use glacis_core::io::read_geotiff;
use glacis_core::Raster;
use glacis_pipeline::{run_all, run_study, Modality, ModelSummary, RunReport, StudyConfig};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "glacis")]
#[command(author, version, about = "Multi-modal remote-sensing studies of a glacier", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one study: dem, sentinel1, sentinel2 or landsat8
    Run {
        /// Study to run
        modality: String,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        overrides: StudyArgs,
    },
    /// Run all four studies; failures do not stop the others
    RunAll {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        overrides: StudyArgs,
    },
    /// List scenes of a collection over the study region
    Search {
        /// Collection: srtm, aster, sentinel1, sentinel2, landsat8
        collection: String,
        /// First acquisition date (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Last acquisition date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Keep scenes with cloud cover below this percentage
        #[arg(long)]
        max_cloud: Option<f64>,
        #[command(flatten)]
        source: SourceArgs,
        /// Study configuration (YAML or JSON) for the region
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Print the study configuration as YAML
    Config {
        /// Configuration file to merge over the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Where imagery comes from
#[derive(Args)]
struct SourceArgs {
    /// Local GeoTIFF archive directory (with catalog.json)
    #[arg(long, conflicts_with = "stac")]
    archive: Option<PathBuf>,
    /// STAC catalog: pc, earth-search or an API URL
    #[arg(long, default_value = "pc")]
    stac: String,
    /// Download cache for STAC assets
    #[arg(long, default_value = ".glacis-cache")]
    cache_dir: PathBuf,
}

/// Overrides applied on top of the configuration file
#[derive(Args)]
struct StudyArgs {
    /// Study configuration (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output directory
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
    /// Sample cap for every study
    #[arg(long)]
    samples: Option<usize>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>) -> Result<StudyConfig> {
    match path {
        Some(p) => StudyConfig::load(p).with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(StudyConfig::default()),
    }
}

fn study_config(args: &StudyArgs) -> Result<StudyConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(out) = &args.out {
        config.output_dir = out.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(samples) = args.samples {
        for m in Modality::ALL {
            config.modality_mut(m).samples = samples;
        }
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_provider(source: &SourceArgs, config: &StudyConfig) -> Result<Box<dyn ImageryProvider>> {
    if let Some(dir) = &source.archive {
        let archive = LocalArchive::open(dir.clone())
            .with_context(|| format!("Failed to open archive {}", dir.display()))?;
        info!("Archive: {} ({} scenes)", dir.display(), archive.catalog().scenes.len());
        return Ok(Box::new(archive));
    }
    let catalog = StacCatalog::from_str_or_url(&source.stac);
    info!("STAC catalog: {}", catalog.label());
    let provider = StacProvider::new(
        catalog,
        StacProviderOptions {
            cache_dir: source.cache_dir.clone(),
            retry: config.retry,
            ..Default::default()
        },
    )
    .context("Failed to create STAC provider")?;
    Ok(Box::new(provider))
}

fn print_report(report: &RunReport, elapsed: std::time::Duration) {
    println!("{} study ({})", report.modality, report.provider);
    let scenes: Vec<String> = report.scenes.iter().map(|(p, n)| format!("{p}: {n}")).collect();
    println!("  Scenes: {}", scenes.join(", "));
    println!("  Features: {}", report.features.join(", "));
    println!(
        "  Samples: {} of {} requested ({} candidates)",
        report.samples.drawn, report.samples.requested, report.samples.candidates
    );
    match &report.model {
        ModelSummary::Supervised {
            label_field,
            metrics,
            selected,
            feature_importances,
            ..
        } => {
            println!("  Label: quantiles of {label_field}");
            for (name, m) in metrics {
                let mark = if name == selected { " *" } else { "" };
                println!("  {name:<14} accuracy {:.3}  macro F1 {:.3}{mark}", m.accuracy, m.macro_f1);
            }
            if let Some(top) = feature_importances.first() {
                println!("  Top feature: {} ({:.3})", top.feature, top.importance);
            }
        }
        ModelSummary::Unsupervised { k, clusters, inertia, .. } => {
            println!("  K-means: k = {k}, inertia {inertia:.2}");
            for c in clusters {
                let centroid: Vec<String> = c.centroid.iter().map(|(f, v)| format!("{f}={v:.3}")).collect();
                println!("  cluster {} ({} samples): {}", c.cluster, c.size, centroid.join(" "));
            }
        }
    }
    println!("  Outputs: {}", report.outputs.model.parent().unwrap_or(Path::new(".")).display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Studies ──────────────────────────────────────────────────
        Commands::Run {
            modality,
            source,
            overrides,
        } => {
            let modality: Modality = modality.parse()?;
            let config = study_config(&overrides)?;
            let provider = open_provider(&source, &config)?;

            let start = Instant::now();
            let pb = spinner(&format!("Running {modality} study..."));
            let outcome = run_study(modality, provider.as_ref(), &config);
            pb.finish_and_clear();
            let report = outcome.with_context(|| format!("{modality} study failed"))?;
            print_report(&report, start.elapsed());
        }

        Commands::RunAll { source, overrides } => {
            let config = study_config(&overrides)?;
            let provider = open_provider(&source, &config)?;

            let start = Instant::now();
            let pb = spinner("Running all studies...");
            let outcomes = run_all(provider.as_ref(), &config);
            pb.finish_and_clear();

            let mut failed = 0;
            for (modality, outcome) in &outcomes {
                match outcome {
                    Ok(report) => print_report(report, start.elapsed()),
                    Err(e) => {
                        failed += 1;
                        println!("{modality} study failed: {e}");
                    }
                }
            }
            if failed == outcomes.len() {
                anyhow::bail!("all {} studies failed", failed);
            }
        }

        // ── Catalog ──────────────────────────────────────────────────
        Commands::Search {
            collection,
            start,
            end,
            max_cloud,
            source,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let collection: Collection = collection.parse()?;
            let dates = DateRange::parse(&start, &end)?;
            let request = ImageryRequest::new(collection, config.region.clone(), dates).with_filter(SceneFilter {
                max_cloud,
                ..Default::default()
            });

            let pb = spinner("Searching...");
            let rows: Vec<(String, String, Option<f64>)> = if let Some(dir) = &source.archive {
                let archive = LocalArchive::open(dir.clone())
                    .with_context(|| format!("Failed to open archive {}", dir.display()))?;
                archive
                    .matching_scenes(&request)
                    .into_iter()
                    .map(|s| (s.id.clone(), s.date.to_string(), s.cloud_cover))
                    .collect()
            } else {
                let provider = StacProvider::new(
                    StacCatalog::from_str_or_url(&source.stac),
                    StacProviderOptions {
                        cache_dir: source.cache_dir.clone(),
                        retry: config.retry,
                        ..Default::default()
                    },
                )
                .context("Failed to create STAC provider")?;
                provider
                    .search(&request)?
                    .into_iter()
                    .map(|item| {
                        let date = item.date().map_or_else(|| "-".to_string(), |d| d.to_string());
                        (item.id, date, item.properties.eo_cloud_cover)
                    })
                    .collect()
            };
            pb.finish_and_clear();

            println!("{} over {} ({}): {} scenes", collection, config.region.name, dates, rows.len());
            for (id, date, cloud) in rows {
                match cloud {
                    Some(c) => println!("  {date}  {c:>5.1}%  {id}"),
                    None => println!("  {date}      -   {id}"),
                }
            }
        }

        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let raster: Raster<f64> = read_geotiff(&input).context("Failed to read raster")?;
            pb.finish_and_clear();
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}
