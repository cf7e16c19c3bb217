//! ripley CLI - Spatial point-pattern clustering analysis.
//!
//! Reads event coordinates from a CSV export, estimates their intensity and
//! tests them for clustering against Monte Carlo CSR envelopes.
#![allow(
    clippy::uninlined_format_args,
    clippy::too_many_lines,
    clippy::struct_excessive_bools
)]

use clap::{Args, Parser, Subcommand, ValueEnum};
use ripley_algorithms::{run_analysis, CsrSimulator, Intensity, KernelDensityEstimator};
use ripley_core::config::{
    AnalysisConfig, EdgeCorrection, KdeConfig, Kernel, NullModel, SimulationConfig,
};
use ripley_core::curve::Statistic;
use ripley_core::pattern::PointPattern;
use ripley_core::projection::Projection;
use ripley_core::window::ObservationWindow;
use ripley_core::PointSetBuilder;
use ripley_io::{CoordinateReader, ResultWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    RipleyIo(#[from] ripley_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] ripley_core::Error),

    #[error("Config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Smoothing kernel selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum KernelArg {
    /// Gaussian kernel truncated at the cutoff
    Gaussian,
    /// Quartic (biweight) kernel
    Quartic,
}

impl From<KernelArg> for Kernel {
    fn from(arg: KernelArg) -> Self {
        match arg {
            KernelArg::Gaussian => Kernel::Gaussian,
            KernelArg::Quartic => Kernel::Quartic,
        }
    }
}

/// K-function edge correction selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CorrectionArg {
    /// No correction
    None,
    /// Ripley's isotropic correction
    Isotropic,
    /// Translation correction
    Translation,
}

impl From<CorrectionArg> for EdgeCorrection {
    fn from(arg: CorrectionArg) -> Self {
        match arg {
            CorrectionArg::None => EdgeCorrection::None,
            CorrectionArg::Isotropic => EdgeCorrection::Isotropic,
            CorrectionArg::Translation => EdgeCorrection::Translation,
        }
    }
}

/// Reported statistic selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatisticArg {
    /// Ripley's K
    K,
    /// Besag's L
    L,
}

impl From<StatisticArg> for Statistic {
    fn from(arg: StatisticArg) -> Self {
        match arg {
            StatisticArg::K => Statistic::K,
            StatisticArg::L => Statistic::L,
        }
    }
}

/// Null model selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum NullModelArg {
    /// Homogeneous Poisson at the observed rate
    Homogeneous,
    /// Inhomogeneous Poisson following the KDE surface
    Inhomogeneous,
}

impl From<NullModelArg> for NullModel {
    fn from(arg: NullModelArg) -> Self {
        match arg {
            NullModelArg::Homogeneous => NullModel::Homogeneous,
            NullModelArg::Inhomogeneous => NullModel::Inhomogeneous,
        }
    }
}

/// Spatial point-pattern clustering analysis.
#[derive(Parser)]
#[command(name = "ripley")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Worker threads (defaults to one per core)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// Options for reading and projecting coordinates.
#[derive(Args, Debug)]
struct InputArgs {
    /// Input CSV file with a header row
    input: PathBuf,

    /// Longitude column name
    #[arg(long, default_value = "Longitude")]
    lon_column: String,

    /// Latitude column name
    #[arg(long, default_value = "Latitude")]
    lat_column: String,

    /// Target projection as an EPSG code (2263 or UTM 326xx/327xx)
    #[arg(long)]
    epsg: Option<u32>,

    /// Treat the coordinate columns as planar x/y and skip projection
    #[arg(long, conflicts_with = "epsg")]
    planar: bool,

    /// Margin added around the bounding box of the points
    #[arg(long)]
    padding: Option<f64>,
}

/// Kernel density options.
#[derive(Args, Debug)]
struct KdeArgs {
    /// KDE bandwidth sigma (projected units)
    #[arg(long)]
    bandwidth: Option<f64>,

    /// Grid cells along the longer window side
    #[arg(long)]
    resolution: Option<usize>,

    /// Smoothing kernel
    #[arg(long, value_enum)]
    kernel: Option<KernelArg>,

    /// Keep kernel mass that falls outside the window (no edge correction)
    #[arg(long)]
    no_kde_edge_correction: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full clustering analysis
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        kde: KdeArgs,

        /// JSON file with an analysis configuration; flags override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of simulated CSR patterns
        #[arg(short = 'n', long)]
        simulations: Option<usize>,

        /// Master seed for the simulations
        #[arg(long)]
        seed: Option<u64>,

        /// Null model for the simulations
        #[arg(long, value_enum)]
        null_model: Option<NullModelArg>,

        /// Envelope rank k
        #[arg(long)]
        rank: Option<usize>,

        /// Largest K-function distance
        #[arg(long)]
        r_max: Option<f64>,

        /// Number of distance steps
        #[arg(long)]
        steps: Option<usize>,

        /// K-function edge correction
        #[arg(long, value_enum)]
        edge_correction: Option<CorrectionArg>,

        /// Reported statistic (L unless set in the config file)
        #[arg(long, value_enum)]
        statistic: Option<StatisticArg>,

        /// Distances below this are ignored by the verdict
        #[arg(long)]
        min_distance: Option<f64>,

        /// Minimum contiguous steps outside the envelope
        #[arg(long)]
        min_run: Option<usize>,

        /// Output directory
        #[arg(short, long, default_value = "ripley-out")]
        output_dir: PathBuf,

        /// Also write all simulated patterns
        #[arg(long)]
        write_simulations: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Estimate the intensity surface only
    Density {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        kde: KdeArgs,

        /// Output CSV file
        #[arg(short, long, default_value = "surface.csv")]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Generate CSR patterns in a rectangular window
    Simulate {
        /// Window left edge
        #[arg(long)]
        xmin: f64,
        /// Window right edge
        #[arg(long)]
        xmax: f64,
        /// Window bottom edge
        #[arg(long)]
        ymin: f64,
        /// Window top edge
        #[arg(long)]
        ymax: f64,

        /// Homogeneous intensity (points per unit area)
        #[arg(long)]
        intensity: f64,

        /// Number of patterns
        #[arg(short = 'n', long, default_value = "1")]
        simulations: usize,

        /// Master seed
        #[arg(long)]
        seed: Option<u64>,

        /// Exact number of points per pattern
        #[arg(long)]
        fixed_count: Option<usize>,

        /// Output CSV file
        #[arg(short, long, default_value = "simulations.csv")]
        output: PathBuf,
    },
}

fn projection_for(input: &InputArgs, fallback: Projection) -> Result<Projection> {
    if input.planar {
        return Ok(Projection::Identity);
    }
    match input.epsg {
        Some(code) => Ok(Projection::from_epsg(code)?),
        None => Ok(fallback),
    }
}

fn apply_kde_args(mut kde: KdeConfig, args: &KdeArgs) -> KdeConfig {
    if let Some(bandwidth) = args.bandwidth {
        kde = kde.with_bandwidth(bandwidth);
    }
    if let Some(resolution) = args.resolution {
        kde = kde.with_resolution(resolution);
    }
    if let Some(kernel) = args.kernel {
        kde = kde.with_kernel(kernel.into());
    }
    if args.no_kde_edge_correction {
        kde = kde.with_edge_correction(false);
    }
    kde
}

fn load_pattern(
    input: &InputArgs,
    projection: Projection,
    padding: f64,
    verbose: bool,
) -> Result<PointPattern> {
    let reader = CoordinateReader::new().with_columns(&input.lon_column, &input.lat_column);
    let (coords, summary) = reader.read_path(&input.input)?;
    if verbose {
        eprintln!("Reading: {}", input.input.display());
        eprintln!(
            "  {} rows, {} kept, {} skipped",
            summary.rows, summary.kept, summary.skipped
        );
        eprintln!("Projection: {} ({})", projection, projection.units());
    }
    let pattern = PointSetBuilder::new(projection)
        .with_padding(padding)
        .build(&coords)?;
    if verbose {
        let w = pattern.window();
        eprintln!(
            "Window: x [{:.1}, {:.1}], y [{:.1}, {:.1}], area {:.4e}",
            w.xmin(),
            w.xmax(),
            w.ymin(),
            w.ymax(),
            w.area()
        );
    }
    Ok(pattern)
}

fn write_file<F>(path: &Path, verbose: bool, write: F) -> Result<()>
where
    F: FnOnce(&mut ResultWriter) -> ripley_io::Result<()>,
{
    let mut writer = ResultWriter::create(path)?;
    write(&mut writer)?;
    if verbose {
        eprintln!("Wrote: {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    match cli.command {
        Commands::Analyze {
            input,
            kde,
            config,
            simulations,
            seed,
            null_model,
            rank,
            r_max,
            steps,
            edge_correction,
            statistic,
            min_distance,
            min_run,
            output_dir,
            write_simulations,
            verbose,
        } => {
            let mut cfg = match &config {
                Some(path) => {
                    let text = std::fs::read_to_string(path)?;
                    serde_json::from_str::<AnalysisConfig>(&text)?
                }
                None => {
                    let mut cfg = AnalysisConfig::default();
                    cfg.kfunction.statistic = Statistic::L;
                    cfg
                }
            };

            cfg.projection = projection_for(&input, cfg.projection)?;
            if let Some(padding) = input.padding {
                cfg.padding = padding;
            }
            cfg.kde = apply_kde_args(cfg.kde, &kde);
            if let Some(n) = simulations {
                cfg.simulation.repetitions = n;
            }
            if let Some(seed) = seed {
                cfg.simulation.seed = Some(seed);
            }
            if let Some(model) = null_model {
                cfg.null_model = model.into();
            }
            if let Some(rank) = rank {
                cfg.envelope.rank = rank;
            }
            if let Some(r_max) = r_max {
                cfg.kfunction.r_max = Some(r_max);
            }
            if let Some(steps) = steps {
                cfg.kfunction.steps = steps;
            }
            if let Some(correction) = edge_correction {
                cfg.kfunction.edge_correction = correction.into();
            }
            if let Some(statistic) = statistic {
                cfg.kfunction.statistic = statistic.into();
            }
            if let Some(distance) = min_distance {
                cfg.envelope.min_distance = distance;
            }
            if let Some(steps) = min_run {
                cfg.envelope.min_run = steps;
            }
            cfg.validate()?;

            if verbose {
                if let Some(path) = &config {
                    eprintln!("Config: {}", path.display());
                }
                eprintln!("Bandwidth: {}", cfg.kde.bandwidth);
                eprintln!("Simulations: {}", cfg.simulation.repetitions);
                eprintln!("Null model: {:?}", cfg.null_model);
                eprintln!("Edge correction: {:?}", cfg.kfunction.edge_correction);
            }

            let start = Instant::now();
            let pattern = load_pattern(&input, cfg.projection, cfg.padding, verbose)?;
            let report = run_analysis(&pattern, &cfg)?;

            std::fs::create_dir_all(&output_dir)?;
            write_file(&output_dir.join("surface.csv"), verbose, |w| {
                w.write_surface_csv(&report.surface)
            })?;
            write_file(&output_dir.join("curves.csv"), verbose, |w| {
                w.write_curves_csv(&report.test)
            })?;
            write_file(&output_dir.join("report.json"), verbose, |w| {
                w.write_report_json(&report, &cfg)
            })?;
            if write_simulations {
                write_file(&output_dir.join("points.csv"), verbose, |w| {
                    w.write_points_csv(&report.pattern)
                })?;
                write_file(&output_dir.join("simulations.csv"), verbose, |w| {
                    w.write_patterns_csv(report.simulations.patterns())
                })?;
            }

            let stats = &report.statistics;
            let test = &report.test;
            if verbose {
                eprintln!("  KDE: {:.3}s", stats.kde_seconds);
                eprintln!("  Simulation: {:.3}s", stats.simulation_seconds);
                eprintln!("  Envelope test: {:.3}s", stats.test_seconds);
            }

            println!(
                "Analyzed {} points in {:.2}s",
                stats.observed_points,
                start.elapsed().as_secs_f64()
            );
            println!(
                "Simulations: {} (seed {}, mean {:.1} points)",
                stats.simulations, stats.seed, stats.mean_simulated_points
            );
            if let Some(run) = test.longest_above() {
                println!(
                    "Above envelope: r {:.1} - {:.1} ({} steps)",
                    run.r_start, run.r_end, run.steps
                );
            }
            if let Some(run) = test.longest_below() {
                println!(
                    "Below envelope: r {:.1} - {:.1} ({} steps)",
                    run.r_start, run.r_end, run.steps
                );
            }
            println!(
                "Pointwise p-value at r = {:.1}: {:.4}",
                test.reference_distance, test.p_value
            );
            println!("MAD test p-value: {:.4}", test.mad_p_value);
            println!("Verdict: {}", test.verdict);
        }

        Commands::Density {
            input,
            kde,
            output,
            verbose,
        } => {
            let projection = projection_for(&input, Projection::default())?;
            let pattern = load_pattern(&input, projection, input.padding.unwrap_or(0.0), verbose)?;
            let config = apply_kde_args(KdeConfig::default(), &kde);

            let start = Instant::now();
            let surface = KernelDensityEstimator::new(config).estimate(&pattern)?;
            write_file(&output, verbose, |w| w.write_surface_csv(&surface))?;

            println!(
                "Estimated {}x{} surface from {} points in {:.2}s",
                surface.cols(),
                surface.rows(),
                pattern.len(),
                start.elapsed().as_secs_f64()
            );
            println!("Peak intensity: {:.6e}", surface.max());
            println!("Integral: {:.2}", surface.integral());
        }

        Commands::Simulate {
            xmin,
            xmax,
            ymin,
            ymax,
            intensity,
            simulations,
            seed,
            fixed_count,
            output,
        } => {
            let window = ObservationWindow::new(xmin, xmax, ymin, ymax)?;
            let mut config = SimulationConfig::new().with_repetitions(simulations);
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if let Some(count) = fixed_count {
                config = config.with_fixed_count(count);
            }

            let set = CsrSimulator::new(config).simulate(&window, Intensity::Uniform(intensity))?;
            write_file(&output, false, |w| w.write_patterns_csv(set.patterns()))?;

            println!(
                "Generated {} patterns (seed {}, mean {:.1} points)",
                set.len(),
                set.seed(),
                set.mean_count()
            );
        }
    }

    Ok(())
}
