//! Command-line runner for the spine signalling model
//!
//! Loads an optional YAML configuration, applies command-line overrides,
//! integrates the network and writes the sampled trajectory as CSV.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use rhomyosin::{
    load_network, reference_system, CsvRecorder, Driver, LayeredSystem, RhoGefActivation,
    SamplePolicy, SimulationConfig, Species, N_SPECIES,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Sampling {
    /// Every grid time, interpolated inside steps
    Interpolate,
    /// At most one sample per step, lagging behind the grid
    Lagging,
    /// At most one sample per step, skipping missed grid times
    SkipMissed,
}

impl From<Sampling> for SamplePolicy {
    fn from(s: Sampling) -> Self {
        match s {
            Sampling::Interpolate => SamplePolicy::Interpolate,
            Sampling::Lagging => SamplePolicy::Lagging,
            Sampling::SkipMissed => SamplePolicy::SkipMissed,
        }
    }
}

/// Dendritic spine signalling simulator
#[derive(Parser)]
#[command(name = "rhomyosin", version)]
#[command(about = "Integrate the dendritic-spine signalling network", long_about = None)]
struct Cli {
    /// YAML run configuration (reference values if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trajectory output file
    #[arg(short, long, default_value = "data.csv")]
    output: PathBuf,

    /// Simulation horizon
    #[arg(long)]
    t_end: Option<f64>,

    /// Absolute error tolerance
    #[arg(long)]
    tolerance: Option<f64>,

    /// Spacing of recorded samples
    #[arg(long)]
    sample_interval: Option<f64>,

    /// Sample placement
    #[arg(long, value_enum)]
    sampling: Option<Sampling>,

    /// Saturating RhoGEF activation instead of the recorded denominator
    #[arg(long)]
    rhogef_saturating: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn build_config(cli: &Cli) -> anyhow::Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    if let Some(t_end) = cli.t_end {
        config.integration.t_end = t_end;
    }
    if let Some(tolerance) = cli.tolerance {
        config.integration.tolerance = tolerance;
    }
    if let Some(interval) = cli.sample_interval {
        config.integration.sample_interval = interval;
    }
    if let Some(sampling) = cli.sampling {
        config.integration.sampling = sampling.into();
    }
    if cli.rhogef_saturating {
        config.model.rhogef_activation = RhoGefActivation::Saturating;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn build_system(config: &SimulationConfig) -> anyhow::Result<LayeredSystem<N_SPECIES>> {
    match &config.network {
        Some(path) => {
            let network = load_network(path)
                .with_context(|| format!("loading network {}", path.display()))?;
            log::info!(
                "using network {} ({} layers, {} reactions)",
                path.display(),
                network.layers.len(),
                network.reaction_count()
            );
            network.compile().context("compiling network")
        }
        None => reference_system(&config.model).context("building reference network"),
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = build_config(cli)?;
    let system = build_system(&config)?;
    let x0 = config.initial_state()?;
    let driver = Driver::new(config.integration.clone())?;

    // Open the sink before any integration work
    let mut recorder = CsvRecorder::create(&cli.output)
        .with_context(|| format!("opening output {}", cli.output.display()))?;

    let summary = driver
        .run(&system, &x0, &Species::names(), &mut recorder)
        .context("simulation aborted")?;

    log::info!("trajectory written to {}", cli.output.display());
    println!("{summary}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
