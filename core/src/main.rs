//! INS1D: a one-dimensional INS/GPS fusion simulator.
//!
//! Runs a ground-truth trajectory, an INS-only dead-reckoning solution and an INS/GPS
//! Kalman filter side by side, writes the per-step results to CSV, and prints an error
//! comparison. Parameters come from a configuration file (TOML/JSON/YAML), command-line
//! flags, or both (flags override the file).

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info};

use ins1d::sim::{SimulationConfig, run_simulation};

const LONG_ABOUT: &str = "INS1D: a one-dimensional INS/GPS fusion simulator.

A vehicle moves along a single axis. A biased, noisy accelerometer is integrated on its own
(INS only) and, in parallel, fused with sparse GPS position fixes by a linear Kalman filter.
The INS-only error grows quadratically with the accelerometer bias while the fused error
stays bounded by the GPS accuracy.

You can run simulations either by:
  1. Loading all parameters from a configuration file (TOML/JSON/YAML)
  2. Specifying parameters via command-line flags (these override the file)";

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about = "A one-dimensional INS/GPS fusion simulator.", long_about = LONG_ABOUT)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a simulation and write the per-step results to CSV
    Run(RunArgs),
    /// Write the default configuration to a file (format chosen by extension)
    Config {
        /// Output configuration file (.toml, .json, .yaml)
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Configuration file (TOML/JSON/YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output CSV file
    #[arg(short, long)]
    output: PathBuf,

    /// Base time step (s)
    #[arg(long)]
    dt: Option<f64>,

    /// Total simulated time (s)
    #[arg(long)]
    total_time: Option<f64>,

    /// Time between GPS fixes (s)
    #[arg(long)]
    gps_period: Option<f64>,

    /// Accelerometer bias (m/s²)
    #[arg(long, allow_hyphen_values = true)]
    accel_bias: Option<f64>,

    /// Accelerometer noise standard deviation (m/s²)
    #[arg(long)]
    accel_noise_std: Option<f64>,

    /// GPS noise standard deviation (m)
    #[arg(long)]
    gps_noise_std: Option<f64>,

    /// Filter process noise standard deviation (m/s²)
    #[arg(long)]
    process_noise_std: Option<f64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
}

impl RunArgs {
    /// Load the configuration file (or defaults) and apply command-line overrides.
    fn resolve_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)
                .with_context(|| format!("failed to read configuration {}", path.display()))?,
            None => SimulationConfig::default(),
        };
        let overrides = [
            (&mut config.dt, self.dt),
            (&mut config.total_time, self.total_time),
            (&mut config.gps_period, self.gps_period),
            (&mut config.accel_bias, self.accel_bias),
            (&mut config.accel_noise_std, self.accel_noise_std),
            (&mut config.gps_noise_std, self.gps_noise_std),
            (&mut config.process_noise_std, self.process_noise_std),
        ];
        for (field, value) in overrides {
            if let Some(v) = value {
                *field = v;
            }
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }
}

/// Initialize the logger with the specified level and optional file target.
fn init_logger(log_level: &str, log_file: Option<&Path>) -> Result<()> {
    let level = log_level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', defaulting to 'info'", log_level);
        log::LevelFilter::Info
    });

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });

    if let Some(log_path) = log_file {
        create_parent_dir(log_path)?;
        let target = Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?,
        );
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.try_init()?;
    Ok(())
}

/// Create the directory an output file will be written into, if it has one.
fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    let config = args.resolve_config()?;
    config.validate().context("invalid simulation configuration")?;
    let result = run_simulation(&config).context("simulation failed")?;
    create_parent_dir(&args.output)?;
    result
        .write_csv(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(
        "Wrote {} records to {}",
        result.len(),
        args.output.display()
    );
    println!("{}", result.statistics());
    Ok(())
}

fn write_default_config(output: &Path) -> Result<()> {
    create_parent_dir(output)?;
    SimulationConfig::default()
        .to_file(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("Default configuration written to {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(&cli.log_level, cli.log_file.as_deref())?;

    let outcome = match &cli.command {
        Command::Run(args) => run(args),
        Command::Config { output } => write_default_config(output),
    };
    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome
}
