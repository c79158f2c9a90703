use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dichoptic_psychophysics::calibration::{verify_betas, CalibrationTarget, Polynomial, DEFAULT_DEGREE};
use dichoptic_psychophysics::config::ExperimentConfig;
use dichoptic_psychophysics::error::ErrorCode;
use dichoptic_psychophysics::staircase::{StaircaseEngine, StaircaseSettings};
use dichoptic_psychophysics::storage::ParticipantStore;
use dichoptic_psychophysics::testing::SimulatedObserver;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "dichoptic_cli",
    about = "Offline tools for dichoptic calibration and staircase runs"
)]
struct Cli {
    /// Experiment configuration JSON (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the dual staircase against a simulated observer
    SimulateStaircase {
        #[arg(long, default_value_t = 0.3)]
        threshold: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Probability of an inverted answer on each trial
        #[arg(long, default_value_t = 0.0)]
        lapse: f64,
        /// Give up after this many trials
        #[arg(long, default_value_t = 10_000)]
        max_trials: usize,
        /// Write the full staircase report here
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fit a gain polynomial to a calibration table ({"level": beta, ...})
    FitCalibration {
        #[arg(long)]
        table: PathBuf,
        #[arg(long, default_value_t = DEFAULT_DEGREE)]
        degree: usize,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print a participant's persisted polynomial
    ShowPolynomial {
        #[arg(long)]
        data_root: PathBuf,
        #[arg(long)]
        participant: String,
        /// DCF_colors or background
        #[arg(long, default_value = "DCF_colors")]
        target: String,
    },
    /// Print the effective configuration as JSON
    DumpConfig,
    /// Strictly parse and validate the configuration file
    ValidateConfig,
}

fn main() -> ExitCode {
    // Reports go to stdout, logs stay on stderr
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::SimulateStaircase {
            threshold,
            seed,
            lapse,
            max_trials,
            output,
        } => {
            let config = load_config(cli.config)?;
            run_simulate(&config, threshold, seed, lapse, max_trials, output)
        }
        Commands::FitCalibration {
            table,
            degree,
            output,
        } => {
            let config = load_config(cli.config)?;
            run_fit(&config, table, degree, output)
        }
        Commands::ShowPolynomial {
            data_root,
            participant,
            target,
        } => run_show_polynomial(data_root, &participant, &target),
        Commands::DumpConfig => {
            let config = load_config(cli.config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
        Commands::ValidateConfig => run_validate(cli.config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<ExperimentConfig> {
    match path {
        Some(path) => Ok(ExperimentConfig::load_from_file(path)),
        None => Ok(ExperimentConfig::default()),
    }
}

#[derive(Serialize)]
struct SimulationSummary {
    converged: bool,
    threshold: Option<f64>,
    trials: usize,
    swiss_estimate: Option<f64>,
    dutch_estimate: Option<f64>,
}

fn run_simulate(
    config: &ExperimentConfig,
    threshold: f64,
    seed: u64,
    lapse: f64,
    max_trials: usize,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let settings = StaircaseSettings::from_config(&config.staircase, &config.contrast);
    let mut engine = StaircaseEngine::new(settings).context("building staircase")?;
    let observer = SimulatedObserver::new(threshold).with_lapse_rate(lapse);

    let mut picker = StdRng::seed_from_u64(seed);
    let mut answers = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut trials = 0usize;

    let outcome = engine.run_until_converged(&mut picker, |pick| {
        if trials >= max_trials {
            return Err(trials);
        }
        trials += 1;
        Ok(observer.respond(pick.alpha, &mut answers))
    });

    let report = engine.report();
    let summary = SimulationSummary {
        converged: outcome.is_ok(),
        threshold: outcome.ok(),
        trials: report.history.len(),
        swiss_estimate: report.swiss_estimate,
        dutch_estimate: report.dutch_estimate,
    };

    if let Some(path) = output {
        fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.converged {
        Ok(ExitCode::from(0))
    } else {
        eprintln!("Staircase did not converge within {} trials", max_trials);
        Ok(ExitCode::from(2))
    }
}

#[derive(Serialize)]
struct FitPayload<'a> {
    levels: usize,
    coefficients: &'a [f64],
    fitted: BTreeMap<usize, f64>,
}

fn run_fit(
    config: &ExperimentConfig,
    table: PathBuf,
    degree: usize,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let contents =
        fs::read_to_string(&table).with_context(|| format!("reading {}", table.display()))?;
    let raw: BTreeMap<usize, f64> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing calibration table {}", table.display()))?;

    let (alphas, betas): (Vec<f64>, Vec<f64>) = raw
        .iter()
        .map(|(&level, &beta)| (config.contrast.alpha_for_level(level), beta))
        .unzip();
    let polynomial = Polynomial::fit(&alphas, &betas, degree)?;

    let payload = FitPayload {
        levels: raw.len(),
        coefficients: polynomial.coefficients(),
        fitted: raw
            .keys()
            .map(|&level| (level, polynomial.evaluate(config.contrast.alpha_for_level(level))))
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    if let Err(err) = verify_betas(&raw, &polynomial, &config.contrast) {
        eprintln!("Calibration rejected ({}): {}", err.code(), err.message());
        return Ok(ExitCode::from(2));
    }

    if let Some(path) = output {
        fs::write(&path, serde_json::to_string_pretty(&polynomial)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(ExitCode::from(0))
}

fn run_show_polynomial(data_root: PathBuf, participant: &str, target: &str) -> Result<ExitCode> {
    let target: CalibrationTarget = target.parse()?;
    let store = ParticipantStore::open(&data_root, participant)?;
    let polynomial = store
        .load_polynomial(target)
        .with_context(|| format!("loading {} polynomial for {}", target, participant))?;
    println!("{}", serde_json::to_string_pretty(&polynomial)?);
    Ok(ExitCode::from(0))
}

fn run_validate(path: Option<PathBuf>) -> Result<ExitCode> {
    let Some(path) = path else {
        bail!("validate-config needs --config <path>");
    };

    let result = ExperimentConfig::from_file(&path).and_then(|config| config.validate());
    match result {
        Ok(()) => {
            println!("{}: ok", path.display());
            Ok(ExitCode::from(0))
        }
        Err(err) => {
            eprintln!("{}: error {}: {}", path.display(), err.code(), err.message());
            Ok(ExitCode::from(2))
        }
    }
}
