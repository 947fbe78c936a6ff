use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tire_knock::analysis::{PressureEstimator, PressureResult};
use tire_knock::audio::{PcmSource, SyntheticKnock};
use tire_knock::calibration::CalibrationPoint;
use tire_knock::config::AppConfig;
use tire_knock::engine::{
    run_until_complete, CycleReport, MeasurementSession, StubTimeSource, SystemTimeSource,
    TimeSource,
};

#[derive(Parser, Debug)]
#[command(
    name = "knock_cli",
    about = "Estimate tire pressure from a recorded or synthetic knock"
)]
struct Cli {
    /// Configuration file (defaults to assets/knock_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log pipeline details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one measurement cycle and print a JSON report
    Measure(MeasureArgs),
    /// Classify a knock frequency directly
    ///
    /// The frequency is rounded to whole Hz first when the configuration
    /// asks for it, exactly as a measured knock would be.
    Classify {
        #[arg(long)]
        hz: f32,
    },
    /// Print the calibration table in use
    Table,
    /// Render a synthetic knock to a WAV file at the configured sample rate
    Synth {
        #[arg(long)]
        hz: f32,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1500)]
        knock_at_ms: u64,
    },
}

#[derive(Args, Debug)]
struct MeasureArgs {
    /// Mono or multi-channel WAV recording of the knock
    #[arg(long, conflicts_with = "synthetic_hz", required_unless_present = "synthetic_hz")]
    wav: Option<PathBuf>,
    /// Generate a knock with this fundamental instead of reading a file
    #[arg(long)]
    synthetic_hz: Option<f32>,
    /// Onset of the synthetic knock
    #[arg(long, default_value_t = 1500)]
    knock_at_ms: u64,
    /// Replay at wall-clock speed instead of stepping the clock
    #[arg(long)]
    realtime: bool,
}

fn main() -> ExitCode {
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
    if cli.verbose {
        tire_knock::init_logging_with_level(tracing::Level::DEBUG);
    } else {
        tire_knock::init_logging_with_level(tracing::Level::WARN);
    }

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    config.validate().context("validating configuration")?;

    match cli.command {
        Commands::Measure(args) => run_measure(&config, args),
        Commands::Classify { hz } => run_classify(&config, hz),
        Commands::Table => run_table(&config),
        Commands::Synth {
            hz,
            out,
            knock_at_ms,
        } => run_synth(&config, hz, out, knock_at_ms),
    }
}

fn run_measure(config: &AppConfig, args: MeasureArgs) -> Result<ExitCode> {
    let (label, source) = match (&args.wav, args.synthetic_hz) {
        (Some(path), _) => {
            let source = PcmSource::from_wav(path, &config.audio)
                .with_context(|| format!("loading {}", path.display()))?;
            (path.display().to_string(), source)
        }
        (None, Some(hz)) => {
            let knock = SyntheticKnock::new(hz)
                .with_sample_rate(config.audio.sample_rate)
                .with_knock_at(args.knock_at_ms);
            let samples = knock.render();
            (
                format!("synthetic {} Hz @ {} ms", hz, args.knock_at_ms),
                PcmSource::new(samples, config.audio.sample_rate, &config.audio),
            )
        }
        (None, None) => bail!("either --wav or --synthetic-hz is required"),
    };

    let max_duration = Duration::from_millis(source.duration_ms());
    let tick_interval = Duration::from_millis(config.audio.tick_interval_ms);
    let mut session = MeasurementSession::new(config, source).context("creating session")?;

    let clock: Box<dyn TimeSource> = if args.realtime {
        Box::new(SystemTimeSource::default())
    } else {
        Box::new(StubTimeSource::new())
    };

    let cycle = run_until_complete(&mut session, clock.as_ref(), tick_interval, max_duration)
        .with_context(|| format!("measuring {}", label))?;

    let measured = cycle.result.is_some();
    emit_json(&MeasureReport {
        source: &label,
        display: cycle.result.as_ref().map(PressureResult::to_string),
        cycle: &cycle,
    })?;

    Ok(if measured {
        ExitCode::from(0)
    } else {
        ExitCode::from(2)
    })
}

fn run_classify(config: &AppConfig, hz: f32) -> Result<ExitCode> {
    let estimator = PressureEstimator::from_config(&config.pressure)?;
    let result = estimator
        .classify_measured(hz)
        .with_context(|| format!("classifying {} Hz", hz))?;

    emit_json(&ClassifyReport {
        display: result.to_string(),
        result,
    })?;
    Ok(ExitCode::from(0))
}

fn run_table(config: &AppConfig) -> Result<ExitCode> {
    emit_json(&TableReport {
        point_count: config.pressure.table.len(),
        points: &config.pressure.table,
    })?;
    Ok(ExitCode::from(0))
}

fn run_synth(config: &AppConfig, hz: f32, out: PathBuf, knock_at_ms: u64) -> Result<ExitCode> {
    if let Some(parent) = out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    SyntheticKnock::new(hz)
        .with_sample_rate(config.audio.sample_rate)
        .with_knock_at(knock_at_ms)
        .write_wav(&out)
        .with_context(|| format!("writing {}", out.display()))?;

    println!("{}", out.display());
    Ok(ExitCode::from(0))
}

fn emit_json<T: Serialize>(report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

#[derive(Serialize)]
struct MeasureReport<'a> {
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display: Option<String>,
    #[serde(flatten)]
    cycle: &'a CycleReport,
}

#[derive(Serialize)]
struct ClassifyReport {
    display: String,
    #[serde(flatten)]
    result: PressureResult,
}

#[derive(Serialize)]
struct TableReport<'a> {
    point_count: usize,
    points: &'a [CalibrationPoint],
}
