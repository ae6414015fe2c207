use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cryptobench::compare;
use cryptobench::config::{self, Config};
use cryptobench::energy;
use cryptobench::parse;
use cryptobench::report::{self, CsvSink, RecordSink};
use cryptobench::telemetry;
use cryptobench::timing;
use cryptobench::types::{BenchmarkRecord, Primitive};

#[derive(Parser)]
#[command(
    name = "cryptobench",
    version,
    about = "Measure crypto primitives, normalize benchmark reports, integrate power traces"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: <config dir>/cryptobench/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One-shot latency probe plus a fixed-duration streaming run
    Bench {
        #[arg(short, long, value_enum, default_value = "sha256")]
        primitive: Primitive,

        /// Minimum streaming time in seconds
        #[arg(short, long)]
        duration: Option<f64>,

        /// Chunk size in bytes fed to each streaming call
        #[arg(short, long)]
        chunk: Option<usize>,

        /// Payload for the one-shot probe
        #[arg(short, long)]
        message: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Normalize a directory of benchmark text reports into one CSV table
    Parse {
        dir: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Integrate a power trace (ts, watts[, phase]) into Joules per phase
    Energy {
        csv: PathBuf,

        #[arg(long)]
        json: bool,
    },
    /// Compare receiver telemetry of two experiment arms
    Compare {
        arm_a: PathBuf,
        arm_b: PathBuf,

        /// Label for the first arm in the summary header
        #[arg(long = "arm-a")]
        arm_a_name: Option<String>,

        /// Label for the second arm in the summary header
        #[arg(long = "arm-b")]
        arm_b_name: Option<String>,

        /// Metric column to compare (repeatable)
        #[arg(long = "metric")]
        metrics: Vec<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p)
                .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", p.display(), e))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}

fn run_bench(
    cfg: &Config,
    primitive: Primitive,
    duration: Option<f64>,
    chunk: Option<usize>,
    message: Option<String>,
    json: bool,
) -> Result<()> {
    let mut stream_cfg = cfg.stream.clone();
    if let Some(secs) = duration {
        stream_cfg.duration_secs = secs;
    }
    if let Some(bytes) = chunk {
        stream_cfg.chunk_bytes = bytes;
    }
    let duration = stream_cfg.duration()?;
    let message = message.unwrap_or_else(|| cfg.probe.message.clone());

    let probe = timing::probe_primitive(primitive, message.as_bytes())?;
    let stream = timing::stream_primitive(primitive, stream_cfg.chunk_bytes, duration)?;
    info!(
        primitive = primitive.label(),
        calls = stream.timing.call_count,
        output = %hex::encode(&stream.output),
        "benchmark finished"
    );

    let output = if json {
        report::format_timing_json(
            primitive.label(),
            &probe.timing,
            &stream.timing,
            stream_cfg.chunk_bytes,
        )
    } else {
        report::format_timing_report(
            primitive.label(),
            &probe.timing,
            &stream.timing,
            stream_cfg.chunk_bytes,
        )
    };
    println!("{}", output.trim_end());

    if stream.timing.call_count == 0 {
        return Err(cryptobench::errors::BenchError::NoSamples.into());
    }
    Ok(())
}

fn run_parse(cfg: &Config, dir: &Path, output: Option<&Path>) -> Result<()> {
    let opts = cfg.parse.options();
    let outcome = parse::parse_report_dir(dir, &opts)?;

    for skipped in &outcome.unreadable {
        eprintln!("Skipped {}: {}", skipped.path.display(), skipped.reason);
    }

    let mut empty = 0usize;
    for file in &outcome.files {
        if file.records.is_empty() {
            empty += 1;
            eprintln!("No benchmark records found in {}", file.path.display());
        }
    }
    let unreadable = outcome.unreadable.len();

    let records: Vec<BenchmarkRecord> = outcome
        .files
        .into_iter()
        .flat_map(|f| f.records)
        .collect();
    if records.is_empty() {
        anyhow::bail!("No benchmark records found under {}", dir.display());
    }

    let mut sink = CsvSink::new(open_output(output)?);
    sink.write_records(&records)?;
    sink.into_inner()?.flush()?;

    if let Some(path) = output {
        eprintln!("Wrote {} with {} rows", path.display(), records.len());
    }

    if empty > 0 || unreadable > 0 {
        anyhow::bail!(
            "{} report file(s) produced no records, {} could not be read",
            empty,
            unreadable
        );
    }
    Ok(())
}

fn run_energy(csv: &Path, json: bool) -> Result<()> {
    let samples = energy::load_power_csv(csv)?;
    let estimates = energy::integrate_by_phase(&samples)?;

    if json {
        println!("{}", report::format_energy_json(&estimates));
    } else {
        print!("{}", report::format_energy(&estimates));
    }

    if !estimates.values().any(|e| e.sufficient) {
        anyhow::bail!(
            "No phase in {} has enough power samples to integrate",
            csv.display()
        );
    }
    Ok(())
}

fn run_compare(
    cfg: &Config,
    arm_a: &Path,
    arm_b: &Path,
    arm_a_name: Option<String>,
    arm_b_name: Option<String>,
    metrics: Vec<String>,
    output: Option<&Path>,
) -> Result<()> {
    let a = telemetry::load_telemetry_csv(arm_a)?;
    let b = telemetry::load_telemetry_csv(arm_b)?;
    info!(arm_a = a.len(), arm_b = b.len(), "receiver samples loaded");

    let arm_a_name = arm_a_name.unwrap_or_else(|| cfg.compare.arm_a.clone());
    let arm_b_name = arm_b_name.unwrap_or_else(|| cfg.compare.arm_b.clone());
    let metrics = if metrics.is_empty() {
        cfg.compare.metrics.clone()
    } else {
        metrics
    };

    let summary = compare::summarize(&arm_a_name, &a, &arm_b_name, &b, &metrics);

    let mut sink = CsvSink::new(open_output(output)?);
    sink.write_summary(&summary)?;
    sink.into_inner()?.flush()?;

    let mut undefined = 0usize;
    for row in &summary.rows {
        if let Err(err) = row.ratio() {
            undefined += 1;
            eprintln!("{}", err);
        }
    }

    if undefined > 0 {
        anyhow::bail!("{} of {} ratio(s) undefined", undefined, summary.rows.len());
    }
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Bench {
            primitive,
            duration,
            chunk,
            message,
            json,
        } => run_bench(&cfg, primitive, duration, chunk, message, json),
        Command::Parse { dir, output } => run_parse(&cfg, &dir, output.as_deref()),
        Command::Energy { csv, json } => run_energy(&csv, json),
        Command::Compare {
            arm_a,
            arm_b,
            arm_a_name,
            arm_b_name,
            metrics,
            output,
        } => run_compare(
            &cfg,
            &arm_a,
            &arm_b,
            arm_a_name,
            arm_b_name,
            metrics,
            output.as_deref(),
        ),
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}
