use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream, Style};
use serde::Serialize;

use crate::types::{BenchmarkRecord, ComparisonSummary, EnergyEstimate, Phase, TimingResult};

pub const RECORD_HEADER: [&str; 4] = [
    "algorithm",
    "block_size_bytes",
    "throughput_MBps",
    "latency_ns_per_block",
];

/// Destination for computed results. Computation never writes files itself.
pub trait RecordSink {
    fn write_records(&mut self, records: &[BenchmarkRecord]) -> Result<()>;
    fn write_summary(&mut self, summary: &ComparisonSummary) -> Result<()>;
}

/// Writes delimited tables to any `io::Write`.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        CsvSink {
            writer: csv::Writer::from_writer(inner),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))
    }
}

fn optional_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_records(&mut self, records: &[BenchmarkRecord]) -> Result<()> {
        self.writer.write_record(RECORD_HEADER)?;
        for r in records {
            self.writer.write_record([
                r.algorithm.clone(),
                r.block_size_bytes.to_string(),
                r.throughput_mbps.to_string(),
                r.latency_ns_per_block.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Undefined ratios and missing means are written as empty cells.
    fn write_summary(&mut self, summary: &ComparisonSummary) -> Result<()> {
        self.writer.write_record([
            "metric".to_string(),
            format!("{}_mean", summary.arm_a),
            format!("{}_mean", summary.arm_b),
            "ratio".to_string(),
        ])?;
        for row in &summary.rows {
            self.writer.write_record([
                row.metric.clone(),
                optional_cell(row.arm_a_mean),
                optional_cell(row.arm_b_mean),
                optional_cell(row.ratio().ok()),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Human-readable byte rate using decimal prefixes.
pub fn format_bps(bps: f64) -> String {
    if bps >= 1e9 {
        format!("{:.3} GB/s ({:.1} MB/s)", bps / 1e9, bps / 1e6)
    } else if bps >= 1e6 {
        format!("{:.1} MB/s", bps / 1e6)
    } else if bps >= 1e3 {
        format!("{:.1} kB/s", bps / 1e3)
    } else {
        format!("{:.0} B/s", bps)
    }
}

fn micros(secs: f64) -> String {
    format!("{:.2} µs", secs * 1e6)
}

fn style_heading() -> Style {
    Style::new().cyan().bold()
}

fn heading(text: &str) -> String {
    let style = style_heading();
    text.if_supports_color(Stream::Stdout, |s| s.style(style))
        .to_string()
}

fn dim(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |s| s.dimmed())
        .to_string()
}

fn line(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!("{:<22}{}\n", format!("{label}:"), value));
}

/// Text report for one primitive: a one-shot probe and a streaming run.
pub fn format_timing_report(
    label: &str,
    probe: &TimingResult,
    stream: &TimingResult,
    chunk_bytes: usize,
) -> String {
    let mut out = String::new();

    out.push_str(&heading(&format!(
        "== One-shot ({label}, {}-byte message) ==",
        probe.bytes_processed
    )));
    out.push('\n');
    line(&mut out, "setup latency", &micros(probe.setup_latency_s));
    line(
        &mut out,
        "op latency",
        &format!("{}  {}", micros(probe.op_latency_s), dim("(execution time)")),
    );
    line(
        &mut out,
        "total latency",
        &format!("{}  {}", micros(probe.total_latency_s), dim("(setup + op)")),
    );
    let tiny = match probe.throughput_bps() {
        Ok(bps) => format_bps(bps),
        Err(_) => "n/a".to_string(),
    };
    line(
        &mut out,
        "throughput",
        &format!("{tiny}  {}", dim("(tiny payload, unreliable)")),
    );
    out.push('\n');

    out.push_str(&heading(&format!("== Streaming ({label}) ==")));
    out.push('\n');
    line(&mut out, "elapsed", &format!("{:.3} s", stream.elapsed_s));
    line(&mut out, "bytes processed", &stream.bytes_processed.to_string());
    line(&mut out, "calls made", &stream.call_count.to_string());
    match (stream.throughput_bps(), stream.per_call_latency_s()) {
        (Ok(bps), Ok(per_call)) => {
            line(&mut out, "throughput", &format_bps(bps));
            line(
                &mut out,
                "per-call latency",
                &format!("{} per {chunk_bytes}B chunk", micros(per_call)),
            );
        }
        _ => {
            line(&mut out, "throughput", &dim("no samples"));
            line(&mut out, "per-call latency", &dim("no samples"));
        }
    }

    out
}

/// JSON shape of a timing result, with derived figures resolved.
#[derive(Serialize)]
struct JsonTiming<'a> {
    #[serde(flatten)]
    timing: &'a TimingResult,
    throughput_bps: Option<f64>,
    per_call_latency_s: Option<f64>,
}

impl<'a> JsonTiming<'a> {
    fn new(timing: &'a TimingResult) -> Self {
        JsonTiming {
            timing,
            throughput_bps: timing.throughput_bps().ok(),
            per_call_latency_s: timing.per_call_latency_s().ok(),
        }
    }
}

#[derive(Serialize)]
struct JsonBench<'a> {
    primitive: &'a str,
    chunk_bytes: usize,
    one_shot: JsonTiming<'a>,
    one_shot_throughput_reliable: bool,
    streaming: JsonTiming<'a>,
}

pub fn format_timing_json(
    label: &str,
    probe: &TimingResult,
    stream: &TimingResult,
    chunk_bytes: usize,
) -> String {
    let bench = JsonBench {
        primitive: label,
        chunk_bytes,
        one_shot: JsonTiming::new(probe),
        one_shot_throughput_reliable: false,
        streaming: JsonTiming::new(stream),
    };
    serde_json::to_string_pretty(&bench).unwrap_or_else(|_| "{}".to_string())
}

/// One line per phase: name, joules, sample count. Insufficient phases are
/// marked so a 0.0 is never mistaken for a measurement.
pub fn format_energy(estimates: &BTreeMap<Phase, EnergyEstimate>) -> String {
    let mut out = String::new();
    for (phase, est) in estimates {
        if est.sufficient {
            out.push_str(&format!(
                "{:<10} {:>12.3} J  ({} samples)\n",
                phase.as_str(),
                est.joules,
                est.samples
            ));
        } else {
            out.push_str(&format!(
                "{:<10} {:>12}    {}\n",
                phase.as_str(),
                "-",
                dim(&format!("(insufficient samples: {})", est.samples))
            ));
        }
    }
    out
}

#[derive(Serialize)]
struct JsonEnergy {
    phase: Phase,
    joules: Option<f64>,
    samples: usize,
    sufficient: bool,
}

pub fn format_energy_json(estimates: &BTreeMap<Phase, EnergyEstimate>) -> String {
    let rows: Vec<JsonEnergy> = estimates
        .iter()
        .map(|(phase, est)| JsonEnergy {
            phase: *phase,
            joules: est.sufficient.then_some(est.joules),
            samples: est.samples,
            sufficient: est.sufficient,
        })
        .collect();
    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}
