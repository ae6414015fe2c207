use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::BenchError;
use crate::types::{Role, TelemetrySample};

/// Epoch values above this are nanoseconds, not seconds.
const NANOS_THRESHOLD: f64 = 1e12;

/// Normalize a telemetry timestamp to a UTC instant.
///
/// Accepts numeric epoch seconds or nanoseconds (values above `1e12`), with
/// an optional trailing `Z`. RFC 3339 strings are accepted as well. Anything
/// else yields `None` instead of failing the row.
pub fn normalize_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let numeric = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    if let Ok(mut secs) = numeric.parse::<f64>() {
        if !secs.is_finite() {
            return None;
        }
        if secs > NANOS_THRESHOLD {
            secs /= 1e9;
        }
        let whole = secs.floor();
        let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
        return DateTime::from_timestamp(whole as i64, nanos);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_float(cell: Option<&str>) -> Option<f64> {
    cell?.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Counters are sometimes written as `3.0`; accept any non-negative integral value.
fn parse_count(cell: Option<&str>) -> Option<u64> {
    let cell = cell?;
    if let Ok(v) = cell.parse::<u64>() {
        return Some(v);
    }
    let v = parse_float(Some(cell))?;
    if v >= 0.0 && v.fract() == 0.0 {
        Some(v as u64)
    } else {
        None
    }
}

struct Columns {
    ts: usize,
    role: usize,
    fps: Option<usize>,
    goodput_mbps: Option<usize>,
    latency_ms_p50: Option<usize>,
    latency_ms_p95: Option<usize>,
    cpu_pct: Option<usize>,
    mem_mb: Option<usize>,
    temp_c: Option<usize>,
    drops: Option<usize>,
    tag_fail: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord, path: &Path) -> Result<Columns, BenchError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let missing = |column: &str| BenchError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        };

        Ok(Columns {
            ts: find("ts")
                .or_else(|| find("timestamp"))
                .ok_or_else(|| missing("ts|timestamp"))?,
            role: find("role").ok_or_else(|| missing("role"))?,
            fps: find("fps"),
            goodput_mbps: find("goodput_mbps"),
            latency_ms_p50: find("latency_ms_p50"),
            latency_ms_p95: find("latency_ms_p95"),
            cpu_pct: find("cpu_pct"),
            mem_mb: find("mem_mb"),
            temp_c: find("temp_c"),
            drops: find("drops"),
            tag_fail: find("tag_fail"),
        })
    }
}

/// Load a telemetry CSV and keep only receiver rows.
///
/// The timestamp column is `ts` when present, otherwise `timestamp`. Cells
/// that fail to parse become `None` and are excluded from later means.
pub fn load_telemetry_csv(path: &Path) -> Result<Vec<TelemetrySample>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| BenchError::CsvError {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let headers = reader
        .headers()
        .map_err(|e| BenchError::CsvError {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?
        .clone();
    let cols = Columns::locate(&headers, path)?;

    let mut samples = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let Ok(record) = record else {
            skipped += 1;
            continue;
        };

        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i));

        let Some(role) = record.get(cols.role).and_then(Role::from_label) else {
            skipped += 1;
            continue;
        };

        samples.push(TelemetrySample {
            timestamp: record.get(cols.ts).and_then(normalize_timestamp),
            role,
            fps: parse_float(cell(cols.fps)),
            goodput_mbps: parse_float(cell(cols.goodput_mbps)),
            latency_ms_p50: parse_float(cell(cols.latency_ms_p50)),
            latency_ms_p95: parse_float(cell(cols.latency_ms_p95)),
            cpu_pct: parse_float(cell(cols.cpu_pct)),
            mem_mb: parse_float(cell(cols.mem_mb)),
            temp_c: parse_float(cell(cols.temp_c)),
            drops: parse_count(cell(cols.drops)),
            tag_fail: parse_count(cell(cols.tag_fail)),
        });
    }

    let total = samples.len();
    let receivers = receivers_only(samples);
    debug!(
        path = %path.display(),
        receivers = receivers.len(),
        senders = total - receivers.len(),
        skipped,
        "loaded telemetry"
    );

    Ok(receivers)
}

/// Only receiver-side rows count toward comparisons.
pub fn receivers_only(samples: Vec<TelemetrySample>) -> Vec<TelemetrySample> {
    samples
        .into_iter()
        .filter(|s| s.role == Role::Receiver)
        .collect()
}
