use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::errors::BenchError;
use crate::types::{EnergyEstimate, Phase, PowerSample};

/// Integrate `(timestamp_s, watts)` samples with the trapezoidal rule.
///
/// Samples must already be filtered to one phase and ordered by time. They
/// are not sorted here: a decreasing timestamp is rejected with
/// [`BenchError::NonMonotonicTimestamps`]. Fewer than two samples give a
/// flagged estimate of 0.0 J rather than an error. A NaN or infinite
/// timestamp or wattage is rejected with [`BenchError::NonFiniteSample`].
pub fn integrate(samples: &[(f64, f64)]) -> Result<EnergyEstimate, BenchError> {
    if let Some(index) = samples
        .iter()
        .position(|(t, w)| !t.is_finite() || !w.is_finite())
    {
        return Err(BenchError::NonFiniteSample { index });
    }

    if samples.len() < 2 {
        return Ok(EnergyEstimate {
            joules: 0.0,
            samples: samples.len(),
            sufficient: false,
        });
    }

    let mut joules = 0.0;
    for (i, pair) in samples.windows(2).enumerate() {
        let (t0, w0) = pair[0];
        let (t1, w1) = pair[1];
        let dt = t1 - t0;
        if dt < 0.0 {
            return Err(BenchError::NonMonotonicTimestamps { index: i + 1 });
        }
        joules += 0.5 * (w0 + w1) * dt;
    }

    Ok(EnergyEstimate {
        joules,
        samples: samples.len(),
        sufficient: true,
    })
}

/// Energy per phase. Phases with no samples are absent from the map; phases
/// with a single sample are present but flagged insufficient.
pub fn integrate_by_phase(
    samples: &[PowerSample],
) -> Result<BTreeMap<Phase, EnergyEstimate>, BenchError> {
    let mut by_phase: BTreeMap<Phase, Vec<(f64, f64)>> = BTreeMap::new();
    for s in samples {
        by_phase
            .entry(s.phase)
            .or_default()
            .push((s.timestamp_s, s.watts));
    }

    let mut out = BTreeMap::new();
    for (phase, points) in by_phase {
        let estimate = integrate(&points)?;
        debug!(
            phase = phase.as_str(),
            joules = estimate.joules,
            samples = estimate.samples,
            "integrated phase"
        );
        out.insert(phase, estimate);
    }
    Ok(out)
}

/// Load a power trace with columns `ts`, `watts` and an optional `phase`.
///
/// Rows with a non-numeric timestamp or a negative/non-numeric wattage are
/// dropped. Without a `phase` column every sample is `Other`.
pub fn load_power_csv(path: &Path) -> Result<Vec<PowerSample>> {
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

    let column = |name: &str| headers.iter().position(|h| h == name);
    let ts_idx = column("ts").ok_or_else(|| BenchError::MissingColumn {
        path: path.to_path_buf(),
        column: "ts".into(),
    })?;
    let watts_idx = column("watts").ok_or_else(|| BenchError::MissingColumn {
        path: path.to_path_buf(),
        column: "watts".into(),
    })?;
    let phase_idx = column("phase");

    let mut samples = Vec::new();
    let mut dropped = 0usize;

    for record in reader.records() {
        let Ok(record) = record else {
            dropped += 1;
            continue;
        };

        let timestamp_s = record
            .get(ts_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite());
        let watts = record
            .get(watts_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0);

        let (Some(timestamp_s), Some(watts)) = (timestamp_s, watts) else {
            dropped += 1;
            continue;
        };

        let phase = phase_idx
            .and_then(|i| record.get(i))
            .map(Phase::from_label)
            .unwrap_or(Phase::Other);

        samples.push(PowerSample {
            timestamp_s,
            watts,
            phase,
        });
    }

    if dropped > 0 {
        debug!(path = %path.display(), dropped, "dropped unparseable power rows");
    }

    Ok(samples)
}
