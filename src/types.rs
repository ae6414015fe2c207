use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::errors::BenchError;

/// One normalized measurement: an algorithm at one block size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRecord {
    pub algorithm: String,
    pub block_size_bytes: u64,
    #[serde(rename = "throughput_MBps")]
    pub throughput_mbps: f64,
    pub latency_ns_per_block: f64,
}

impl BenchmarkRecord {
    /// Build a record from a rate reported in kilo-units per second.
    ///
    /// A non-positive rate yields zero throughput and zero latency, so a
    /// zero-throughput record never carries a finite latency.
    pub fn from_kilo_rate(algorithm: String, block_size_bytes: u64, value_k: f64) -> Self {
        let bytes_per_sec = value_k * 1000.0;
        let (throughput_mbps, latency_ns_per_block) = if bytes_per_sec > 0.0 {
            (
                bytes_per_sec / (1024.0 * 1024.0),
                (block_size_bytes as f64 / bytes_per_sec) * 1e9,
            )
        } else {
            (0.0, 0.0)
        };

        BenchmarkRecord {
            algorithm,
            block_size_bytes,
            throughput_mbps,
            latency_ns_per_block,
        }
    }
}

/// Raw timing figures from a probe or a streaming run.
///
/// Throughput and per-call latency are derived on demand and fail with
/// [`BenchError::NoSamples`] (no calls) or [`BenchError::ZeroElapsed`] (the
/// clock did not advance) instead of producing NaN or infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingResult {
    pub setup_latency_s: f64,
    pub op_latency_s: f64,
    pub total_latency_s: f64,
    pub bytes_processed: u64,
    pub call_count: u64,
    pub elapsed_s: f64,
}

impl TimingResult {
    pub fn throughput_bps(&self) -> Result<f64, BenchError> {
        if self.call_count == 0 {
            return Err(BenchError::NoSamples);
        }
        if !(self.elapsed_s > 0.0) {
            return Err(BenchError::ZeroElapsed);
        }
        Ok(self.bytes_processed as f64 / self.elapsed_s)
    }

    pub fn per_call_latency_s(&self) -> Result<f64, BenchError> {
        if self.call_count == 0 {
            return Err(BenchError::NoSamples);
        }
        Ok(self.elapsed_s / self.call_count as f64)
    }
}

/// Experiment phase a power sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Handshake,
    Steady,
    Other,
}

impl Phase {
    /// Anything that is not `handshake` or `steady` lands in `Other`.
    pub fn from_label(label: &str) -> Phase {
        match label.trim().to_ascii_lowercase().as_str() {
            "handshake" => Phase::Handshake,
            "steady" => Phase::Steady,
            _ => Phase::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Handshake => "handshake",
            Phase::Steady => "steady",
            Phase::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerSample {
    pub timestamp_s: f64,
    pub watts: f64,
    pub phase: Phase,
}

/// Result of integrating one phase's power trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyEstimate {
    pub joules: f64,
    pub samples: usize,
    /// False when fewer than two samples were available; `joules` is then 0.0
    /// and must not be read as a measured zero.
    pub sufficient: bool,
}

impl EnergyEstimate {
    pub fn require_sufficient(&self) -> Result<f64, BenchError> {
        if !self.sufficient {
            return Err(BenchError::InsufficientPowerSamples {
                count: self.samples,
            });
        }
        Ok(self.joules)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    pub fn from_label(label: &str) -> Option<Role> {
        match label.trim() {
            "sender" => Some(Role::Sender),
            "receiver" => Some(Role::Receiver),
            _ => None,
        }
    }
}

/// One telemetry row. Cells that were missing or unparseable are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    pub timestamp: Option<DateTime<Utc>>,
    pub role: Role,
    pub fps: Option<f64>,
    pub goodput_mbps: Option<f64>,
    pub latency_ms_p50: Option<f64>,
    pub latency_ms_p95: Option<f64>,
    pub cpu_pct: Option<f64>,
    pub mem_mb: Option<f64>,
    pub temp_c: Option<f64>,
    pub drops: Option<u64>,
    pub tag_fail: Option<u64>,
}

impl TelemetrySample {
    /// Look up a metric by its CSV column name.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "fps" => self.fps,
            "goodput_mbps" => self.goodput_mbps,
            "latency_ms_p50" => self.latency_ms_p50,
            "latency_ms_p95" => self.latency_ms_p95,
            "cpu_pct" => self.cpu_pct,
            "mem_mb" => self.mem_mb,
            "temp_c" => self.temp_c,
            "drops" => self.drops.map(|v| v as f64),
            "tag_fail" => self.tag_fail.map(|v| v as f64),
            _ => None,
        }
    }
}

/// Per-metric means of two experiment arms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub metric: String,
    pub arm_a_mean: Option<f64>,
    pub arm_b_mean: Option<f64>,
}

impl MetricComparison {
    /// `arm_b_mean / arm_a_mean`, undefined when arm A is zero or either arm
    /// has no values.
    pub fn ratio(&self) -> Result<f64, BenchError> {
        match (self.arm_a_mean, self.arm_b_mean) {
            (Some(a), Some(b)) if a != 0.0 => Ok(b / a),
            _ => Err(BenchError::UndefinedRatio {
                metric: self.metric.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub arm_a: String,
    pub arm_b: String,
    /// In the order the metrics were requested.
    pub rows: Vec<MetricComparison>,
}

impl ComparisonSummary {
    pub fn get(&self, metric: &str) -> Option<&MetricComparison> {
        self.rows.iter().find(|row| row.metric == metric)
    }
}

/// Built-in primitives the harness can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum Primitive {
    Sha256,
    Aes256Gcm,
    Aes128Gcm,
}

impl Primitive {
    pub fn label(&self) -> &'static str {
        match self {
            Primitive::Sha256 => "SHA-256",
            Primitive::Aes256Gcm => "AES-256-GCM",
            Primitive::Aes128Gcm => "AES-128-GCM",
        }
    }
}
