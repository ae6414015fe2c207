use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("Streaming benchmark made no calls; throughput and per-call latency are undefined")]
    NoSamples,

    #[error("Measured interval is zero; throughput is undefined at this clock resolution")]
    ZeroElapsed,

    #[error("{primitive} operation failed: {detail}")]
    OperationFailed {
        primitive: &'static str,
        detail: String,
    },

    #[error("Energy integration needs at least 2 power samples, got {count}")]
    InsufficientPowerSamples { count: usize },

    #[error("Power sample timestamps decrease at index {index}; samples must be sorted by time")]
    NonMonotonicTimestamps { index: usize },

    #[error("Power sample {index} has a non-finite timestamp or wattage")]
    NonFiniteSample { index: usize },

    #[error("Ratio for metric '{metric}' is undefined (arm A mean is zero or missing)")]
    UndefinedRatio { metric: String },

    #[error("Failed to read report file {path}: {source}")]
    ReportReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read CSV {path}: {detail}")]
    CsvError { path: PathBuf, detail: String },

    #[error("CSV {path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Invalid stream duration {secs}s; expected a finite, non-negative number")]
    InvalidDuration { secs: f64 },

    #[error("Invalid config file {path}: {detail}")]
    ConfigError { path: PathBuf, detail: String },
}
