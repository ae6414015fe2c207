use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use crate::compare::DEFAULT_METRICS;
use crate::errors::BenchError;
use crate::parse::ParseOptions;
use crate::timing::{DEFAULT_CHUNK_BYTES, DEFAULT_PROBE_MESSAGE, DEFAULT_STREAM_SECS};

/// Settings read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub stream: StreamConfig,
    pub probe: ProbeConfig,
    pub parse: ParseConfig,
    pub compare: CompareConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    pub duration_secs: f64,
    pub chunk_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            duration_secs: DEFAULT_STREAM_SECS,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub message: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            message: String::from_utf8_lossy(DEFAULT_PROBE_MESSAGE).into_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseConfig {
    pub exclude_prefixes: Vec<String>,
    pub extension: String,
}

impl Default for ParseConfig {
    fn default() -> Self {
        let opts = ParseOptions::default();
        ParseConfig {
            exclude_prefixes: opts.exclude_prefixes,
            extension: opts.extension,
        }
    }
}

impl ParseConfig {
    pub fn options(&self) -> ParseOptions {
        ParseOptions {
            exclude_prefixes: self.exclude_prefixes.clone(),
            extension: self.extension.trim_start_matches('.').to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareConfig {
    pub arm_a: String,
    pub arm_b: String,
    pub metrics: Vec<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        CompareConfig {
            arm_a: "ECDH".to_string(),
            arm_b: "RSA".to_string(),
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl StreamConfig {
    /// Stream duration, rejecting negative or non-finite values.
    pub fn duration(&self) -> Result<Duration, BenchError> {
        Duration::try_from_secs_f64(self.duration_secs).map_err(|_| BenchError::InvalidDuration {
            secs: self.duration_secs,
        })
    }
}

/// Default config location: `<config dir>/cryptobench/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cryptobench").join("config.toml"))
}

pub fn parse_config(text: &str, path: &Path) -> Result<Config, BenchError> {
    toml::from_str(text).map_err(|e| BenchError::ConfigError {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Load `explicit` if given (it must exist), else the default location if it
/// exists, else built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) if p.is_file() => p,
            _ => {
                debug!("no config file; using defaults");
                return Ok(Config::default());
            }
        },
    };

    let text = std::fs::read_to_string(&path).map_err(|e| BenchError::ConfigError {
        path: path.clone(),
        detail: e.to_string(),
    })?;
    debug!(path = %path.display(), "loaded config");
    Ok(parse_config(&text, &path)?)
}
