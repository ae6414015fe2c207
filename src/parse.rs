use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::BenchError;
use crate::types::BenchmarkRecord;

/// File-name prefixes of metadata dumps that are never benchmark reports.
pub const DEFAULT_EXCLUDE_PREFIXES: &[&str] = &["perf_", "system_info"];

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*type\s+(.*)$").expect("header pattern"));
static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*bytes").expect("size pattern"));
static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z0-9_\-]+)\s+(.+)$").expect("row pattern"));
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([A-Za-z0-9_\-]+)\s+(\d+)\s+bytes\s+([0-9.]+)k").expect("line pattern")
});

// ---------------------------------------------------------------------------
// Name normalization
// ---------------------------------------------------------------------------

type NameRule = (fn(&str) -> bool, &'static str);

fn is_aes_128(name: &str) -> bool {
    name.contains("aes") && name.contains("128")
}

fn is_aes_256(name: &str) -> bool {
    name.contains("aes") && name.contains("256")
}

fn is_sha256(name: &str) -> bool {
    name.contains("sha256")
}

fn is_sha512(name: &str) -> bool {
    name.contains("sha512")
}

/// Evaluated top to bottom against the lowercased name; first match wins.
const NAME_RULES: &[NameRule] = &[
    (is_aes_128, "AES-128"),
    (is_aes_256, "AES-256"),
    (is_sha256, "SHA256"),
    (is_sha512, "SHA512"),
];

/// Map an algorithm token to its canonical label. Names no rule knows are
/// uppercased and accepted.
pub fn clean_name(name: &str) -> String {
    let lower = name.to_lowercase();
    NAME_RULES
        .iter()
        .find(|(matches, _)| matches(&lower))
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| name.to_uppercase())
}

/// Parse one throughput cell such as `12345.67k`. Anything that is not a
/// finite number becomes `0.0`.
fn parse_rate_cell(cell: &str) -> f64 {
    cell.trim_end_matches(['k', 'K'])
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Grammars
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrammarKind {
    Table,
    PerLine,
}

impl GrammarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrammarKind::Table => "table",
            GrammarKind::PerLine => "per-line",
        }
    }
}

/// A recognizer for one report layout. Implementations are pure.
pub trait Grammar: Sync {
    fn kind(&self) -> GrammarKind;
    fn parse(&self, lines: &[&str]) -> Vec<BenchmarkRecord>;
}

/// `type 16 bytes 64 bytes ...` header followed by one row per algorithm.
pub struct TableStyle;

impl Grammar for TableStyle {
    fn kind(&self) -> GrammarKind {
        GrammarKind::Table
    }

    fn parse(&self, lines: &[&str]) -> Vec<BenchmarkRecord> {
        let mut sizes: Vec<Option<u64>> = Vec::new();
        let mut records = Vec::new();

        for line in lines {
            if let Some(caps) = HEADER_RE.captures(line) {
                sizes = SIZE_RE
                    .captures_iter(&caps[1])
                    .map(|c| c[1].parse::<u64>().ok())
                    .collect();
                continue;
            }

            if sizes.is_empty() {
                continue;
            }

            let Some(caps) = ROW_RE.captures(line) else {
                continue;
            };

            let algorithm = clean_name(&caps[1]);
            for (&size, cell) in sizes.iter().zip(caps[2].split_whitespace()) {
                // Zero or overflowing sizes keep their column but emit nothing.
                let Some(size) = size.filter(|s| *s > 0) else {
                    continue;
                };
                records.push(BenchmarkRecord::from_kilo_rate(
                    algorithm.clone(),
                    size,
                    parse_rate_cell(cell),
                ));
            }
        }

        records
    }
}

/// `<algorithm> <size> bytes <rate>k` on every line.
pub struct PerLineStyle;

impl Grammar for PerLineStyle {
    fn kind(&self) -> GrammarKind {
        GrammarKind::PerLine
    }

    fn parse(&self, lines: &[&str]) -> Vec<BenchmarkRecord> {
        lines
            .iter()
            .filter_map(|line| LINE_RE.captures(line))
            .filter_map(|caps| {
                let size = caps[2].parse::<u64>().ok().filter(|s| *s > 0)?;
                Some(BenchmarkRecord::from_kilo_rate(
                    clean_name(&caps[1]),
                    size,
                    parse_rate_cell(&caps[3]),
                ))
            })
            .collect()
    }
}

/// Recognizers in precedence order. Table style must come first: per-line
/// style also matches stray lines of a table report and would produce a
/// partial record set from a well-formed table.
pub const GRAMMARS: &[&dyn Grammar] = &[&TableStyle, &PerLineStyle];

/// Run the grammars in order and keep the first non-empty result.
pub fn parse_report_lines(lines: &[&str]) -> Option<(GrammarKind, Vec<BenchmarkRecord>)> {
    GRAMMARS.iter().find_map(|grammar| {
        let records = grammar.parse(lines);
        if records.is_empty() {
            None
        } else {
            Some((grammar.kind(), records))
        }
    })
}

pub fn parse_report_text(text: &str) -> Option<(GrammarKind, Vec<BenchmarkRecord>)> {
    let lines: Vec<&str> = text.lines().collect();
    parse_report_lines(&lines)
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub exclude_prefixes: Vec<String>,
    /// Extension (without the dot) of report files picked up from a directory.
    pub extension: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            exclude_prefixes: DEFAULT_EXCLUDE_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            extension: "txt".to_string(),
        }
    }
}

impl ParseOptions {
    pub fn is_excluded(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.exclude_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

/// Outcome for one report file. `grammar` is `None` when neither grammar
/// produced a record.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub grammar: Option<GrammarKind>,
    pub records: Vec<BenchmarkRecord>,
}

/// Parse one report. Returns `Ok(None)` for excluded file names without
/// reading them. Invalid UTF-8 is replaced, not fatal.
pub fn parse_report_file(path: &Path, opts: &ParseOptions) -> Result<Option<ParsedFile>> {
    if opts.is_excluded(path) {
        debug!(path = %path.display(), "skipping excluded report");
        return Ok(None);
    }

    let bytes = std::fs::read(path).map_err(|source| BenchError::ReportReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);

    let (grammar, records) = match parse_report_text(&text) {
        Some((kind, records)) => (Some(kind), records),
        None => {
            warn!(path = %path.display(), "no benchmark records in report");
            (None, Vec::new())
        }
    };

    if let Some(kind) = grammar {
        info!(
            path = %path.display(),
            grammar = kind.as_str(),
            records = records.len(),
            "parsed report"
        );
    }

    Ok(Some(ParsedFile {
        path: path.to_path_buf(),
        grammar,
        records,
    }))
}

/// A report that matched the directory filter but could not be read.
#[derive(Debug, Clone)]
pub struct UnreadableReport {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-file outcomes for one report directory.
#[derive(Debug, Clone, Default)]
pub struct ReportDir {
    pub files: Vec<ParsedFile>,
    pub unreadable: Vec<UnreadableReport>,
}

impl ReportDir {
    pub fn records(&self) -> usize {
        self.files.iter().map(|f| f.records.len()).sum()
    }
}

/// Parse every report in `dir` with the configured extension, in file-name
/// order. Each file is independent: one that cannot be read is logged and
/// listed in [`ReportDir::unreadable`] while the rest are still parsed.
pub fn parse_report_dir(dir: &Path, opts: &ParseOptions) -> Result<ReportDir> {
    let entries = std::fs::read_dir(dir).map_err(|source| BenchError::ReportReadError {
        path: dir.to_path_buf(),
        source,
    })?;

    // Dangling links are kept so they surface as unreadable.
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            !path.is_dir()
                && path.extension().and_then(|e| e.to_str()) == Some(opts.extension.as_str())
        })
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut outcome = ReportDir::default();
    for path in &paths {
        match parse_report_file(path, opts) {
            Ok(Some(file)) => outcome.files.push(file),
            Ok(None) => continue,
            Err(err) => {
                warn!("{err}");
                outcome.unreadable.push(UnreadableReport {
                    path: path.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(outcome)
}
