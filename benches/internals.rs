use std::fs;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tempfile::TempDir;

use cryptobench::compare;
use cryptobench::energy;
use cryptobench::parse::{self, ParseOptions};
use cryptobench::types::{Role, TelemetrySample};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ALGORITHMS: &[&str] = &[
    "aes-128-gcm",
    "aes-256-gcm",
    "aes-128-cbc",
    "sha256",
    "sha512",
    "chacha20-poly1305",
];

const SIZES: &[u64] = &[16, 64, 256, 1024, 8192, 16384];

/// An `openssl speed` style table with a short preamble.
fn table_report() -> String {
    let mut out = String::from(
        "version: 3.0.2\nThe 'numbers' are in 1000s of bytes per second processed.\ntype",
    );
    for size in SIZES {
        out.push_str(&format!(" {:>8} bytes", size));
    }
    out.push('\n');
    for (i, algo) in ALGORITHMS.iter().enumerate() {
        out.push_str(&format!("{:<18}", algo));
        for (j, _) in SIZES.iter().enumerate() {
            out.push_str(&format!(" {:>12.2}k", 1000.0 * (i + 1) as f64 * (j + 1) as f64));
        }
        out.push('\n');
    }
    out
}

fn per_line_report() -> String {
    let mut out = String::new();
    for (i, algo) in ALGORITHMS.iter().enumerate() {
        for size in SIZES {
            out.push_str(&format!("{algo} {size} bytes {:.2}k\n", 500.0 * (i + 1) as f64));
        }
    }
    out
}

/// A directory of `count` reports alternating between the two grammars, plus
/// one excluded file.
fn setup_report_dir(count: usize) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let table = table_report();
    let per_line = per_line_report();
    for i in 0..count {
        let body = if i % 2 == 0 { &table } else { &per_line };
        fs::write(tmp.path().join(format!("report_{i:04}.txt")), body).unwrap();
    }
    fs::write(tmp.path().join("perf_stat.txt"), &per_line).unwrap();
    tmp
}

/// Power trace at 10 Hz with a slow ramp.
fn power_trace(len: usize) -> Vec<(f64, f64)> {
    (0..len)
        .map(|i| (i as f64 * 0.1, 20.0 + (i % 50) as f64 * 0.2))
        .collect()
}

fn receiver(i: usize) -> TelemetrySample {
    TelemetrySample {
        timestamp: None,
        role: Role::Receiver,
        fps: Some(30.0 + (i % 7) as f64),
        goodput_mbps: Some(12.5),
        latency_ms_p50: Some(4.0 + (i % 3) as f64),
        latency_ms_p95: Some(9.0),
        cpu_pct: Some(40.0),
        mem_mb: Some(512.0),
        temp_c: if i % 4 == 0 { None } else { Some(55.0) },
        drops: Some(0),
        tag_fail: Some(0),
    }
}

// ---------------------------------------------------------------------------
// Benchmarks: parse
// ---------------------------------------------------------------------------

fn bench_clean_name(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean_name");
    for name in ["aes-128-gcm", "sha512", "chacha20-poly1305"] {
        group.bench_with_input(BenchmarkId::new("name", name), name, |b, n| {
            b.iter(|| parse::clean_name(black_box(n)));
        });
    }
    group.finish();
}

fn bench_parse_report_text(c: &mut Criterion) {
    let table = table_report();
    let per_line = per_line_report();

    let mut group = c.benchmark_group("parse_report_text");
    group.bench_function("table", |b| {
        b.iter(|| parse::parse_report_text(black_box(&table)));
    });
    group.bench_function("per_line", |b| {
        b.iter(|| parse::parse_report_text(black_box(&per_line)));
    });
    group.finish();
}

fn bench_parse_report_dir(c: &mut Criterion) {
    let opts = ParseOptions::default();
    let mut group = c.benchmark_group("parse_report_dir");

    for &count in &[4, 32, 128] {
        let dir = setup_report_dir(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| parse::parse_report_dir(dir.path(), &opts).unwrap());
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmarks: energy
// ---------------------------------------------------------------------------

fn bench_integrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrate");
    for &len in &[100, 10_000, 1_000_000] {
        let trace = power_trace(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &trace, |b, t| {
            b.iter(|| energy::integrate(black_box(t)).unwrap());
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmarks: compare
// ---------------------------------------------------------------------------

fn bench_summarize(c: &mut Criterion) {
    let arm_a: Vec<TelemetrySample> = (0..5_000).map(receiver).collect();
    let arm_b: Vec<TelemetrySample> = (0..5_000).map(|i| receiver(i + 3)).collect();

    c.bench_function("summarize_default_metrics", |b| {
        b.iter(|| {
            compare::summarize(
                "ECDH",
                black_box(&arm_a),
                "RSA",
                black_box(&arm_b),
                compare::DEFAULT_METRICS,
            )
        });
    });
}

// ---------------------------------------------------------------------------
// Criterion groups
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_clean_name,
    bench_parse_report_text,
    bench_parse_report_dir,
    bench_integrate,
    bench_summarize,
);
criterion_main!(benches);
