use tracing::debug;

use crate::types::{ComparisonSummary, MetricComparison, TelemetrySample};

/// Metrics compared when none are configured.
pub const DEFAULT_METRICS: &[&str] = &[
    "fps",
    "goodput_mbps",
    "latency_ms_p50",
    "latency_ms_p95",
    "cpu_pct",
    "temp_c",
];

/// Arithmetic mean of the present values; `None` when there are none.
pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Compare two arms metric by metric, keeping the requested metric order.
///
/// Missing values are left out of each mean rather than counted as zero.
/// Ratios are computed on demand by [`MetricComparison::ratio`].
pub fn summarize<S: AsRef<str>>(
    arm_a_name: &str,
    arm_a: &[TelemetrySample],
    arm_b_name: &str,
    arm_b: &[TelemetrySample],
    metrics: &[S],
) -> ComparisonSummary {
    let rows = metrics
        .iter()
        .map(|metric| {
            let metric = metric.as_ref();
            let arm_a_mean = mean(arm_a.iter().map(|s| s.metric(metric)));
            let arm_b_mean = mean(arm_b.iter().map(|s| s.metric(metric)));
            debug!(metric, ?arm_a_mean, ?arm_b_mean, "compared metric");
            MetricComparison {
                metric: metric.to_string(),
                arm_a_mean,
                arm_b_mean,
            }
        })
        .collect();

    ComparisonSummary {
        arm_a: arm_a_name.to_string(),
        arm_b: arm_b_name.to_string(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BenchError;
    use crate::types::Role;

    fn receiver(fps: Option<f64>, cpu: Option<f64>) -> TelemetrySample {
        TelemetrySample {
            timestamp: None,
            role: Role::Receiver,
            fps,
            goodput_mbps: None,
            latency_ms_p50: None,
            latency_ms_p95: None,
            cpu_pct: cpu,
            mem_mb: None,
            temp_c: None,
            drops: Some(2),
            tag_fail: None,
        }
    }

    #[test]
    fn mean_skips_missing() {
        assert_eq!(mean([Some(2.0), None, Some(4.0)]), Some(3.0));
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean([None, None]), None);
        assert_eq!(mean(std::iter::empty()), None);
    }

    #[test]
    fn ratio_of_means() {
        let a = [receiver(Some(4.0), None), receiver(Some(6.0), None)];
        let b = [receiver(Some(10.0), None)];
        let summary = summarize("ECDH", &a, "RSA", &b, &["fps"]);
        let row = summary.get("fps").unwrap();
        assert_eq!(row.arm_a_mean, Some(5.0));
        assert_eq!(row.arm_b_mean, Some(10.0));
        assert_eq!(row.ratio().unwrap(), 2.0);
    }

    #[test]
    fn zero_denominator_is_undefined() {
        let a = [receiver(Some(0.0), None)];
        let b = [receiver(Some(10.0), None)];
        let summary = summarize("A", &a, "B", &b, &["fps"]);
        let err = summary.rows[0].ratio().unwrap_err();
        assert!(matches!(err, BenchError::UndefinedRatio { ref metric } if metric == "fps"));
    }

    #[test]
    fn missing_arm_values_are_undefined() {
        let a = [receiver(Some(1.0), None)];
        let b = [receiver(Some(2.0), Some(50.0))];
        let summary = summarize("A", &a, "B", &b, &["cpu_pct"]);
        assert_eq!(summary.rows[0].arm_a_mean, None);
        assert!(summary.rows[0].ratio().is_err());
    }

    #[test]
    fn metric_order_preserved() {
        let a = [receiver(Some(1.0), Some(1.0))];
        let summary = summarize("A", &a, "B", &a, DEFAULT_METRICS);
        let names: Vec<&str> = summary.rows.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(names, DEFAULT_METRICS);
        assert_eq!(summary.arm_a, "A");
        assert_eq!(summary.arm_b, "B");
    }

    #[test]
    fn counters_are_comparable() {
        let a = [receiver(None, None)];
        let summary = summarize("A", &a, "B", &a, &["drops"]);
        assert_eq!(summary.rows[0].ratio().unwrap(), 1.0);
    }

    #[test]
    fn unknown_metric_has_no_mean() {
        let a = [receiver(Some(1.0), None)];
        let summary = summarize("A", &a, "B", &a, &["bogus"]);
        assert_eq!(summary.rows[0].arm_a_mean, None);
    }
}
