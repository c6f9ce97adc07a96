//! # Sample Aggregation
//!
//! Reduces the per-second samples of one log into the scalar summary that
//! reports and charts display.
//!
//! Throughput statistics cover every sample. Latency statistics cover only
//! the stable window: the samples left after discarding the first
//! [`WARMUP_SAMPLES`], or all of them when the run is that short. A sample
//! without a given latency field is left out of that field's statistics
//! instead of counting as zero, and a field with no values at all reports
//! zeros.

use crate::defaults::WARMUP_SAMPLES;
use crate::log_stream::Sample;
use crate::utils::calculate_stats;
use serde::{Deserialize, Serialize};

/// Average, minimum and maximum of one field
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl FieldStats {
    pub fn from_values(values: &[f64]) -> Self {
        let (avg, min, max, _) = calculate_stats(values);
        Self { avg, min, max }
    }
}

/// Latency statistics over the stable window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyAggregate {
    pub p50: FieldStats,
    pub p90: FieldStats,
    pub p99: FieldStats,
    pub p99_9: FieldStats,
}

/// Scalar summary of one log record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LogAggregate {
    pub avg_tps: f64,
    pub min_tps: f64,
    pub max_tps: f64,
    pub sample_count: usize,
    pub stable_window_len: usize,
    pub latency: LatencyAggregate,
}

/// Samples used for latency statistics
pub fn stable_window(samples: &[Sample]) -> &[Sample] {
    if samples.len() > WARMUP_SAMPLES {
        &samples[WARMUP_SAMPLES..]
    } else {
        samples
    }
}

fn collect_field<F>(samples: &[Sample], field: F) -> Vec<f64>
where
    F: Fn(&Sample) -> Option<u64>,
{
    samples.iter().filter_map(field).map(|v| v as f64).collect()
}

/// Reduce an ordered sample sequence to its summary statistics
pub fn aggregate(samples: &[Sample]) -> LogAggregate {
    let throughput: Vec<f64> = samples.iter().map(|s| s.throughput as f64).collect();
    let tps = FieldStats::from_values(&throughput);

    let window = stable_window(samples);
    let latency = LatencyAggregate {
        p50: FieldStats::from_values(&collect_field(window, |s| s.p50)),
        p90: FieldStats::from_values(&collect_field(window, |s| s.p90)),
        p99: FieldStats::from_values(&collect_field(window, |s| s.p99)),
        p99_9: FieldStats::from_values(&collect_field(window, |s| s.p99_9)),
    };

    LogAggregate {
        avg_tps: tps.avg,
        min_tps: tps.min,
        max_tps: tps.max,
        sample_count: samples.len(),
        stable_window_len: window.len(),
        latency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(throughput: u64, p99: Option<u64>) -> Sample {
        Sample {
            throughput,
            p50: p99.map(|v| v / 2),
            p99,
            ..Sample::default()
        }
    }

    #[test]
    fn test_warmup_is_excluded_from_latency() {
        let mut samples: Vec<Sample> = (0..10).map(|_| sample(100, Some(10))).collect();
        samples.extend([20, 22, 24, 26, 28].iter().map(|&p| sample(200, Some(p))));

        let agg = aggregate(&samples);
        assert_eq!(agg.sample_count, 15);
        assert_eq!(agg.stable_window_len, 5);
        assert_eq!(agg.latency.p99.avg, 24.0);
        assert_eq!(agg.latency.p99.min, 20.0);
        assert_eq!(agg.latency.p99.max, 28.0);

        // Throughput covers the warm-up too
        assert!((agg.avg_tps - 2000.0 / 15.0).abs() < 1e-9);
        assert_eq!(agg.min_tps, 100.0);
        assert_eq!(agg.max_tps, 200.0);
    }

    #[test]
    fn test_short_run_uses_every_sample() {
        let samples: Vec<Sample> = [10, 20, 30].iter().map(|&p| sample(50, Some(p))).collect();
        let agg = aggregate(&samples);
        assert_eq!(agg.stable_window_len, 3);
        assert_eq!(agg.latency.p99.avg, 20.0);

        let ten: Vec<Sample> = (0..10).map(|i| sample(1, Some(i))).collect();
        assert_eq!(stable_window(&ten).len(), 10);
    }

    #[test]
    fn test_missing_fields_are_excluded_not_zeroed() {
        let samples = vec![sample(10, Some(100)), sample(10, None), sample(10, Some(300))];
        let agg = aggregate(&samples);
        assert_eq!(agg.latency.p99.avg, 200.0);
        assert_eq!(agg.latency.p99.min, 100.0);
        assert_eq!(agg.latency.p90, FieldStats::default());
    }

    #[test]
    fn test_empty_input_defaults_to_zero() {
        let agg = aggregate(&[]);
        assert_eq!(agg, LogAggregate::default());
    }
}
