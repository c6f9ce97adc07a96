//! # Histogram and Log Correlation
//!
//! Joins the static histogram summary of each run with the aggregate of its
//! per-second log, producing one [`SummaryRow`] per configuration found in
//! both sources. The join is an exact inner join on [`ConfigKey`]; keys seen
//! on only one side are listed in the [`Correlation`] so callers can report
//! them, and stay available in the per-source record sets.

use crate::aggregator::LogAggregate;
use crate::histogram::HistogramSummary;
use crate::identifier::ConfigKey;
use crate::utils::round2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One correlated row of the summary table
///
/// Latencies are in microseconds. Scalars missing from the histogram file
/// default to zero; the percentile columns read straight from the histogram
/// table stay optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub percentage: u32,
    pub last_percentage: Option<u32>,
    pub size_bytes: u64,
    pub size_kb: f64,
    pub threads: u32,
    pub avg_tps: f64,
    pub max_tps: f64,
    pub min_tps: f64,
    pub avg_p50_us: f64,
    pub min_p50_us: f64,
    pub max_p50_us: f64,
    pub avg_p90_us: f64,
    pub min_p90_us: f64,
    pub max_p90_us: f64,
    pub avg_p99_us: f64,
    pub min_p99_us: f64,
    pub max_p99_us: f64,
    pub avg_p99_9_us: f64,
    pub mean_latency_us: f64,
    pub max_latency_us: f64,
    pub std_dev_us: f64,
    pub total_count: u64,
    pub db_size_mb: f64,
    pub index_size_mb: f64,
    pub hdr_p50_us: Option<f64>,
    pub hdr_p90_us: Option<f64>,
    pub hdr_p99_us: Option<f64>,
    pub hdr_p99_9_us: Option<f64>,
    pub hdr_p99_99_us: Option<f64>,
}

impl SummaryRow {
    pub fn new(key: &ConfigKey, histogram: &HistogramSummary, aggregate: &LogAggregate) -> Self {
        let latency = &aggregate.latency;
        let percentiles = &histogram.key_percentiles;
        Self {
            percentage: key.fill_percentage,
            last_percentage: key.last_fill_percentage,
            size_bytes: key.record_size_bytes,
            size_kb: key.size_kb(),
            threads: key.thread_count,
            avg_tps: aggregate.avg_tps,
            max_tps: aggregate.max_tps,
            min_tps: aggregate.min_tps,
            avg_p50_us: latency.p50.avg,
            min_p50_us: latency.p50.min,
            max_p50_us: latency.p50.max,
            avg_p90_us: latency.p90.avg,
            min_p90_us: latency.p90.min,
            max_p90_us: latency.p90.max,
            avg_p99_us: latency.p99.avg,
            min_p99_us: latency.p99.min,
            max_p99_us: latency.p99.max,
            avg_p99_9_us: latency.p99_9.avg,
            mean_latency_us: histogram.mean.unwrap_or(0.0),
            max_latency_us: histogram.max.unwrap_or(0.0),
            std_dev_us: histogram.std_dev.unwrap_or(0.0),
            total_count: histogram.total_count.unwrap_or(0),
            db_size_mb: histogram.db_size_mb.unwrap_or(0.0),
            index_size_mb: histogram.index_size_mb.unwrap_or(0.0),
            hdr_p50_us: percentiles.p50,
            hdr_p90_us: percentiles.p90,
            hdr_p99_us: percentiles.p99,
            hdr_p99_9_us: percentiles.p99_9,
            hdr_p99_99_us: percentiles.p99_99,
        }
    }

    pub fn key(&self) -> ConfigKey {
        let key = ConfigKey::new(self.percentage, self.size_bytes, self.threads);
        match self.last_percentage {
            Some(last) => key.with_last_fill(last),
            None => key,
        }
    }

    /// Copy with the derived averages rounded to two decimals for tabular output
    pub fn rounded(&self) -> Self {
        Self {
            avg_tps: round2(self.avg_tps),
            avg_p50_us: round2(self.avg_p50_us),
            avg_p90_us: round2(self.avg_p90_us),
            avg_p99_us: round2(self.avg_p99_us),
            avg_p99_9_us: round2(self.avg_p99_9_us),
            mean_latency_us: round2(self.mean_latency_us),
            std_dev_us: round2(self.std_dev_us),
            ..self.clone()
        }
    }
}

/// Result of joining the two sources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub rows: Vec<SummaryRow>,
    pub histogram_only: Vec<ConfigKey>,
    pub log_only: Vec<ConfigKey>,
}

/// Inner-join histogram summaries with log aggregates on exact key equality
///
/// Rows come out in key order.
pub fn correlate(
    histograms: &BTreeMap<ConfigKey, &HistogramSummary>,
    aggregates: &BTreeMap<ConfigKey, &LogAggregate>,
) -> Correlation {
    let mut correlation = Correlation::default();

    for (key, aggregate) in aggregates {
        match histograms.get(key) {
            Some(histogram) => correlation.rows.push(SummaryRow::new(key, histogram, aggregate)),
            None => correlation.log_only.push(*key),
        }
    }

    correlation.histogram_only = histograms
        .keys()
        .filter(|key| !aggregates.contains_key(key))
        .copied()
        .collect();

    correlation
}
