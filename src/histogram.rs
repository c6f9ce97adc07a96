//! # Histogram Summary Parsing
//!
//! Parses the text dump of an HDR histogram written by the load-test harness
//! at the end of a run. The dump is a percentile table followed by summary
//! marker lines and, optionally, the storage footprint reported by the
//! server:
//!
//! ```text
//!        Value     Percentile TotalCount 1/(1-Percentile)
//!
//!      120.000 0.500000000000      50000           2.00
//!      980.000 0.990000000000      99000         100.00
//! #[Mean    =      180.123, StdDeviation   =       95.456]
//! #[Max     =     4096.000, Total count    =       100000]
//! Database size: Total: 1234.56 MB
//! INDEX size: Total: 78.90 MB
//! ```
//!
//! ## Line Classification
//!
//! Each line is classified exactly once, in a single pass:
//!
//! - `#[Mean ...` and `#[Max ...` summary markers
//! - `Database size:` and `INDEX size:` storage lines
//! - any other `#` line is a comment and ignored
//! - three or more whitespace-separated tokens form a percentile row
//! - everything else is ignored
//!
//! A percentile row whose tokens do not parse is skipped and reported as a
//! [`ExtractError::MalformedDataLine`]; the column header line of the dump
//! lands here too.

use crate::defaults::PERCENTILE_TOLERANCE;
use crate::error::{ExtractError, Parsed};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::trace;

/// One row of the percentile table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentilePoint {
    pub value_us: f64,
    pub percentile: f64,
    pub count: u64,
}

/// Percentile to latency mapping with tolerance-matched lookup
///
/// Rows are kept in file order. When the same percentile appears more than
/// once, the last row wins for exact lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PercentileTable {
    points: Vec<PercentilePoint>,
}

impl PercentileTable {
    pub fn from_points(points: Vec<PercentilePoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[PercentilePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Latency at `percentile` (a fraction in (0, 1))
    ///
    /// An exact match is preferred. Otherwise the closest recorded
    /// percentile is used, but only when it lies within
    /// [`PERCENTILE_TOLERANCE`] of the request; anything further away
    /// yields `None`.
    pub fn lookup(&self, percentile: f64) -> Option<f64> {
        if let Some(point) = self.points.iter().rev().find(|p| p.percentile == percentile) {
            return Some(point.value_us);
        }

        let mut closest: Option<&PercentilePoint> = None;
        let mut min_diff = f64::INFINITY;
        for point in &self.points {
            let diff = (point.percentile - percentile).abs();
            if diff < min_diff {
                min_diff = diff;
                closest = Some(point);
            }
        }

        match closest {
            Some(point) if min_diff <= PERCENTILE_TOLERANCE => Some(point.value_us),
            _ => None,
        }
    }
}

/// Latencies at the percentiles every report shows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyPercentiles {
    pub p50: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub p99_9: Option<f64>,
    pub p99_99: Option<f64>,
}

impl KeyPercentiles {
    pub fn from_table(table: &PercentileTable) -> Self {
        Self {
            p50: table.lookup(0.5),
            p90: table.lookup(0.9),
            p95: table.lookup(0.95),
            p99: table.lookup(0.99),
            p99_9: table.lookup(0.999),
            p99_99: table.lookup(0.9999),
        }
    }
}

/// Everything extracted from one histogram file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub max: Option<f64>,
    pub total_count: Option<u64>,
    pub db_size_mb: Option<f64>,
    pub index_size_mb: Option<f64>,
    pub key_percentiles: KeyPercentiles,
    pub percentile_table: PercentileTable,
}

fn mean_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Mean\s+=\s+([0-9.]+),\s+StdDeviation\s+=\s+([0-9.]+)")
            .expect("mean pattern is valid")
    })
}

fn max_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Max\s+=\s+([0-9.]+),\s+Total count\s+=\s+([0-9]+)")
            .expect("max pattern is valid")
    })
}

fn storage_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Total:\s*([0-9.]+)\s*MB").expect("storage pattern is valid"))
}

fn parse_float(text: &str, line_number: usize, what: &str) -> Result<f64, ExtractError> {
    let value = text
        .parse::<f64>()
        .map_err(|e| ExtractError::malformed_line(line_number, format!("invalid {} {:?}: {}", what, text, e)))?;
    // JSON has no encoding for inf or NaN
    if !value.is_finite() {
        return Err(ExtractError::malformed_line(
            line_number,
            format!("non-finite {} {:?}", what, text),
        ));
    }
    Ok(value)
}

/// Scalar from a summary capture, `None` unless finite
fn finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_percentile_row(tokens: &[&str], line_number: usize) -> Result<PercentilePoint, ExtractError> {
    let value_us = parse_float(tokens[0], line_number, "latency value")?;
    let percentile = parse_float(tokens[1], line_number, "percentile")?;
    let count = tokens[2].parse::<u64>().map_err(|e| {
        ExtractError::malformed_line(line_number, format!("invalid count {:?}: {}", tokens[2], e))
    })?;
    Ok(PercentilePoint {
        value_us,
        percentile,
        count,
    })
}

impl HistogramSummary {
    /// Parse the full text of a histogram file
    ///
    /// Never fails as a whole: unusable lines are reported in
    /// [`Parsed::issues`] and parsing continues.
    pub fn parse(text: &str) -> Parsed<HistogramSummary> {
        let mut summary = HistogramSummary::default();
        let mut points = Vec::new();
        let mut issues = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with("#[Mean") {
                match mean_pattern().captures(line) {
                    Some(caps) => {
                        summary.mean = finite(&caps[1]);
                        summary.std_dev = finite(&caps[2]);
                    }
                    None => issues.push(ExtractError::malformed_line(line_number, "unreadable mean line")),
                }
            } else if line.starts_with("#[Max") {
                match max_pattern().captures(line) {
                    Some(caps) => {
                        summary.max = finite(&caps[1]);
                        summary.total_count = caps[2].parse().ok();
                    }
                    None => issues.push(ExtractError::malformed_line(line_number, "unreadable max line")),
                }
            } else if line.starts_with('#') {
                continue;
            } else if line.starts_with("Database size:") {
                summary.db_size_mb = storage_pattern().captures(line).and_then(|c| finite(&c[1]));
            } else if line.starts_with("INDEX size:") {
                summary.index_size_mb = storage_pattern().captures(line).and_then(|c| finite(&c[1]));
            } else {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                if tokens.len() < 3 {
                    continue;
                }
                match parse_percentile_row(&tokens, line_number) {
                    Ok(point) => points.push(point),
                    Err(e) => {
                        trace!("Skipping histogram row: {}", e);
                        issues.push(e);
                    }
                }
            }
        }

        summary.percentile_table = PercentileTable::from_points(points);
        summary.key_percentiles = KeyPercentiles::from_table(&summary.percentile_table);
        Parsed::new(summary, issues)
    }

    /// Latency at an arbitrary percentile, with tolerance matching
    pub fn percentile(&self, percentile: f64) -> Option<f64> {
        self.percentile_table.lookup(percentile)
    }
}
