use crate::{
    aggregator::LogAggregate,
    correlator::SummaryRow,
    histogram::HistogramSummary,
    identifier::{ConfigKey, Identifier, Workload},
    log_stream::{LogRecord, Sample},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Histogram-derived record of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramEntry {
    pub source_file: String,
    pub params: Identifier,
    pub summary: HistogramSummary,
}

/// Log-derived record of one run with its aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub source_file: String,
    pub params: Identifier,
    pub record: LogRecord,
    pub aggregate: LogAggregate,
}

/// One sample flattened for per-second charts
///
/// Numeric fields the log did not carry are written as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub percentage: u32,
    pub last_percentage: Option<u32>,
    pub size_kb: f64,
    pub threads: u32,
    pub timestamp: String,
    pub seconds: u64,
    pub tps: u64,
    pub hits: u64,
    pub misses: u64,
    pub timeouts: u64,
    pub errors: u64,
    pub min_latency: u64,
    pub max_latency: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p99_9: u64,
    pub p99_99: u64,
}

impl TimeSeriesRow {
    pub fn new(key: &ConfigKey, sample: &Sample) -> Self {
        Self {
            percentage: key.fill_percentage,
            last_percentage: key.last_fill_percentage,
            size_kb: key.size_kb(),
            threads: key.thread_count,
            timestamp: sample.timestamp.clone(),
            seconds: sample.elapsed_seconds.unwrap_or(0),
            tps: sample.throughput,
            hits: sample.hit_count.unwrap_or(0),
            misses: sample.miss_count.unwrap_or(0),
            timeouts: sample.timeout_count.unwrap_or(0),
            errors: sample.error_count.unwrap_or(0),
            min_latency: sample.min_latency.unwrap_or(0),
            max_latency: sample.max_latency.unwrap_or(0),
            p50: sample.p50.unwrap_or(0),
            p90: sample.p90.unwrap_or(0),
            p99: sample.p99.unwrap_or(0),
            p99_9: sample.p99_9.unwrap_or(0),
            p99_99: sample.p99_99.unwrap_or(0),
        }
    }
}

/// A file the batch could not use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// Extraction metadata for reproducibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub workload: Workload,
    pub histogram_files: usize,
    pub log_files: usize,
    pub skipped_files: Vec<SkippedFile>,
    pub skipped_lines: usize,
}

/// Complete output of one extraction pass
///
/// Per-source maps are keyed by the stringified [`ConfigKey`]
/// (e.g. `50pct_1024B_thr20`) and keep every parsed run, joined or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResults {
    pub metadata: ExtractionMetadata,
    pub histogram_data: BTreeMap<String, HistogramEntry>,
    pub log_data: BTreeMap<String, LogEntry>,
    pub summary: Vec<SummaryRow>,
    pub histogram_only: Vec<String>,
    pub log_only: Vec<String>,
}

impl ExtractionResults {
    /// Every sample of every log, in key then file order
    pub fn time_series(&self) -> Vec<TimeSeriesRow> {
        self.log_data
            .values()
            .flat_map(|entry| {
                let key = entry.params.key;
                entry
                    .record
                    .samples
                    .iter()
                    .map(move |sample| TimeSeriesRow::new(&key, sample))
            })
            .collect()
    }

    /// Summary row with the highest peak throughput
    pub fn best_throughput(&self) -> Option<&SummaryRow> {
        self.summary.iter().max_by(|a, b| a.max_tps.total_cmp(&b.max_tps))
    }

    /// Summary row with the lowest average p99 latency
    pub fn lowest_p99(&self) -> Option<&SummaryRow> {
        self.summary.iter().min_by(|a, b| a.avg_p99_us.total_cmp(&b.avg_p99_us))
    }

    /// Mean of the per-configuration average throughput
    pub fn overall_avg_tps(&self) -> f64 {
        if self.summary.is_empty() {
            return 0.0;
        }
        self.summary.iter().map(|r| r.avg_tps).sum::<f64>() / self.summary.len() as f64
    }
}

/// Paths written by [`ResultsManager::finalize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub json: PathBuf,
    pub summary_csv: PathBuf,
    pub per_second_csv: PathBuf,
}

/// Results manager for writing the extraction outputs
pub struct ResultsManager {
    output_dir: PathBuf,
    json_file: String,
    csv_file: String,
    per_second_file: String,
}

impl ResultsManager {
    /// Create a results manager writing into `output_dir`, creating it if needed
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            json_file: crate::defaults::JSON_FILE.to_string(),
            csv_file: crate::defaults::CSV_FILE.to_string(),
            per_second_file: crate::defaults::PER_SECOND_FILE.to_string(),
        })
    }

    /// Override the output file names
    pub fn with_file_names(mut self, json_file: &str, csv_file: &str, per_second_file: &str) -> Self {
        self.json_file = json_file.to_string();
        self.csv_file = csv_file.to_string();
        self.per_second_file = per_second_file.to_string();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the JSON record set and both CSV tables
    pub fn finalize(&self, results: &ExtractionResults) -> Result<OutputPaths> {
        info!("Finalizing extraction results");

        let paths = OutputPaths {
            json: self.output_dir.join(&self.json_file),
            summary_csv: self.output_dir.join(&self.csv_file),
            per_second_csv: self.output_dir.join(&self.per_second_file),
        };

        self.write_json(results, &paths.json)?;
        self.write_summary_csv(&results.summary, &paths.summary_csv)?;
        self.write_time_series_csv(&results.time_series(), &paths.per_second_csv)?;

        info!("Results written to: {:?}", self.output_dir);
        Ok(paths)
    }

    fn write_json(&self, results: &ExtractionResults, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Wrote record set to {:?}", path);
        Ok(())
    }

    fn write_summary_csv(&self, rows: &[SummaryRow], path: &Path) -> Result<()> {
        let mut writer =
            csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
        for row in rows {
            writer.serialize(row.rounded())?;
        }
        writer.flush()?;
        debug!("Wrote {} summary rows to {:?}", rows.len(), path);
        Ok(())
    }

    fn write_time_series_csv(&self, rows: &[TimeSeriesRow], path: &Path) -> Result<()> {
        let mut writer =
            csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        debug!("Wrote {} per-second rows to {:?}", rows.len(), path);
        Ok(())
    }

    /// Read back a record set written by [`ResultsManager::finalize`]
    pub fn load(path: &Path) -> Result<ExtractionResults> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
