//! # Extraction Engine Module
//!
//! Orchestrates one extraction pass over a fixed set of benchmark artifacts:
//! histogram dumps and per-second logs are parsed file by file, folded into
//! a [`Batch`] keyed by [`ConfigKey`], and finally correlated into summary
//! rows.
//!
//! ## Failure Isolation
//!
//! No single file or line can abort the pass. Unrecognized filenames are
//! skipped with a warning, files with malformed identifiers or read errors
//! are skipped with an error, logs without a single throughput sample are
//! skipped before the join, and unusable lines are counted. The result
//! always carries whatever could be extracted, plus the skip counts.
//!
//! ## Concurrency
//!
//! Files are independent of each other, so with `parallel` enabled they are
//! parsed on the rayon pool. Parsed outcomes are collected in file-name
//! order and only then merged into the batch, which keeps the output
//! identical to a sequential pass.

use crate::{
    aggregator::aggregate,
    cli::Args,
    correlator::correlate,
    error::{ExtractError, Parsed},
    histogram::HistogramSummary,
    identifier::{parse_filename, ConfigKey, Workload},
    log_stream::LogParser,
    results::{ExtractionMetadata, ExtractionResults, HistogramEntry, LogEntry, SkippedFile},
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Explicit inputs of an extraction pass
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    pub hdr_dir: PathBuf,
    pub log_dir: PathBuf,
    pub workload: Workload,
    pub parallel: bool,
    pub strict_merge: bool,
}

impl ExtractionConfig {
    pub fn new(hdr_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>, workload: Workload) -> Self {
        Self {
            hdr_dir: hdr_dir.into(),
            log_dir: log_dir.into(),
            workload,
            parallel: false,
            strict_merge: false,
        }
    }

    /// Build the configuration from parsed CLI arguments
    ///
    /// Unset directories fall back to the harness layout under `data_dir`.
    pub fn from_args(args: &Args) -> Self {
        let hdr_dir = args
            .hdr_dir
            .clone()
            .unwrap_or_else(|| args.data_dir.join(crate::defaults::HDR_DIR));
        let log_dir = args
            .log_dir
            .clone()
            .unwrap_or_else(|| args.data_dir.join(crate::defaults::log_dir_for(args.workload)));

        Self {
            hdr_dir,
            log_dir,
            workload: args.workload,
            parallel: args.parallel,
            strict_merge: args.strict,
        }
    }
}

/// Accumulates per-file outcomes into keyed record sets
///
/// The only state shared across files. Later files replace earlier ones
/// with the same key.
#[derive(Debug)]
pub struct Batch {
    workload: Workload,
    histograms: BTreeMap<ConfigKey, HistogramEntry>,
    logs: BTreeMap<ConfigKey, LogEntry>,
    histogram_files: usize,
    log_files: usize,
    skipped_files: Vec<SkippedFile>,
    skipped_lines: usize,
}

impl Batch {
    pub fn new(workload: Workload) -> Self {
        Self {
            workload,
            histograms: BTreeMap::new(),
            logs: BTreeMap::new(),
            histogram_files: 0,
            log_files: 0,
            skipped_files: Vec::new(),
            skipped_lines: 0,
        }
    }

    pub fn add_histogram(&mut self, file: &str, outcome: Result<Parsed<HistogramEntry>, ExtractError>) {
        self.histogram_files += 1;
        if let Some(entry) = self.accept(file, outcome) {
            let key = entry.params.key;
            if let Some(previous) = self.histograms.insert(key, entry) {
                warn!("{} replaces {} for {}", file, previous.source_file, key);
            }
        }
    }

    pub fn add_log(&mut self, file: &str, outcome: Result<Parsed<LogEntry>, ExtractError>) {
        self.log_files += 1;
        if let Some(entry) = self.accept(file, outcome) {
            // A log without samples has nothing to correlate
            if entry.record.samples.is_empty() {
                warn!("Skipping {}: no {} throughput samples", file, self.workload);
                self.skipped_files.push(SkippedFile {
                    file: file.to_string(),
                    reason: format!("no {} throughput samples", self.workload),
                });
                return;
            }
            let key = entry.params.key;
            if let Some(previous) = self.logs.insert(key, entry) {
                warn!("{} replaces {} for {}", file, previous.source_file, key);
            }
        }
    }

    fn accept<T>(&mut self, file: &str, outcome: Result<Parsed<T>, ExtractError>) -> Option<T> {
        match outcome {
            Ok(parsed) => {
                for issue in &parsed.issues {
                    debug!("{}: {}", file, issue);
                }
                if !parsed.issues.is_empty() {
                    info!("{}: skipped {} line(s)", file, parsed.issues.len());
                }
                self.skipped_lines += parsed.issues.len();
                Some(parsed.record)
            }
            Err(e) => {
                if e.is_skippable() {
                    warn!("Skipping {}: {}", file, e);
                } else {
                    error!("Failed to extract {}: {}", file, e);
                }
                self.skipped_files.push(SkippedFile {
                    file: file.to_string(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    pub fn skipped_file_count(&self) -> usize {
        self.skipped_files.len()
    }

    /// Correlate the two record sets and produce the final results
    pub fn finish(self) -> ExtractionResults {
        let histograms: BTreeMap<ConfigKey, &HistogramSummary> =
            self.histograms.iter().map(|(k, e)| (*k, &e.summary)).collect();
        let aggregates = self.logs.iter().map(|(k, e)| (*k, &e.aggregate)).collect();
        let correlation = correlate(&histograms, &aggregates);

        for key in &correlation.histogram_only {
            debug!("No log for {}", key);
        }
        for key in &correlation.log_only {
            debug!("No histogram for {}", key);
        }
        info!(
            "Correlated {} configurations ({} histogram-only, {} log-only)",
            correlation.rows.len(),
            correlation.histogram_only.len(),
            correlation.log_only.len()
        );

        ExtractionResults {
            metadata: ExtractionMetadata {
                version: crate::VERSION.to_string(),
                timestamp: chrono::Utc::now(),
                workload: self.workload,
                histogram_files: self.histogram_files,
                log_files: self.log_files,
                skipped_files: self.skipped_files,
                skipped_lines: self.skipped_lines,
            },
            histogram_data: self
                .histograms
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            log_data: self.logs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            summary: correlation.rows,
            histogram_only: correlation.histogram_only.iter().map(ToString::to_string).collect(),
            log_only: correlation.log_only.iter().map(ToString::to_string).collect(),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_text(path: &Path) -> Result<String, ExtractError> {
    std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// List files with `extension` in `dir`, sorted by name
///
/// A missing directory yields no files.
pub fn discover(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!("Directory {:?} does not exist, no files to process", dir);
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Extraction engine for one pass over the configured directories
pub struct Extractor {
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn log_parser(&self) -> LogParser {
        LogParser::new(self.config.workload).strict(self.config.strict_merge)
    }

    /// Parse one histogram file already loaded into memory
    pub fn histogram_from_text(filename: &str, text: &str) -> Result<Parsed<HistogramEntry>, ExtractError> {
        let params = parse_filename(filename)?;
        Ok(HistogramSummary::parse(text).map(|summary| HistogramEntry {
            source_file: filename.to_string(),
            params,
            summary,
        }))
    }

    /// Parse one log file already loaded into memory
    pub fn log_from_text(&self, filename: &str, text: &str) -> Result<Parsed<LogEntry>, ExtractError> {
        let params = parse_filename(filename)?;
        let parsed = self.log_parser().parse(text)?;
        Ok(parsed.map(|record| {
            let aggregate = aggregate(&record.samples);
            LogEntry {
                source_file: filename.to_string(),
                params,
                record,
                aggregate,
            }
        }))
    }

    pub fn histogram_from_file(&self, path: &Path) -> Result<Parsed<HistogramEntry>, ExtractError> {
        let name = file_name(path);
        // Reject unrecognized names before touching the file
        parse_filename(&name)?;
        Self::histogram_from_text(&name, &read_text(path)?)
    }

    pub fn log_from_file(&self, path: &Path) -> Result<Parsed<LogEntry>, ExtractError> {
        let name = file_name(path);
        parse_filename(&name)?;
        self.log_from_text(&name, &read_text(path)?)
    }

    /// Run the full pass: discover, parse, merge, correlate
    pub fn run(&self) -> Result<ExtractionResults> {
        let hdr_files = discover(&self.config.hdr_dir, "txt")?;
        let log_files = discover(&self.config.log_dir, "log")?;
        info!(
            "Processing {} histogram files and {} log files ({} workload)",
            hdr_files.len(),
            log_files.len(),
            self.config.workload
        );

        let histograms = self.parse_all(&hdr_files, |path| self.histogram_from_file(path));
        let logs = self.parse_all(&log_files, |path| self.log_from_file(path));

        let mut batch = Batch::new(self.config.workload);
        for (name, outcome) in histograms {
            batch.add_histogram(&name, outcome);
        }
        for (name, outcome) in logs {
            batch.add_log(&name, outcome);
        }

        if batch.skipped_file_count() > 0 {
            warn!("Skipped {} file(s)", batch.skipped_file_count());
        }
        Ok(batch.finish())
    }

    fn parse_all<T, F>(&self, files: &[PathBuf], parse: F) -> Vec<(String, Result<Parsed<T>, ExtractError>)>
    where
        T: Send,
        F: Fn(&Path) -> Result<Parsed<T>, ExtractError> + Sync,
    {
        if self.config.parallel {
            files
                .par_iter()
                .map(|path| (file_name(path), parse(path)))
                .collect()
        } else {
            files.iter().map(|path| (file_name(path), parse(path))).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTOGRAM: &str = "\
     120.000 0.500000000000      50000           2.00
     980.000 0.990000000000      99000         100.00
#[Mean    =      180.000, StdDeviation   =       95.000]
#[Max     =     4096.000, Total count    =       100000]
";

    const LOG: &str = "\
Threads: 20
Stage 1: timed
2025-05-01 10:00:01.000 INFO read(tps=1000 (hit=900 miss=100) timeouts=0 errors=0)
hdr: read ts 1, 1000, 5, 500, 50, 90, 99, 150
2025-05-01 10:00:02.000 INFO read(tps=3000 (hit=2900 miss=100) timeouts=0 errors=0)
hdr: read ts 2, 3000, 5, 500, 70, 110, 119, 150
";

    fn extractor() -> Extractor {
        let mut config = ExtractionConfig::new("unused", "unused", Workload::Read);
        config.strict_merge = true;
        Extractor::new(config)
    }

    #[test]
    fn test_batch_joins_matching_keys() {
        let ex = extractor();
        let mut batch = Batch::new(Workload::Read);

        batch.add_histogram(
            "read_latency_50pct_1024B_thr20_1.txt",
            Extractor::histogram_from_text("read_latency_50pct_1024B_thr20_1.txt", HISTOGRAM),
        );
        batch.add_histogram(
            "read_latency_75pct_1024B_thr20_1.txt",
            Extractor::histogram_from_text("read_latency_75pct_1024B_thr20_1.txt", HISTOGRAM),
        );
        batch.add_log(
            "read_latency_50pct_1024B_thr20_1.log",
            ex.log_from_text("read_latency_50pct_1024B_thr20_1.log", LOG),
        );

        let results = batch.finish();
        assert_eq!(results.summary.len(), 1);
        let row = &results.summary[0];
        assert_eq!(row.percentage, 50);
        assert_eq!(row.avg_tps, 2000.0);
        assert_eq!(row.avg_p50_us, 60.0);
        assert_eq!(row.mean_latency_us, 180.0);
        assert_eq!(row.hdr_p99_us, Some(980.0));

        assert_eq!(results.histogram_only, vec!["75pct_1024B_thr20".to_string()]);
        assert!(results.log_only.is_empty());
        assert_eq!(results.histogram_data.len(), 2);
        assert_eq!(results.metadata.histogram_files, 2);
        assert_eq!(results.metadata.log_files, 1);
    }

    #[test]
    fn test_batch_counts_skips() {
        let ex = extractor();
        let mut batch = Batch::new(Workload::Read);

        batch.add_histogram("notes.txt", Extractor::histogram_from_text("notes.txt", HISTOGRAM));
        batch.add_log(
            "read_latency_50pct_1024B_thr20_1.log",
            ex.log_from_text(
                "read_latency_50pct_1024B_thr20_1.log",
                "Stage 1: go\nhdr: read ts 1, 1, 1, 1, 1, 1, 1, 1\n",
            ),
        );
        batch.add_log(
            "read_latency_50pct_1024B_thr20_2.log",
            ex.log_from_text(
                "read_latency_50pct_1024B_thr20_2.log",
                "Stage 1: go\n2025-05-01 10:00:01.000 INFO read(tps=abc)\n",
            ),
        );

        assert_eq!(batch.skipped_file_count(), 3);
        let results = batch.finish();
        assert_eq!(results.metadata.skipped_files.len(), 3);
        assert_eq!(results.metadata.skipped_files[0].file, "notes.txt");
        assert!(results.summary.is_empty());
        // The tps=abc line is not a throughput line, so that log parses empty
        assert_eq!(results.metadata.skipped_files[2].file, "read_latency_50pct_1024B_thr20_2.log");
        assert!(results.log_data.is_empty());
        assert!(results.log_only.is_empty());
    }

    #[test]
    fn test_sample_less_log_is_not_joined() {
        let ex = extractor();
        let mut batch = Batch::new(Workload::Read);

        batch.add_histogram(
            "read_latency_50pct_1024B_thr20_1.txt",
            Extractor::histogram_from_text("read_latency_50pct_1024B_thr20_1.txt", HISTOGRAM),
        );
        batch.add_log(
            "read_latency_50pct_1024B_thr20_1.log",
            ex.log_from_text("read_latency_50pct_1024B_thr20_1.log", "Threads: 20\nStage 1: go\n"),
        );

        assert_eq!(batch.skipped_file_count(), 1);
        let results = batch.finish();
        assert!(results.summary.is_empty());
        assert!(results.lowest_p99().is_none());
        assert!(results.log_data.is_empty());
        assert_eq!(results.histogram_only, vec!["50pct_1024B_thr20".to_string()]);
        assert_eq!(results.metadata.log_files, 1);
    }

    #[test]
    fn test_sample_less_log_keeps_earlier_run() {
        let ex = extractor();
        let mut batch = Batch::new(Workload::Read);

        batch.add_histogram(
            "read_latency_50pct_1024B_thr20_1.txt",
            Extractor::histogram_from_text("read_latency_50pct_1024B_thr20_1.txt", HISTOGRAM),
        );
        batch.add_log(
            "read_latency_50pct_1024B_thr20_1.log",
            ex.log_from_text("read_latency_50pct_1024B_thr20_1.log", LOG),
        );
        batch.add_log(
            "read_latency_50pct_1024B_thr20_2.log",
            ex.log_from_text("read_latency_50pct_1024B_thr20_2.log", "Threads: 20\n"),
        );

        let results = batch.finish();
        assert_eq!(results.summary.len(), 1);
        assert_eq!(results.summary[0].avg_tps, 2000.0);
        assert_eq!(
            results.log_data["50pct_1024B_thr20"].source_file,
            "read_latency_50pct_1024B_thr20_1.log"
        );
    }

    #[test]
    fn test_later_file_replaces_earlier() {
        let mut batch = Batch::new(Workload::Read);
        batch.add_histogram(
            "read_latency_50pct_1024B_thr20_1.txt",
            Extractor::histogram_from_text("read_latency_50pct_1024B_thr20_1.txt", HISTOGRAM),
        );
        batch.add_histogram(
            "read_latency_50pct_1024B_thr20_2.txt",
            Extractor::histogram_from_text("read_latency_50pct_1024B_thr20_2.txt", "1.0 0.5 1\n"),
        );
        let results = batch.finish();
        let entry = &results.histogram_data["50pct_1024B_thr20"];
        assert_eq!(entry.source_file, "read_latency_50pct_1024B_thr20_2.txt");
        assert_eq!(entry.summary.percentile_table.len(), 1);
    }

    #[test]
    fn test_config_from_args_defaults() {
        let args = Args {
            data_dir: PathBuf::from("/bench"),
            workload: Workload::Write,
            ..Args::default()
        };
        let config = ExtractionConfig::from_args(&args);
        assert_eq!(config.hdr_dir, PathBuf::from("/bench/hdr_stats"));
        assert_eq!(config.log_dir, PathBuf::from("/bench/write_latency_results"));
        assert!(!config.parallel);
    }
}
