//! # Key-Value Benchmark Extraction Library
//!
//! Turns the raw artifacts of a key-value store benchmark sweep into
//! structured, correlated records.
//!
//! A sweep runs the store under many configurations (fill percentage,
//! record size, client thread count) and leaves two kinds of files behind
//! for each run:
//!
//! - **Histogram dumps** (`hdr_stats/*.txt`): a percentile distribution
//!   table followed by `#[Mean ...]` / `#[Max ...]` summary lines
//! - **Per-second logs** (`<workload>_latency_results/*.log`): a
//!   `key: value` configuration header, then a stream of throughput lines
//!   each followed by an `hdr:` latency line
//!
//! Both are identified by their file names, which encode the same
//! [`ConfigKey`]. The library parses both sides, aggregates each log over
//! its stable window, and joins the two on the key.
//!
//! ## Architecture Overview
//!
//! - `identifier`: file name grammar and the [`ConfigKey`] join key
//! - `histogram`: histogram dump parsing and percentile lookup
//! - `log_stream`: two-state per-second log parser
//! - `aggregator`: stable-window throughput and latency aggregates
//! - `correlator`: inner join into [`SummaryRow`]s
//! - `extract`: directory discovery and the batch driver
//! - `results`: JSON and CSV outputs
//! - `cli`, `logging`, `utils`: binary plumbing
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use kvbench_extract::{ExtractionConfig, Extractor, ResultsManager, Workload};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ExtractionConfig::new("run/hdr_stats", "run/read_latency_results", Workload::Read);
//!     let results = Extractor::new(config).run()?;
//!
//!     for row in &results.summary {
//!         println!("{}: {:.0} tps, p99 {:.1}us", row.key(), row.avg_tps, row.avg_p99_us);
//!     }
//!
//!     ResultsManager::new(Path::new("benchmark_analysis"))?.finalize(&results)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Model
//!
//! Every parse operation is total over its input. Unusable lines are
//! reported alongside the record in [`Parsed::issues`], and whole files are
//! only rejected for unrecognized or malformed names. A batch never aborts
//! because of one bad file.

pub mod aggregator;

/// Command-line interface
pub mod cli;

pub mod correlator;
pub mod error;

/// Directory discovery and the batch extraction driver
///
/// Parses every recognized file on its own (optionally on the rayon pool),
/// merges outcomes into keyed record sets in file-name order and hands the
/// two sets to the correlator.
pub mod extract;

pub mod histogram;
pub mod identifier;
pub mod log_stream;
pub mod logging;

/// Output of an extraction pass
///
/// Holds the full record set and writes it as pretty JSON plus two CSV
/// tables: the correlated summary and the flattened per-second series.
pub mod results;

pub mod utils;

pub use aggregator::{aggregate, LogAggregate};
pub use cli::Args;
pub use correlator::{correlate, SummaryRow};
pub use error::{ExtractError, Parsed};
pub use extract::{ExtractionConfig, Extractor};
pub use histogram::{HistogramSummary, PercentileTable};
pub use identifier::{parse_filename, ConfigKey, Identifier, Workload};
pub use log_stream::{LogParser, LogRecord, Sample};
pub use results::{ExtractionResults, ResultsManager};

/// The current version of the extractor
///
/// Written into the output metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default values
///
/// Directory names follow the layout the benchmark harness writes.
pub mod defaults {
    use crate::identifier::Workload;

    /// Samples dropped from the front of a log before aggregation
    ///
    /// The store needs a few seconds after a stage starts before throughput
    /// settles. Logs with this many samples or fewer are aggregated whole.
    pub const WARMUP_SAMPLES: usize = 10;

    /// Maximum distance for a nearest-percentile lookup
    pub const PERCENTILE_TOLERANCE: f64 = 0.001;

    /// Histogram dump directory under the data directory
    pub const HDR_DIR: &str = "hdr_stats";

    pub const READ_LOG_DIR: &str = "read_latency_results";
    pub const WRITE_LOG_DIR: &str = "write_latency_results";

    /// Per-second log directory for a workload
    pub fn log_dir_for(workload: Workload) -> &'static str {
        match workload {
            Workload::Read => READ_LOG_DIR,
            Workload::Write => WRITE_LOG_DIR,
        }
    }

    pub const OUTPUT_DIR: &str = "benchmark_analysis";
    pub const JSON_FILE: &str = "benchmark_data.json";
    pub const CSV_FILE: &str = "benchmark_summary.csv";
    pub const PER_SECOND_FILE: &str = "per_second_data.csv";
}
