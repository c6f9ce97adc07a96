use crate::identifier::Workload;
use clap::Parser;
use std::path::PathBuf;

/// Extract latency and throughput records from key-value store benchmark artifacts
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Directory holding the benchmark output (hdr_stats/ and the log directory)
    #[clap(long, default_value = ".", help_heading = "Input Options")]
    pub data_dir: PathBuf,

    /// Directory with histogram dumps (defaults to <data-dir>/hdr_stats)
    #[clap(long, help_heading = "Input Options")]
    pub hdr_dir: Option<PathBuf>,

    /// Directory with per-second logs (defaults to <data-dir>/<workload>_latency_results)
    #[clap(long, help_heading = "Input Options")]
    pub log_dir: Option<PathBuf>,

    /// Which side of the store the benchmark exercised
    #[clap(short = 'w', long, value_enum, default_value_t = Workload::Read, help_heading = "Input Options")]
    pub workload: Workload,

    /// Directory for output files
    #[clap(short = 'o', long, default_value = crate::defaults::OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Output JSON file name
    #[clap(long, default_value = crate::defaults::JSON_FILE)]
    pub json_file: String,

    /// Output summary CSV file name
    #[clap(long, default_value = crate::defaults::CSV_FILE)]
    pub csv_file: String,

    /// Output per-second CSV file name
    #[clap(long, default_value = crate::defaults::PER_SECOND_FILE)]
    pub per_second_file: String,

    /// Parse files in parallel
    #[clap(long, default_value_t = false)]
    pub parallel: bool,

    /// Fail a log file whose histogram line has no preceding throughput line
    #[clap(long, default_value_t = false)]
    pub strict: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

// derive(Default) would not apply the clap defaults, so spell them out.
impl Default for Args {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            hdr_dir: None,
            log_dir: None,
            workload: Workload::Read,
            output_dir: PathBuf::from(crate::defaults::OUTPUT_DIR),
            json_file: crate::defaults::JSON_FILE.to_string(),
            csv_file: crate::defaults::CSV_FILE.to_string(),
            per_second_file: crate::defaults::PER_SECOND_FILE.to_string(),
            parallel: false,
            strict: false,
            verbose: false,
        }
    }
}
