//! # Key-Value Benchmark Extractor - Main Entry Point
//!
//! The main function performs these operations:
//! 1. **Parse arguments**: input directories, workload, output names
//! 2. **Initialize logging**: colored console output via tracing
//! 3. **Extract**: parse histogram dumps and per-second logs, correlate them
//! 4. **Write outputs**: JSON record set plus summary and per-second CSVs
//! 5. **Report**: print a short console summary of the sweep
//!
//! Bad inputs never stop the run; only failures to list an input directory
//! or write an output file end it with an error.

use anyhow::Result;
use clap::Parser;
use kvbench_extract::{
    cli::Args,
    extract::{ExtractionConfig, Extractor},
    logging,
    results::{ExtractionResults, ResultsManager},
    utils::{format_latency_us, format_size_mb, format_tps, print_table_row, print_table_separator},
};
use tracing::{info, warn};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    info!("Starting key-value benchmark extraction");

    let config = ExtractionConfig::from_args(&args);
    info!("Histogram directory: {:?}", config.hdr_dir);
    info!("Log directory: {:?}", config.log_dir);

    let results = Extractor::new(config).run()?;

    let paths = ResultsManager::new(&args.output_dir)?
        .with_file_names(&args.json_file, &args.csv_file, &args.per_second_file)
        .finalize(&results)?;

    print_summary(&results);

    println!();
    println!("Files created:");
    println!("  {}", paths.json.display());
    println!("  {}", paths.summary_csv.display());
    println!("  {}", paths.per_second_csv.display());

    if results.summary.is_empty() {
        warn!("No configuration had both a histogram and a log");
    }
    Ok(())
}

fn print_summary(results: &ExtractionResults) {
    let meta = &results.metadata;

    println!();
    println!("Extraction Summary ({} workload)", meta.workload);
    println!("  Histogram files:  {}", meta.histogram_files);
    println!("  Log files:        {}", meta.log_files);
    println!("  Skipped files:    {}", meta.skipped_files.len());
    println!("  Skipped lines:    {}", meta.skipped_lines);
    println!("  Configurations:   {}", results.summary.len());

    if results.summary.is_empty() {
        return;
    }

    println!();
    let widths = [28, 14, 14, 12, 12, 12, 12];
    print_table_separator(&widths);
    print_table_row(
        &["Configuration", "Avg TPS", "Max TPS", "Avg p50", "Avg p99", "DB size", "Index size"],
        &widths,
    );
    print_table_separator(&widths);
    for row in &results.summary {
        print_table_row(
            &[
                &row.key().to_string(),
                &format_tps(row.avg_tps),
                &format_tps(row.max_tps),
                &format_latency_us(row.avg_p50_us),
                &format_latency_us(row.avg_p99_us),
                &format_size_mb(row.db_size_mb),
                &format_size_mb(row.index_size_mb),
            ],
            &widths,
        );
    }
    print_table_separator(&widths);

    println!();
    println!("  Overall average: {}", format_tps(results.overall_avg_tps()));
    if let Some(best) = results.best_throughput() {
        println!("  Best throughput: {} ({})", format_tps(best.max_tps), best.key());
    }
    if let Some(lowest) = results.lowest_p99() {
        println!("  Lowest p99:      {} ({})", format_latency_us(lowest.avg_p99_us), lowest.key());
    }
}
