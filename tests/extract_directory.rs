use anyhow::Result;
use kvbench_extract::{
    defaults, ExtractionConfig, Extractor, LogParser, ResultsManager, Workload,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HISTOGRAM: &str = "\
       Value     Percentile TotalCount 1/(1-Percentile)

     120.000 0.500000000000      50000           2.00
     450.000 0.900000000000      90000          10.00
     980.000 0.990000000000      99000         100.00
    2100.000 0.999000000000      99900        1000.00
#[Mean    =      180.000, StdDeviation   =       95.000]
#[Max     =     4096.000, Total count    =       100000]
#[Buckets =           22, SubBuckets     =         2048]
Database size: Total: 512.5 MB
INDEX size: Total: 64.25 MB
";

/// Log with `seconds` samples; p99 is 10 during warm-up and climbs after it
fn read_log(seconds: u64) -> String {
    let mut text = String::from("Threads: 20\nRecord size: 1024\nStage 1: timed read\n");
    for s in 1..=seconds {
        let p99 = if s <= 10 { 10 } else { 20 + 2 * (s - 11) };
        text.push_str(&format!(
            "2025-05-01 10:00:{:02}.000 INFO read(tps={} (hit=900 miss=100) timeouts=0 errors=0)\n",
            s,
            1000 * s
        ));
        text.push_str(&format!("hdr: read ts {}, 1000, 5, 500, 50, 90, {}, 150\n", s, p99));
    }
    text
}

fn write_log() -> String {
    let mut text = String::from("Fill target: 50\n");
    for s in 1..=3u64 {
        text.push_str(&format!("2025-05-01 11:00:{:02}.000 INFO write(tps={})\n", s, 500 * s));
        text.push_str(&format!("hdr: write ts {}, 500, 8, 800, 60, 120, 240, 400, 900\n", s));
    }
    text
}

fn write_file(dir: &Path, name: &str, body: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(name), body)?;
    Ok(())
}

/// Histograms for {A, B}, logs for {B, C}, plus a stray file on each side
fn read_layout() -> Result<TempDir> {
    let root = TempDir::new()?;
    let hdr = root.path().join(defaults::HDR_DIR);
    let logs = root.path().join(defaults::READ_LOG_DIR);

    write_file(&hdr, "read_latency_25pct_1024B_thr20_1714000000.txt", HISTOGRAM)?;
    write_file(&hdr, "read_latency_50pct_1024B_thr20_1714000100.txt", HISTOGRAM)?;
    write_file(&hdr, "README.txt", "not a histogram")?;

    write_file(&logs, "read_latency_50pct_1024B_thr20_1714000100.log", &read_log(15))?;
    write_file(&logs, "read_latency_75pct_1024B_thr20_1714000200.log", &read_log(3))?;
    write_file(&logs, "scratch.log", "nothing here")?;

    Ok(root)
}

fn read_config(root: &Path) -> ExtractionConfig {
    ExtractionConfig::new(
        root.join(defaults::HDR_DIR),
        root.join(defaults::READ_LOG_DIR),
        Workload::Read,
    )
}

#[test]
fn extracts_and_joins_a_read_sweep() -> Result<()> {
    let root = read_layout()?;
    let results = Extractor::new(read_config(root.path())).run()?;

    assert_eq!(results.summary.len(), 1);
    let row = &results.summary[0];
    assert_eq!(row.key().to_string(), "50pct_1024B_thr20");
    assert_eq!(row.threads, 20);
    assert_eq!(row.size_bytes, 1024);
    assert_eq!(row.size_kb, 1.0);

    // p99 over the stable window only
    assert_eq!(row.avg_p99_us, 24.0);
    assert_eq!(row.min_p99_us, 20.0);
    assert_eq!(row.max_p99_us, 28.0);
    // throughput over every sample
    assert_eq!(row.avg_tps, 8000.0);
    assert_eq!(row.max_tps, 15000.0);
    assert_eq!(row.min_tps, 1000.0);

    assert_eq!(row.mean_latency_us, 180.0);
    assert_eq!(row.std_dev_us, 95.0);
    assert_eq!(row.total_count, 100000);
    assert_eq!(row.db_size_mb, 512.5);
    assert_eq!(row.index_size_mb, 64.25);
    assert_eq!(row.hdr_p90_us, Some(450.0));
    assert_eq!(row.hdr_p99_9_us, Some(2100.0));
    assert_eq!(row.hdr_p99_99_us, None);

    assert_eq!(results.histogram_only, vec!["25pct_1024B_thr20".to_string()]);
    assert_eq!(results.log_only, vec!["75pct_1024B_thr20".to_string()]);
    assert_eq!(results.histogram_data.len(), 2);
    assert_eq!(results.log_data.len(), 2);

    let meta = &results.metadata;
    assert_eq!(meta.histogram_files, 3);
    assert_eq!(meta.log_files, 3);
    assert_eq!(meta.skipped_files.len(), 2);
    assert!(meta.skipped_files.iter().any(|s| s.file == "README.txt"));
    assert!(meta.skipped_files.iter().any(|s| s.file == "scratch.log"));
    // One column header line per parsed histogram dump
    assert_eq!(meta.skipped_lines, 2);
    Ok(())
}

#[test]
fn log_header_and_samples_survive_extraction() -> Result<()> {
    let root = read_layout()?;
    let results = Extractor::new(read_config(root.path())).run()?;

    let entry = &results.log_data["75pct_1024B_thr20"];
    assert_eq!(entry.record.config_header["Threads"], "20");
    assert_eq!(entry.record.config_header["Record size"], "1024");
    assert_eq!(entry.record.samples.len(), 3);

    let first = &entry.record.samples[0];
    assert_eq!(first.timestamp, "2025-05-01 10:00:01.000");
    assert_eq!(first.throughput, 1000);
    assert_eq!(first.hit_count, Some(900));
    assert_eq!(first.miss_count, Some(100));
    assert_eq!(first.p50, Some(50));
    assert_eq!(first.p90, Some(90));
    assert_eq!(first.p99, Some(10));

    // Short logs are aggregated whole
    assert_eq!(entry.aggregate.sample_count, 3);
    assert_eq!(entry.aggregate.stable_window_len, 3);
    Ok(())
}

#[test]
fn parallel_pass_matches_sequential_pass() -> Result<()> {
    let root = read_layout()?;
    let sequential = Extractor::new(read_config(root.path())).run()?;

    let mut config = read_config(root.path());
    config.parallel = true;
    let parallel = Extractor::new(config).run()?;

    assert_eq!(sequential.summary, parallel.summary);
    assert_eq!(sequential.histogram_data, parallel.histogram_data);
    assert_eq!(sequential.log_data, parallel.log_data);
    assert_eq!(sequential.metadata.skipped_files, parallel.metadata.skipped_files);
    assert_eq!(sequential.metadata.skipped_lines, parallel.metadata.skipped_lines);
    Ok(())
}

#[test]
fn reparsing_the_same_file_is_idempotent() -> Result<()> {
    let root = read_layout()?;
    let extractor = Extractor::new(read_config(root.path()));
    let path = root
        .path()
        .join(defaults::READ_LOG_DIR)
        .join("read_latency_50pct_1024B_thr20_1714000100.log");

    let first = extractor.log_from_file(&path)?;
    let second = extractor.log_from_file(&path)?;
    assert_eq!(first.record, second.record);

    let hdr_path = root
        .path()
        .join(defaults::HDR_DIR)
        .join("read_latency_50pct_1024B_thr20_1714000100.txt");
    assert_eq!(
        extractor.histogram_from_file(&hdr_path)?.record,
        extractor.histogram_from_file(&hdr_path)?.record
    );
    Ok(())
}

#[test]
fn prefill_log_joins_last_fill_histogram() -> Result<()> {
    let root = TempDir::new()?;
    let hdr = root.path().join(defaults::HDR_DIR);
    let logs = root.path().join(defaults::WRITE_LOG_DIR);

    write_file(&hdr, "write_latency_50pct_25lastperc_1024B_thr20.txt", HISTOGRAM)?;
    write_file(&logs, "prefill_50pct_1024B_20threads.log", &write_log())?;

    let config = ExtractionConfig::new(&hdr, &logs, Workload::Write);
    let results = Extractor::new(config).run()?;

    assert_eq!(results.summary.len(), 1);
    let row = &results.summary[0];
    assert_eq!(row.percentage, 50);
    assert_eq!(row.last_percentage, Some(25));
    assert_eq!(row.avg_tps, 1000.0);
    assert_eq!(row.avg_p50_us, 60.0);
    assert_eq!(row.avg_p99_us, 240.0);
    assert_eq!(row.avg_p99_9_us, 400.0);

    let entry = &results.log_data["50pct_25lastperc_1024B_thr20"];
    assert_eq!(entry.record.samples[2].p99_99, Some(900));
    Ok(())
}

#[test]
fn missing_directories_yield_empty_results() -> Result<()> {
    let root = TempDir::new()?;
    let results = Extractor::new(read_config(root.path())).run()?;
    assert!(results.summary.is_empty());
    assert!(results.histogram_data.is_empty());
    assert_eq!(results.metadata.histogram_files, 0);
    Ok(())
}

#[test]
fn outputs_round_trip_through_results_manager() -> Result<()> {
    let root = read_layout()?;
    let results = Extractor::new(read_config(root.path())).run()?;

    let out = root.path().join("analysis");
    let paths = ResultsManager::new(&out)?.finalize(&results)?;
    assert_eq!(paths.json, out.join(defaults::JSON_FILE));

    let loaded = ResultsManager::load(&paths.json)?;
    assert_eq!(loaded.summary, results.summary);
    assert_eq!(loaded.log_data.len(), 2);

    let summary_csv = fs::read_to_string(&paths.summary_csv)?;
    let header = summary_csv.lines().next().unwrap_or_default();
    for column in ["percentage", "size_kb", "threads", "avg_tps", "avg_p99_us", "db_size_mb"] {
        assert!(header.split(',').any(|c| c == column), "missing column {}", column);
    }
    assert_eq!(summary_csv.lines().count(), 2);

    // 15 + 3 samples across both logs
    let per_second = fs::read_to_string(&paths.per_second_csv)?;
    assert_eq!(per_second.lines().count(), 19);
    Ok(())
}

#[test]
fn strict_parser_rejects_orphan_histogram_line() {
    let text = "Stage 1: timed\nhdr: read ts 1, 1000, 5, 500, 50, 90, 99, 150\n";
    assert!(LogParser::new(Workload::Read).strict(true).parse(text).is_err());

    let lenient = LogParser::new(Workload::Read)
        .parse(text)
        .expect("lenient parse never fails");
    assert!(lenient.record.samples.is_empty());
    assert_eq!(lenient.issues.len(), 1);
}

#[test]
fn non_finite_histogram_rows_still_reload() -> Result<()> {
    let root = TempDir::new()?;
    let hdr = root.path().join(defaults::HDR_DIR);
    let logs = root.path().join(defaults::READ_LOG_DIR);

    let body = format!("inf 0.5 10\n{}", HISTOGRAM);
    write_file(&hdr, "read_latency_50pct_1024B_thr20_1714000100.txt", &body)?;
    write_file(&logs, "read_latency_50pct_1024B_thr20_1714000100.log", &read_log(3))?;
    write_file(&logs, "read_latency_75pct_1024B_thr20_1714000200.log", "Threads: 20\nStage 1: go\n")?;

    let results = Extractor::new(read_config(root.path())).run()?;
    assert_eq!(results.summary.len(), 1);
    assert_eq!(results.summary[0].hdr_p50_us, Some(120.0));
    assert!(results.log_only.is_empty());
    assert!(results
        .metadata
        .skipped_files
        .iter()
        .any(|s| s.file == "read_latency_75pct_1024B_thr20_1714000200.log"));

    let paths = ResultsManager::new(&root.path().join("analysis"))?.finalize(&results)?;
    let loaded = ResultsManager::load(&paths.json)?;
    assert_eq!(loaded.histogram_data, results.histogram_data);
    Ok(())
}
