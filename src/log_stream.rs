//! # Per-Second Log Parsing
//!
//! The harness writes one log per run. It opens with free-text
//! `key: value` configuration lines, announces the timed stage, and then
//! emits two lines for every second of the run:
//!
//! ```text
//! Threads: 20
//! Stage 1: default config
//! 2025-05-01 10:00:01.004 INFO read(tps=1000 (hit=900 miss=100) timeouts=0 errors=0)
//! hdr: read 2025-05-01T10:00:01Z 1, 1000, 5, 500, 50, 90, 99, 150, 300
//! ```
//!
//! The throughput line opens a new [`Sample`]; the `hdr:` line that follows
//! fills in the latency fields of that same sample.
//!
//! ## State Machine
//!
//! ```text
//!   InConfigHeader --(Stage N: | first sample line)--> InSampleStream
//! ```
//!
//! The transition is one-way. Header lines are only collected before it;
//! afterwards every line is judged purely as a potential sample line.

use crate::error::{ExtractError, Parsed};
use crate::identifier::Workload;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Minimum token count of a usable `hdr:` line (through p99.9)
const HDR_MIN_TOKENS: usize = 11;

/// One second of the timed stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: String,
    pub elapsed_seconds: Option<u64>,
    pub throughput: u64,
    pub hit_count: Option<u64>,
    pub miss_count: Option<u64>,
    pub timeout_count: Option<u64>,
    pub error_count: Option<u64>,
    pub total_count: Option<u64>,
    pub min_latency: Option<u64>,
    pub max_latency: Option<u64>,
    pub p50: Option<u64>,
    pub p90: Option<u64>,
    pub p99: Option<u64>,
    pub p99_9: Option<u64>,
    pub p99_99: Option<u64>,
}

impl Sample {
    fn merge_histogram(&mut self, hdr: &HistogramLine) {
        self.elapsed_seconds = Some(hdr.elapsed_seconds);
        self.total_count = Some(hdr.total);
        self.min_latency = Some(hdr.min_latency);
        self.max_latency = Some(hdr.max_latency);
        self.p50 = Some(hdr.p50);
        self.p90 = Some(hdr.p90);
        self.p99 = Some(hdr.p99);
        self.p99_9 = Some(hdr.p99_9);
        self.p99_99 = hdr.p99_99;
    }

    /// Whether the paired histogram line has been merged in
    pub fn has_latency(&self) -> bool {
        self.p50.is_some()
    }
}

/// Configuration header and per-second samples of one log file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub config_header: BTreeMap<String, String>,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    InConfigHeader,
    InSampleStream,
}

#[derive(Debug, Clone, PartialEq)]
struct HistogramLine {
    elapsed_seconds: u64,
    total: u64,
    min_latency: u64,
    max_latency: u64,
    p50: u64,
    p90: u64,
    p99: u64,
    p99_9: u64,
    p99_99: Option<u64>,
}

fn stage_marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^Stage\s+\d+:").expect("stage marker pattern is valid"))
}

fn throughput_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?P<op>read|write)\(tps=(?P<tps>\d+),?(?:\s+\(hit=(?P<hit>\d+),?\s+miss=(?P<miss>\d+)\))?(?:\s+timeouts=(?P<timeouts>\d+),?)?(?:\s+errors=(?P<errors>\d+))?",
        )
        .expect("throughput pattern is valid")
    })
}

fn parse_count(token: &str, line_number: usize, field: &str) -> Result<u64, ExtractError> {
    token
        .trim_end_matches(',')
        .parse::<u64>()
        .map_err(|e| ExtractError::malformed_line(line_number, format!("invalid {} {:?}: {}", field, token, e)))
}

fn optional_count(caps: &Captures<'_>, name: &str, line_number: usize) -> Result<Option<u64>, ExtractError> {
    caps.name(name)
        .map(|m| parse_count(m.as_str(), line_number, name))
        .transpose()
}

/// Per-file log parser for one workload side
#[derive(Debug, Clone, Copy)]
pub struct LogParser {
    workload: Workload,
    strict: bool,
}

impl LogParser {
    pub fn new(workload: Workload) -> Self {
        Self {
            workload,
            strict: false,
        }
    }

    /// Fail the file instead of dropping a histogram line with no sample to update
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn workload(&self) -> Workload {
        self.workload
    }

    /// Parse the full text of a log file
    ///
    /// Returns `Err` only in strict mode, for an orphan histogram line.
    pub fn parse(&self, text: &str) -> Result<Parsed<LogRecord>, ExtractError> {
        let mut state = ParserState::InConfigHeader;
        let mut record = LogRecord::default();
        let mut issues = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if state == ParserState::InConfigHeader && stage_marker_pattern().is_match(line) {
                debug!("Timed stage starts at line {}", line_number);
                state = ParserState::InSampleStream;
                continue;
            }

            if self.is_histogram_line(line) {
                state = ParserState::InSampleStream;
                match self.parse_histogram_line(line, line_number) {
                    Ok(hdr) => match record.samples.last_mut() {
                        Some(sample) => sample.merge_histogram(&hdr),
                        None if self.strict => {
                            return Err(ExtractError::EmptySampleOnHistogramLine { line_number })
                        }
                        None => {
                            debug!("Dropping histogram line {} with no preceding sample", line_number);
                            issues.push(ExtractError::EmptySampleOnHistogramLine { line_number });
                        }
                    },
                    Err(e) => {
                        debug!("Skipping histogram line: {}", e);
                        issues.push(e);
                    }
                }
                continue;
            }

            if let Some(result) = self.parse_throughput_line(line, line_number) {
                state = ParserState::InSampleStream;
                match result {
                    Ok(sample) => record.samples.push(sample),
                    Err(e) => {
                        debug!("Skipping throughput line: {}", e);
                        issues.push(e);
                    }
                }
                continue;
            }

            if state == ParserState::InConfigHeader {
                if let Some((key, value)) = header_entry(line) {
                    record.config_header.insert(key.to_string(), value.to_string());
                }
            }
        }

        Ok(Parsed::new(record, issues))
    }

    fn is_histogram_line(&self, line: &str) -> bool {
        let mut tokens = line.split_whitespace();
        tokens.next() == Some("hdr:") && tokens.next() == Some(self.workload.op())
    }

    fn parse_histogram_line(&self, line: &str, line_number: usize) -> Result<HistogramLine, ExtractError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < HDR_MIN_TOKENS {
            return Err(ExtractError::malformed_line(
                line_number,
                format!("histogram line has {} fields, expected at least {}", tokens.len(), HDR_MIN_TOKENS),
            ));
        }

        Ok(HistogramLine {
            elapsed_seconds: parse_count(tokens[3], line_number, "elapsed seconds")?,
            total: parse_count(tokens[4], line_number, "total")?,
            min_latency: parse_count(tokens[5], line_number, "min latency")?,
            max_latency: parse_count(tokens[6], line_number, "max latency")?,
            p50: parse_count(tokens[7], line_number, "p50")?,
            p90: parse_count(tokens[8], line_number, "p90")?,
            p99: parse_count(tokens[9], line_number, "p99")?,
            p99_9: parse_count(tokens[10], line_number, "p99.9")?,
            p99_99: tokens
                .get(11)
                .map(|t| parse_count(t, line_number, "p99.99"))
                .transpose()?,
        })
    }

    /// `None` when the line carries no throughput marker for this workload
    fn parse_throughput_line(&self, line: &str, line_number: usize) -> Option<Result<Sample, ExtractError>> {
        let caps = throughput_pattern()
            .captures_iter(line)
            .find(|caps| &caps["op"] == self.workload.op())?;

        let marker_start = caps.get(0).map_or(0, |m| m.start());
        let timestamp = line[..marker_start]
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join(" ");

        Some(build_sample(&caps, timestamp, line_number))
    }
}

fn build_sample(caps: &Captures<'_>, timestamp: String, line_number: usize) -> Result<Sample, ExtractError> {
    Ok(Sample {
        timestamp,
        throughput: parse_count(&caps["tps"], line_number, "tps")?,
        hit_count: optional_count(caps, "hit", line_number)?,
        miss_count: optional_count(caps, "miss", line_number)?,
        timeout_count: optional_count(caps, "timeouts", line_number)?,
        error_count: optional_count(caps, "errors", line_number)?,
        ..Sample::default()
    })
}

/// `key: value` pair of the configuration header, if the line is one
fn header_entry(line: &str) -> Option<(&str, &str)> {
    if line.starts_with(|c: char| c.is_ascii_digit()) || line.starts_with("hdr:") {
        return None;
    }
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}
