//! # Benchmark Identifier Parsing
//!
//! The load-test harness encodes the parameters of each run in the artifact
//! filename. This module recovers them as a [`ConfigKey`], the join key used
//! by every later stage of the pipeline.
//!
//! ## Recognized Shapes
//!
//! - `<prefix>_<pct>pct_<size>B_thr<threads>_<timestamp>[_<suffix>][.ext]`
//! - `<prefix>_<pct>pct_<last>lastperc_<size>B_thr<threads>[_<timestamp>][.ext]`
//! - `prefill_<pct>pct_<size>B_<threads>threads[.ext]`
//!
//! A run timestamp may span several numeric parts (`20250501_101010`); any
//! non-numeric `_<suffix>` after it is ignored.
//!
//! A name that fits none of these is reported as
//! [`ExtractError::UnrecognizedFilename`]. A name that fits but carries a
//! numeric group too large for its field is a
//! [`ExtractError::MalformedIdentifier`].

use crate::error::ExtractError;
use clap::ValueEnum;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Benchmark parameters that uniquely identify one run
///
/// Field order doubles as the sort order: fill level, then record size,
/// then thread count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigKey {
    pub fill_percentage: u32,
    pub record_size_bytes: u64,
    pub thread_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fill_percentage: Option<u32>,
}

impl ConfigKey {
    pub fn new(fill_percentage: u32, record_size_bytes: u64, thread_count: u32) -> Self {
        Self {
            fill_percentage,
            record_size_bytes,
            thread_count,
            last_fill_percentage: None,
        }
    }

    /// Attach the fill level the database was at before this run
    pub fn with_last_fill(mut self, last_fill_percentage: u32) -> Self {
        self.last_fill_percentage = Some(last_fill_percentage);
        self
    }

    pub fn size_kb(&self) -> f64 {
        self.record_size_bytes as f64 / 1024.0
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}pct_", self.fill_percentage)?;
        if let Some(last) = self.last_fill_percentage {
            write!(f, "{}lastperc_", last)?;
        }
        write!(f, "{}B_thr{}", self.record_size_bytes, self.thread_count)
    }
}

/// Which side of the store the benchmark exercised
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    Read,
    Write,
}

impl Workload {
    /// Operation token used by the harness in throughput and histogram lines
    pub fn op(&self) -> &'static str {
        match self {
            Workload::Read => "read",
            Workload::Write => "write",
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op())
    }
}

/// Which filename shape produced an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// `<prefix>_<pct>pct_<size>B_thr<threads>_<timestamp>`
    Run,
    /// `<prefix>_<pct>pct_<last>lastperc_<size>B_thr<threads>`
    LastFill,
    /// `prefill_<pct>pct_<size>B_<threads>threads`
    Prefill,
}

/// Everything recovered from an artifact filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub key: ConfigKey,
    pub prefix: String,
    pub timestamp: Option<String>,
    pub kind: IdentifierKind,
}

fn last_fill_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<prefix>[A-Za-z0-9_]+?)_(?P<pct>\d+)pct_(?P<last>\d+)lastperc_(?P<size>\d+)B_thr(?P<threads>\d+)(?:_(?P<ts>\d+))?(?:\.[A-Za-z0-9]+)?$",
        )
        .expect("last-fill filename pattern is valid")
    })
}

fn run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<prefix>[A-Za-z0-9_]+?)_(?P<pct>\d+)pct_(?P<size>\d+)B_thr(?P<threads>\d+)_(?P<ts>\d+(?:_\d+)*)(?:_[A-Za-z0-9_]+)?(?:\.[A-Za-z0-9]+)?$",
        )
        .expect("run filename pattern is valid")
    })
}

fn prefill_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^prefill_(?P<pct>\d+)pct_(?P<size>\d+)B_(?P<threads>\d+)threads(?:\.[A-Za-z0-9]+)?$",
        )
        .expect("prefill filename pattern is valid")
    })
}

/// Fill level a prefill run started from
///
/// Prefill logs are named only by their target level; the harness fills in
/// fixed steps, so the starting level follows from the target.
pub fn previous_fill_level(target: u32) -> u32 {
    match target {
        50 => 25,
        75 => 50,
        _ => 0,
    }
}

fn numeric_group<T>(caps: &Captures<'_>, name: &str, field: &'static str, filename: &str) -> Result<T, ExtractError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    // Only called for groups that are mandatory in the matched pattern.
    let text = caps.name(name).map(|m| m.as_str()).unwrap_or_default();
    text.parse::<T>().map_err(|source| ExtractError::MalformedIdentifier {
        filename: filename.to_string(),
        field,
        source,
    })
}

fn key_from(caps: &Captures<'_>, filename: &str) -> Result<ConfigKey, ExtractError> {
    Ok(ConfigKey::new(
        numeric_group(caps, "pct", "fill percentage", filename)?,
        numeric_group(caps, "size", "record size", filename)?,
        numeric_group(caps, "threads", "thread count", filename)?,
    ))
}

/// Parse the benchmark parameters out of a filename or path
///
/// Only the final path component is considered.
pub fn parse_filename(filename: &str) -> Result<Identifier, ExtractError> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    if let Some(caps) = last_fill_pattern().captures(name) {
        let last = numeric_group(&caps, "last", "last fill percentage", name)?;
        return Ok(Identifier {
            key: key_from(&caps, name)?.with_last_fill(last),
            prefix: caps["prefix"].to_string(),
            timestamp: caps.name("ts").map(|m| m.as_str().to_string()),
            kind: IdentifierKind::LastFill,
        });
    }

    if let Some(caps) = run_pattern().captures(name) {
        return Ok(Identifier {
            key: key_from(&caps, name)?,
            prefix: caps["prefix"].to_string(),
            timestamp: caps.name("ts").map(|m| m.as_str().to_string()),
            kind: IdentifierKind::Run,
        });
    }

    if let Some(caps) = prefill_pattern().captures(name) {
        let key = key_from(&caps, name)?;
        let last = previous_fill_level(key.fill_percentage);
        return Ok(Identifier {
            key: key.with_last_fill(last),
            prefix: "prefill".to_string(),
            timestamp: None,
            kind: IdentifierKind::Prefill,
        });
    }

    Err(ExtractError::UnrecognizedFilename {
        filename: name.to_string(),
    })
}
