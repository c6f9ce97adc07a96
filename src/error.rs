//! # Extraction Error Taxonomy
//!
//! Every failure the extraction layer can observe is isolated to the smallest
//! unit it affects: a single line, a single file, or (for join misses) a
//! single row. None of these variants aborts a batch.
//!
//! | Variant                      | Scope | Batch behavior                  |
//! |------------------------------|-------|---------------------------------|
//! | `UnrecognizedFilename`       | file  | skip, log at warn, continue     |
//! | `MalformedIdentifier`        | file  | skip, log at error, continue    |
//! | `Io`                         | file  | skip, log at error, continue    |
//! | `MalformedDataLine`          | line  | skip line, continue file        |
//! | `EmptySampleOnHistogramLine` | line  | drop line (strict: fail file)   |
//!
//! Keys present in only one source are not errors; see
//! [`crate::correlator::Correlation`].

use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while turning benchmark artifacts into records
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The filename does not follow any known benchmark naming pattern
    #[error("unrecognized benchmark filename: {filename}")]
    UnrecognizedFilename { filename: String },

    /// The filename matched a pattern but a numeric group did not fit
    #[error("malformed {field} in filename {filename}: {source}")]
    MalformedIdentifier {
        filename: String,
        field: &'static str,
        #[source]
        source: ParseIntError,
    },

    /// A data line looked relevant but could not be parsed
    #[error("line {line_number}: {reason}")]
    MalformedDataLine { line_number: usize, reason: String },

    /// A histogram line arrived before any throughput line
    #[error("line {line_number}: histogram line has no preceding throughput sample")]
    EmptySampleOnHistogramLine { line_number: usize },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    /// Whether the file should be skipped quietly rather than reported as broken
    pub fn is_skippable(&self) -> bool {
        matches!(self, ExtractError::UnrecognizedFilename { .. })
    }

    /// Whether the error concerns one line rather than a whole file
    pub fn is_line_level(&self) -> bool {
        matches!(
            self,
            ExtractError::MalformedDataLine { .. } | ExtractError::EmptySampleOnHistogramLine { .. }
        )
    }

    pub(crate) fn malformed_line(line_number: usize, reason: impl Into<String>) -> Self {
        ExtractError::MalformedDataLine {
            line_number,
            reason: reason.into(),
        }
    }
}

/// A file-level record together with the non-fatal issues met while building it
#[derive(Debug)]
pub struct Parsed<T> {
    pub record: T,
    pub issues: Vec<ExtractError>,
}

impl<T> Parsed<T> {
    pub fn new(record: T, issues: Vec<ExtractError>) -> Self {
        Self { record, issues }
    }

    /// Transform the record while keeping the collected issues
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Parsed<U> {
        Parsed {
            record: f(self.record),
            issues: self.issues,
        }
    }
}
