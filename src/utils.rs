//! # Utility Functions and Helper Module
//!
//! Small numeric and formatting helpers shared by the aggregation, output
//! and console layers.
//!
//! ## Key Functionality Categories
//!
//! - **Statistics**: mean/min/max/stddev over extracted series
//! - **Rounding**: two-decimal rounding used for tabular output
//! - **Formatting**: human-readable latency, throughput and storage values
//! - **Display Helpers**: plain console tables for the batch summary
//!
//! ## Usage Examples
//!
//! ```rust
//! use kvbench_extract::utils::*;
//!
//! assert_eq!(format_latency_us(1500.0), "1.50ms");
//! assert_eq!(format_tps(15500.0), "15.50K tps");
//! assert_eq!(round2(1.23456), 1.23);
//! ```

/// Calculate statistics from a slice of values
///
/// Returns `(mean, min, max, standard_deviation)`.
///
/// ## Empty Dataset Handling
///
/// An empty slice yields `(0.0, 0.0, 0.0, 0.0)`. Downstream tables treat a
/// zero as "no data" rather than carrying nulls.
///
/// ## Standard Deviation Calculation
///
/// Uses the population standard deviation formula:
/// σ = √(Σ(x - μ)² / N)
///
/// ## Examples
///
/// ```rust
/// # use kvbench_extract::utils::calculate_stats;
/// let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// let (mean, min, max, std_dev) = calculate_stats(&values);
/// assert_eq!(mean, 3.0);
/// assert_eq!(min, 1.0);
/// assert_eq!(max, 5.0);
/// // std_dev ≈ 1.414
/// ```
pub fn calculate_stats(values: &[f64]) -> (f64, f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }

    let sum: f64 = values.iter().sum();
    let count = values.len() as f64;
    let mean = sum / count;

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count;
    let std_dev = variance.sqrt();

    (mean, min, max, std_dev)
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a latency given in microseconds
///
/// ## Scaling
///
/// - Microseconds: < 1,000 (e.g., "750.00μs")
/// - Milliseconds: < 1,000,000 (e.g., "1.50ms")
/// - Seconds: ≥ 1,000,000 (e.g., "2.00s")
///
/// ```rust
/// # use kvbench_extract::utils::format_latency_us;
/// assert_eq!(format_latency_us(750.0), "750.00μs");
/// assert_eq!(format_latency_us(2_000_000.0), "2.00s");
/// ```
pub fn format_latency_us(us: f64) -> String {
    if us < 1000.0 {
        format!("{:.2}μs", us)
    } else if us < 1_000_000.0 {
        format!("{:.2}ms", us / 1000.0)
    } else {
        format!("{:.2}s", us / 1_000_000.0)
    }
}

/// Format a transaction rate
///
/// Uses decimal scaling (powers of 1000), mirroring how the harness
/// reports throughput.
pub fn format_tps(tps: f64) -> String {
    if tps < 1000.0 {
        format!("{:.0} tps", tps)
    } else if tps < 1_000_000.0 {
        format!("{:.2}K tps", tps / 1000.0)
    } else {
        format!("{:.2}M tps", tps / 1_000_000.0)
    }
}

/// Format a storage size given in megabytes
pub fn format_size_mb(mb: f64) -> String {
    if mb < 1024.0 {
        format!("{:.2} MB", mb)
    } else {
        format!("{:.2} GB", mb / 1024.0)
    }
}

/// Print a table row with fixed column widths
///
/// ```text
/// | Configuration      | Avg TPS    | Avg p99    |
/// ```
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    print!("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        print!(" {:width$} |", column, width = width);
    }
    println!();
}

/// Print a table separator matching `print_table_row` widths
pub fn print_table_separator(widths: &[usize]) {
    print!("+");
    for &width in widths {
        print!("{}", "-".repeat(width + 2));
        print!("+");
    }
    println!();
}
