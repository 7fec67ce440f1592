//! Rendering of run reports.
//!
//! A finished run produces a [`RunReport`]; the formatters here turn it into
//! text for a terminal or into JSON for other tools.
//!
//! # Examples
//!
//! ```rust,ignore
//! use term_scrub::formatters::{HumanFormatter, ReportFormatter};
//!
//! let report = driver.run()?;
//! println!("{}", HumanFormatter::new().format(&report)?);
//! ```

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::error::{Result, ScrubError};
use crate::rules::OUTLIER_RULES;
use crate::schema::COLUMNS;
use crate::stats::RunReport;

/// Options shared by the formatters.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the per-step drop breakdown and file bookkeeping
    pub include_details: bool,
    /// Include the list of skipped files
    pub include_skipped: bool,
    /// Decimal places used for ratios in human output
    pub ratio_precision: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_details: true,
            include_skipped: true,
            ratio_precision: 6,
        }
    }
}

impl FormatterConfig {
    /// Only the quality evaluation block.
    pub fn minimal() -> Self {
        Self {
            include_details: false,
            include_skipped: false,
            ratio_precision: 6,
        }
    }

    pub fn with_details(mut self, include: bool) -> Self {
        self.include_details = include;
        self
    }

    pub fn with_ratio_precision(mut self, precision: usize) -> Self {
        self.ratio_precision = precision;
        self
    }
}

/// Converts a run report into a string representation.
pub trait ReportFormatter {
    /// Formats `report` with the formatter's own configuration.
    fn format(&self, report: &RunReport) -> Result<String>;

    /// Formats `report` with an explicit configuration.
    fn format_with_config(&self, report: &RunReport, _config: &FormatterConfig) -> Result<String> {
        self.format(report)
    }
}

/// Formats reports as JSON.
///
/// Ratios over an empty run are `NaN`, which JSON cannot represent; they are
/// emitted as `null`.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &RunReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &RunReport, config: &FormatterConfig) -> Result<String> {
        let mut value = serde_json::to_value(report)
            .map_err(|e| ScrubError::Serialization(format!("Failed to serialize report: {e}")))?;

        if let Some(object) = value.as_object_mut() {
            if !config.include_details {
                for key in [
                    "dropped",
                    "invalid_booleans",
                    "files_processed",
                    "batches_written",
                ] {
                    object.remove(key);
                }
            }
            if !config.include_skipped {
                object.remove("skipped_files");
            }
        }

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        rendered.map_err(|e| ScrubError::Serialization(format!("Failed to serialize report: {e}")))
    }
}

/// Formats reports as plain text for the console.
///
/// Columns are listed in schema order, followed by any column the schema
/// does not name. Outlier rules appear in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &RunReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &RunReport, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        render_human(&mut output, report, config)
            .map_err(|e| ScrubError::Internal(format!("Failed to render report: {e}")))?;
        Ok(output)
    }
}

fn render_human(out: &mut String, report: &RunReport, config: &FormatterConfig) -> std::fmt::Result {
    let precision = config.ratio_precision;
    let column_order = column_order(report.missing_counts.keys());
    let rule_order: Vec<&str> = OUTLIER_RULES.iter().map(|rule| rule.name).collect();

    writeln!(out)?;
    writeln!(out, "=== data quality evaluation ===")?;
    if report.cancelled {
        writeln!(out, "(run cancelled, partial results)")?;
    }
    writeln!(out, "total_rows: {}", report.total_rows)?;
    writeln!(out, "processed_rows: {}", report.processed_rows)?;
    writeln!(out, "deleted_rows: {}", report.deleted_rows)?;

    writeln!(out, "missing_counts:")?;
    write_counts(out, &column_order, &report.missing_counts)?;
    writeln!(out, "missing_ratio:")?;
    write_ratios(out, &column_order, &report.missing_ratio, precision)?;
    writeln!(out, "outlier_counts:")?;
    write_counts(out, &rule_order, &report.outlier_counts)?;
    writeln!(out, "outlier_ratio:")?;
    write_ratios(out, &rule_order, &report.outlier_ratio, precision)?;

    writeln!(out, "duplicate_counts: {}", report.duplicate_counts)?;
    writeln!(
        out,
        "duplicate_ratio: {}",
        format_ratio(report.duplicate_ratio, precision)
    )?;

    if config.include_details {
        writeln!(out)?;
        writeln!(out, "dropped:")?;
        writeln!(out, "  outlier: {}", report.dropped.outlier)?;
        writeln!(out, "  duplicate: {}", report.dropped.duplicate)?;
        writeln!(out, "  invalid_email: {}", report.dropped.invalid_email)?;
        writeln!(out, "invalid_booleans: {}", report.invalid_booleans)?;
        writeln!(out, "files_processed: {}", report.files_processed)?;
        writeln!(out, "batches_written: {}", report.batches_written)?;
    }

    if config.include_skipped && !report.skipped_files.is_empty() {
        writeln!(out, "skipped_files:")?;
        for skipped in &report.skipped_files {
            writeln!(out, "  {}: {}", skipped.path.display(), skipped.reason)?;
        }
    }

    writeln!(out, "processing time: {:.2} seconds", report.elapsed_secs)?;
    Ok(())
}

fn column_order<'a>(present: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let present: Vec<&str> = present.map(String::as_str).collect();
    let mut order: Vec<&str> = COLUMNS
        .iter()
        .copied()
        .filter(|column| present.contains(column))
        .collect();
    order.extend(
        present
            .iter()
            .copied()
            .filter(|column| !COLUMNS.contains(column)),
    );
    order
}

fn write_counts(out: &mut String, order: &[&str], counts: &BTreeMap<String, u64>) -> std::fmt::Result {
    let width = label_width(order);
    for key in order {
        if let Some(count) = counts.get(*key) {
            writeln!(out, "  {key:<width$} {count}")?;
        }
    }
    Ok(())
}

fn write_ratios(
    out: &mut String,
    order: &[&str],
    ratios: &BTreeMap<String, f64>,
    precision: usize,
) -> std::fmt::Result {
    let width = label_width(order);
    for key in order {
        if let Some(ratio) = ratios.get(*key) {
            writeln!(out, "  {key:<width$} {}", format_ratio(*ratio, precision))?;
        }
    }
    Ok(())
}

fn label_width(order: &[&str]) -> usize {
    order.iter().map(|key| key.len()).max().unwrap_or(0)
}

fn format_ratio(ratio: f64, precision: usize) -> String {
    if ratio.is_nan() {
        "NaN".to_string()
    } else {
        format!("{ratio:.precision$}")
    }
}
