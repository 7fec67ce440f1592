//! Read-only quality scanning of a single batch.

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type};
use arrow::record_batch::RecordBatch;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::rules::{self, OUTLIER_RULES};
use crate::stats::QualityReport;

/// Computes missing, duplicate and outlier counts for a batch.
///
/// The scanner never modifies its input. Rules are evaluated on raw values,
/// before any cleaning, and independently of each other: a row outside the
/// valid range of two rules is counted under both.
///
/// # Example
///
/// ```rust,ignore
/// use term_scrub::scanner::QualityScanner;
///
/// let report = QualityScanner::new().scan(&batch)?;
/// println!("{} duplicates in {} rows", report.duplicate_count, report.total_rows);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QualityScanner;

impl QualityScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scans `batch` and returns its batch-scoped report.
    #[instrument(skip_all, fields(rows = batch.num_rows()))]
    pub fn scan(&self, batch: &RecordBatch) -> Result<QualityReport> {
        let mut report = QualityReport::empty();
        report.total_rows = batch.num_rows() as u64;

        for (field, column) in batch.schema().fields().iter().zip(batch.columns()) {
            report
                .missing_counts
                .insert(field.name().clone(), missing_count(column.as_ref()));
        }

        report.duplicate_count = rules::duplicate_mask(batch)?.true_count() as u64;

        for rule in &OUTLIER_RULES {
            let outliers = rule.evaluate(batch)?.true_count() as u64;
            report.outlier_counts.insert(rule.name.to_string(), outliers);
        }

        debug!(
            duplicates = report.duplicate_count,
            outliers = report.outlier_total(),
            "Scanned batch"
        );
        Ok(report)
    }
}

/// Counts missing cells: nulls, plus `NaN` in floating point columns.
pub fn missing_count(array: &dyn Array) -> u64 {
    let nan_count = match array.data_type() {
        DataType::Float64 => array
            .as_primitive::<Float64Type>()
            .iter()
            .filter(|v| v.is_some_and(f64::is_nan))
            .count(),
        DataType::Float32 => array
            .as_primitive::<Float32Type>()
            .iter()
            .filter(|v| v.is_some_and(f32::is_nan))
            .count(),
        _ => 0,
    };

    (array.logical_null_count() + nan_count) as u64
}
