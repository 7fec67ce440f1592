//! Quality statistics and their aggregation across batches and files.
//!
//! Statistics are computed per batch and folded into a run-scoped
//! [`StatsAggregator`]. Every fold is an element-wise sum of counters, so the
//! order in which batches are folded never changes the totals. This is what
//! allows batches or files to be processed independently and combined later.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::rules::OUTLIER_RULES;
use crate::schema;

/// State that can be combined with other states of the same kind.
///
/// Merging must be associative and commutative.
pub trait Mergeable: Sized {
    /// Merges `other` into `self`.
    fn merge_from(&mut self, other: &Self);

    /// Merges any number of states into one.
    fn merge(states: Vec<Self>) -> Self
    where
        Self: Default,
    {
        let mut merged = Self::default();
        for state in &states {
            merged.merge_from(state);
        }
        merged
    }
}

fn add_counts(into: &mut BTreeMap<String, u64>, from: &BTreeMap<String, u64>) {
    for (key, count) in from {
        *into.entry(key.clone()).or_insert(0) += count;
    }
}

/// Missing, duplicate and outlier counts over some scope (batch, file or run).
///
/// All counts refer to rows as they were before cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Number of rows observed.
    pub total_rows: u64,
    /// Missing cells per column.
    pub missing_counts: BTreeMap<String, u64>,
    /// Outlier rows per rule.
    pub outlier_counts: BTreeMap<String, u64>,
    /// Rows repeating an earlier row of the same batch.
    pub duplicate_count: u64,
}

impl QualityReport {
    /// Creates a report with no observed rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sum of outlier counts across rules.
    pub fn outlier_total(&self) -> u64 {
        self.outlier_counts.values().sum()
    }
}

impl Mergeable for QualityReport {
    fn merge_from(&mut self, other: &Self) {
        self.total_rows += other.total_rows;
        add_counts(&mut self.missing_counts, &other.missing_counts);
        add_counts(&mut self.outlier_counts, &other.outlier_counts);
        self.duplicate_count += other.duplicate_count;
    }
}

/// Rows removed by each cleaning step.
///
/// Steps run in order, so a row is attributed to the first step that removed it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCounts {
    /// Rows outside the valid range of any rule.
    pub outlier: u64,
    /// Duplicate rows, including ones that only became identical after normalization.
    pub duplicate: u64,
    /// Rows with a missing or malformed email.
    pub invalid_email: u64,
}

impl DropCounts {
    pub fn total(&self) -> u64 {
        self.outlier + self.duplicate + self.invalid_email
    }
}

/// Row accounting of the cleaning step over some scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningTally {
    /// Rows handed to the cleaner.
    pub input_rows: u64,
    /// Rows that survived cleaning.
    pub output_rows: u64,
    /// Removal breakdown.
    pub dropped: DropCounts,
    /// `is_active` values that could not be coerced to a boolean and were nulled.
    pub invalid_booleans: u64,
}

impl CleaningTally {
    pub fn rows_removed(&self) -> u64 {
        self.input_rows - self.output_rows
    }
}

impl Mergeable for CleaningTally {
    fn merge_from(&mut self, other: &Self) {
        self.input_rows += other.input_rows;
        self.output_rows += other.output_rows;
        self.dropped.outlier += other.dropped.outlier;
        self.dropped.duplicate += other.dropped.duplicate;
        self.dropped.invalid_email += other.dropped.invalid_email;
        self.invalid_booleans += other.invalid_booleans;
    }
}

/// Everything one batch contributes to the run statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub quality: QualityReport,
    pub cleaning: CleaningTally,
}

impl BatchSummary {
    pub fn new(quality: QualityReport, cleaning: CleaningTally) -> Self {
        Self { quality, cleaning }
    }
}

impl Mergeable for BatchSummary {
    fn merge_from(&mut self, other: &Self) {
        self.quality.merge_from(&other.quality);
        self.cleaning.merge_from(&other.cleaning);
    }
}

/// A source file the run gave up on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Run-scoped accumulator of batch statistics.
///
/// Created at the start of a run, fed by [`fold`](Self::fold), and consumed by
/// [`finalize`](Self::finalize). It is an ordinary owned value: concurrent
/// producers either guard it with a lock or build one aggregator each and
/// [`merge`](Self::merge) them at the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsAggregator {
    totals: BatchSummary,
    files_processed: u64,
    batches_written: u64,
    skipped_files: Vec<SkippedFile>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one batch into the running totals.
    pub fn fold(&mut self, summary: &BatchSummary) {
        self.totals.merge_from(summary);
        self.batches_written += 1;
    }

    /// Records that a source file has been fully processed.
    pub fn complete_file(&mut self) {
        self.files_processed += 1;
    }

    /// Records a source file that was abandoned.
    pub fn skip_file(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        self.skipped_files.push(SkippedFile {
            path: path.into(),
            reason: reason.into(),
        });
    }

    /// Combines two aggregators.
    pub fn merge(mut self, other: StatsAggregator) -> StatsAggregator {
        self.totals.merge_from(&other.totals);
        self.files_processed += other.files_processed;
        self.batches_written += other.batches_written;
        self.skipped_files.extend(other.skipped_files);
        self
    }

    /// The running totals.
    pub fn totals(&self) -> &BatchSummary {
        &self.totals
    }

    /// Computes the final report. Ratios are `NaN` when no rows were observed.
    ///
    /// Every schema column and outlier rule appears in the report, with a zero
    /// count if no batch mentioned it.
    pub fn finalize(self, elapsed: Duration, cancelled: bool) -> RunReport {
        let mut quality = self.totals.quality;
        for column in schema::COLUMNS {
            quality.missing_counts.entry(column.to_string()).or_insert(0);
        }
        for rule in &OUTLIER_RULES {
            quality.outlier_counts.entry(rule.name.to_string()).or_insert(0);
        }
        let cleaning = self.totals.cleaning;
        let total = quality.total_rows;

        RunReport {
            total_rows: total,
            processed_rows: cleaning.output_rows,
            deleted_rows: cleaning.rows_removed(),
            missing_ratio: ratios(&quality.missing_counts, total),
            missing_counts: quality.missing_counts,
            outlier_ratio: ratios(&quality.outlier_counts, total),
            outlier_counts: quality.outlier_counts,
            duplicate_counts: quality.duplicate_count,
            duplicate_ratio: ratio(quality.duplicate_count, total),
            dropped: cleaning.dropped,
            invalid_booleans: cleaning.invalid_booleans,
            files_processed: self.files_processed,
            batches_written: self.batches_written,
            skipped_files: self.skipped_files,
            cancelled,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }
}

/// `count / total`, or `NaN` for an empty scope.
pub fn ratio(count: u64, total: u64) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        count as f64 / total as f64
    }
}

fn ratios(counts: &BTreeMap<String, u64>, total: u64) -> BTreeMap<String, f64> {
    counts
        .iter()
        .map(|(key, count)| (key.clone(), ratio(*count, total)))
        .collect()
}

/// The final quality report of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Rows read before cleaning.
    pub total_rows: u64,
    /// Rows written after cleaning.
    pub processed_rows: u64,
    /// Rows removed by cleaning.
    pub deleted_rows: u64,
    pub missing_counts: BTreeMap<String, u64>,
    pub missing_ratio: BTreeMap<String, f64>,
    pub outlier_counts: BTreeMap<String, u64>,
    pub outlier_ratio: BTreeMap<String, f64>,
    pub duplicate_counts: u64,
    pub duplicate_ratio: f64,
    /// Breakdown of `deleted_rows` by cleaning step.
    pub dropped: DropCounts,
    pub invalid_booleans: u64,
    pub files_processed: u64,
    pub batches_written: u64,
    pub skipped_files: Vec<SkippedFile>,
    /// True if the run stopped early on request.
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(rows: u64, email_missing: u64, age_outliers: u64, duplicates: u64) -> QualityReport {
        QualityReport {
            total_rows: rows,
            missing_counts: BTreeMap::from([
                ("email".to_string(), email_missing),
                ("age".to_string(), 0),
            ]),
            outlier_counts: BTreeMap::from([("age".to_string(), age_outliers)]),
            duplicate_count: duplicates,
        }
    }

    fn summary(rows: u64, kept: u64) -> BatchSummary {
        BatchSummary::new(
            report(rows, rows / 4, rows / 5, rows / 10),
            CleaningTally {
                input_rows: rows,
                output_rows: kept,
                dropped: DropCounts {
                    outlier: rows - kept,
                    duplicate: 0,
                    invalid_email: 0,
                },
                invalid_booleans: 1,
            },
        )
    }

    #[test]
    fn test_fold_order_does_not_matter() {
        let batches = [summary(100, 90), summary(40, 40), summary(7, 3)];

        let mut forward = StatsAggregator::new();
        batches.iter().for_each(|b| forward.fold(b));

        let mut backward = StatsAggregator::new();
        batches.iter().rev().for_each(|b| backward.fold(b));

        assert_eq!(forward, backward);
        assert_eq!(forward.totals().quality.total_rows, 147);
        assert_eq!(forward.totals().cleaning.output_rows, 133);
    }

    #[test]
    fn test_merge_matches_sequential_fold() {
        let batches = [summary(10, 9), summary(20, 15), summary(30, 30)];

        let mut sequential = StatsAggregator::new();
        batches.iter().for_each(|b| sequential.fold(b));

        let mut left = StatsAggregator::new();
        left.fold(&batches[2]);
        let mut right = StatsAggregator::new();
        right.fold(&batches[0]);
        right.fold(&batches[1]);

        assert_eq!(left.merge(right), sequential);
    }

    #[test]
    fn test_merge_of_states_sums_counters() {
        let merged = QualityReport::merge(vec![report(10, 1, 2, 3), report(5, 1, 0, 0)]);

        assert_eq!(merged.total_rows, 15);
        assert_eq!(merged.missing_counts["email"], 2);
        assert_eq!(merged.outlier_counts["age"], 2);
        assert_eq!(merged.duplicate_count, 3);
    }

    #[test]
    fn test_finalize_ratios() {
        let mut aggregator = StatsAggregator::new();
        aggregator.fold(&summary(200, 180));
        aggregator.complete_file();

        let report = aggregator.finalize(Duration::from_millis(1500), false);

        assert_eq!(report.total_rows, 200);
        assert_eq!(report.processed_rows, 180);
        assert_eq!(report.deleted_rows, 20);
        assert_eq!(report.missing_ratio["email"], 50.0 / 200.0);
        assert_eq!(report.outlier_ratio["age"], 40.0 / 200.0);
        assert_eq!(report.duplicate_ratio, 20.0 / 200.0);
        assert_eq!(report.files_processed, 1);
        assert_eq!(report.batches_written, 1);
        assert_eq!(report.elapsed_secs, 1.5);
    }

    #[test]
    fn test_finalize_with_no_rows_reports_nan() {
        let mut aggregator = StatsAggregator::new();
        aggregator.fold(&BatchSummary::new(report(0, 0, 0, 0), CleaningTally::default()));

        let report = aggregator.finalize(Duration::ZERO, false);

        assert_eq!(report.total_rows, 0);
        assert!(report.duplicate_ratio.is_nan());
        assert!(report.missing_ratio["email"].is_nan());
        assert!(report.outlier_ratio["age"].is_nan());
    }

    #[test]
    fn test_finalize_lists_every_column_and_rule() {
        let report = StatsAggregator::new().finalize(Duration::ZERO, false);

        assert_eq!(report.missing_counts.len(), schema::COLUMNS.len());
        assert_eq!(report.missing_counts["phone_number"], 0);
        assert!(report.missing_ratio["phone_number"].is_nan());
        assert_eq!(report.outlier_counts.len(), OUTLIER_RULES.len());
        assert!(report.outlier_ratio["credit_score"].is_nan());
    }

    #[test]
    fn test_skipped_files_are_reported() {
        let mut aggregator = StatsAggregator::new();
        aggregator.skip_file("data/part-0004.parquet", "Source unavailable");

        let report = aggregator.finalize(Duration::ZERO, true);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.skipped_files[0].reason, "Source unavailable");
        assert!(report.cancelled);
    }
}
