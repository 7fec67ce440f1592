//! The batch pipeline: read, scan, clean, write, fold.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use tracing::{debug, error, info, instrument, warn};

use crate::cleaner::RecordCleaner;
use crate::config::{FailurePolicy, PipelineConfig};
use crate::error::Result;
use crate::logging::truncate_field;
use crate::reader::BatchReader;
use crate::scanner::QualityScanner;
use crate::stats::{BatchSummary, RunReport, StatsAggregator};
use crate::writer::BatchWriter;
use crate::{log_batch, log_file};

/// A shared flag asking a running pipeline to stop.
///
/// Clones share the same flag. The driver checks it between batches, so a
/// batch already in progress is always finished and written.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress information emitted after each batch is written and folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub file_index: usize,
    pub batch_index: usize,
    pub rows: u64,
    pub kept: u64,
}

/// Callback receiving [`BatchProgress`] updates.
pub type ProgressCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;

/// Statistics of one source file, and whether it was read to the end.
struct FileRun {
    stats: StatsAggregator,
    completed: bool,
}

/// Drives a run over every configured source file.
///
/// Files are processed in the order the input source resolves them, and the
/// batches of a file in reading order. Each batch is scanned, cleaned,
/// written as its own artifact and folded into the statistics. Only one
/// batch is held in memory at a time.
///
/// # Examples
///
/// ```rust,no_run
/// use term_scrub::config::{InputSource, PipelineConfig};
/// use term_scrub::formatters::{HumanFormatter, ReportFormatter};
/// use term_scrub::pipeline::PipelineDriver;
///
/// # fn example() -> term_scrub::error::Result<()> {
/// let config = PipelineConfig::new(
///     InputSource::numbered("30G_data/part-000{index}.parquet", 16),
///     "new_data",
/// );
/// let report = PipelineDriver::new(config).run()?;
/// println!("{}", HumanFormatter::new().format(&report)?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PipelineDriver {
    config: PipelineConfig,
    scanner: QualityScanner,
    cleaner: RecordCleaner,
    cancellation: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for PipelineDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineDriver")
            .field("config", &self.config)
            .field("cancellation", &self.cancellation)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineDriver {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            scanner: QualityScanner::new(),
            cleaner: RecordCleaner::new(),
            cancellation: CancellationToken::new(),
            progress_callback: None,
        }
    }

    /// Uses `token` to observe cancellation requests.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Calls `callback` after every batch is written and folded.
    ///
    /// The callback runs on the pipeline thread before the next cancellation
    /// check, so cancelling from inside it stops the run after that batch.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// A handle that cancels this driver's runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline and returns the run report.
    ///
    /// With [`FailurePolicy::SkipFile`] a source file that cannot be opened,
    /// decoded or matched against the schema is listed in the report's
    /// `skipped_files`. Its statistics are discarded, but artifacts already
    /// written for it stay on disk. With [`FailurePolicy::Abort`] the first
    /// such error is returned. Configuration and write errors always end the
    /// run.
    #[instrument(skip(self), fields(
        output_dir = %self.config.output_dir.display(),
        batch_size = self.config.batch_size,
    ))]
    pub fn run(&self) -> Result<RunReport> {
        self.config.validate()?;
        let files = self.config.input.resolve()?;
        let writer = BatchWriter::new(&self.config.output_dir, &self.config.output_prefix)?;

        info!(files = files.len(), "Starting scrub run");
        let start_time = Instant::now();
        let mut run = StatsAggregator::new();
        let mut cancelled = false;

        for (file_index, path) in files.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                cancelled = true;
                break;
            }

            match self.process_file(&writer, file_index, path) {
                Ok(file) => {
                    run = run.merge(file.stats);
                    if !file.completed {
                        cancelled = true;
                        break;
                    }
                }
                Err(e)
                    if e.is_file_scoped()
                        && self.config.failure_policy == FailurePolicy::SkipFile =>
                {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Skipping source file"
                    );
                    run.skip_file(path, e.to_string());
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Aborting scrub run");
                    return Err(e);
                }
            }
        }

        if cancelled {
            warn!("Scrub run cancelled, report covers folded batches only");
        }

        let report = run.finalize(start_time.elapsed(), cancelled);
        info!(
            total_rows = report.total_rows,
            processed_rows = report.processed_rows,
            deleted_rows = report.deleted_rows,
            files_processed = report.files_processed,
            skipped_files = report.skipped_files.len(),
            elapsed_secs = report.elapsed_secs,
            "Scrub run completed"
        );
        Ok(report)
    }

    fn process_file(&self, writer: &BatchWriter, file_index: usize, path: &Path) -> Result<FileRun> {
        let mut reader = BatchReader::open(path, self.config.batch_size)?;
        log_file!(
            self.config.log,
            path = %truncate_field(&path.display().to_string(), self.config.log.max_field_length),
            rows = reader.total_rows(),
            "Processing file"
        );

        let mut stats = StatsAggregator::new();
        let mut batch_index = 0;
        loop {
            if self.cancellation.is_cancelled() {
                return Ok(FileRun {
                    stats,
                    completed: false,
                });
            }
            let Some(batch) = reader.next() else {
                break;
            };

            let started = Instant::now();
            let summary = self.process_batch(writer, batch?, file_index, batch_index)?;
            stats.fold(&summary);

            debug!(
                file_index,
                batch_index,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Batch time"
            );
            log_batch!(
                self.config.log,
                file_index,
                batch_index,
                rows = summary.cleaning.input_rows,
                kept = summary.cleaning.output_rows,
                "Processed batch"
            );
            if let Some(callback) = &self.progress_callback {
                callback(BatchProgress {
                    file_index,
                    batch_index,
                    rows: summary.cleaning.input_rows,
                    kept: summary.cleaning.output_rows,
                });
            }
            batch_index += 1;
        }

        stats.complete_file();
        Ok(FileRun {
            stats,
            completed: true,
        })
    }

    fn process_batch(
        &self,
        writer: &BatchWriter,
        batch: RecordBatch,
        file_index: usize,
        batch_index: usize,
    ) -> Result<BatchSummary> {
        let quality = self.scanner.scan(&batch)?;
        let outcome = self.cleaner.clean(batch)?;
        writer.write(&outcome.cleaned, file_index, batch_index)?;
        Ok(BatchSummary::new(quality, outcome.tally))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputSource;
    use crate::error::ScrubError;
    use crate::test_fixtures::{batch_from_rows, dirty_rows, raw_schema, write_parquet, SampleRow};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_rows(dir: &TempDir, name: &str, rows: &[SampleRow]) -> PathBuf {
        let path = dir.path().join(name);
        write_parquet(&path, raw_schema(), &[batch_from_rows(rows)]).unwrap();
        path
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_run_over_one_dirty_file() {
        let dir = TempDir::new().unwrap();
        let (rows, survivors) = dirty_rows();
        let input = write_rows(&dir, "part-00.parquet", &rows);
        let out = dir.path().join("out");

        let config = PipelineConfig::new(InputSource::paths(vec![input]), &out);
        let report = PipelineDriver::new(config).run().unwrap();

        assert_eq!(report.total_rows, rows.len() as u64);
        assert_eq!(report.processed_rows, survivors as u64);
        assert_eq!(report.deleted_rows, (rows.len() - survivors) as u64);
        assert_eq!(report.files_processed, 1);
        assert_eq!(report.batches_written, 1);
        assert!(!report.cancelled);
        assert!(out.join("cleaned_batch_0_0.parquet").exists());
    }

    #[test]
    fn test_missing_file_is_skipped_by_default() {
        let dir = TempDir::new().unwrap();
        let present = write_rows(&dir, "a.parquet", &[SampleRow::valid(1)]);
        let missing = dir.path().join("b.parquet");

        let config = PipelineConfig::new(
            InputSource::paths(vec![missing.clone(), present]),
            dir.path().join("out"),
        );
        let report = PipelineDriver::new(config).run().unwrap();

        assert_eq!(report.files_processed, 1);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.skipped_files[0].path, missing);
        assert_eq!(report.total_rows, 1);
    }

    #[test]
    fn test_missing_file_aborts_under_abort_policy() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::new(
            InputSource::paths(vec![dir.path().join("absent.parquet")]),
            dir.path().join("out"),
        )
        .with_failure_policy(FailurePolicy::Abort);

        let err = PipelineDriver::new(config).run().unwrap_err();
        assert!(matches!(err, ScrubError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_invalid_config_fails_before_any_work() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let config =
            PipelineConfig::new(InputSource::paths(vec![]), &out).with_batch_size(0);

        let err = PipelineDriver::new(config).run().unwrap_err();
        assert!(matches!(err, ScrubError::Configuration(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_cancelled_before_start_reports_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_rows(&dir, "a.parquet", &[SampleRow::valid(1)]);
        let out = dir.path().join("out");

        let driver = PipelineDriver::new(PipelineConfig::new(InputSource::paths(vec![input]), &out));
        driver.cancellation_token().cancel();
        let report = driver.run().unwrap();

        assert!(report.cancelled);
        assert_eq!(report.total_rows, 0);
        assert_eq!(report.batches_written, 0);
        assert!(report.duplicate_ratio.is_nan());
        assert!(!out.join("cleaned_batch_0_0.parquet").exists());
    }

    #[test]
    fn test_cancel_between_batches_keeps_written_artifacts() {
        let dir = TempDir::new().unwrap();
        let rows: Vec<SampleRow> = (0..6).map(SampleRow::valid).collect();
        let input = write_rows(&dir, "a.parquet", &rows);
        let out = dir.path().join("out");

        let config = PipelineConfig::new(InputSource::paths(vec![input]), &out).with_batch_size(2);
        let token = CancellationToken::new();
        let cancel = token.clone();
        let driver = PipelineDriver::new(config)
            .with_cancellation(token)
            .with_progress_callback(move |progress| {
                if progress.batch_index == 0 {
                    cancel.cancel();
                }
            });
        let report = driver.run().unwrap();

        assert!(report.cancelled);
        assert_eq!(report.batches_written, 1);
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.files_processed, 0);
        assert!(out.join("cleaned_batch_0_0.parquet").exists());
        assert!(!out.join("cleaned_batch_0_1.parquet").exists());
    }
}
