//! # term-scrub - Streaming Quality Checks and Cleaning for Parquet
//!
//! term-scrub reads a collection of Parquet files in bounded batches,
//! measures the quality of every batch, removes or repairs defective records
//! and writes each cleaned batch as its own Parquet artifact. When every file
//! has been processed it reports run-wide quality statistics.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use term_scrub::prelude::*;
//!
//! # fn example() -> Result<()> {
//! let config = PipelineConfig::new(
//!     InputSource::numbered("30G_data/part-000{index}.parquet", 16),
//!     "new_data",
//! )
//! .with_batch_size(1_000_000);
//!
//! let report = PipelineDriver::new(config).run()?;
//! println!("{}", HumanFormatter::new().format(&report)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## What a run does
//!
//! For every batch, in order:
//!
//! 1. [`QualityScanner`](scanner::QualityScanner) counts missing cells per
//!    column, duplicate rows and outliers per rule.
//! 2. [`RecordCleaner`](cleaner::RecordCleaner) removes outliers, duplicates
//!    and rows with malformed e-mails, and normalizes datetimes, genders and
//!    the activity flag.
//! 3. [`BatchWriter`](writer::BatchWriter) persists the cleaned batch.
//! 4. [`StatsAggregator`](stats::StatsAggregator) folds the batch statistics
//!    into the run totals.
//!
//! Defective rows never fail a run. A file that cannot be read is skipped
//! or aborts the run, depending on the [`FailurePolicy`](config::FailurePolicy).
//!
//! ## Architecture
//!
//! - **`schema`**: the expected columns and their vocabularies
//! - **`rules`**: the outlier, duplicate and e-mail predicates shared by
//!   scanning and cleaning
//! - **`reader`** / **`writer`**: batch-wise Parquet I/O
//! - **`scanner`** / **`cleaner`**: per-batch measurement and repair
//! - **`stats`**: mergeable statistics and the final report
//! - **`pipeline`**: the driver tying everything together
//! - **`formatters`**: human and JSON rendering of reports

pub mod cleaner;
pub mod config;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod reader;
pub mod rules;
pub mod scanner;
pub mod schema;
pub mod stats;
pub mod writer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

// Re-export commonly used types
pub use arrow;
pub use parquet;
