//! Prelude for commonly used types and traits in term-scrub.

pub use crate::cleaner::{CleaningOutcome, RecordCleaner};
pub use crate::config::{FailurePolicy, InputSource, PipelineConfig};
pub use crate::error::{Result, ScrubError};
pub use crate::formatters::{FormatterConfig, HumanFormatter, JsonFormatter, ReportFormatter};
pub use crate::logging::LogConfig;
pub use crate::pipeline::{BatchProgress, CancellationToken, PipelineDriver};
pub use crate::reader::BatchReader;
pub use crate::scanner::QualityScanner;
pub use crate::stats::{BatchSummary, Mergeable, QualityReport, RunReport, StatsAggregator};
pub use crate::writer::BatchWriter;
