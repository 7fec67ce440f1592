//! Lazy, memory-bounded batch reading of Parquet sources.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use tracing::{debug, instrument};

use crate::error::{Result, ScrubError};
use crate::schema;

/// Yields a Parquet file as a sequence of record batches.
///
/// At most `batch_size` rows are decoded at a time. The reader moves forward
/// only: once a batch has been yielded it cannot be read again, and a fresh
/// reader must be opened to start over. The file's row count is known as
/// soon as the reader is opened, from the footer metadata.
///
/// # Examples
///
/// ```rust,no_run
/// use term_scrub::reader::BatchReader;
///
/// # fn example() -> term_scrub::error::Result<()> {
/// let reader = BatchReader::open("data/part-0000.parquet", 100_000)?;
/// println!("{} rows", reader.total_rows());
/// for batch in reader {
///     let batch = batch?;
///     println!("batch of {}", batch.num_rows());
/// }
/// # Ok(())
/// # }
/// ```
pub struct BatchReader {
    path: PathBuf,
    schema: SchemaRef,
    total_rows: u64,
    rows_read: u64,
    batch_index: usize,
    inner: Option<ParquetRecordBatchReader>,
}

impl BatchReader {
    /// Opens `path` for reading in batches of at most `batch_size` rows.
    ///
    /// Fails with `SourceUnavailable` if the file cannot be opened,
    /// `SourceCorrupt` if its footer cannot be decoded, and `SchemaMismatch`
    /// if it lacks a required column.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), batch_size = batch_size))]
    pub fn open(path: impl AsRef<Path>, batch_size: usize) -> Result<Self> {
        let path = path.as_ref();
        if batch_size == 0 {
            return Err(ScrubError::Configuration(
                "batch_size must be a positive integer".to_string(),
            ));
        }

        let file = File::open(path).map_err(|e| ScrubError::source_unavailable(path, e))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            ScrubError::source_corrupt_with_source(path, "unreadable footer", Box::new(e))
        })?;

        let schema = builder.schema().clone();
        schema::validate(&schema, path)?;

        let total_rows = u64::try_from(builder.metadata().file_metadata().num_rows())
            .map_err(|_| ScrubError::source_corrupt(path, "negative row count in footer"))?;

        let inner = builder.with_batch_size(batch_size).build().map_err(|e| {
            ScrubError::source_corrupt_with_source(path, "cannot build batch reader", Box::new(e))
        })?;

        debug!(total_rows, "Opened source");
        Ok(Self {
            path: path.to_path_buf(),
            schema,
            total_rows,
            rows_read: 0,
            batch_index: 0,
            inner: Some(inner),
        })
    }

    /// Row count declared by the file footer.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Rows yielded so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Schema of the source as stored on disk.
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fail(&mut self, error: ScrubError) -> Option<Result<RecordBatch>> {
        self.inner = None;
        Some(Err(error))
    }
}

impl std::fmt::Debug for BatchReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchReader")
            .field("path", &self.path)
            .field("total_rows", &self.total_rows)
            .field("rows_read", &self.rows_read)
            .field("exhausted", &self.inner.is_none())
            .finish()
    }
}

impl Iterator for BatchReader {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let inner = self.inner.as_mut()?;

        match inner.next() {
            Some(Ok(batch)) => {
                self.rows_read += batch.num_rows() as u64;
                self.batch_index += 1;
                if self.rows_read > self.total_rows {
                    let message = format!(
                        "decoded {} rows, footer declares {}",
                        self.rows_read, self.total_rows
                    );
                    return self.fail(ScrubError::source_corrupt(&self.path, message));
                }
                Some(Ok(batch))
            }
            Some(Err(e)) => {
                let message = format!("cannot decode batch {}", self.batch_index);
                let error = ScrubError::source_corrupt_with_source(&self.path, message, Box::new(e));
                self.fail(error)
            }
            None => {
                self.inner = None;
                if self.rows_read != self.total_rows {
                    let message = format!(
                        "decoded {} rows, footer declares {}",
                        self.rows_read, self.total_rows
                    );
                    return Some(Err(ScrubError::source_corrupt(&self.path, message)));
                }
                None
            }
        }
    }
}
