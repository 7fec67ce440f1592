//! Persistence of cleaned batches.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::{debug, instrument};

use crate::error::{Result, ScrubError};

/// Default file name prefix of cleaned artifacts.
pub const DEFAULT_PREFIX: &str = "cleaned_batch";

/// A cleaned batch that has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub rows: u64,
}

/// Writes each cleaned batch to its own Parquet file.
///
/// Artifacts are named `{prefix}_{file_index}_{batch_index}.parquet`, so every
/// (file, batch) pair maps to a distinct file. Data is first written to a
/// `.tmp` sibling and renamed into place once complete: an artifact present
/// under its final name is always a whole file.
#[derive(Debug, Clone)]
pub struct BatchWriter {
    output_dir: PathBuf,
    prefix: String,
    properties: WriterProperties,
}

impl BatchWriter {
    /// Creates a writer for `output_dir`, creating the directory if needed.
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| {
            ScrubError::write_with_source(&output_dir, "cannot create output directory", Box::new(e))
        })?;

        let properties = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        Ok(Self {
            output_dir,
            prefix: prefix.into(),
            properties,
        })
    }

    /// The destination of the artifact for a (file, batch) pair.
    pub fn artifact_path(&self, file_index: usize, batch_index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{file_index}_{batch_index}.parquet", self.prefix))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes `batch` as the artifact of (`file_index`, `batch_index`).
    ///
    /// An existing artifact with the same name is replaced.
    #[instrument(skip(self, batch), fields(rows = batch.num_rows()))]
    pub fn write(
        &self,
        batch: &RecordBatch,
        file_index: usize,
        batch_index: usize,
    ) -> Result<WrittenArtifact> {
        let path = self.artifact_path(file_index, batch_index);
        let staging = path.with_extension("parquet.tmp");

        self.write_file(&staging, batch).map_err(|e| {
            let _ = fs::remove_file(&staging);
            ScrubError::write_with_source(&path, "cannot write artifact", Box::new(e))
        })?;
        fs::rename(&staging, &path).map_err(|e| {
            ScrubError::write_with_source(&path, "cannot move artifact into place", Box::new(e))
        })?;

        debug!(path = %path.display(), "Wrote artifact");
        Ok(WrittenArtifact {
            path,
            rows: batch.num_rows() as u64,
        })
    }

    fn write_file(&self, path: &Path, batch: &RecordBatch) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(self.properties.clone()))?;
        writer.write(batch)?;
        writer.close()?;
        Ok(())
    }
}
