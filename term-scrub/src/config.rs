//! Pipeline configuration and input enumeration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrubError};
use crate::logging::LogConfig;
use crate::writer::DEFAULT_PREFIX;

/// Default number of rows per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1_000_000;

/// Placeholder replaced by the file index in numbered templates.
pub const INDEX_PLACEHOLDER: &str = "{index}";

/// Where the source files come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputSource {
    /// `count` files named by substituting `{index}` in `template` with the
    /// zero-padded index (`0..count`).
    Numbered {
        template: String,
        count: usize,
        #[serde(default = "default_index_width")]
        width: usize,
    },
    /// Every file matching a glob pattern, in lexicographic order.
    Glob { pattern: String },
    /// An explicit list, processed as given.
    Paths { paths: Vec<PathBuf> },
}

fn default_index_width() -> usize {
    2
}

impl InputSource {
    /// A numbered sequence with two-digit indices.
    pub fn numbered(template: impl Into<String>, count: usize) -> Self {
        Self::Numbered {
            template: template.into(),
            count,
            width: default_index_width(),
        }
    }

    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::Glob {
            pattern: pattern.into(),
        }
    }

    pub fn paths(paths: Vec<PathBuf>) -> Self {
        Self::Paths { paths }
    }

    /// Expands the source into the ordered list of files to process.
    ///
    /// Numbered and explicit sources are not checked for existence here; a
    /// missing file surfaces when the pipeline tries to open it.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        match self {
            Self::Numbered {
                template,
                count,
                width,
            } => Ok((0..*count)
                .map(|index| {
                    let index = format!("{index:0width$}", width = *width);
                    PathBuf::from(template.replace(INDEX_PLACEHOLDER, &index))
                })
                .collect()),
            Self::Glob { pattern } => {
                let entries = glob::glob(pattern).map_err(|e| {
                    ScrubError::Configuration(format!("Invalid glob pattern '{pattern}': {e}"))
                })?;
                let mut paths = entries
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| ScrubError::Io(e.into_error()))?;
                paths.sort();
                Ok(paths)
            }
            Self::Paths { paths } => Ok(paths.clone()),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Numbered { template, .. } if !template.contains(INDEX_PLACEHOLDER) => {
                Err(ScrubError::Configuration(format!(
                    "Numbered input template '{template}' must contain {INDEX_PLACEHOLDER}"
                )))
            }
            Self::Glob { pattern } if pattern.trim().is_empty() => Err(
                ScrubError::Configuration("Glob pattern cannot be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// What the pipeline does when a single source file fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the file as skipped and continue with the next one.
    #[default]
    SkipFile,
    /// Stop the run and return the error.
    Abort,
}

/// Configuration of a pipeline run.
///
/// # Examples
///
/// ```rust
/// use term_scrub::config::{FailurePolicy, InputSource, PipelineConfig};
///
/// let config = PipelineConfig::new(InputSource::numbered("data/part-000{index}.parquet", 16), "cleaned")
///     .with_batch_size(250_000)
///     .with_failure_policy(FailurePolicy::Abort);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source files.
    pub input: InputSource,
    /// Directory receiving the cleaned artifacts.
    pub output_dir: PathBuf,
    /// File name prefix of the artifacts.
    #[serde(default = "default_prefix")]
    pub output_prefix: String,
    /// Maximum rows per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Per-batch logging detail. Not part of the serialized form.
    #[serde(skip)]
    pub log: LogConfig,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl PipelineConfig {
    /// Creates a configuration with default batch size, prefix and failure policy.
    pub fn new(input: InputSource, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input,
            output_dir: output_dir.into(),
            output_prefix: default_prefix(),
            batch_size: DEFAULT_BATCH_SIZE,
            failure_policy: FailurePolicy::default(),
            log: LogConfig::default(),
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ScrubError::Serialization(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Checks the configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ScrubError::Configuration(
                "batch_size must be a positive integer".to_string(),
            ));
        }
        if self.output_prefix.is_empty() || self.output_prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(ScrubError::Configuration(format!(
                "Invalid output prefix '{}'",
                self.output_prefix
            )));
        }
        self.input.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_numbered_source_pads_indices() {
        let source = InputSource::numbered("data/part-000{index}.parquet", 12);
        let paths = source.resolve().unwrap();

        assert_eq!(paths.len(), 12);
        assert_eq!(paths[0], PathBuf::from("data/part-00000.parquet"));
        assert_eq!(paths[9], PathBuf::from("data/part-00009.parquet"));
        assert_eq!(paths[11], PathBuf::from("data/part-00011.parquet"));
    }

    #[test]
    fn test_numbered_source_with_custom_width() {
        let source = InputSource::Numbered {
            template: "in/{index}.parquet".to_string(),
            count: 2,
            width: 4,
        };
        assert_eq!(
            source.resolve().unwrap(),
            vec![
                PathBuf::from("in/0000.parquet"),
                PathBuf::from("in/0001.parquet")
            ]
        );
    }

    #[test]
    fn test_glob_source_is_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["b.parquet", "a.parquet", "c.parquet", "notes.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let pattern = format!("{}/*.parquet", dir.path().display());
        let paths = InputSource::glob(pattern).resolve().unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.parquet", "b.parquet", "c.parquet"]);
    }

    #[test]
    fn test_invalid_glob_is_configuration_error() {
        let err = InputSource::glob("data/[.parquet").resolve().unwrap_err();
        assert!(matches!(err, ScrubError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let config = PipelineConfig::new(InputSource::paths(vec![]), "out").with_batch_size(0);
        assert!(matches!(
            config.validate(),
            Err(ScrubError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_template_without_placeholder() {
        let config = PipelineConfig::new(InputSource::numbered("data/part.parquet", 3), "out");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file_applies_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scrub.json");
        fs::write(
            &path,
            r#"{
                "input": {"kind": "numbered", "template": "30G_data/part-000{index}.parquet", "count": 16},
                "output_dir": "new_data"
            }"#,
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();

        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.output_prefix, "cleaned_batch");
        assert_eq!(config.failure_policy, FailurePolicy::SkipFile);
        assert_eq!(config.input.resolve().unwrap().len(), 16);
    }

    #[test]
    fn test_from_json_file_rejects_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = PipelineConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ScrubError::Serialization(_)));
    }
}
