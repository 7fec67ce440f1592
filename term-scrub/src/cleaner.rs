//! Removal of defective rows and normalization of the surviving ones.
//!
//! Cleaning runs a fixed sequence of steps. Each step sees only the rows
//! that survived the previous ones:
//!
//! 1. drop rows outside the valid range of any outlier rule
//! 2. drop duplicate rows, keeping the first occurrence
//! 3. normalize `timestamp` and `registration_date` (unparseable values become null)
//! 4. drop rows whose email is missing or malformed
//! 5. rewrite unknown `gender` values to `"Other"`
//! 6. coerce `is_active` to a strict boolean (uncoercible values become null)
//! 7. drop rows that steps 3-6 made identical to an earlier row
//!
//! Step 7 makes cleaning idempotent: a cleaned batch passes through the
//! cleaner again without losing rows.

use std::sync::Arc;

use arrow::array::{
    new_null_array, Array, ArrayRef, AsArray, BooleanArray, StringArray, TimestampMicrosecondArray,
};
use arrow::compute::{cast, filter_record_batch, not};
use arrow::datatypes::{DataType, Field, Float64Type, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::rules::{self, column, is_string_type};
use crate::schema;
use crate::stats::{CleaningTally, DropCounts};

/// Naive datetime layouts, tried in order. Parsed values are taken as UTC.
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M",
];

/// Layouts carrying an explicit UTC offset.
const ZONED_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// The value unknown genders are rewritten to.
const FALLBACK_GENDER: &str = "Other";

/// A cleaned batch together with its row accounting.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    /// Surviving rows, normalized.
    pub cleaned: RecordBatch,
    /// Row accounting for this batch.
    pub tally: CleaningTally,
}

impl CleaningOutcome {
    /// Input rows minus surviving rows.
    pub fn rows_removed(&self) -> u64 {
        self.tally.rows_removed()
    }
}

/// Applies the cleaning steps to a batch.
///
/// Defective rows are never reported as errors. An error means the batch
/// itself is unusable (a required column is absent or an Arrow kernel failed).
#[derive(Debug, Clone, Default)]
pub struct RecordCleaner;

impl RecordCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Cleans `batch`, consuming it.
    #[instrument(skip_all, fields(rows = batch.num_rows()))]
    pub fn clean(&self, batch: RecordBatch) -> Result<CleaningOutcome> {
        let input_rows = batch.num_rows() as u64;
        let mut dropped = DropCounts::default();

        let outliers = rules::outlier_mask(&batch)?;
        dropped.outlier = outliers.true_count() as u64;
        let batch = filter_record_batch(&batch, &not(&outliers)?)?;

        let (batch, duplicates) = drop_duplicates(batch)?;
        dropped.duplicate = duplicates;

        let mut batch = batch;
        for name in schema::DATETIME_COLUMNS {
            let normalized = normalize_datetime(column(&batch, name)?)?;
            batch = replace_column(&batch, name, normalized)?;
        }

        let valid_emails = rules::valid_email_mask(&batch)?;
        dropped.invalid_email = (batch.num_rows() - valid_emails.true_count()) as u64;
        let batch = filter_record_batch(&batch, &valid_emails)?;

        let genders = normalize_gender(column(&batch, schema::GENDER)?)?;
        let batch = replace_column(&batch, schema::GENDER, genders)?;

        let (is_active, invalid_booleans) = coerce_booleans(column(&batch, schema::IS_ACTIVE)?)?;
        let batch = replace_column(&batch, schema::IS_ACTIVE, Arc::new(is_active))?;

        let (cleaned, collapsed) = drop_duplicates(batch)?;
        dropped.duplicate += collapsed;

        let tally = CleaningTally {
            input_rows,
            output_rows: cleaned.num_rows() as u64,
            dropped,
            invalid_booleans,
        };

        debug!(
            kept = tally.output_rows,
            outliers = dropped.outlier,
            duplicates = dropped.duplicate,
            invalid_emails = dropped.invalid_email,
            invalid_booleans,
            "Cleaned batch"
        );

        Ok(CleaningOutcome { cleaned, tally })
    }
}

/// Removes rows repeating an earlier row. Returns the batch and the number removed.
fn drop_duplicates(batch: RecordBatch) -> Result<(RecordBatch, u64)> {
    let duplicates = rules::duplicate_mask(&batch)?;
    let removed = duplicates.true_count() as u64;
    if removed == 0 {
        return Ok((batch, 0));
    }
    Ok((filter_record_batch(&batch, &not(&duplicates)?)?, removed))
}

/// Swaps the column `name` for `values`, keeping its position. The field becomes nullable.
fn replace_column(batch: &RecordBatch, name: &str, values: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    let index = schema.index_of(name)?;

    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields[index] = fields[index]
        .clone()
        .with_data_type(values.data_type().clone())
        .with_nullable(true);

    let mut columns = batch.columns().to_vec();
    columns[index] = values;

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// Converts a datetime-like column to microsecond timestamps.
///
/// Timestamp inputs keep their time zone. Strings and dates become naive
/// (zone-less) timestamps; strings with an explicit offset are shifted to UTC
/// first. Anything unparseable becomes null.
pub fn normalize_datetime(values: &ArrayRef) -> Result<ArrayRef> {
    let naive = DataType::Timestamp(TimeUnit::Microsecond, None);

    let normalized = match values.data_type() {
        DataType::Timestamp(_, tz) => {
            cast(values, &DataType::Timestamp(TimeUnit::Microsecond, tz.clone()))?
        }
        DataType::Date32 | DataType::Date64 => cast(values, &naive)?,
        data_type if is_string_type(data_type) => {
            let strings = cast(values, &DataType::Utf8)?;
            let parsed: TimestampMicrosecondArray = strings
                .as_string::<i32>()
                .iter()
                .map(|value| value.and_then(parse_datetime))
                .collect();
            Arc::new(parsed)
        }
        _ => new_null_array(&naive, values.len()),
    };

    Ok(normalized)
}

/// Parses a datetime string into microseconds since the Unix epoch (UTC).
pub fn parse_datetime(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp_micros());
    }
    for format in ZONED_DATETIME_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Some(parsed.timestamp_micros());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc().timestamp_micros());
        }
    }
    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| midnight.and_utc().timestamp_micros())
    })
}

/// Rewrites every value outside the accepted set, nulls included, to `"Other"`.
pub fn normalize_gender(values: &ArrayRef) -> Result<ArrayRef> {
    let strings = if is_string_type(values.data_type()) {
        cast(values, &DataType::Utf8)?
    } else {
        new_null_array(&DataType::Utf8, values.len())
    };

    let normalized: StringArray = strings
        .as_string::<i32>()
        .iter()
        .map(|gender| match gender {
            Some(gender) if schema::VALID_GENDERS.contains(&gender) => Some(gender),
            _ => Some(FALLBACK_GENDER),
        })
        .collect();

    Ok(Arc::new(normalized))
}

/// Coerces a column to a strict boolean.
///
/// Accepted encodings are native booleans, the strings `true`/`false` (any
/// case, surrounding whitespace ignored) and the numbers `1`/`0`. Any other
/// non-null value becomes null and is counted as a failure, which is returned
/// alongside the coerced array.
pub fn coerce_booleans(values: &ArrayRef) -> Result<(BooleanArray, u64)> {
    let coerced: BooleanArray = match values.data_type() {
        DataType::Boolean => values.as_boolean().clone(),
        DataType::Null => BooleanArray::from(vec![None; values.len()]),
        data_type if is_string_type(data_type) => {
            let strings = cast(values, &DataType::Utf8)?;
            strings
                .as_string::<i32>()
                .iter()
                .map(|value| value.and_then(parse_bool))
                .collect()
        }
        data_type if data_type.is_numeric() => {
            let numbers = cast(values, &DataType::Float64)?;
            numbers
                .as_primitive::<Float64Type>()
                .iter()
                .map(|value| match value {
                    Some(v) if v == 1.0 => Some(true),
                    Some(v) if v == 0.0 => Some(false),
                    _ => None,
                })
                .collect()
        }
        _ => BooleanArray::from(vec![None; values.len()]),
    };

    let failures = coerced.null_count().saturating_sub(values.logical_null_count()) as u64;
    Ok((coerced, failures))
}

fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
