//! Row-level validity rules shared by the scanner and the cleaner.
//!
//! Both components evaluate the same rule table, so a row the scanner counts
//! as an outlier is exactly a row the cleaner removes. Every rule produces a
//! null-free [`BooleanArray`] mask with one slot per row.

use std::collections::HashSet;

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray};
use arrow::compute::{cast, or};
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use arrow::row::{RowConverter, SortField};
use arrow::util::display::array_value_to_string;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, ScrubError};
use crate::schema;

/// An inclusive valid range for a numeric column.
///
/// A value is an outlier when it lies strictly outside `[min, max]`. Nulls,
/// `NaN` and values that cannot be read as numbers are never outliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierRule {
    /// Name under which outliers are counted.
    pub name: &'static str,
    /// Column the rule reads.
    pub column: &'static str,
    /// Smallest valid value.
    pub min: f64,
    /// Largest valid value.
    pub max: f64,
}

/// The outlier rules, in evaluation order.
pub const OUTLIER_RULES: [OutlierRule; 3] = [
    OutlierRule {
        name: schema::AGE,
        column: schema::AGE,
        min: 0.0,
        max: 120.0,
    },
    OutlierRule {
        name: schema::INCOME,
        column: schema::INCOME,
        min: 0.0,
        max: 1_000_000_000.0,
    },
    OutlierRule {
        name: schema::CREDIT_SCORE,
        column: schema::CREDIT_SCORE,
        min: 300.0,
        max: 850.0,
    },
];

impl OutlierRule {
    /// Returns true if `value` falls outside the valid range.
    pub fn is_outlier(&self, value: f64) -> bool {
        // NaN fails both comparisons
        value < self.min || value > self.max
    }

    /// Evaluates the rule over `batch`, marking outlier rows `true`.
    pub fn evaluate(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let values = cast(column(batch, self.column)?, &DataType::Float64)?;
        let values = values.as_primitive::<Float64Type>();

        Ok(values
            .iter()
            .map(|value| Some(value.is_some_and(|v| self.is_outlier(v))))
            .collect())
    }
}

/// Marks rows violating any outlier rule.
pub fn outlier_mask(batch: &RecordBatch) -> Result<BooleanArray> {
    let mut mask = BooleanArray::from(vec![false; batch.num_rows()]);
    for rule in &OUTLIER_RULES {
        mask = or(&mask, &rule.evaluate(batch)?)?;
    }
    Ok(mask)
}

/// Marks rows that repeat an earlier row of the same batch across all columns.
///
/// The first occurrence is left unmarked. Two nulls in the same column
/// compare equal.
pub fn duplicate_mask(batch: &RecordBatch) -> Result<BooleanArray> {
    let fields: Vec<SortField> = batch
        .schema()
        .fields()
        .iter()
        .map(|field| SortField::new(field.data_type().clone()))
        .collect();

    if RowConverter::supports_fields(&fields) {
        let converter = RowConverter::new(fields)?;
        let rows = converter.convert_columns(batch.columns())?;
        let mut seen = HashSet::with_capacity(rows.num_rows());
        Ok(rows.iter().map(|row| Some(!seen.insert(row))).collect())
    } else {
        rendered_duplicate_mask(batch.columns(), batch.num_rows())
    }
}

/// Fallback for column types the row format cannot encode.
fn rendered_duplicate_mask(columns: &[ArrayRef], num_rows: usize) -> Result<BooleanArray> {
    let mut seen = HashSet::with_capacity(num_rows);
    let mut mask = Vec::with_capacity(num_rows);

    for row in 0..num_rows {
        let key = columns
            .iter()
            .map(|column| {
                if column.is_null(row) {
                    Ok(None)
                } else {
                    array_value_to_string(column, row).map(Some)
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        mask.push(!seen.insert(key));
    }

    Ok(BooleanArray::from(mask))
}

/// Returns true if `email` has the `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
        // This regex is compile-time constant and known to be valid
        #[allow(clippy::expect_used)]
        Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("Hard-coded regex pattern should be valid")
    });

    EMAIL_REGEX.is_match(email)
}

/// Marks rows whose `email` is a valid address. Nulls and non-string columns are invalid.
pub fn valid_email_mask(batch: &RecordBatch) -> Result<BooleanArray> {
    let emails = column(batch, schema::EMAIL)?;

    let mask = if is_string_type(emails.data_type()) {
        let emails = cast(emails, &DataType::Utf8)?;
        emails
            .as_string::<i32>()
            .iter()
            .map(|email| Some(email.is_some_and(is_valid_email)))
            .collect()
    } else {
        BooleanArray::from(vec![false; batch.num_rows()])
    };

    Ok(mask)
}

/// Returns true for string columns, including dictionary-encoded ones.
pub(crate) fn is_string_type(data_type: &DataType) -> bool {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => true,
        DataType::Dictionary(_, value_type) => is_string_type(value_type),
        _ => false,
    }
}

/// Looks up a required column by name.
pub(crate) fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ScrubError::ColumnNotFound {
            column: name.to_string(),
        })
}
