//! The fixed record schema processed by the pipeline.
//!
//! Sources are matched by column name only. Physical types are allowed to
//! vary between files (a numeric column may be stored as `Int32` in one file
//! and `Float64` in another); the rules and the cleaner cast as needed.
//! The numeric columns must still hold a type that casts to `Float64`.

use arrow::compute::can_cast_types;
use arrow::datatypes::{DataType, Schema};
use std::path::Path;

use crate::error::{Result, ScrubError};

pub const TIMESTAMP: &str = "timestamp";
pub const USER_NAME: &str = "user_name";
pub const CHINESE_NAME: &str = "chinese_name";
pub const EMAIL: &str = "email";
pub const AGE: &str = "age";
pub const INCOME: &str = "income";
pub const GENDER: &str = "gender";
pub const COUNTRY: &str = "country";
pub const CHINESE_ADDRESS: &str = "chinese_address";
pub const PURCHASE_HISTORY: &str = "purchase_history";
pub const IS_ACTIVE: &str = "is_active";
pub const REGISTRATION_DATE: &str = "registration_date";
pub const CREDIT_SCORE: &str = "credit_score";
pub const PHONE_NUMBER: &str = "phone_number";

/// All required columns, in canonical order.
pub const COLUMNS: [&str; 14] = [
    TIMESTAMP,
    USER_NAME,
    CHINESE_NAME,
    EMAIL,
    AGE,
    INCOME,
    GENDER,
    COUNTRY,
    CHINESE_ADDRESS,
    PURCHASE_HISTORY,
    IS_ACTIVE,
    REGISTRATION_DATE,
    CREDIT_SCORE,
    PHONE_NUMBER,
];

/// Columns normalized to a canonical datetime representation.
pub const DATETIME_COLUMNS: [&str; 2] = [TIMESTAMP, REGISTRATION_DATE];

/// Columns read as numbers by the outlier rules.
pub const NUMERIC_COLUMNS: [&str; 3] = [AGE, INCOME, CREDIT_SCORE];

/// The accepted values of the `gender` column. Anything else becomes the last one.
pub const VALID_GENDERS: [&str; 3] = ["Male", "Female", "Other"];

/// Returns the required columns absent from `schema`.
pub fn missing_columns(schema: &Schema) -> Vec<String> {
    COLUMNS
        .iter()
        .filter(|name| schema.column_with_name(name).is_none())
        .map(|name| name.to_string())
        .collect()
}

/// Checks that `schema` carries every required column and that the numeric
/// columns can be read as `Float64`.
pub fn validate(schema: &Schema, path: &Path) -> Result<()> {
    let missing = missing_columns(schema);
    if !missing.is_empty() {
        return Err(ScrubError::SchemaMismatch {
            path: path.to_path_buf(),
            missing,
        });
    }

    for name in NUMERIC_COLUMNS {
        let (_, field) = schema
            .column_with_name(name)
            .ok_or_else(|| ScrubError::ColumnNotFound {
                column: name.to_string(),
            })?;
        if !can_cast_types(field.data_type(), &DataType::Float64) {
            return Err(ScrubError::ColumnType {
                path: path.to_path_buf(),
                column: name.to_string(),
                data_type: field.data_type().to_string(),
            });
        }
    }

    Ok(())
}
