//! Common test fixtures for scanning and cleaning scenarios.
//!
//! Fixtures build record batches over the full 14-column schema from a list
//! of [`SampleRow`]s so that tests only spell out the fields they care about.

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::schema;

/// One raw input record, as found in source files.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub timestamp: Option<String>,
    pub user_name: Option<String>,
    pub chinese_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub income: Option<f64>,
    pub gender: Option<String>,
    pub country: Option<String>,
    pub chinese_address: Option<String>,
    pub purchase_history: Option<String>,
    pub is_active: Option<bool>,
    pub registration_date: Option<String>,
    pub credit_score: Option<i64>,
    pub phone_number: Option<String>,
}

impl SampleRow {
    /// A record that passes every rule. Distinct ids give distinct rows.
    pub fn valid(id: u32) -> Self {
        Self {
            timestamp: Some(format!("2024-03-{:02} 08:30:00", id % 28 + 1)),
            user_name: Some(format!("user_{id}")),
            chinese_name: Some("张伟".to_string()),
            email: Some(format!("user{id}@example.com")),
            age: Some(30),
            income: Some(85_000.0),
            gender: Some("Female".to_string()),
            country: Some("China".to_string()),
            chinese_address: Some("北京市朝阳区".to_string()),
            purchase_history: Some(r#"{"items": 3, "total": 120.5}"#.to_string()),
            is_active: Some(true),
            registration_date: Some("2021-06-15".to_string()),
            credit_score: Some(700),
            phone_number: Some(format!("138{id:08}")),
        }
    }
}

/// The raw source schema used by fixtures.
pub fn raw_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(schema::TIMESTAMP, DataType::Utf8, true),
        Field::new(schema::USER_NAME, DataType::Utf8, true),
        Field::new(schema::CHINESE_NAME, DataType::Utf8, true),
        Field::new(schema::EMAIL, DataType::Utf8, true),
        Field::new(schema::AGE, DataType::Int64, true),
        Field::new(schema::INCOME, DataType::Float64, true),
        Field::new(schema::GENDER, DataType::Utf8, true),
        Field::new(schema::COUNTRY, DataType::Utf8, true),
        Field::new(schema::CHINESE_ADDRESS, DataType::Utf8, true),
        Field::new(schema::PURCHASE_HISTORY, DataType::Utf8, true),
        Field::new(schema::IS_ACTIVE, DataType::Boolean, true),
        Field::new(schema::REGISTRATION_DATE, DataType::Utf8, true),
        Field::new(schema::CREDIT_SCORE, DataType::Int64, true),
        Field::new(schema::PHONE_NUMBER, DataType::Utf8, true),
    ]))
}

fn strings(rows: &[SampleRow], get: impl Fn(&SampleRow) -> &Option<String>) -> ArrayRef {
    Arc::new(StringArray::from(
        rows.iter().map(|r| get(r).as_deref()).collect::<Vec<_>>(),
    ))
}

/// Builds a batch over [`raw_schema`] from `rows`.
pub fn batch_from_rows(rows: &[SampleRow]) -> RecordBatch {
    let columns: Vec<ArrayRef> = vec![
        strings(rows, |r| &r.timestamp),
        strings(rows, |r| &r.user_name),
        strings(rows, |r| &r.chinese_name),
        strings(rows, |r| &r.email),
        Arc::new(Int64Array::from(
            rows.iter().map(|r| r.age).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.income).collect::<Vec<_>>(),
        )),
        strings(rows, |r| &r.gender),
        strings(rows, |r| &r.country),
        strings(rows, |r| &r.chinese_address),
        strings(rows, |r| &r.purchase_history),
        Arc::new(BooleanArray::from(
            rows.iter().map(|r| r.is_active).collect::<Vec<_>>(),
        )),
        strings(rows, |r| &r.registration_date),
        Arc::new(Int64Array::from(
            rows.iter().map(|r| r.credit_score).collect::<Vec<_>>(),
        )),
        strings(rows, |r| &r.phone_number),
    ];

    // Fixture columns always match the schema above
    #[allow(clippy::expect_used)]
    RecordBatch::try_new(raw_schema(), columns).expect("fixture batch should match its schema")
}

/// Replaces one column of `batch`, keeping its position.
pub fn replace_column(batch: &RecordBatch, name: &str, data_type: DataType, values: ArrayRef) -> RecordBatch {
    let schema = batch.schema();
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut columns = batch.columns().to_vec();

    if let Ok(index) = schema.index_of(name) {
        fields[index] = Field::new(name, data_type, true);
        columns[index] = values;
    }

    #[allow(clippy::expect_used)]
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .expect("replacement column should match the batch length")
}

/// Writes `batches` to a Parquet file at `path`. Row groups follow the batches.
pub fn write_parquet(path: &Path, schema: SchemaRef, batches: &[RecordBatch]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

/// A deliberately dirty mix of records covering every defect the cleaner handles.
///
/// Returns the rows together with how many survive cleaning.
pub fn dirty_rows() -> (Vec<SampleRow>, usize) {
    let rows = vec![
        // kept
        SampleRow::valid(1),
        // age outlier
        SampleRow {
            age: Some(-1),
            ..SampleRow::valid(2)
        },
        // income outlier
        SampleRow {
            income: Some(2_000_000_000.0),
            ..SampleRow::valid(3)
        },
        // credit score outlier
        SampleRow {
            credit_score: Some(851),
            ..SampleRow::valid(4)
        },
        // exact duplicate of the first row
        SampleRow::valid(1),
        // malformed email
        SampleRow {
            email: Some("a@@b".to_string()),
            ..SampleRow::valid(5)
        },
        // missing email
        SampleRow {
            email: None,
            ..SampleRow::valid(6)
        },
        // kept, gender rewritten
        SampleRow {
            gender: Some("nonbinary".to_string()),
            ..SampleRow::valid(7)
        },
        // kept, timestamp nulled
        SampleRow {
            timestamp: Some("not a date".to_string()),
            ..SampleRow::valid(8)
        },
        // kept, missing age is not an outlier
        SampleRow {
            age: None,
            ..SampleRow::valid(9)
        },
    ];
    (rows, 4)
}

/// Generates `count` pseudo-random records. Roughly `dirty_fraction` of them
/// carry one defect (outlier, bad email, odd gender, unparsable date, missing
/// value, or a repeat of an earlier record).
pub fn random_rows<R: rand::Rng>(rng: &mut R, count: usize, dirty_fraction: f64) -> Vec<SampleRow> {
    const GENDERS: [&str; 5] = ["Male", "Female", "Other", "nonbinary", "M"];
    let mut rows: Vec<SampleRow> = Vec::with_capacity(count);

    for i in 0..count {
        let id = i as u32;
        let mut row = SampleRow {
            age: Some(rng.random_range(18..90)),
            income: Some(rng.random_range(0.0..500_000.0)),
            credit_score: Some(rng.random_range(300..=850)),
            is_active: Some(rng.random_bool(0.5)),
            ..SampleRow::valid(id)
        };

        if rng.random_bool(dirty_fraction.clamp(0.0, 1.0)) {
            match rng.random_range(0..7) {
                0 => row.age = Some(rng.random_range(121..200)),
                1 => row.credit_score = Some(rng.random_range(0..300)),
                2 => row.email = Some(format!("user{id}@@broken")),
                3 => row.gender = Some(GENDERS[rng.random_range(0..GENDERS.len())].to_string()),
                4 => row.registration_date = Some("someday".to_string()),
                5 => row.income = None,
                _ if !rows.is_empty() => row = rows[rng.random_range(0..rows.len())].clone(),
                _ => row.phone_number = None,
            }
        }
        rows.push(row);
    }
    rows
}
