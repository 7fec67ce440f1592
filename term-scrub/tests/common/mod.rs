//! Shared helpers for integration tests: building raw records and writing them
//! as Parquet sources.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use term_scrub::schema;

/// One raw record. Numeric and text fields are optional to express missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub income: Option<f64>,
    pub gender: Option<String>,
    pub is_active: Option<bool>,
    pub registration_date: Option<String>,
    pub credit_score: Option<i64>,
    pub id: u32,
}

impl Record {
    pub fn valid(id: u32) -> Self {
        Self {
            timestamp: Some(format!("2024-01-{:02}T10:00:00", id % 28 + 1)),
            email: Some(format!("customer{id}@shop.example")),
            age: Some(25 + i64::from(id % 50)),
            income: Some(40_000.0 + f64::from(id)),
            gender: Some(if id % 2 == 0 { "Male" } else { "Female" }.to_string()),
            is_active: Some(id % 3 != 0),
            registration_date: Some("2020-02-29".to_string()),
            credit_score: Some(650),
            id,
        }
    }
}

pub fn source_schema() -> SchemaRef {
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

fn text(values: Vec<Option<String>>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}

pub fn batch(records: &[Record]) -> RecordBatch {
    let ids = || records.iter().map(|r| r.id);
    let columns: Vec<ArrayRef> = vec![
        text(records.iter().map(|r| r.timestamp.clone()).collect()),
        text(ids().map(|id| Some(format!("customer_{id}"))).collect()),
        text(ids().map(|_| Some("李娜".to_string())).collect()),
        text(records.iter().map(|r| r.email.clone()).collect()),
        Arc::new(Int64Array::from(records.iter().map(|r| r.age).collect::<Vec<_>>())),
        Arc::new(Float64Array::from(
            records.iter().map(|r| r.income).collect::<Vec<_>>(),
        )),
        text(records.iter().map(|r| r.gender.clone()).collect()),
        text(ids().map(|_| Some("China".to_string())).collect()),
        text(ids().map(|_| Some("上海市浦东新区".to_string())).collect()),
        text(ids().map(|id| Some(format!("[{id}]"))).collect()),
        Arc::new(BooleanArray::from(
            records.iter().map(|r| r.is_active).collect::<Vec<_>>(),
        )),
        text(records.iter().map(|r| r.registration_date.clone()).collect()),
        Arc::new(Int64Array::from(
            records.iter().map(|r| r.credit_score).collect::<Vec<_>>(),
        )),
        text(ids().map(|id| Some(format!("139{id:08}"))).collect()),
    ];
    RecordBatch::try_new(source_schema(), columns).unwrap()
}

/// Writes `records` to `dir/name`, one row group per `row_group` records.
pub fn write_source(dir: &Path, name: &str, records: &[Record], row_group: usize) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, source_schema(), None).unwrap();
    for chunk in records.chunks(row_group.max(1)) {
        writer.write(&batch(chunk)).unwrap();
        writer.flush().unwrap();
    }
    writer.close().unwrap();
    path
}

pub fn read_rows(path: &Path) -> usize {
    let file = File::open(path).unwrap();
    ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap()
        .map(|batch| batch.unwrap().num_rows())
        .sum()
}
