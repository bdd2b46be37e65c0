//! Fixture files for unit tests

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::reader::Table;

pub fn sample_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("value", DataType::Float64, true),
    ]))
}

fn sample_batch(schema: &SchemaRef, start: usize, rows: usize) -> RecordBatch {
    let names = ["Alice", "Bob", "Charlie", "David", "Eve"];
    let ids: Vec<i64> = (start..start + rows).map(|i| i as i64).collect();
    let name_col: Vec<&str> = (start..start + rows).map(|i| names[i % names.len()]).collect();
    let values: Vec<Option<f64>> = (start..start + rows)
        .map(|i| if i % 7 == 0 { None } else { Some(i as f64 * 1.5) })
        .collect();

    RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(name_col)),
            Arc::new(Float64Array::from(values)),
        ],
    )
    .unwrap()
}

/// `rows` rows split into batches of at most `batch_rows`
pub fn sample_table(rows: usize, batch_rows: usize) -> Table {
    let schema = sample_schema();
    let batches = (0..rows)
        .step_by(batch_rows)
        .map(|start| sample_batch(&schema, start, batch_rows.min(rows - start)))
        .collect();
    Table::new(schema, batches)
}

pub fn write_parquet_fixture(path: &Path, rows: usize, row_group_size: Option<usize>) {
    let table = sample_table(rows, 1000);
    let mut props = WriterProperties::builder();
    if let Some(size) = row_group_size {
        props = props.set_max_row_group_size(size);
    }
    let file = File::create(path).unwrap();
    let mut writer =
        ArrowWriter::try_new(file, table.schema().clone(), Some(props.build())).unwrap();
    for batch in table.batches() {
        writer.write(batch).unwrap();
    }
    writer.close().unwrap();
}

pub fn write_ipc_fixture(path: &Path, rows: usize, batch_rows: usize) {
    let table = sample_table(rows, batch_rows);
    let file = File::create(path).unwrap();
    let mut writer = FileWriter::try_new(file, table.schema()).unwrap();
    for batch in table.batches() {
        writer.write(batch).unwrap();
    }
    writer.finish().unwrap();
}
