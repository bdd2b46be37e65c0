#![allow(dead_code)]

use arrow::array::{BooleanArray, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

pub fn create_test_parquet(path: &Path, num_rows: usize, row_group_size: usize) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("value", DataType::Float64, true),
        Field::new("active", DataType::Boolean, false),
    ]));

    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .build();
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props)).unwrap();

    let names = ["Alice", "Bob", "Charlie", "David", "Eve", "Frank"];
    let batch_size = 5000;
    for batch_start in (0..num_rows).step_by(batch_size) {
        let batch_end = (batch_start + batch_size).min(num_rows);

        let ids: Vec<i32> = (batch_start..batch_end).map(|i| i as i32).collect();
        let names_vec: Vec<&str> = (batch_start..batch_end)
            .map(|i| names[i % names.len()])
            .collect();
        let values: Vec<Option<f64>> = (batch_start..batch_end)
            .map(|i| if i % 11 == 0 { None } else { Some(i as f64 * 0.25) })
            .collect();
        let active: Vec<bool> = (batch_start..batch_end).map(|i| i % 2 == 0).collect();

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from(ids)),
                Arc::new(StringArray::from(names_vec)),
                Arc::new(Float64Array::from(values)),
                Arc::new(BooleanArray::from(active)),
            ],
        )
        .unwrap();
        writer.write(&batch).unwrap();
    }

    writer.close().unwrap();
}
