use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, TimeUnit, TimestampMicrosecondType};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, Table, Value};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a table from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, comma separated
/// * `.json`    – `[{ "column": value, ... }, ...]`
/// * `.parquet` – any flat schema of scalar columns
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(Error::Format(format!(
            "unsupported file extension '.{other}' for {}",
            path.display()
        ))),
    }?;
    log::debug!(
        "loaded {} rows x {} columns from {}",
        table.n_rows(),
        table.n_cols(),
        path.display()
    );
    Ok(table)
}

/// Concatenate tables row-wise, in input order.
///
/// The result carries the union of all columns, ordered by first
/// appearance. Rows from a table lacking a column get `Null` there.
/// No de-duplication is performed.
pub fn merge(tables: Vec<Table>) -> Result<Table> {
    let mut names: Vec<String> = Vec::new();
    for table in &tables {
        for name in table.column_names() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }

    let total: usize = tables.iter().map(Table::n_rows).sum();
    let mut columns: Vec<Column> = names
        .into_iter()
        .map(|n| Column::new(n, Vec::with_capacity(total)))
        .collect();

    for table in &tables {
        for col in &mut columns {
            match table.column(&col.name) {
                Ok(src) => col.values.extend(src.values.iter().cloned()),
                Err(_) => col
                    .values
                    .extend(std::iter::repeat(Value::Null).take(table.n_rows())),
            }
        }
    }

    Table::from_columns(columns)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| Error::io(path, e))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_reader(open(path)?);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(Error::Format(format!(
            "{}: missing header row",
            path.display()
        )));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        rows.push(record.iter().map(Value::infer).collect());
    }

    Table::from_rows(headers, rows)
}

fn csv_error(path: &Path, err: csv::Error) -> Error {
    if !err.is_io_error() {
        return Error::Format(format!("{}: {err}", path.display()));
    }
    match err.into_kind() {
        csv::ErrorKind::Io(e) => Error::io(path, e),
        other => Error::Format(format!("{}: {other:?}", path.display())),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected layout is records-oriented, the default `to_json(orient='records')`:
///
/// ```json
/// [
///   { "product_id": 1, "stock_level": 50, "product_category": "Food" },
///   { "product_id": 2, "stock_level": null }
/// ]
/// ```
///
/// Keys absent from a record become `Null` in that row.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let root: JsonValue = serde_json::from_str(&text)
        .map_err(|e| Error::Format(format!("{}: {e}", path.display())))?;

    let records = root
        .as_array()
        .ok_or_else(|| Error::Format("expected a top-level JSON array".into()))?;

    let mut objects = Vec::with_capacity(records.len());
    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| Error::Format(format!("record {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .into_iter()
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map_or(Value::Null, json_to_value))
                .collect()
        })
        .collect();
    Table::from_rows(headers, rows)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with a flat schema.
///
/// Integer widths widen to `i64`, floats to `f64`; `Date32`, `Date64` and
/// `Timestamp` columns become [`Value::Date`]. Works with files written by
/// both Pandas (`df.to_parquet()`) and Polars (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)
        .map_err(|e| Error::Format(format!("{}: {e}", path.display())))?;
    let mut columns: Vec<Column> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| Column::new(f.name().clone(), Vec::new()))
        .collect();
    let reader = builder
        .build()
        .map_err(|e| Error::Format(format!("{}: {e}", path.display())))?;

    for batch_result in reader {
        let batch =
            batch_result.map_err(|e| Error::Format(format!("{}: {e}", path.display())))?;
        for (col, array) in columns.iter_mut().zip(batch.columns()) {
            col.values.extend(arrow_values(&col.name, array)?);
        }
    }

    Table::from_columns(columns)
}

/// Convert one Arrow column into cells.
fn arrow_values(name: &str, array: &ArrayRef) -> Result<Vec<Value>> {
    let cast_to = |to: &DataType| {
        cast(array.as_ref(), to).map_err(|e| Error::Format(format!("column '{name}': {e}")))
    };

    let n = array.len();
    let values = match array.data_type() {
        DataType::Null => vec![Value::Null; n],
        DataType::Utf8 => {
            let arr = array.as_string::<i32>();
            (0..n)
                .map(|i| nullable(arr, i, || Value::String(arr.value(i).to_string())))
                .collect()
        }
        DataType::LargeUtf8 => {
            let arr = array.as_string::<i64>();
            (0..n)
                .map(|i| nullable(arr, i, || Value::String(arr.value(i).to_string())))
                .collect()
        }
        DataType::Boolean => {
            let arr = array.as_boolean();
            (0..n)
                .map(|i| nullable(arr, i, || Value::Bool(arr.value(i))))
                .collect()
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let widened = cast_to(&DataType::Int64)?;
            let arr = widened.as_primitive::<Int64Type>();
            (0..n)
                .map(|i| nullable(arr, i, || Value::Integer(arr.value(i))))
                .collect()
        }
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let widened = cast_to(&DataType::Float64)?;
            let arr = widened.as_primitive::<Float64Type>();
            (0..n)
                .map(|i| nullable(arr, i, || Value::Float(arr.value(i))))
                .collect()
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            let widened = cast_to(&DataType::Timestamp(TimeUnit::Microsecond, None))?;
            let arr = widened.as_primitive::<TimestampMicrosecondType>();
            (0..n)
                .map(|i| {
                    if arr.is_null(i) {
                        return Ok(Value::Null);
                    }
                    arr.value_as_datetime(i).map(Value::Date).ok_or_else(|| {
                        Error::Format(format!("column '{name}', row {i}: timestamp out of range"))
                    })
                })
                .collect::<Result<Vec<_>>>()?
        }
        other => {
            return Err(Error::Format(format!(
                "column '{name}': unsupported type {other:?}"
            )))
        }
    };
    Ok(values)
}

fn nullable(arr: &dyn Array, i: usize, value: impl FnOnce() -> Value) -> Value {
    if arr.is_null(i) {
        Value::Null
    } else {
        value()
    }
}
