use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Number, Value as JsonValue};

use super::model::{Column, Table, Value};
use crate::error::{Error, Result};

/// Write a table to `path`, choosing the format by extension (`.csv`,
/// `.json`, `.parquet`/`.pq`).
///
/// Output goes to a sibling `.partial` file that is renamed into place once
/// complete, so a failed write never leaves a truncated file at `path`.
/// Missing parent directories are created.
pub fn write_file(table: &Table, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !matches!(ext.as_str(), "csv" | "json" | "parquet" | "pq") {
        return Err(Error::Format(format!(
            "unsupported output extension '.{ext}' for {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            log::debug!("created directory {}", parent.display());
        }
    }

    let partial = partial_path(path);
    let file = File::create(&partial).map_err(|e| Error::io(&partial, e))?;
    let written = match ext.as_str() {
        "csv" => write_csv(table, file, &partial),
        "json" => write_json(table, file, &partial),
        _ => write_parquet(table, file, &partial),
    };
    let renamed = written.and_then(|()| fs::rename(&partial, path).map_err(|e| Error::io(path, e)));
    if let Err(e) = renamed {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    log::debug!("wrote {} rows to {}", table.n_rows(), path.display());
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn write_csv(table: &Table, file: File, path: &Path) -> Result<()> {
    let to_err = |e: csv::Error| Error::io(path, std::io::Error::other(e));
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(table.column_names()).map_err(to_err)?;
    for i in 0..table.n_rows() {
        writer
            .write_record(table.row(i).map(Value::to_string))
            .map_err(to_err)?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}

// ---------------------------------------------------------------------------
// JSON (records orientation, mirrors the loader)
// ---------------------------------------------------------------------------

fn write_json(table: &Table, file: File, path: &Path) -> Result<()> {
    let records: Vec<JsonValue> = (0..table.n_rows())
        .map(|i| {
            let obj: Map<String, JsonValue> = table
                .column_names()
                .zip(table.row(i))
                .map(|(name, v)| (name.to_string(), value_to_json(v)))
                .collect();
            JsonValue::Object(obj)
        })
        .collect();

    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, &records)
        .map_err(|e| Error::io(path, std::io::Error::other(e)))?;
    out.flush().map_err(|e| Error::io(path, e))
}

fn value_to_json(v: &Value) -> JsonValue {
    match v {
        Value::Null => JsonValue::Null,
        Value::Integer(i) => JsonValue::from(*i),
        Value::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::String(_) | Value::Date(_) => JsonValue::String(v.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn write_parquet(table: &Table, file: File, path: &Path) -> Result<()> {
    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) =
        table.columns().iter().map(arrow_column).unzip();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new_with_options(
        schema.clone(),
        arrays,
        &RecordBatchOptions::new().with_row_count(Some(table.n_rows())),
    )
    .map_err(|e| Error::Format(e.to_string()))?;

    let to_err = |e: parquet::errors::ParquetError| Error::io(path, std::io::Error::other(e));
    let mut writer = ArrowWriter::try_new(file, schema, None).map_err(to_err)?;
    writer.write(&batch).map_err(to_err)?;
    writer.close().map_err(to_err)?;
    Ok(())
}

/// Pick the narrowest Arrow type holding every non-missing cell: integers,
/// then floats (integers mixed with floats widen), booleans, timestamps,
/// and text for anything else.
fn arrow_column(col: &Column) -> (Field, ArrayRef) {
    let present = || col.values.iter().filter(|v| !v.is_null());
    let any_present = present().next().is_some();
    let all = |pred: fn(&Value) -> bool| any_present && present().all(pred);

    let (data_type, array): (DataType, ArrayRef) = if all(|v| matches!(v, Value::Integer(_))) {
        let arr: Int64Array = col
            .values
            .iter()
            .map(|v| match v {
                Value::Integer(i) => Some(*i),
                _ => None,
            })
            .collect();
        (DataType::Int64, Arc::new(arr))
    } else if all(|v| v.as_f64().is_some()) {
        let arr: Float64Array = col.values.iter().map(Value::as_f64).collect();
        (DataType::Float64, Arc::new(arr))
    } else if all(|v| matches!(v, Value::Bool(_))) {
        let arr: BooleanArray = col
            .values
            .iter()
            .map(|v| match v {
                Value::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        (DataType::Boolean, Arc::new(arr))
    } else if all(|v| matches!(v, Value::Date(_))) {
        let arr: TimestampMicrosecondArray = col
            .values
            .iter()
            .map(|v| match v {
                Value::Date(d) => Some(d.and_utc().timestamp_micros()),
                _ => None,
            })
            .collect();
        (DataType::Timestamp(TimeUnit::Microsecond, None), Arc::new(arr))
    } else {
        let arr: StringArray = col
            .values
            .iter()
            .map(|v| (!v.is_null()).then(|| v.to_string()))
            .collect();
        (DataType::Utf8, Arc::new(arr))
    };

    (Field::new(col.name.as_str(), data_type, true), array)
}
