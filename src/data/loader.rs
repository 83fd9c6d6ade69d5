use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::DataError;
use super::model::{CellValue, Column, ColumnType, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – columnar snapshot (site, summary and measurement tables)
/// * `.csv`     – header row plus records (GDP reference data)
/// * `.json`    – `[{ "site_name": "A1094", ... }, ...]`
///
/// Row order always matches the source.
pub fn load_table(path: &Path) -> Result<Table, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(path.to_path_buf()));
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, name),
        "csv" => load_csv(path, name),
        "json" => load_json(path, name),
        other => Err(DataError::Format(format!(
            "{}: unsupported file extension .{other}",
            path.display()
        ))),
    }?;

    log::info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

fn io_error(path: &Path, source: std::io::Error) -> DataError {
    if source.kind() == std::io::ErrorKind::NotFound {
        DataError::NotFound(path.to_path_buf())
    } else {
        DataError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per row.
/// Empty cells are missing values. Column types are inferred over the whole
/// file and every cell is then converted to its column's type.
fn load_csv(path: &Path, name: String) -> Result<Table, DataError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let mut reader = csv::Reader::from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataError::Format(format!("{}: reading CSV headers: {e}", path.display())))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        return Err(DataError::Format(format!(
            "{}: CSV has no header row",
            path.display()
        )));
    }

    // Unequal record lengths surface here as csv::ErrorKind::UnequalLengths.
    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            DataError::Format(format!("{}: CSV row {row_no}: {e}", path.display()))
        })?;
        records.push(record);
    }

    let mut types = vec![ColumnType::Null; headers.len()];
    for record in &records {
        for (col_idx, value) in record.iter().enumerate() {
            types[col_idx] = types[col_idx].merge(infer_cell_type(value));
        }
    }

    let rows: Vec<Vec<CellValue>> = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&types)
                .map(|(value, dtype)| convert_cell(value, *dtype))
                .collect()
        })
        .collect();

    let columns: Vec<Column> = headers
        .into_iter()
        .zip(types)
        .map(|(name, dtype)| Column::new(name, dtype))
        .collect();

    Table::new(name, columns, rows)
}

fn infer_cell_type(s: &str) -> ColumnType {
    if s.is_empty() {
        return ColumnType::Null;
    }
    if s.parse::<i64>().is_ok() {
        return ColumnType::Integer;
    }
    if s.parse::<f64>().is_ok() {
        return ColumnType::Float;
    }
    if s == "true" || s == "false" {
        return ColumnType::Bool;
    }
    ColumnType::Text
}

fn convert_cell(s: &str, dtype: ColumnType) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    let text = || CellValue::String(s.to_string());
    match dtype {
        ColumnType::Integer => s.parse().map(CellValue::Integer).unwrap_or_else(|_| text()),
        ColumnType::Float => s.parse().map(CellValue::Float).unwrap_or_else(|_| text()),
        ColumnType::Bool => CellValue::Bool(s == "true"),
        ColumnType::Text | ColumnType::Date | ColumnType::Null => text(),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "site_name": "A1094", "latitude": 45.42, "longitude": -75.69 },
///   ...
/// ]
/// ```
///
/// Columns are the union of keys across records; a key absent from a record
/// is a missing value there.
fn load_json(path: &Path, name: String) -> Result<Table, DataError> {
    let text = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let root: JsonValue = serde_json::from_str(&text)
        .map_err(|e| DataError::Format(format!("{}: parsing JSON: {e}", path.display())))?;

    let records = root.as_array().ok_or_else(|| {
        DataError::Format(format!("{}: expected top-level JSON array", path.display()))
    })?;

    let mut names: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| {
            DataError::Format(format!("{}: row {i} is not a JSON object", path.display()))
        })?;
        for key in obj.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let raw: Vec<Vec<CellValue>> = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            names
                .iter()
                .map(|n| obj.get(n).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    let mut types = vec![ColumnType::Null; names.len()];
    for row in &raw {
        for (col_idx, cell) in row.iter().enumerate() {
            types[col_idx] = types[col_idx].merge(cell.column_type());
        }
    }

    let rows: Vec<Vec<CellValue>> = raw
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&types)
                .map(|(cell, dtype)| coerce_cell(cell, *dtype))
                .collect()
        })
        .collect();

    let columns: Vec<Column> = names
        .into_iter()
        .zip(types)
        .map(|(name, dtype)| Column::new(name, dtype))
        .collect();

    Table::new(name, columns, rows)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

/// Convert a cell into the (possibly widened) type of its column.
fn coerce_cell(cell: CellValue, dtype: ColumnType) -> CellValue {
    match (cell, dtype) {
        (CellValue::Null, _) => CellValue::Null,
        (CellValue::Integer(i), ColumnType::Float) => CellValue::Float(i as f64),
        (cell, ColumnType::Text) if cell.column_type() != ColumnType::Text => {
            CellValue::String(cell.to_string())
        }
        (cell, _) => cell,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet snapshot of a site table.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, name: String) -> Result<Table, DataError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
        DataError::Format(format!("{}: reading parquet metadata: {e}", path.display()))
    })?;

    let columns: Vec<Column> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| Column::new(f.name().clone(), arrow_column_type(f.data_type())))
        .collect();

    let reader = builder.build().map_err(|e| {
        DataError::Format(format!("{}: building parquet reader: {e}", path.display()))
    })?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|e| {
            DataError::Format(format!("{}: reading record batch: {e}", path.display()))
        })?;

        let arrays = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| normalize_array(batch.column(idx), column.dtype))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DataError::Format(format!("{}: {e}", path.display())))?;

        for row in 0..batch.num_rows() {
            let cells: Vec<CellValue> = arrays
                .iter()
                .zip(&columns)
                .map(|(array, column)| extract_cell(array, column.dtype, row))
                .collect();
            rows.push(cells);
        }
    }

    Table::new(name, columns, rows)
}

// -- Parquet / Arrow helpers --

fn arrow_column_type(data_type: &DataType) -> ColumnType {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => ColumnType::Integer,
        DataType::Float16 | DataType::Float32 | DataType::Float64 => ColumnType::Float,
        DataType::Boolean => ColumnType::Bool,
        DataType::Date32 | DataType::Date64 => ColumnType::Date,
        DataType::Null => ColumnType::Null,
        _ => ColumnType::Text,
    }
}

/// Cast a column to the single Arrow type we read each `ColumnType` from.
/// Types Arrow cannot cast to text are left as-is and formatted per cell.
fn normalize_array(array: &ArrayRef, dtype: ColumnType) -> Result<ArrayRef, String> {
    let target = match dtype {
        ColumnType::Integer => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Bool | ColumnType::Null => return Ok(array.clone()),
        ColumnType::Text | ColumnType::Date => {
            if !can_cast_types(array.data_type(), &DataType::Utf8) {
                return Ok(array.clone());
            }
            DataType::Utf8
        }
    };
    cast(array, &target).map_err(|e| format!("casting {:?}: {e}", array.data_type()))
}

/// Extract a single cell from a normalized Arrow column at a given row.
fn extract_cell(col: &ArrayRef, dtype: ColumnType, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match (dtype, col.data_type()) {
        (ColumnType::Integer, _) => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        (ColumnType::Float, _) => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        (ColumnType::Bool, _) => CellValue::Bool(col.as_boolean().value(row)),
        (ColumnType::Date, DataType::Utf8) => {
            CellValue::Date(col.as_string::<i32>().value(row).to_string())
        }
        (ColumnType::Text, DataType::Utf8) => {
            CellValue::String(col.as_string::<i32>().value(row).to_string())
        }
        (ColumnType::Null, _) => CellValue::Null,
        _ => array_value_to_string(col.as_ref(), row)
            .map(CellValue::String)
            .unwrap_or(CellValue::Null),
    }
}
