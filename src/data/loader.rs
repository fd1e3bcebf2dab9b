use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::coerce::{coerce, RawCell};
use super::error::LoadError;
use super::model::{CellValue, ColumnType, Field, Row, Table, TableSchema};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`                          – UTF-8, header row with column names
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – first sheet, first row is the header
/// * `.json`                         – `[{ "col": value, ... }, ...]`
/// * `.parquet`                      – flat columns (strings, numbers, dates)
///
/// Declared columns are coerced to their type; rows whose *required* values
/// fail to coerce are dropped and counted on the returned table.
pub fn load(path: &Path, schema: &TableSchema) -> Result<Table, LoadError> {
    std::fs::metadata(path).map_err(|e| LoadError::io(path, e))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "csv" => read_csv(path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_spreadsheet(path)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    let table = build_table(path, schema, raw)?;
    log::info!(
        "Loaded {} rows from {} ({} columns)",
        table.len(),
        path.display(),
        table.fields().len()
    );
    if table.dropped_rows() > 0 {
        log::warn!(
            "Dropped {} rows from {} with missing or malformed required values",
            table.dropped_rows(),
            path.display()
        );
    }
    Ok(table)
}

/// Header plus untyped cells, as read from any format.
#[derive(Debug, Default)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<RawCell>>,
}

// ---------------------------------------------------------------------------
// Typing
// ---------------------------------------------------------------------------

fn build_table(path: &Path, schema: &TableSchema, raw: RawTable) -> Result<Table, LoadError> {
    if let Some(missing) = schema
        .columns
        .iter()
        .find(|c| c.required && !raw.headers.contains(&c.name))
    {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: missing.name.clone(),
        });
    }

    // File columns in header order; undeclared ones are kept as text.
    let mut fields: Vec<Field> = raw
        .headers
        .iter()
        .map(|h| {
            let ty = schema.spec(h).map(|c| c.ty).unwrap_or(ColumnType::Str);
            Field::new(h, ty)
        })
        .collect();
    for spec in &schema.columns {
        if !raw.headers.contains(&spec.name) {
            log::warn!(
                "Optional column '{}' not present in {}; it reads as empty",
                spec.name,
                path.display()
            );
            fields.push(Field::new(&spec.name, spec.ty));
        }
    }

    let mut rows = Vec::with_capacity(raw.rows.len());
    let mut dropped = 0;

    'rows: for raw_row in &raw.rows {
        let mut row = Row::new();
        for (idx, header) in raw.headers.iter().enumerate() {
            let cell = raw_row.get(idx).unwrap_or(&RawCell::Empty);
            let spec = schema.spec(header);
            let ty = spec.map(|c| c.ty).unwrap_or(ColumnType::Str);
            let mut value = coerce(cell, ty);

            if value.is_null() && spec.is_some_and(|c| c.required) {
                dropped += 1;
                continue 'rows;
            }
            if schema.uppercase_text {
                if let CellValue::Str(s) = &value {
                    value = CellValue::Str(s.to_uppercase());
                }
            }
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }

    Ok(Table::new(fields, rows).with_dropped(dropped))
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<RawTable, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| LoadError::parse(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::parse(path, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LoadError::parse(path, format!("CSV row {row_no}: {e}")))?;
        rows.push(record.iter().map(|v| RawCell::Text(v.to_string())).collect());
    }

    Ok(RawTable { headers, rows })
}

// ---------------------------------------------------------------------------
// Spreadsheet reader
// ---------------------------------------------------------------------------

fn read_spreadsheet(path: &Path) -> Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| LoadError::parse(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::parse(path, "workbook has no sheets"))?
        .map_err(|e| LoadError::parse(path, e))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header_row) => header_row.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => Vec::new(),
    };
    let rows = sheet_rows
        .map(|r| r.iter().map(spreadsheet_cell).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

fn spreadsheet_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Int(i) => RawCell::Int(*i),
        Data::Float(v) => RawCell::Float(*v),
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Bool(b) => RawCell::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(RawCell::DateTime)
            .unwrap_or(RawCell::Empty),
        Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(_) | Data::Empty => RawCell::Empty,
    }
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Data": "2024-05-02", "Profissional": "Ana", "Valor": 45.0 },
///   ...
/// ]
/// ```
fn read_json(path: &Path) -> Result<RawTable, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let root: JsonValue = serde_json::from_str(&text).map_err(|e| LoadError::parse(path, e))?;

    let records = root
        .as_array()
        .ok_or_else(|| LoadError::parse(path, "expected top-level JSON array"))?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::parse(path, format!("row {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_cell).unwrap_or(RawCell::Empty))
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_cell(val: &JsonValue) -> RawCell {
    match val {
        JsonValue::String(s) => RawCell::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                RawCell::Int(i)
            } else if let Some(f) = n.as_f64() {
                RawCell::Float(f)
            } else {
                RawCell::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => RawCell::Bool(*b),
        JsonValue::Null => RawCell::Empty,
        other => RawCell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`) as long as the columns are flat.
fn read_parquet(path: &Path) -> Result<RawTable, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::io(path, e))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| LoadError::parse(path, e))?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().map_err(|e| LoadError::parse(path, e))?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| LoadError::parse(path, e))?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| arrow_cell(col, row))
                    .collect(),
            );
        }
    }

    Ok(RawTable { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &ArrayRef, row: usize) -> RawCell {
    if col.is_null(row) {
        return RawCell::Empty;
    }
    let datetime = match col.data_type() {
        DataType::Utf8 => return RawCell::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => {
            return RawCell::Text(col.as_string::<i64>().value(row).to_string())
        }
        DataType::Int32 => return RawCell::Int(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => return RawCell::Int(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => {
            return RawCell::Float(col.as_primitive::<Float32Type>().value(row) as f64)
        }
        DataType::Float64 => return RawCell::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => return RawCell::Bool(col.as_boolean().value(row)),
        DataType::Date32 => col.as_primitive::<Date32Type>().value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Second, _) => col
            .as_primitive::<TimestampSecondType>()
            .value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Millisecond, _) => col
            .as_primitive::<TimestampMillisecondType>()
            .value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Microsecond, _) => col
            .as_primitive::<TimestampMicrosecondType>()
            .value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => col
            .as_primitive::<TimestampNanosecondType>()
            .value_as_datetime(row),
        _ => None,
    };
    datetime.map(RawCell::DateTime).unwrap_or(RawCell::Empty)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::ColumnSpec;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn booking_schema() -> TableSchema {
        TableSchema::new(vec![
            ColumnSpec::required("Data", ColumnType::Date),
            ColumnSpec::optional("Valor", ColumnType::Float),
            ColumnSpec::optional("Profissional", ColumnType::Str),
        ])
    }

    #[test]
    fn csv_rows_with_bad_required_dates_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "agenda.csv",
            "Data,Valor,Profissional,Extra\n\
             2024-05-02,45.0,Ana,x\n\
             garbage,30,Bruno,y\n\
             2024-05-03,abc,Ana,z\n",
        );

        let table = load(&path, &booking_schema()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.dropped_rows(), 1);
        assert_eq!(
            table.value(0, "Data"),
            &CellValue::from(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
        );
        // Optional numeric failing to coerce is kept as missing.
        assert_eq!(table.value(1, "Valor"), &CellValue::Null);
        // Undeclared columns survive as text.
        assert_eq!(table.column_type("Extra"), Some(ColumnType::Str));
    }

    #[test]
    fn absent_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("AGENDAMENTOS.xlsx"), &booking_schema()).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn missing_required_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "x.csv", "Valor,Profissional\n1,Ana\n");
        let err = load(&path, &booking_schema()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "Data"));
    }

    #[test]
    fn ragged_csv_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "x.csv", "Data,Valor\n2024-01-01,1\n2024-01-02,2,3\n");
        let err = load(&path, &booking_schema()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "x.txt", "Data\n");
        let err = load(&path, &booking_schema()).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ref e) if e == "txt"));
    }

    #[test]
    fn json_records_with_uppercasing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "credito.json",
            r#"[{"EMPREGO": "clt", "IDADE": 30}, {"EMPREGO": "autônomo", "IDADE": null}]"#,
        );
        let schema = TableSchema::new(vec![
            ColumnSpec::optional("EMPREGO", ColumnType::Str),
            ColumnSpec::required("IDADE", ColumnType::Int),
        ])
        .with_uppercase_text();

        let table = load(&path, &schema).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.dropped_rows(), 1);
        assert_eq!(table.value(0, "EMPREGO"), &CellValue::from("CLT"));
    }

    #[test]
    fn xlsx_first_sheet_with_native_and_text_dates() {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AGENDAMENTOS.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in ["Data", "Valor", "Profissional"].iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let day = ExcelDateTime::from_ymd(2024, 5, 2).unwrap();
        sheet.write_datetime_with_format(1, 0, &day, &date_format).unwrap();
        sheet.write_number(1, 1, 45.0).unwrap();
        sheet.write_string(1, 2, "Ana").unwrap();
        sheet.write_string(2, 0, "garbage").unwrap();
        sheet.write_number(2, 1, 30.0).unwrap();
        sheet.write_string(2, 2, "Bruno").unwrap();
        sheet.write_string(3, 0, "2024-05-03").unwrap();
        sheet.write_string(3, 2, "Ana").unwrap();
        workbook.save(&path).unwrap();

        let table = load(&path, &booking_schema()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.dropped_rows(), 1);
        assert_eq!(
            table.value(0, "Data"),
            &CellValue::from(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
        );
        assert_eq!(table.value(0, "Valor"), &CellValue::Float(45.0));
        assert_eq!(
            table.value(1, "Data"),
            &CellValue::from(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap())
        );
        assert_eq!(table.value(1, "Valor"), &CellValue::Null);
    }

    #[test]
    fn parquet_timestamps_and_text() {
        use std::sync::Arc;

        use arrow::array::{Float64Array, StringArray, TimestampMillisecondArray};
        use arrow::datatypes::{Field as ArrowField, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let start = NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let ms = start.and_utc().timestamp_millis();

        let schema = Arc::new(Schema::new(vec![
            ArrowField::new("Data", DataType::Timestamp(TimeUnit::Millisecond, None), true),
            ArrowField::new("Valor", DataType::Float64, true),
            ArrowField::new("Profissional", DataType::Utf8, true),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(TimestampMillisecondArray::from(vec![Some(ms), None, Some(ms + 86_400_000)])),
            Arc::new(Float64Array::from(vec![Some(45.0), Some(30.0), None])),
            Arc::new(StringArray::from(vec![Some("Ana"), Some("Bruno"), None])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agenda.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load(&path, &booking_schema()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.dropped_rows(), 1);
        assert_eq!(table.value(0, "Data"), &CellValue::Date(start));
        assert_eq!(table.value(0, "Profissional"), &CellValue::from("Ana"));
        assert_eq!(table.value(1, "Valor"), &CellValue::Null);
        assert_eq!(table.value(1, "Profissional"), &CellValue::Null);
    }

    #[test]
    fn spreadsheet_cells_map_to_raw_cells() {
        assert_eq!(spreadsheet_cell(&Data::Float(2.5)), RawCell::Float(2.5));
        assert_eq!(spreadsheet_cell(&Data::Empty), RawCell::Empty);
        assert_eq!(
            spreadsheet_cell(&Data::String("Corte".into())),
            RawCell::Text("Corte".into())
        );
        let iso = spreadsheet_cell(&Data::DateTimeIso("2024-05-02T10:20:00".into()));
        assert_eq!(
            iso,
            RawCell::DateTime(
                NaiveDate::from_ymd_opt(2024, 5, 2)
                    .unwrap()
                    .and_hms_opt(10, 20, 0)
                    .unwrap()
            )
        );
    }
}
