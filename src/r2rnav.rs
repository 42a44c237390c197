//! Reading and writing r2rnav record files and product files
//!
//! The r2rnav intermediate file holds the full 17-column record table
//! and round-trips losslessly: a processed sequence written by the
//! parse stage is read back unchanged by the export stage. Two
//! on-disk encodings are supported, plain CSV (missing values spelled
//! `NAN`, timestamps ISO-8601, durations fractional seconds) and a
//! JSON column/row table. Product files are CSV restricted to the
//! product's column whitelist, optionally preceded by a GeoCSV header.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use log::debug;
use serde_json::{json, Value};

use crate::error::{NavError, Result};
use crate::export::NavProduct;
use crate::geocsv;
use crate::types::{
    duration_seconds, format_iso, format_iso_naive, NavRecord, R2RNAV_COLS,
};

/// Cell value used for missing data in CSV output.
const MISSING: &str = "NAN";

const ISO_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// On-disk encoding of a full record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFileFormat {
    Csv,
    Json,
}

impl FromStr for RecordFileFormat {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(RecordFileFormat::Csv),
            "json" => Ok(RecordFileFormat::Json),
            other => Err(NavError::Export(format!(
                "unknown record file format: {:?}",
                other
            ))),
        }
    }
}

fn csv_cell(rec: &NavRecord, column: &str) -> String {
    fn opt_num<T: ToString>(v: Option<T>) -> String {
        v.map_or(MISSING.to_string(), |v| v.to_string())
    }
    fn opt_duration(d: Option<Duration>) -> String {
        d.map_or(MISSING.to_string(), |d| duration_seconds(d).to_string())
    }

    match column {
        "iso_time" => rec
            .iso_time
            .map_or(MISSING.to_string(), |ts| format_iso(&ts)),
        "sensor_time" => rec
            .sensor_time
            .map_or(MISSING.to_string(), |ts| format_iso_naive(&ts)),
        "ship_longitude" => opt_num(rec.ship_longitude),
        "ship_latitude" => opt_num(rec.ship_latitude),
        "nmea_quality" => opt_num(rec.nmea_quality),
        "nsv" => opt_num(rec.nsv),
        "hdop" => opt_num(rec.hdop),
        "antenna_height" => opt_num(rec.antenna_height),
        "valid_cksum" => rec.valid_cksum.to_string(),
        "valid_parse" => rec.valid_parse.to_string(),
        "deltaT" => opt_duration(rec.delta_t),
        "sensor_deltaT" => opt_duration(rec.sensor_delta_t),
        "valid_order" => opt_num(rec.valid_order),
        "distance" => opt_num(rec.distance),
        "speed_made_good" => opt_num(rec.speed_made_good),
        "course_made_good" => opt_num(rec.course_made_good),
        "acceleration" => opt_num(rec.acceleration),
        other => unreachable!("unknown column {}", other),
    }
}

fn json_cell(rec: &NavRecord, column: &str) -> Value {
    fn opt_f64(v: Option<f64>) -> Value {
        v.map_or(Value::Null, |v| json!(v))
    }
    fn opt_duration(d: Option<Duration>) -> Value {
        d.map_or(Value::Null, |d| json!(duration_seconds(d)))
    }

    match column {
        "iso_time" => rec
            .iso_time
            .map_or(Value::Null, |ts| json!(format_iso(&ts))),
        "sensor_time" => rec
            .sensor_time
            .map_or(Value::Null, |ts| json!(format_iso_naive(&ts))),
        "ship_longitude" => opt_f64(rec.ship_longitude),
        "ship_latitude" => opt_f64(rec.ship_latitude),
        "nmea_quality" => rec.nmea_quality.map_or(Value::Null, |v| json!(v)),
        "nsv" => rec.nsv.map_or(Value::Null, |v| json!(v)),
        "hdop" => opt_f64(rec.hdop),
        "antenna_height" => opt_f64(rec.antenna_height),
        "valid_cksum" => json!(rec.valid_cksum),
        "valid_parse" => json!(rec.valid_parse),
        "deltaT" => opt_duration(rec.delta_t),
        "sensor_deltaT" => opt_duration(rec.sensor_delta_t),
        "valid_order" => rec.valid_order.map_or(Value::Null, |v| json!(v)),
        "distance" => opt_f64(rec.distance),
        "speed_made_good" => opt_f64(rec.speed_made_good),
        "course_made_good" => opt_f64(rec.course_made_good),
        "acceleration" => opt_f64(rec.acceleration),
        other => unreachable!("unknown column {}", other),
    }
}

/// Write the full record table as CSV.
pub fn write_records_csv<W: Write>(writer: W, records: &[NavRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(R2RNAV_COLS)?;
    for rec in records {
        let row: Vec<String> = R2RNAV_COLS.iter().map(|col| csv_cell(rec, col)).collect();
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the full record table as a JSON column/row table.
pub fn write_records_json<W: Write>(mut writer: W, records: &[NavRecord]) -> Result<()> {
    let rows: Vec<Value> = records
        .iter()
        .map(|rec| {
            Value::Array(
                R2RNAV_COLS
                    .iter()
                    .map(|col| json_cell(rec, col))
                    .collect(),
            )
        })
        .collect();
    let table = json!({ "columns": R2RNAV_COLS, "records": rows });
    serde_json::to_writer(&mut writer, &table)?;
    writer.flush()?;
    Ok(())
}

/// Write a full record file in the given encoding.
pub fn write_record_file(
    path: &Path,
    records: &[NavRecord],
    format: RecordFileFormat,
) -> Result<()> {
    debug!(
        "writing {} records to {} ({:?})",
        records.len(),
        path.display(),
        format
    );
    let file = BufWriter::new(File::create(path)?);
    match format {
        RecordFileFormat::Csv => write_records_csv(file, records),
        RecordFileFormat::Json => write_records_json(file, records),
    }
}

fn parse_opt_str(cell: &str) -> Option<&str> {
    if cell.is_empty() || cell == MISSING {
        None
    } else {
        Some(cell)
    }
}

fn parse_opt_f64(cell: &str, column: &str) -> Result<Option<f64>> {
    parse_opt_str(cell)
        .map(|s| {
            s.parse()
                .map_err(|_| NavError::Parse(format!("bad {} value: {:?}", column, s)))
        })
        .transpose()
}

fn parse_opt_u32(cell: &str, column: &str) -> Result<Option<u32>> {
    // Tolerate float spellings of integer columns
    Ok(parse_opt_f64(cell, column)?.map(|v| v as u32))
}

fn parse_flag(cell: &str, column: &str) -> Result<u8> {
    Ok(parse_opt_u32(cell, column)?.unwrap_or(0) as u8)
}

fn parse_opt_duration(cell: &str, column: &str) -> Result<Option<Duration>> {
    Ok(parse_opt_f64(cell, column)?
        .map(|secs| Duration::microseconds((secs * 1e6).round() as i64)))
}

fn parse_naive_timestamp(cell: &str, column: &str) -> Result<Option<NaiveDateTime>> {
    parse_opt_str(cell)
        .map(|s| {
            NaiveDateTime::parse_from_str(s, ISO_PARSE_FORMAT)
                .map_err(|e| NavError::Parse(format!("bad {} value {:?}: {}", column, s, e)))
        })
        .transpose()
}

fn record_from_cells(columns: &[String], cells: &[String]) -> Result<NavRecord> {
    if cells.len() != columns.len() {
        return Err(NavError::Parse(format!(
            "expected {} cells, got {}",
            columns.len(),
            cells.len()
        )));
    }

    let mut rec = NavRecord::default();
    for (column, cell) in columns.iter().zip(cells) {
        match column.as_str() {
            "iso_time" => {
                rec.iso_time =
                    parse_naive_timestamp(cell, column)?.map(|ts| Utc.from_utc_datetime(&ts));
            }
            "sensor_time" => rec.sensor_time = parse_naive_timestamp(cell, column)?,
            "ship_longitude" => rec.ship_longitude = parse_opt_f64(cell, column)?,
            "ship_latitude" => rec.ship_latitude = parse_opt_f64(cell, column)?,
            "nmea_quality" => rec.nmea_quality = parse_opt_u32(cell, column)?,
            "nsv" => rec.nsv = parse_opt_u32(cell, column)?,
            "hdop" => rec.hdop = parse_opt_f64(cell, column)?,
            "antenna_height" => rec.antenna_height = parse_opt_f64(cell, column)?,
            "valid_cksum" => rec.valid_cksum = parse_flag(cell, column)?,
            "valid_parse" => rec.valid_parse = parse_flag(cell, column)?,
            "deltaT" => rec.delta_t = parse_opt_duration(cell, column)?,
            "sensor_deltaT" => rec.sensor_delta_t = parse_opt_duration(cell, column)?,
            "valid_order" => rec.valid_order = parse_opt_u32(cell, column)?.map(|v| v as u8),
            "distance" => rec.distance = parse_opt_f64(cell, column)?,
            "speed_made_good" => rec.speed_made_good = parse_opt_f64(cell, column)?,
            "course_made_good" => rec.course_made_good = parse_opt_f64(cell, column)?,
            "acceleration" => rec.acceleration = parse_opt_f64(cell, column)?,
            other => {
                return Err(NavError::Parse(format!("unknown column: {:?}", other)));
            }
        }
    }
    Ok(rec)
}

fn read_records_csv(path: &Path) -> Result<Vec<NavRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        records.push(record_from_cells(&columns, &cells)?);
    }
    Ok(records)
}

fn json_cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn read_records_json(path: &Path) -> Result<Vec<NavRecord>> {
    let file = BufReader::new(File::open(path)?);
    let table: Value = serde_json::from_reader(file)?;

    let columns: Vec<String> = table["columns"]
        .as_array()
        .ok_or_else(|| NavError::Parse("record table has no columns array".to_string()))?
        .iter()
        .map(|c| json_cell_to_string(c))
        .collect();
    let rows = table["records"]
        .as_array()
        .ok_or_else(|| NavError::Parse("record table has no records array".to_string()))?;

    let mut records = Vec::new();
    for row in rows {
        let cells: Vec<String> = row
            .as_array()
            .ok_or_else(|| NavError::Parse("record row is not an array".to_string()))?
            .iter()
            .map(json_cell_to_string)
            .collect();
        records.push(record_from_cells(&columns, &cells)?);
    }
    Ok(records)
}

/// Read a full record file written by [`write_record_file`].
pub fn read_record_file(path: &Path, format: RecordFileFormat) -> Result<Vec<NavRecord>> {
    let records = match format {
        RecordFileFormat::Csv => read_records_csv(path)?,
        RecordFileFormat::Json => read_records_json(path)?,
    };
    debug!("read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Write a product as CSV restricted to its column whitelist. When
/// `geocsv_overrides` is given the product's GeoCSV metadata header is
/// emitted first, with the overrides applied.
pub fn write_product<W: Write>(
    mut writer: W,
    product: &NavProduct,
    geocsv_overrides: Option<&[(String, String)]>,
) -> Result<()> {
    if let Some(overrides) = geocsv_overrides {
        let template = geocsv::template_for_product(product.name).ok_or_else(|| {
            NavError::Export(format!("no geocsv template for product {:?}", product.name))
        })?;
        writer.write_all(geocsv::render_header(template, overrides).as_bytes())?;
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(product.columns)?;
    for rec in &product.records {
        let row: Vec<String> = product
            .columns
            .iter()
            .map(|col| csv_cell(rec, col))
            .collect();
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::build_control;
    use chrono::Duration;

    fn sample_records() -> Vec<NavRecord> {
        let base = Utc.with_ymd_and_hms(2021, 3, 26, 12, 0, 0).unwrap();
        let mut records: Vec<NavRecord> = (0..3)
            .map(|i| {
                let ts = base + Duration::seconds(i);
                NavRecord {
                    iso_time: Some(ts),
                    sensor_time: Some(ts.naive_utc()),
                    ship_longitude: Some(122.4 + i as f64 * 0.001),
                    ship_latitude: Some(24.8),
                    nmea_quality: Some(2),
                    nsv: Some(12),
                    hdop: Some(0.8),
                    antenna_height: Some(12.5),
                    valid_cksum: 1,
                    valid_parse: 1,
                    ..NavRecord::default()
                }
            })
            .collect();
        records.push(NavRecord::parse_failure());
        crate::kinematics::derive_kinematics(&mut records);
        records
    }

    fn assert_roundtrip(format: RecordFileFormat) {
        let records = sample_records();
        let file = tempfile::NamedTempFile::new().unwrap();
        write_record_file(file.path(), &records, format).unwrap();
        let restored = read_record_file(file.path(), format).unwrap();

        assert_eq!(restored.len(), records.len());
        for (a, b) in records.iter().zip(&restored) {
            assert_eq!(a.iso_time, b.iso_time);
            assert_eq!(a.sensor_time, b.sensor_time);
            assert_eq!(a.ship_longitude, b.ship_longitude);
            assert_eq!(a.nmea_quality, b.nmea_quality);
            assert_eq!(a.valid_cksum, b.valid_cksum);
            assert_eq!(a.valid_parse, b.valid_parse);
            assert_eq!(a.delta_t, b.delta_t);
            assert_eq!(a.valid_order, b.valid_order);
            assert_eq!(a.speed_made_good, b.speed_made_good);
        }
    }

    #[test]
    fn test_csv_record_file_roundtrip() {
        assert_roundtrip(RecordFileFormat::Csv);
    }

    #[test]
    fn test_json_record_file_roundtrip() {
        assert_roundtrip(RecordFileFormat::Json);
    }

    #[test]
    fn test_csv_missing_values_spelled_nan() {
        let records = vec![NavRecord::parse_failure()];
        let mut out = Vec::new();
        write_records_csv(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), R2RNAV_COLS.join(","));
        let row = lines.next().unwrap();
        assert_eq!(row, "NAN,NAN,NAN,NAN,NAN,NAN,NAN,0,0,NAN,NAN,NAN,NAN,NAN,NAN,NAN,NAN");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("csv".parse::<RecordFileFormat>().unwrap(), RecordFileFormat::Csv);
        assert_eq!("json".parse::<RecordFileFormat>().unwrap(), RecordFileFormat::Json);
        assert!("hdf".parse::<RecordFileFormat>().is_err());
    }

    #[test]
    fn test_product_writer_restricts_columns() {
        let product = build_control(sample_records());
        let mut out = Vec::new();
        write_product(&mut out, &product, None).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("iso_time,ship_longitude,ship_latitude\n"));
        assert!(!text.contains("valid_cksum"));
    }

    #[test]
    fn test_product_writer_emits_geocsv_header() {
        let product = build_control(sample_records());
        let overrides = vec![("cruise_id".to_string(), "FK210326".to_string())];
        let mut out = Vec::new();
        write_product(&mut out, &product, Some(&overrides)).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("#dataset: GeoCSV 2.0\n"));
        assert!(text.contains("#cruise_id: FK210326\n"));
        let data_start = text.find("iso_time,").unwrap();
        assert!(text[..data_start].lines().all(|l| l.starts_with('#')));
    }
}
