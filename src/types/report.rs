//! Summary reports over a record sequence
//!
//! Three report shapes: `InfoReport` (temporal/spatial extent of a
//! processed sequence), `FileReport` (same plus parse accounting for
//! one raw source file), and `QaReport` (threshold-based quality
//! assessment). All of them summarize only cleanly parsed records;
//! building any report over a sequence with no such records is an
//! error rather than a report full of nulls.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use crate::error::{NavError, Result};
use crate::types::{duration_seconds, format_iso, NavRecord};

/// Default maximum acceptable epoch gap, seconds.
pub const DEFAULT_GAP_THRESHOLD: f64 = 300.0;
/// Default maximum reasonable speed over ground, m/s.
pub const DEFAULT_SPEED_THRESHOLD: f64 = 8.7;
/// Default maximum reasonable horizontal acceleration, m/s^2.
pub const DEFAULT_ACCELERATION_THRESHOLD: f64 = 1.0;

fn good_records(records: &[NavRecord]) -> Vec<&NavRecord> {
    records.iter().filter(|r| r.valid_parse == 1).collect()
}

fn min_max<F>(records: &[&NavRecord], field: F) -> (Option<f64>, Option<f64>)
where
    F: Fn(&NavRecord) -> Option<f64>,
{
    let mut lo: Option<f64> = None;
    let mut hi: Option<f64> = None;
    for rec in records {
        if let Some(v) = field(rec) {
            lo = Some(lo.map_or(v, |m: f64| m.min(v)));
            hi = Some(hi.map_or(v, |m: f64| m.max(v)));
        }
    }
    (lo, hi)
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = 100.0 * count as f64 / total as f64;
    (pct * 10_000.0).round() / 10_000.0
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(v) => format!("{:.*}", precision, v),
        None => "null".to_string(),
    }
}

fn fmt_opt_ts(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => format_iso(&ts),
        None => "null".to_string(),
    }
}

fn json_opt_f64(v: Option<f64>) -> Value {
    match v {
        Some(v) => json!(v),
        None => Value::Null,
    }
}

/// Temporal and spatial extent of a processed sequence.
#[derive(Debug, Clone)]
pub struct InfoReport {
    pub filename: String,
    pub start_ts: Option<DateTime<Utc>>,
    pub end_ts: Option<DateTime<Utc>>,
    /// [longitude, latitude] of the first record.
    pub start_coord: [Option<f64>; 2],
    /// [longitude, latitude] of the last record.
    pub end_coord: [Option<f64>; 2],
    /// [max_lon, max_lat, min_lon, min_lat].
    pub bbox: [Option<f64>; 4],
    pub total_lines: usize,
}

impl InfoReport {
    pub fn build(filename: &str, records: &[NavRecord]) -> Result<Self> {
        let good = good_records(records);
        let (first, last) = match (good.first(), good.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(NavError::EmptySequence),
        };

        let (lon_min, lon_max) = min_max(&good, |r| r.ship_longitude);
        let (lat_min, lat_max) = min_max(&good, |r| r.ship_latitude);

        Ok(InfoReport {
            filename: filename.to_string(),
            start_ts: first.iso_time,
            end_ts: last.iso_time,
            start_coord: [first.ship_longitude, first.ship_latitude],
            end_coord: [last.ship_longitude, last.ship_latitude],
            bbox: [lon_max, lat_max, lon_min, lat_min],
            total_lines: good.len(),
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "filename": self.filename,
            "startTS": fmt_opt_ts(self.start_ts),
            "endTS": fmt_opt_ts(self.end_ts),
            "startCoord": [json_opt_f64(self.start_coord[0]), json_opt_f64(self.start_coord[1])],
            "endCoord": [json_opt_f64(self.end_coord[0]), json_opt_f64(self.end_coord[1])],
            "bbox": [
                json_opt_f64(self.bbox[0]),
                json_opt_f64(self.bbox[1]),
                json_opt_f64(self.bbox[2]),
                json_opt_f64(self.bbox[3]),
            ],
            "totalLines": self.total_lines,
        })
    }
}

impl fmt::Display for InfoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NavInfo Report: {}", self.filename)?;
        writeln!(f, "Navigation Start/End Info:")?;
        writeln!(f, "\tStart Date: {}", fmt_opt_ts(self.start_ts))?;
        writeln!(f, "\tEnd Date: {}", fmt_opt_ts(self.end_ts))?;
        writeln!(
            f,
            "\tStart Lat/Lon: [{},{}]",
            fmt_opt(self.start_coord[1], 6),
            fmt_opt(self.start_coord[0], 6)
        )?;
        writeln!(
            f,
            "\tEnd Lat/Lon: [{},{}]",
            fmt_opt(self.end_coord[1], 6),
            fmt_opt(self.end_coord[0], 6)
        )?;
        writeln!(f, "Navigation Bounding Box Info:")?;
        writeln!(f, "\tMinimum Longitude: {}", fmt_opt(self.bbox[2], 6))?;
        writeln!(f, "\tMaximum Longitude: {}", fmt_opt(self.bbox[0], 6))?;
        writeln!(f, "\tMinimum Latitude: {}", fmt_opt(self.bbox[3], 6))?;
        writeln!(f, "\tMaximum Latitude: {}", fmt_opt(self.bbox[1], 6))?;
        write!(f, "Total Lines of Data: {}", self.total_lines)
    }
}

/// Extent plus parse accounting for a single raw source file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub info: InfoReport,
    pub parse_errors: usize,
}

impl FileReport {
    /// `records` is the parser output for one file (failed lines
    /// retained as null records); `total_lines` covers both.
    pub fn build(filename: &str, records: &[NavRecord], parse_errors: usize) -> Result<Self> {
        let mut info = InfoReport::build(filename, records)?;
        info.total_lines += parse_errors;
        Ok(FileReport { info, parse_errors })
    }

    pub fn to_json(&self) -> Value {
        let mut value = self.info.to_json();
        value["parseErrors"] = json!(self.parse_errors);
        value["totalLines"] = json!(self.info.total_lines);
        value
    }
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File Report: {}", self.info.filename)?;
        writeln!(f, "Navigation Start/End Info:")?;
        writeln!(f, "\tStart Date: {}", fmt_opt_ts(self.info.start_ts))?;
        writeln!(f, "\tEnd Date: {}", fmt_opt_ts(self.info.end_ts))?;
        writeln!(
            f,
            "\tStart Lat/Lon: [{},{}]",
            fmt_opt(self.info.start_coord[1], 6),
            fmt_opt(self.info.start_coord[0], 6)
        )?;
        writeln!(
            f,
            "\tEnd Lat/Lon: [{},{}]",
            fmt_opt(self.info.end_coord[1], 6),
            fmt_opt(self.info.end_coord[0], 6)
        )?;
        writeln!(f, "Navigation Bounding Box Info:")?;
        writeln!(f, "\tMinimum Longitude: {}", fmt_opt(self.info.bbox[2], 6))?;
        writeln!(f, "\tMaximum Longitude: {}", fmt_opt(self.info.bbox[0], 6))?;
        writeln!(f, "\tMinimum Latitude: {}", fmt_opt(self.info.bbox[3], 6))?;
        writeln!(f, "\tMaximum Latitude: {}", fmt_opt(self.info.bbox[1], 6))?;
        writeln!(f, "Parsing Errors: {}", self.parse_errors)?;
        write!(f, "Total Lines of Data: {}", self.info.total_lines)
    }
}

/// Threshold-based quality assessment of a processed sequence.
#[derive(Debug, Clone)]
pub struct QaReport {
    pub filename: String,
    pub total_lines: usize,

    pub gap_threshold: Duration,
    pub speed_threshold: f64,
    pub acceleration_threshold: f64,

    pub antenna_height: (Option<f64>, Option<f64>),
    pub speed: (Option<f64>, Option<f64>),
    pub acceleration: (Option<f64>, Option<f64>),
    pub nsv: (Option<u32>, Option<u32>),
    pub hdop: (Option<f64>, Option<f64>),
    pub delta_t: (Option<Duration>, Option<Duration>),
    pub first_epoch: Option<DateTime<Utc>>,
    pub last_epoch: Option<DateTime<Utc>>,

    pub gap_errors: usize,
    pub out_of_sequence_errors: usize,
    pub quality_errors: usize,
    pub speed_errors: usize,
    pub acceleration_errors: usize,
    pub cksum_errors: usize,
}

impl QaReport {
    pub fn build(
        filename: &str,
        records: &[NavRecord],
        gap_seconds: f64,
        speed_threshold: f64,
        acceleration_threshold: f64,
    ) -> Result<Self> {
        let good = good_records(records);
        if good.is_empty() {
            return Err(NavError::EmptySequence);
        }
        let total = good.len();

        let gap_threshold = Duration::microseconds((gap_seconds * 1e6) as i64);

        let (nsv_min, nsv_max) = {
            let mut lo: Option<u32> = None;
            let mut hi: Option<u32> = None;
            for rec in &good {
                if let Some(n) = rec.nsv {
                    lo = Some(lo.map_or(n, |m| m.min(n)));
                    hi = Some(hi.map_or(n, |m| m.max(n)));
                }
            }
            (lo, hi)
        };

        let (dt_min, dt_max) = {
            let mut lo: Option<Duration> = None;
            let mut hi: Option<Duration> = None;
            for rec in &good {
                if let Some(d) = rec.delta_t {
                    lo = Some(lo.map_or(d, |m| m.min(d)));
                    hi = Some(hi.map_or(d, |m| m.max(d)));
                }
            }
            (lo, hi)
        };

        // A null quality indicator is a quality error too.
        let quality_ok = |r: &NavRecord| matches!(r.nmea_quality, Some(1..=3));

        Ok(QaReport {
            filename: filename.to_string(),
            total_lines: total,
            gap_threshold,
            speed_threshold,
            acceleration_threshold,
            antenna_height: min_max(&good, |r| r.antenna_height),
            speed: min_max(&good, |r| r.speed_made_good),
            acceleration: min_max(&good, |r| r.acceleration),
            nsv: (nsv_min, nsv_max),
            hdop: min_max(&good, |r| r.hdop),
            delta_t: (dt_min, dt_max),
            first_epoch: good.first().and_then(|r| r.iso_time),
            last_epoch: good.last().and_then(|r| r.iso_time),
            gap_errors: good
                .iter()
                .filter(|r| r.delta_t.map_or(false, |d| d > gap_threshold))
                .count(),
            out_of_sequence_errors: good
                .iter()
                .filter(|r| r.valid_order == Some(0))
                .count(),
            quality_errors: good.iter().filter(|r| !quality_ok(r)).count(),
            speed_errors: good
                .iter()
                .filter(|r| r.speed_made_good.map_or(false, |s| s > speed_threshold))
                .count(),
            acceleration_errors: good
                .iter()
                .filter(|r| {
                    r.acceleration
                        .map_or(false, |a| a > acceleration_threshold)
                })
                .count(),
            cksum_errors: good.iter().filter(|r| r.valid_cksum == 0).count(),
        })
    }

    pub fn to_json(&self) -> Value {
        let dt_max = self.delta_t.1.map(duration_seconds);
        json!({
            "filename": self.filename,
            "antennaAltitudeMax": json_opt_f64(self.antenna_height.1),
            "antennaAltitudeMin": json_opt_f64(self.antenna_height.0),
            "horizontalSpeedMax": json_opt_f64(self.speed.1),
            "horizontalSpeedMin": json_opt_f64(self.speed.0),
            "horizontalAccelerationMax": json_opt_f64(self.acceleration.1),
            "horizontalAccelerationMin": json_opt_f64(self.acceleration.0),
            "firstEpoch": fmt_opt_ts(self.first_epoch),
            "lastEpoch": fmt_opt_ts(self.last_epoch),
            "satellitesMax": self.nsv.1,
            "satellitesMin": self.nsv.0,
            "hdopMax": json_opt_f64(self.hdop.1),
            "hdopMin": json_opt_f64(self.hdop.0),
            "deltaTMax": json_opt_f64(dt_max),
            "deltaTErrors": self.gap_errors,
            "deltaTErrorPercentage": percent(self.gap_errors, self.total_lines),
            "outOfSequenceErrors": self.out_of_sequence_errors,
            "outOfSequenceErrorPercentage": percent(self.out_of_sequence_errors, self.total_lines),
            "nmeaQualityErrors": self.quality_errors,
            "nmeaQualityErrorPercentage": percent(self.quality_errors, self.total_lines),
            "horizontalSpeedErrors": self.speed_errors,
            "horizontalSpeedErrorPercentage": percent(self.speed_errors, self.total_lines),
            "horizontalAccelerationErrors": self.acceleration_errors,
            "horizontalAccelerationErrorPercentage":
                percent(self.acceleration_errors, self.total_lines),
            "cksumErrors": self.cksum_errors,
            "cksumErrorPercentage": percent(self.cksum_errors, self.total_lines),
            "totalLines": self.total_lines,
        })
    }
}

impl fmt::Display for QaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dt_max = self.delta_t.1.map(duration_seconds);
        writeln!(f, "NavQA Report: {}", self.filename)?;
        writeln!(f, "Duration and range of values:")?;
        writeln!(
            f,
            "Maximum Antenna Altitude: {} m",
            fmt_opt(self.antenna_height.1, 3)
        )?;
        writeln!(
            f,
            "Minimum Antenna Altitude: {} m",
            fmt_opt(self.antenna_height.0, 3)
        )?;
        writeln!(f, "Maximum Horizontal Speed: {} m/s", fmt_opt(self.speed.1, 3))?;
        writeln!(f, "Minimum Horizontal Speed: {} m/s", fmt_opt(self.speed.0, 3))?;
        writeln!(
            f,
            "Maximum Horizontal Acceleration: {} m/s^2",
            fmt_opt(self.acceleration.1, 3)
        )?;
        writeln!(
            f,
            "Minimum Horizontal Acceleration: {} m/s^2",
            fmt_opt(self.acceleration.0, 3)
        )?;
        writeln!(f, "First epoch: {}", fmt_opt_ts(self.first_epoch))?;
        writeln!(f, "Last epoch: {}", fmt_opt_ts(self.last_epoch))?;
        writeln!(f, "Number of satellites:")?;
        writeln!(
            f,
            "Maximum Number of Satellites: {}",
            self.nsv.1.map_or("null".to_string(), |n| n.to_string())
        )?;
        writeln!(
            f,
            "Minimum Number of Satellites: {}",
            self.nsv.0.map_or("null".to_string(), |n| n.to_string())
        )?;
        writeln!(f, "Maximum HDOP: {}", fmt_opt(self.hdop.1, 1))?;
        writeln!(f, "Minimum HDOP: {}", fmt_opt(self.hdop.0, 1))?;
        writeln!(f)?;
        writeln!(f, "Quality Assessment:")?;
        writeln!(f, "Longest epoch gap: {} s", fmt_opt(dt_max, 6))?;
        writeln!(
            f,
            "Number of Gaps Longer than Threshold: {}",
            self.gap_errors
        )?;
        writeln!(
            f,
            "Percentage of Gaps Longer than Threshold: {:.4} %",
            percent(self.gap_errors, self.total_lines)
        )?;
        writeln!(
            f,
            "Number of Epochs Out of Sequence: {}",
            self.out_of_sequence_errors
        )?;
        writeln!(
            f,
            "Percent records out of sequence: {:.4} %",
            percent(self.out_of_sequence_errors, self.total_lines)
        )?;
        writeln!(
            f,
            "Number of Epochs with Bad GPS Quality Indicator: {}",
            self.quality_errors
        )?;
        writeln!(
            f,
            "Percent records with Bad GPS Quality Indicator: {:.4} %",
            percent(self.quality_errors, self.total_lines)
        )?;
        writeln!(
            f,
            "Number of Horizontal Speeds Exceeding Threshold: {}",
            self.speed_errors
        )?;
        writeln!(
            f,
            "Percent Unreasonable Horizontal Speeds: {:.4} %",
            percent(self.speed_errors, self.total_lines)
        )?;
        writeln!(
            f,
            "Number of Horizontal Accelerations Exceeding Threshold: {}",
            self.acceleration_errors
        )?;
        writeln!(
            f,
            "Percent Unreasonable Horizontal Accelerations: {:.4} %",
            percent(self.acceleration_errors, self.total_lines)
        )?;
        writeln!(f, "Number of Checksum Errors: {}", self.cksum_errors)?;
        write!(
            f,
            "Percent records with Checksum Errors: {:.4} %",
            percent(self.cksum_errors, self.total_lines)
        )
    }
}
