//! Canonical navigation record schema
//!
//! One `NavRecord` is a single observation epoch. Parsers populate the
//! raw fields; the kinematic processor fills the derived fields. Every
//! value that can be absent in the source data is an `Option`, so null
//! propagation is explicit rather than hidden in NaN sentinels.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Canonical r2rnav column order. This is a stable contract for
/// downstream CSV/JSON consumers and must not be reordered.
pub const R2RNAV_COLS: [&str; 17] = [
    "iso_time",
    "ship_longitude",
    "ship_latitude",
    "nmea_quality",
    "nsv",
    "hdop",
    "antenna_height",
    "valid_cksum",
    "valid_parse",
    "sensor_time",
    "deltaT",
    "sensor_deltaT",
    "valid_order",
    "distance",
    "speed_made_good",
    "course_made_good",
    "acceleration",
];

/// Column whitelist for the best-resolution product.
pub const BESTRES_COLS: [&str; 9] = [
    "iso_time",
    "ship_longitude",
    "ship_latitude",
    "nmea_quality",
    "nsv",
    "hdop",
    "antenna_height",
    "speed_made_good",
    "course_made_good",
];

/// Column whitelist for the one-minute product.
pub const ONEMIN_COLS: [&str; 5] = [
    "iso_time",
    "ship_longitude",
    "ship_latitude",
    "speed_made_good",
    "course_made_good",
];

/// Column whitelist for the control-point product.
pub const CONTROL_COLS: [&str; 3] = ["iso_time", "ship_longitude", "ship_latitude"];

/// One navigation observation epoch.
///
/// Raw fields come from a format parser; derived fields are `None`
/// until the kinematic processor has run (and stay `None` for the
/// first record of a sequence).
#[derive(Debug, Clone, Default)]
pub struct NavRecord {
    /// Primary UTC timestamp, the ordering key. Absent on parse failure.
    pub iso_time: Option<DateTime<Utc>>,
    /// Raw instrument clock. Time-of-day-only clocks are anchored to
    /// 1900-01-01 so day rollover can be detected downstream.
    pub sensor_time: Option<NaiveDateTime>,
    pub ship_longitude: Option<f64>,
    pub ship_latitude: Option<f64>,
    /// NMEA quality indicator; 1..=3 is considered a good fix.
    pub nmea_quality: Option<u32>,
    /// Satellites used in the fix.
    pub nsv: Option<u32>,
    /// Horizontal dilution of precision.
    pub hdop: Option<f64>,
    /// Antenna height above mean sea level, meters.
    pub antenna_height: Option<f64>,
    /// 1 when the sentence checksum matched or the format carries none.
    pub valid_cksum: u8,
    /// 1 when every required field of the line parsed.
    pub valid_parse: u8,

    /// Elapsed time since the previous record's `iso_time`.
    pub delta_t: Option<Duration>,
    /// Elapsed time since the previous record's `sensor_time`,
    /// day-rollover corrected.
    pub sensor_delta_t: Option<Duration>,
    /// 1 when both deltas are absent or positive; advisory, not a filter.
    pub valid_order: Option<u8>,
    /// Great-circle distance to the previous record, kilometers.
    pub distance: Option<f64>,
    /// Speed made good, m/s.
    pub speed_made_good: Option<f64>,
    /// Course made good, compass degrees [0, 360).
    pub course_made_good: Option<f64>,
    /// Horizontal acceleration, m/s^2.
    pub acceleration: Option<f64>,
}

impl NavRecord {
    /// All-null record emitted for a line that failed to parse. Keeps
    /// positional continuity so line counting stays exact.
    pub fn parse_failure() -> Self {
        NavRecord::default()
    }

    /// (latitude, longitude) when both are present.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.ship_latitude, self.ship_longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Epoch used to anchor time-of-day-only instrument clocks.
pub fn sensor_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).expect("valid epoch date")
}

/// Duration as fractional seconds. Durations here are file-scale (well
/// under i64::MAX microseconds), so the microsecond view never saturates.
pub fn duration_seconds(d: Duration) -> f64 {
    match d.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => d.num_milliseconds() as f64 / 1_000.0,
    }
}

/// ISO-8601 timestamp format used across all tabular output.
pub const ISO_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Format a UTC timestamp in the canonical output form.
pub fn format_iso(ts: &DateTime<Utc>) -> String {
    ts.format(ISO_TIME_FORMAT).to_string()
}

/// Format a naive sensor timestamp in the canonical output form.
pub fn format_iso_naive(ts: &NaiveDateTime) -> String {
    ts.format(ISO_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_failure_record_is_all_null() {
        let rec = NavRecord::parse_failure();
        assert_eq!(rec.valid_parse, 0);
        assert_eq!(rec.valid_cksum, 0);
        assert!(rec.iso_time.is_none());
        assert!(rec.position().is_none());
        assert!(rec.delta_t.is_none());
    }

    #[test]
    fn test_position_requires_both_coordinates() {
        let mut rec = NavRecord::default();
        rec.ship_latitude = Some(24.8);
        assert!(rec.position().is_none());
        rec.ship_longitude = Some(122.4);
        assert_eq!(rec.position(), Some((24.8, 122.4)));
    }

    #[test]
    fn test_duration_seconds() {
        assert_eq!(duration_seconds(Duration::seconds(60)), 60.0);
        assert_eq!(duration_seconds(Duration::milliseconds(1500)), 1.5);
        assert_eq!(duration_seconds(Duration::seconds(-30)), -30.0);
    }

    #[test]
    fn test_format_iso_carries_microseconds() {
        let ts = Utc.with_ymd_and_hms(2021, 3, 26, 13, 47, 51).unwrap()
            + Duration::microseconds(329619);
        assert_eq!(format_iso(&ts), "2021-03-26T13:47:51.329619Z");
    }
}
