//! Kinematic derivation over a time-ordered record sequence
//!
//! Applied once after parsing (and after multi-file concatenation).
//! Sequence order is trusted as given and never re-sorted; the
//! `valid_order` flag records where it looks wrong. Every derived
//! column is an `Option` with explicit null propagation: the first
//! record of a sequence has no deltas, and a null anywhere upstream
//! stays null downstream.

use chrono::{DateTime, Datelike, Duration, Utc};
use log::debug;

use crate::geodesy::{bearing_degrees, great_circle_distance_km};
use crate::types::{duration_seconds, NavRecord};

/// Sensor clocks anchored to 1900 carry no date; this year marks them.
const TIME_OF_DAY_YEAR: i32 = 1900;

/// Compute the derived columns for a full sequence in place.
///
/// Parser-supplied velocity fields are kept: speed and course are only
/// filled where absent, and distance falls back to supplied speed x
/// sensor_deltaT only when geometry is unavailable.
pub fn derive_kinematics(records: &mut [NavRecord]) {
    debug!("deriving kinematics over {} records", records.len());

    for i in 0..records.len() {
        let prev = if i == 0 {
            None
        } else {
            let p = &records[i - 1];
            Some((p.iso_time, p.sensor_time, p.position(), p.speed_made_good))
        };

        let rec = &mut records[i];

        let (prev_iso, prev_sensor, prev_pos, prev_speed) = match prev {
            Some(values) => values,
            None => {
                // First record: no deltas, order trivially valid
                rec.valid_order = Some(1);
                continue;
            }
        };

        rec.delta_t = match (prev_iso, rec.iso_time) {
            (Some(a), Some(b)) => Some(b - a),
            _ => None,
        };

        rec.sensor_delta_t = match (prev_sensor, rec.sensor_time) {
            (Some(a), Some(b)) => {
                let mut delta = b - a;
                // Midnight rollover: a dateless clock stepping backwards
                // by less than a day has wrapped, not reversed
                if b.year() == TIME_OF_DAY_YEAR
                    && delta < Duration::zero()
                    && delta >= -Duration::days(1)
                {
                    delta = delta + Duration::days(1);
                }
                Some(delta)
            }
            _ => None,
        };

        let forward = |d: Option<Duration>| d.map_or(true, |d| d > Duration::zero());
        rec.valid_order = Some(u8::from(
            forward(rec.delta_t) && forward(rec.sensor_delta_t),
        ));

        rec.distance = match (prev_pos, rec.position()) {
            (Some(a), Some(b)) => Some(great_circle_distance_km(a, b)),
            _ => match (rec.speed_made_good, rec.sensor_delta_t) {
                // Geometry unavailable: back out distance from the
                // instrument-reported speed
                (Some(speed), Some(dt)) => Some(speed / 1000.0 * duration_seconds(dt)),
                _ => None,
            },
        };

        if rec.speed_made_good.is_none() {
            rec.speed_made_good = match (rec.distance, rec.sensor_delta_t) {
                (Some(km), Some(dt)) => {
                    let secs = duration_seconds(dt);
                    (secs != 0.0).then(|| km * 1000.0 / secs)
                }
                _ => None,
            };
        }

        if rec.course_made_good.is_none() {
            rec.course_made_good = match (prev_pos, rec.position()) {
                (Some(a), Some(b)) => Some(bearing_degrees(a, b)),
                _ => None,
            };
        }

        rec.acceleration = match (prev_speed, rec.speed_made_good, rec.delta_t) {
            (Some(s0), Some(s1), Some(dt)) => {
                let secs = duration_seconds(dt);
                (secs != 0.0).then(|| (s1 - s0) / secs)
            }
            _ => None,
        };
    }
}

/// Retain only records whose `iso_time` lies within the inclusive
/// bounds. Relative order is preserved and derived columns are left
/// untouched, so a cropped view still shows the true gap at its
/// boundary. When any bound is given, records without a timestamp are
/// dropped (they cannot satisfy a bound).
pub fn crop_records(
    records: Vec<NavRecord>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<NavRecord> {
    if start.is_none() && end.is_none() {
        return records;
    }

    records
        .into_iter()
        .filter(|rec| match rec.iso_time {
            Some(ts) => {
                start.map_or(true, |s| ts >= s) && end.map_or(true, |e| ts <= e)
            }
            None => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_at(secs: i64, lat: f64, lon: f64) -> NavRecord {
        let ts = Utc.with_ymd_and_hms(2021, 3, 26, 12, 0, 0).unwrap() + Duration::seconds(secs);
        NavRecord {
            iso_time: Some(ts),
            sensor_time: Some(ts.naive_utc()),
            ship_latitude: Some(lat),
            ship_longitude: Some(lon),
            nmea_quality: Some(2),
            valid_cksum: 1,
            valid_parse: 1,
            ..NavRecord::default()
        }
    }

    #[test]
    fn test_stationary_equally_spaced_sequence() {
        let mut records = vec![
            record_at(0, 24.8, 122.4),
            record_at(60, 24.8, 122.4),
            record_at(120, 24.8, 122.4),
        ];
        derive_kinematics(&mut records);

        // First record: all deltas undefined, order valid
        assert!(records[0].delta_t.is_none());
        assert!(records[0].speed_made_good.is_none());
        assert_eq!(records[0].valid_order, Some(1));

        for rec in &records[1..] {
            assert_eq!(rec.delta_t, Some(Duration::seconds(60)));
            assert_eq!(rec.valid_order, Some(1));
            assert_eq!(rec.speed_made_good, Some(0.0));
            assert_eq!(rec.distance, Some(0.0));
        }

        // Record 2 has no previous speed, record 3 does
        assert!(records[1].acceleration.is_none());
        assert_eq!(records[2].acceleration, Some(0.0));
    }

    #[test]
    fn test_reversed_timestamps_flag_out_of_order() {
        let mut records = vec![record_at(60, 24.8, 122.4), record_at(0, 24.8, 122.4)];
        derive_kinematics(&mut records);

        assert_eq!(records[0].valid_order, Some(1));
        assert_eq!(records[1].valid_order, Some(0));
        assert_eq!(records[1].delta_t, Some(Duration::seconds(-60)));
    }

    #[test]
    fn test_moving_sequence_derives_speed_and_course() {
        // ~1.112 km due north in 60 s
        let mut records = vec![record_at(0, 24.0, 122.0), record_at(60, 24.01, 122.0)];
        derive_kinematics(&mut records);

        let rec = &records[1];
        let dist = rec.distance.unwrap();
        assert!((dist - 1.112).abs() < 0.01, "distance {}", dist);

        let speed = rec.speed_made_good.unwrap();
        assert!((speed - dist * 1000.0 / 60.0).abs() < 1e-9);

        let course = rec.course_made_good.unwrap();
        assert!(course < 1.0 || course > 359.0, "course {}", course);
    }

    #[test]
    fn test_day_rollover_on_dateless_sensor_clock() {
        use crate::types::sensor_epoch;

        let base = Utc.with_ymd_and_hms(2021, 3, 26, 23, 59, 58).unwrap();
        let mut records = vec![
            NavRecord {
                iso_time: Some(base),
                sensor_time: Some(
                    sensor_epoch().and_hms_opt(23, 59, 58).unwrap(),
                ),
                valid_parse: 1,
                ..NavRecord::default()
            },
            NavRecord {
                iso_time: Some(base + Duration::seconds(4)),
                sensor_time: Some(sensor_epoch().and_hms_opt(0, 0, 2).unwrap()),
                valid_parse: 1,
                ..NavRecord::default()
            },
        ];
        derive_kinematics(&mut records);

        assert_eq!(records[1].sensor_delta_t, Some(Duration::seconds(4)));
        assert_eq!(records[1].valid_order, Some(1));
    }

    #[test]
    fn test_no_rollover_for_dated_sensor_clock() {
        // A dated clock stepping backwards is genuinely out of order
        let base = Utc.with_ymd_and_hms(2021, 3, 26, 12, 0, 0).unwrap();
        let mut records = vec![
            NavRecord {
                iso_time: Some(base),
                sensor_time: Some(base.naive_utc()),
                valid_parse: 1,
                ..NavRecord::default()
            },
            NavRecord {
                iso_time: Some(base + Duration::seconds(1)),
                sensor_time: Some(base.naive_utc() - Duration::hours(1)),
                valid_parse: 1,
                ..NavRecord::default()
            },
        ];
        derive_kinematics(&mut records);

        assert_eq!(records[1].sensor_delta_t, Some(Duration::hours(-1)));
        assert_eq!(records[1].valid_order, Some(0));
    }

    #[test]
    fn test_parser_supplied_speed_survives() {
        let mut records = vec![record_at(0, 24.0, 122.0), record_at(60, 24.01, 122.0)];
        records[1].speed_made_good = Some(3.9);
        records[1].course_made_good = Some(147.2);
        derive_kinematics(&mut records);

        assert_eq!(records[1].speed_made_good, Some(3.9));
        assert_eq!(records[1].course_made_good, Some(147.2));
        // Geometry still wins for distance when both points exist
        assert!(records[1].distance.unwrap() > 1.0);
    }

    #[test]
    fn test_speed_fallback_distance_without_geometry() {
        let base = Utc.with_ymd_and_hms(2021, 3, 26, 12, 0, 0).unwrap();
        let make = |secs: i64, speed: Option<f64>| NavRecord {
            iso_time: Some(base + Duration::seconds(secs)),
            sensor_time: Some((base + Duration::seconds(secs)).naive_utc()),
            speed_made_good: speed,
            valid_parse: 1,
            ..NavRecord::default()
        };
        let mut records = vec![make(0, None), make(10, Some(2.0))];
        derive_kinematics(&mut records);

        // 2 m/s over 10 s -> 20 m -> 0.02 km
        assert!((records[1].distance.unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_null_row_propagates_null_and_stays_ordered() {
        let mut records = vec![
            record_at(0, 24.8, 122.4),
            NavRecord::parse_failure(),
            record_at(120, 24.8, 122.4),
        ];
        derive_kinematics(&mut records);

        let null_row = &records[1];
        assert!(null_row.delta_t.is_none());
        assert!(null_row.distance.is_none());
        // Both deltas null: advisory order check passes
        assert_eq!(null_row.valid_order, Some(1));

        // Record after the null row has no previous time either
        assert!(records[2].delta_t.is_none());
        assert_eq!(records[2].valid_order, Some(1));
    }

    #[test]
    fn test_crop_inclusive_bounds() {
        let records = vec![
            record_at(0, 24.8, 122.4),
            record_at(60, 24.8, 122.4),
            record_at(120, 24.8, 122.4),
        ];
        let start = records[1].iso_time;
        let cropped = crop_records(records, start, None);
        assert_eq!(cropped.len(), 2);
    }

    #[test]
    fn test_crop_past_end_yields_empty() {
        let records = vec![record_at(0, 24.8, 122.4), record_at(60, 24.8, 122.4)];
        let start = Some(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap());
        let cropped = crop_records(records, start, None);
        assert!(cropped.is_empty());
    }

    #[test]
    fn test_crop_drops_untimed_records_only_with_bounds() {
        let records = vec![record_at(0, 24.8, 122.4), NavRecord::parse_failure()];

        let untouched = crop_records(records.clone(), None, None);
        assert_eq!(untouched.len(), 2);

        let start = Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        let cropped = crop_records(records, start, None);
        assert_eq!(cropped.len(), 1);
    }
}
