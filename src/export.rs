//! Reduced trackline products
//!
//! Three products derive from a processed (usually QC-filtered)
//! sequence: `bestres` keeps every record at full resolution, `1min`
//! subsamples to one record per minute and recomputes velocities over
//! the subsampled geometry, and `control` thins the trackline to its
//! shape-defining points with Ramer-Douglas-Peucker. Each product
//! carries the column whitelist its writers emit.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use log::debug;

use crate::geodesy::{bearing_degrees, great_circle_distance_km};
use crate::types::{duration_seconds, NavRecord, BESTRES_COLS, CONTROL_COLS, ONEMIN_COLS};

/// Simplification tolerance for the control product, decimal degrees.
pub const RDP_EPSILON: f64 = 0.001;

const LONLAT_DECIMALS: u32 = 8;
const SPEED_DECIMALS: u32 = 2;
const COURSE_DECIMALS: u32 = 3;

/// A reduced product: a record subset plus the columns it exposes.
#[derive(Debug, Clone)]
pub struct NavProduct {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub records: Vec<NavRecord>,
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn round_record(rec: &mut NavRecord) {
    rec.ship_longitude = rec.ship_longitude.map(|v| round_to(v, LONLAT_DECIMALS));
    rec.ship_latitude = rec.ship_latitude.map(|v| round_to(v, LONLAT_DECIMALS));
    rec.speed_made_good = rec.speed_made_good.map(|v| round_to(v, SPEED_DECIMALS));
    rec.course_made_good = rec.course_made_good.map(|v| round_to(v, COURSE_DECIMALS));
}

/// Full-resolution product: every record, whitelisted columns, rounded
/// coordinates and velocities.
pub fn build_bestres(mut records: Vec<NavRecord>) -> NavProduct {
    for rec in &mut records {
        round_record(rec);
    }
    NavProduct {
        name: "bestres",
        columns: &BESTRES_COLS,
        records,
    }
}

/// One-minute product: one row per minute bucket, with speed and
/// course recomputed from the subsampled positions.
///
/// Buckets are labeled by their left edge and closed on the left, so a
/// record at 12:00:59 lands in the 12:00:00 bucket. Bucket membership
/// depends only on the timestamp, never on record order, so a late
/// record falling back into an earlier minute joins that minute's row.
/// Records without a timestamp cannot be bucketed and are dropped.
/// Bucket rows missing more than one of position/speed/course are
/// dropped before the recomputation.
pub fn build_onemin(records: Vec<NavRecord>) -> NavProduct {
    let mut buckets: BTreeMap<i64, NavRecord> = BTreeMap::new();

    for rec in records {
        let ts = match rec.iso_time {
            Some(ts) => ts,
            None => continue,
        };
        let bucket = ts.timestamp().div_euclid(60);
        let row = buckets.entry(bucket).or_insert_with(|| {
            let label = Utc
                .timestamp_opt(bucket * 60, 0)
                .single()
                .unwrap_or(ts);
            NavRecord {
                iso_time: Some(label),
                valid_parse: 1,
                ..NavRecord::default()
            }
        });
        // First non-null value per column wins within a bucket
        row.ship_longitude = row.ship_longitude.or(rec.ship_longitude);
        row.ship_latitude = row.ship_latitude.or(rec.ship_latitude);
        row.speed_made_good = row.speed_made_good.or(rec.speed_made_good);
        row.course_made_good = row.course_made_good.or(rec.course_made_good);
    }

    let mut subsampled: Vec<NavRecord> = buckets.into_values().collect();

    // Keep rows with at least 4 of the 5 product columns populated
    // (iso_time is always set here)
    subsampled.retain(|rec| {
        let populated = 1
            + usize::from(rec.ship_longitude.is_some())
            + usize::from(rec.ship_latitude.is_some())
            + usize::from(rec.speed_made_good.is_some())
            + usize::from(rec.course_made_good.is_some());
        populated >= 4
    });

    // Velocities over the original one-second spacing are meaningless
    // at one-minute resolution: recompute over the subsampled geometry
    for i in 0..subsampled.len() {
        let prev = if i == 0 {
            None
        } else {
            let p = &subsampled[i - 1];
            Some((p.iso_time, p.position()))
        };

        let rec = &mut subsampled[i];
        match prev {
            Some((prev_ts, prev_pos)) => {
                let delta_secs = match (prev_ts, rec.iso_time) {
                    (Some(a), Some(b)) => Some(duration_seconds(b - a)),
                    _ => None,
                };
                let distance = match (prev_pos, rec.position()) {
                    (Some(a), Some(b)) => Some(great_circle_distance_km(a, b)),
                    _ => None,
                };
                rec.speed_made_good = match (distance, delta_secs) {
                    (Some(km), Some(secs)) if secs != 0.0 => Some(km * 1000.0 / secs),
                    _ => None,
                };
                rec.course_made_good = match (prev_pos, rec.position()) {
                    (Some(a), Some(b)) => Some(bearing_degrees(a, b)),
                    _ => None,
                };
            }
            None => {
                rec.speed_made_good = None;
                rec.course_made_good = None;
            }
        }
    }

    for rec in &mut subsampled {
        round_record(rec);
    }

    debug!("one-minute product holds {} records", subsampled.len());
    NavProduct {
        name: "1min",
        columns: &ONEMIN_COLS,
        records: subsampled,
    }
}

/// Control-point product: trackline thinned with Ramer-Douglas-Peucker
/// in (longitude, latitude) degree space, then re-joined to the source
/// records by first exact coordinate match to recover timestamps.
pub fn build_control(records: Vec<NavRecord>) -> NavProduct {
    let coords: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|rec| match (rec.ship_longitude, rec.ship_latitude) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            _ => None,
        })
        .collect();

    let control = rdp(&coords, RDP_EPSILON);
    debug!(
        "rdp reduced {} coordinates to {} control points",
        coords.len(),
        control.len()
    );

    let mut out = Vec::with_capacity(control.len());
    for (lon, lat) in control {
        let matched = records.iter().find(|rec| {
            rec.ship_longitude == Some(lon) && rec.ship_latitude == Some(lat)
        });
        if let Some(rec) = matched {
            let mut rec = rec.clone();
            round_record(&mut rec);
            out.push(rec);
        }
    }

    NavProduct {
        name: "control",
        columns: &CONTROL_COLS,
        records: out,
    }
}

/// Ramer-Douglas-Peucker line simplification. Keeps both endpoints and
/// every point whose perpendicular distance from the chord exceeds
/// `epsilon` (same units as the input coordinates).
pub fn rdp(points: &[(f64, f64)], epsilon: f64) -> Vec<(f64, f64)> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_index = 0;
    for (i, &point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_index = i;
        }
    }

    if max_dist > epsilon {
        let mut left = rdp(&points[..=max_index], epsilon);
        let right = rdp(&points[max_index..], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(point: (f64, f64), start: (f64, f64), end: (f64, f64)) -> f64 {
    let (px, py) = point;
    let (sx, sy) = start;
    let (ex, ey) = end;

    let dx = ex - sx;
    let dy = ey - sy;
    let norm = (dx * dx + dy * dy).sqrt();
    if norm == 0.0 {
        // Degenerate chord: fall back to point distance
        return ((px - sx).powi(2) + (py - sy).powi(2)).sqrt();
    }
    ((dy * px - dx * py + ex * sy - ey * sx) / norm).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record_at(secs: i64, lon: f64, lat: f64) -> NavRecord {
        let ts = Utc.with_ymd_and_hms(2021, 3, 26, 12, 0, 0).unwrap() + Duration::seconds(secs);
        NavRecord {
            iso_time: Some(ts),
            sensor_time: Some(ts.naive_utc()),
            ship_longitude: Some(lon),
            ship_latitude: Some(lat),
            nmea_quality: Some(2),
            speed_made_good: Some(1.0),
            course_made_good: Some(90.0),
            valid_cksum: 1,
            valid_parse: 1,
            ..NavRecord::default()
        }
    }

    #[test]
    fn test_bestres_rounds_and_keeps_all_records() {
        let mut records = vec![record_at(0, 122.123456789, 24.123456789)];
        records[0].speed_made_good = Some(1.23456);
        records[0].course_made_good = Some(123.45678);

        let product = build_bestres(records);
        assert_eq!(product.name, "bestres");
        assert_eq!(product.columns.len(), 9);
        assert_eq!(product.records.len(), 1);

        let rec = &product.records[0];
        assert_eq!(rec.ship_longitude, Some(122.12345679));
        assert_eq!(rec.ship_latitude, Some(24.12345679));
        assert_eq!(rec.speed_made_good, Some(1.23));
        assert_eq!(rec.course_made_good, Some(123.457));
    }

    #[test]
    fn test_onemin_buckets_left_labeled() {
        // 120 records at 1 Hz -> two minute buckets, labeled :00 and :01
        let records: Vec<NavRecord> =
            (0..120).map(|i| record_at(i, 122.4, 24.8)).collect();
        let product = build_onemin(records);

        assert_eq!(product.name, "1min");
        assert_eq!(product.records.len(), 2);

        let t0 = product.records[0].iso_time.unwrap();
        let t1 = product.records[1].iso_time.unwrap();
        assert_eq!(t0.format("%H:%M:%S").to_string(), "12:00:00");
        assert_eq!(t1.format("%H:%M:%S").to_string(), "12:01:00");
    }

    #[test]
    fn test_onemin_recomputes_velocity_over_buckets() {
        // Second bucket 0.01 degrees north of the first
        let mut records: Vec<NavRecord> =
            (0..60).map(|i| record_at(i, 122.0, 24.0)).collect();
        records.extend((60..120).map(|i| record_at(i, 122.0, 24.01)));

        let product = build_onemin(records);
        assert_eq!(product.records.len(), 2);

        // First subsampled record has no predecessor
        assert!(product.records[0].speed_made_good.is_none());
        assert!(product.records[0].course_made_good.is_none());

        // ~1.112 km in 60 s -> ~18.5 m/s, due north
        let speed = product.records[1].speed_made_good.unwrap();
        assert!((speed - 18.53).abs() < 0.2, "speed {}", speed);
        let course = product.records[1].course_made_good.unwrap();
        assert!(course < 1.0 || course > 359.0, "course {}", course);
    }

    #[test]
    fn test_onemin_merges_out_of_order_records_into_their_bucket() {
        // A record falling back into an earlier minute joins that
        // minute's row instead of opening a duplicate one
        let records = vec![
            record_at(10, 122.4, 24.8),
            record_at(70, 122.5, 24.9),
            record_at(40, 123.0, 25.0),
        ];
        let product = build_onemin(records);

        assert_eq!(product.records.len(), 2);
        let labels: Vec<String> = product
            .records
            .iter()
            .map(|r| r.iso_time.unwrap().format("%H:%M:%S").to_string())
            .collect();
        assert_eq!(labels, vec!["12:00:00", "12:01:00"]);

        // The in-bucket value seen first still wins
        assert_eq!(product.records[0].ship_longitude, Some(122.4));
    }

    #[test]
    fn test_onemin_drops_sparse_buckets() {
        let mut records = vec![record_at(0, 122.4, 24.8)];
        // Bucket at minute 1 has timestamp only
        let mut sparse = NavRecord::default();
        sparse.iso_time = record_at(60, 0.0, 0.0).iso_time;
        sparse.valid_parse = 1;
        records.push(sparse);

        let product = build_onemin(records);
        assert_eq!(product.records.len(), 1);
    }

    #[test]
    fn test_rdp_collinear_points_reduce_to_endpoints() {
        let points = vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)];
        let control = rdp(&points, RDP_EPSILON);
        assert_eq!(control, vec![(0.0, 0.0), (3.0, 3.0)]);
    }

    #[test]
    fn test_rdp_keeps_significant_deviation() {
        let points = vec![(0.0, 0.0), (1.0, 0.5), (2.0, 0.0)];
        let control = rdp(&points, RDP_EPSILON);
        assert_eq!(control.len(), 3);

        // Same shape inside tolerance collapses
        let flat = vec![(0.0, 0.0), (1.0, 0.0005), (2.0, 0.0)];
        let control = rdp(&flat, RDP_EPSILON);
        assert_eq!(control.len(), 2);
    }

    #[test]
    fn test_control_product_recovers_timestamps() {
        let records = vec![
            record_at(0, 0.0, 0.0),
            record_at(60, 1.0, 1.0),
            record_at(120, 2.0, 2.0),
            record_at(180, 3.0, 2.0),
        ];
        let product = build_control(records);

        assert_eq!(product.name, "control");
        assert_eq!(product.columns.len(), 3);
        // Collinear first three collapse around the corner at (2,2)
        assert_eq!(product.records.len(), 3);
        assert!(product.records.iter().all(|r| r.iso_time.is_some()));
        assert_eq!(product.records[0].ship_longitude, Some(0.0));
        assert_eq!(product.records[2].ship_longitude, Some(3.0));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456789, 2), 1.23);
        assert_eq!(round_to(-122.123456781, 8), -122.12345678);
        assert_eq!(round_to(0.5, 0), 1.0);
    }
}
