//! Quality-control filtering
//!
//! The QC pass is a hard filter applied before building reduced
//! products: records that fail any test are removed, not flagged.
//! Because the tests compare against real values, a record with a null
//! in any tested field cannot pass and is culled as well (the first
//! record of a sequence always has null derived columns, so it never
//! survives QC).

use log::debug;

use crate::types::{
    NavRecord, DEFAULT_ACCELERATION_THRESHOLD, DEFAULT_GAP_THRESHOLD, DEFAULT_SPEED_THRESHOLD,
};

/// Thresholds shared by QC filtering and QA reporting.
#[derive(Debug, Clone, Copy)]
pub struct QcThresholds {
    /// Maximum acceptable gap between epochs, seconds.
    pub gap_seconds: f64,
    /// Maximum reasonable speed over ground, m/s.
    pub max_speed: f64,
    /// Maximum reasonable horizontal acceleration, m/s^2.
    pub max_acceleration: f64,
}

impl Default for QcThresholds {
    fn default() -> Self {
        QcThresholds {
            gap_seconds: DEFAULT_GAP_THRESHOLD,
            max_speed: DEFAULT_SPEED_THRESHOLD,
            max_acceleration: DEFAULT_ACCELERATION_THRESHOLD,
        }
    }
}

/// Retain only records that pass every QC test: a good-quality fix
/// (nmea_quality 1..=3), a verified checksum, in-sequence timestamps,
/// and speed/acceleration within the thresholds.
pub fn apply_qc(records: Vec<NavRecord>, thresholds: &QcThresholds) -> Vec<NavRecord> {
    let before = records.len();

    let filtered: Vec<NavRecord> = records
        .into_iter()
        .filter(|rec| {
            matches!(rec.nmea_quality, Some(1..=3))
                && rec.valid_cksum == 1
                && rec.valid_order == Some(1)
                && rec
                    .speed_made_good
                    .map_or(false, |s| s <= thresholds.max_speed)
                && rec
                    .acceleration
                    .map_or(false, |a| a <= thresholds.max_acceleration)
        })
        .collect();

    debug!("qc filter kept {} of {} records", filtered.len(), before);
    filtered
}
