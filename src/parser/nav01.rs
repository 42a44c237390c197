//! nav01: interleaved GGA/ZDA/VTG sentence streams (Furuno GP-90D)
//!
//! No line carries its own date, so three sentence kinds have to be
//! fused: GGA position fixes, VTG velocity sentences and ZDA date
//! sentences. Each kind is collected into its own line-indexed table,
//! then velocity is merged onto each fix from the nearest VTG at or
//! after it, and the date from the nearest ZDA at or before it
//! (repeated dates deduplicated to their first occurrence). Fixes for
//! which no date can ever be resolved are dropped.
//!
//! Malformed lines of any kind are counted as parse errors; a
//! malformed GGA additionally emits an all-null record so the fix
//! sequence keeps positional continuity, while a malformed VTG/ZDA
//! only leaves its fields absent downstream.

use std::path::Path;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use log::{debug, warn};

use crate::error::{NavError, Result};
use crate::geodesy::{hemisphere_correction, nmea_coordinate, verify_checksum};
use crate::parser::{read_lines, split_fields, NavParser, ParsedFile};
use crate::types::{sensor_epoch, NavRecord};

const DESCRIPTION: &str = "Nav parser for raw output from a Furuno GP-90D GPS receiver. Data \
                           file contains GGA/ZDA/VTG NMEA0183 sentences with no additional \
                           information added.";

const EXAMPLE_DATA: &str = "\
$GPGGA,123034,2447.9660,N,12221.8670,E,2,9,0.3,38,M,,M,,*40
$GPVTG,147.2,T,150.9,M,7.6,N,14.1,K*76
$GPZDA,123034,23,08,2009,00,00*4D
$GPGGA,123035,2447.9641,N,12221.8681,E,2,9,0.4,38,M,,M,,*4B
$GPVTG,147.2,T,150.9,M,7.6,N,14.1,K*76
$GPZDA,123035,23,08,2009,00,00*4C
";

// hdr,sensor_time,lat,NS,lon,EW,quality,nsv,hdop,antenna_height,M,
// height_wgs84,M,last_update,dgps_station*checksum
const GGA_FIELD_COUNT: usize = 15;
// hdr,heading_true,T,heading_mag,M,speed_kts,N,speed_kph,K*checksum
const VTG_FIELD_COUNT: usize = 9;
// hdr,sensor_time,day,month,year,tz_hr,tz_min*checksum
const ZDA_FIELD_COUNT: usize = 7;

const SENSOR_TIME_FORMAT: &str = "%H%M%S";

struct GgaFix {
    lineno: usize,
    sensor_tod: NaiveTime,
    latitude: f64,
    longitude: f64,
    nmea_quality: u32,
    nsv: u32,
    hdop: f64,
    antenna_height: f64,
    valid_cksum: u8,
}

struct VtgEntry {
    lineno: usize,
    speed_made_good: f64,
    course_made_good: f64,
}

struct ZdaEntry {
    lineno: usize,
    date: NaiveDate,
}

/// One slot per GGA line, bad lines included, so the output sequence
/// mirrors the fix positions in the raw file.
enum FixSlot {
    Good(GgaFix),
    Bad,
}

pub struct Nav01Parser;

impl Nav01Parser {
    fn parse_gga(lineno: usize, line: &str, fields: &[&str]) -> Result<GgaFix> {
        if fields.len() != GGA_FIELD_COUNT {
            return Err(NavError::Parse(format!(
                "expected {} GGA fields, got {}",
                GGA_FIELD_COUNT,
                fields.len()
            )));
        }

        let sensor_tod = NaiveTime::parse_from_str(fields[1], SENSOR_TIME_FORMAT)
            .map_err(|e| NavError::Parse(format!("bad sensor time: {}", e)))?;
        let latitude = hemisphere_correction(nmea_coordinate(fields[2], 2)?, fields[3])?;
        let longitude = hemisphere_correction(nmea_coordinate(fields[4], 3)?, fields[5])?;

        let nmea_quality: u32 = fields[6]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad quality indicator: {:?}", fields[6])))?;
        let nsv: u32 = fields[7]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad satellite count: {:?}", fields[7])))?;
        let hdop: f64 = fields[8]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad hdop: {:?}", fields[8])))?;
        let antenna_height: f64 = fields[9]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad antenna height: {:?}", fields[9])))?;

        let valid_cksum = verify_checksum(line)? as u8;

        Ok(GgaFix {
            lineno,
            sensor_tod,
            latitude,
            longitude,
            nmea_quality,
            nsv,
            hdop,
            antenna_height,
            valid_cksum,
        })
    }

    fn parse_vtg(lineno: usize, fields: &[&str]) -> Result<VtgEntry> {
        if fields.len() != VTG_FIELD_COUNT {
            return Err(NavError::Parse(format!(
                "expected {} VTG fields, got {}",
                VTG_FIELD_COUNT,
                fields.len()
            )));
        }

        let speed_kph: f64 = fields[7]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad VTG speed: {:?}", fields[7])))?;
        let course_made_good: f64 = fields[1]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad VTG heading: {:?}", fields[1])))?;

        Ok(VtgEntry {
            lineno,
            speed_made_good: speed_kph * 1000.0 / 3600.0,
            course_made_good,
        })
    }

    fn parse_zda(lineno: usize, fields: &[&str]) -> Result<ZdaEntry> {
        if fields.len() != ZDA_FIELD_COUNT {
            return Err(NavError::Parse(format!(
                "expected {} ZDA fields, got {}",
                ZDA_FIELD_COUNT,
                fields.len()
            )));
        }

        let date =
            NaiveDate::parse_from_str(&format!("{}{}{}", fields[4], fields[3], fields[2]), "%Y%m%d")
                .map_err(|e| NavError::Parse(format!("bad ZDA date: {}", e)))?;

        Ok(ZdaEntry { lineno, date })
    }
}

impl NavParser for Nav01Parser {
    fn name(&self) -> &'static str {
        "nav01"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn example_data(&self) -> &'static str {
        EXAMPLE_DATA
    }

    fn parse_file(&self, path: &Path) -> Result<ParsedFile> {
        let mut fixes: Vec<FixSlot> = Vec::new();
        let mut vtgs: Vec<VtgEntry> = Vec::new();
        let mut zdas: Vec<ZdaEntry> = Vec::new();
        let mut parse_errors = 0usize;

        for (lineno, line) in read_lines(path)? {
            if line.trim().is_empty() {
                continue;
            }

            let fields = split_fields(&line);
            match fields.first() {
                Some(&"$GPGGA") => match Self::parse_gga(lineno, &line, &fields) {
                    Ok(fix) => fixes.push(FixSlot::Good(fix)),
                    Err(err) => {
                        warn!("parsing error (line {}): {}", lineno, err);
                        debug!("offending line: {}", line);
                        fixes.push(FixSlot::Bad);
                        parse_errors += 1;
                    }
                },
                Some(&"$GPVTG") => match Self::parse_vtg(lineno, &fields) {
                    Ok(vtg) => vtgs.push(vtg),
                    Err(err) => {
                        warn!("parsing error (line {}): {}", lineno, err);
                        parse_errors += 1;
                    }
                },
                Some(&"$GPZDA") => match Self::parse_zda(lineno, &fields) {
                    Ok(zda) => zdas.push(zda),
                    Err(err) => {
                        warn!("parsing error (line {}): {}", lineno, err);
                        parse_errors += 1;
                    }
                },
                _ => continue,
            }
        }

        // Deduplicate repeated dates, first occurrence wins
        let mut seen_dates: Vec<NaiveDate> = Vec::new();
        zdas.retain(|z| {
            if seen_dates.contains(&z.date) {
                false
            } else {
                seen_dates.push(z.date);
                true
            }
        });

        let mut parsed = ParsedFile {
            records: Vec::new(),
            parse_errors,
        };
        let mut dateless = 0usize;

        for slot in &fixes {
            let fix = match slot {
                FixSlot::Good(fix) => fix,
                FixSlot::Bad => {
                    parsed.records.push(NavRecord::parse_failure());
                    continue;
                }
            };

            // Both tables are sorted by line number, so the nearest
            // VTG at or after the fix and the nearest ZDA at or before
            // it are found by binary search
            let vtg = vtgs.get(vtgs.partition_point(|v| v.lineno < fix.lineno));
            let zda = zdas
                .partition_point(|z| z.lineno <= fix.lineno)
                .checked_sub(1)
                .map(|i| &zdas[i]);

            let date = match zda {
                Some(zda) => zda.date,
                None => {
                    // No date can ever resolve for this fix
                    dateless += 1;
                    continue;
                }
            };

            parsed.records.push(NavRecord {
                iso_time: Some(Utc.from_utc_datetime(&date.and_time(fix.sensor_tod))),
                sensor_time: Some(sensor_epoch().and_time(fix.sensor_tod)),
                ship_longitude: Some(fix.longitude),
                ship_latitude: Some(fix.latitude),
                nmea_quality: Some(fix.nmea_quality),
                nsv: Some(fix.nsv),
                hdop: Some(fix.hdop),
                antenna_height: Some(fix.antenna_height),
                valid_cksum: fix.valid_cksum,
                valid_parse: 1,
                speed_made_good: vtg.map(|v| v.speed_made_good),
                course_made_good: vtg.map(|v| v.course_made_good),
                ..NavRecord::default()
            });
        }

        if dateless > 0 {
            debug!("dropped {} fixes with no resolvable date", dateless);
        }
        debug!("finished parsing {}", path.display());
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse_str(contents: &str) -> ParsedFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        Nav01Parser.parse_file(file.path()).unwrap()
    }

    #[test]
    fn test_fusion_drops_fix_before_first_zda() {
        // The first GGA has no ZDA at or before it, so its date can
        // never resolve and it is dropped.
        let parsed = parse_str(EXAMPLE_DATA);

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.parse_errors, 0);

        let rec = &parsed.records[0];
        assert_eq!(
            crate::types::format_iso(&rec.iso_time.unwrap()),
            "2009-08-23T12:30:35.000000Z"
        );
        assert_eq!(rec.nmea_quality, Some(2));
        assert_eq!(rec.nsv, Some(9));
        assert_eq!(rec.valid_cksum, 1);

        // Velocity from the VTG after the fix: 14.1 km/h -> m/s
        let speed = rec.speed_made_good.unwrap();
        assert!((speed - 14.1 * 1000.0 / 3600.0).abs() < 1e-9);
        assert_eq!(rec.course_made_good, Some(147.2));
    }

    #[test]
    fn test_fusion_with_leading_zda_keeps_all_fixes() {
        let input = "\
$GPZDA,123033,23,08,2009,00,00*4C
$GPGGA,123034,2447.9660,N,12221.8670,E,2,9,0.3,38,M,,M,,*40
$GPVTG,147.2,T,150.9,M,7.6,N,14.1,K*76
$GPGGA,123035,2447.9641,N,12221.8681,E,2,9,0.4,38,M,,M,,*4B
$GPVTG,147.2,T,150.9,M,7.6,N,14.1,K*76
$GPZDA,123035,23,08,2009,00,00*4C
";
        let parsed = parse_str(input);
        assert_eq!(parsed.records.len(), 2);

        // Both fixes resolve to the one deduplicated date
        for rec in &parsed.records {
            assert_eq!(
                rec.iso_time.unwrap().format("%Y-%m-%d").to_string(),
                "2009-08-23"
            );
            assert!(rec.speed_made_good.is_some());
        }
    }

    #[test]
    fn test_fusion_picks_nearest_sentences_by_line() {
        let input = "\
$GPZDA,123033,23,08,2009,00,00*4C
$GPGGA,123034,2447.9660,N,12221.8670,E,2,9,0.3,38,M,,M,,*40
$GPVTG,147.2,T,150.9,M,7.6,N,14.1,K*76
$GPZDA,123036,24,08,2009,00,00*4C
$GPGGA,123036,2447.9641,N,12221.8681,E,2,9,0.4,38,M,,M,,*4B
$GPVTG,10.0,T,10.0,M,5.0,N,9.0,K*00
";
        let parsed = parse_str(input);
        assert_eq!(parsed.records.len(), 2);

        // First fix: the VTG on the next line, the leading ZDA's date
        let first = &parsed.records[0];
        assert_eq!(first.course_made_good, Some(147.2));
        assert_eq!(
            first.iso_time.unwrap().format("%Y-%m-%d").to_string(),
            "2009-08-23"
        );

        // Second fix: the later VTG and the intervening ZDA's date
        let second = &parsed.records[1];
        assert_eq!(second.course_made_good, Some(10.0));
        assert_eq!(
            second.iso_time.unwrap().format("%Y-%m-%d").to_string(),
            "2009-08-24"
        );
    }

    #[test]
    fn test_bad_gga_keeps_positional_slot() {
        let input = "\
$GPZDA,123033,23,08,2009,00,00*4C
$GPGGA,123034,garbage,N,12221.8670,E,2,9,0.3,38,M,,M,,*40
$GPGGA,123035,2447.9641,N,12221.8681,E,2,9,0.4,38,M,,M,,*4B
";
        let parsed = parse_str(input);

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.parse_errors, 1);
        assert_eq!(parsed.records[0].valid_parse, 0);
        assert_eq!(parsed.records[1].valid_parse, 1);
    }

    #[test]
    fn test_bad_vtg_leaves_velocity_absent() {
        let input = "\
$GPZDA,123033,23,08,2009,00,00*4C
$GPGGA,123034,2447.9660,N,12221.8670,E,2,9,0.3,38,M,,M,,*40
$GPVTG,truncated*00
";
        let parsed = parse_str(input);

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.parse_errors, 1);
        let rec = &parsed.records[0];
        assert_eq!(rec.valid_parse, 1);
        assert!(rec.speed_made_good.is_none());
        assert!(rec.course_made_good.is_none());
    }
}
