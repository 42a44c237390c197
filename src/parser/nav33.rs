//! nav33: GGA sentences prefixed with an ISO8601 timestamp
//!
//! Same sentence body as nav02, but the prefix is a single
//! `YYYY-mm-ddTHH:MM:SS.ssssssZ` field instead of the two-field SCS
//! timestamp.

use std::path::Path;

use chrono::{NaiveDateTime, NaiveTime, TimeZone, Utc};
use log::{debug, warn};

use crate::error::{NavError, Result};
use crate::geodesy::{hemisphere_correction, nmea_coordinate, verify_checksum};
use crate::parser::{read_lines, split_fields, NavParser, ParsedFile};
use crate::types::{sensor_epoch, NavRecord};

const DESCRIPTION: &str = "Nav parser for GGA data prefixed with a ISO8601 formatted timestamp \
                           (YYYY-mm-ddTHH:MM:SS.sssZ) and comma (,)";

const EXAMPLE_DATA: &str = "\
2021-03-26T13:47:51.329619Z,$INGGA,134751.20,1911.031052,N,06918.538133,W,2,12,0.8,0.03,M,-42.58,M,12.0,0043*5A
2021-03-26T13:47:52.207173Z,$INGGA,134752.20,1911.030998,N,06918.538134,W,2,12,0.8,-0.01,M,-42.58,M,13.0,0043*7E
2021-03-26T13:47:53.212068Z,$INGGA,134753.20,1911.030936,N,06918.538141,W,2,12,0.8,-0.08,M,-42.58,M,14.0,0043*77
";

// timestamp,hdr,sensor_time,lat,NS,lon,EW,quality,nsv,hdop,antenna_height,
// M,height_wgs84,M,last_update,dgps_station*checksum
const RAW_FIELD_COUNT: usize = 16;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const SENSOR_TIME_FORMAT: &str = "%H%M%S%.f";

pub struct Nav33Parser;

impl Nav33Parser {
    fn parse_line(fields: &[&str]) -> Result<NavRecord> {
        if fields.len() != RAW_FIELD_COUNT {
            return Err(NavError::Parse(format!(
                "expected {} fields, got {}",
                RAW_FIELD_COUNT,
                fields.len()
            )));
        }

        let timestamp = NaiveDateTime::parse_from_str(fields[0], TIMESTAMP_FORMAT)
            .map_err(|e| NavError::Parse(format!("bad timestamp prefix: {}", e)))?;
        let sensor_tod = NaiveTime::parse_from_str(fields[2], SENSOR_TIME_FORMAT)
            .map_err(|e| NavError::Parse(format!("bad sensor time: {}", e)))?;

        let latitude = hemisphere_correction(nmea_coordinate(fields[3], 2)?, fields[4])?;
        let longitude = hemisphere_correction(nmea_coordinate(fields[5], 3)?, fields[6])?;

        let nmea_quality: u32 = fields[7]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad quality indicator: {:?}", fields[7])))?;
        let nsv: u32 = fields[8]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad satellite count: {:?}", fields[8])))?;
        let hdop: f64 = fields[9]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad hdop: {:?}", fields[9])))?;
        let antenna_height: f64 = fields[10]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad antenna height: {:?}", fields[10])))?;

        let valid_cksum = verify_checksum(&fields[1..].join(","))?;

        Ok(NavRecord {
            iso_time: Some(Utc.from_utc_datetime(&timestamp)),
            sensor_time: Some(sensor_epoch().and_time(sensor_tod)),
            ship_longitude: Some(longitude),
            ship_latitude: Some(latitude),
            nmea_quality: Some(nmea_quality),
            nsv: Some(nsv),
            hdop: Some(hdop),
            antenna_height: Some(antenna_height),
            valid_cksum: valid_cksum as u8,
            valid_parse: 1,
            ..NavRecord::default()
        })
    }
}

impl NavParser for Nav33Parser {
    fn name(&self) -> &'static str {
        "nav33"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn example_data(&self) -> &'static str {
        EXAMPLE_DATA
    }

    fn parse_file(&self, path: &Path) -> Result<ParsedFile> {
        let mut parsed = ParsedFile::default();

        for (lineno, line) in read_lines(path)? {
            if line.trim().is_empty() {
                continue;
            }

            match Self::parse_line(&split_fields(&line)) {
                Ok(record) => parsed.records.push(record),
                Err(err) => {
                    warn!("parsing error (line {}): {}", lineno, err);
                    debug!("offending line: {}", line);
                    parsed.records.push(NavRecord::parse_failure());
                    parsed.parse_errors += 1;
                }
            }
        }

        debug!("finished parsing {}", path.display());
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::format_iso;
    use std::io::Write;

    #[test]
    fn test_parse_example_data() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE_DATA.as_bytes()).unwrap();

        let parsed = Nav33Parser.parse_file(file.path()).unwrap();
        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.parse_errors, 0);

        let first = &parsed.records[0];
        assert_eq!(first.valid_parse, 1);
        assert_eq!(first.valid_cksum, 1);
        assert_eq!(
            format_iso(&first.iso_time.unwrap()),
            "2021-03-26T13:47:51.329619Z"
        );
        assert_eq!(first.nsv, Some(12));

        // 06918.538133 W -> -(69 + 18.538133/60)
        let lon = first.ship_longitude.unwrap();
        assert!((lon + (69.0 + 18.538133 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_truncated_line_is_null_record() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"2021-03-26T13:47:51.329619Z,$INGGA,134751.20\n")
            .unwrap();

        let parsed = Nav33Parser.parse_file(file.path()).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.parse_errors, 1);
        assert_eq!(parsed.records[0].valid_parse, 0);
    }
}
