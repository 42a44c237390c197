//! nav03: GLL/GGA mix prefixed with an SCS timestamp, no checksums
//!
//! Lines are either a position-only GLL sentence or a full GGA fix,
//! both prefixed with `mm/dd/YYYY,HH:MM:SS.sss,`. Stray VTG/ZDA
//! sentences may appear and are skipped. No sentence carries a
//! checksum, so `valid_cksum` is fixed at 1 for parsed lines.

use std::path::Path;

use chrono::{NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};

use crate::error::{NavError, Result};
use crate::geodesy::{hemisphere_correction, nmea_coordinate};
use crate::parser::{read_lines, split_fields, NavParser, ParsedFile};
use crate::types::NavRecord;

const DESCRIPTION: &str = "Nav parser for GLL data prefixed with the SCS formatted timestamp \
                           (mm/dd/YYYY,HH:MM:SS.sss) and comma (,). Data may contain random \
                           NMEA0183 GGA, VTG and ZDA sentences. None of the sentences contain \
                           trailing checksums.";

const EXAMPLE_DATA: &str = "\
10/05/2010,13:05:48.703,$GPVTG,55,T,56,M,8.8,N,16.3,K
10/05/2010,13:05:58.703,$GPGGA,130517,4651.698,N,09153.945,W,1,8,0.3,201,M,-32,M
10/05/2010,13:06:08.750,$GPVTG,55,T,56,M,8.8,N,16.4,K
10/05/2010,13:06:18.703,$GPVTG,56,T,57,M,8.8,N,16.3,K
10/05/2010,13:06:28.593,$GPGLL,4651.739,N,09153.857,W
10/05/2010,13:06:38.546,$GPGLL,4651.754,N,09153.828,W
10/05/2010,13:06:48.500,$GPGLL,4651.768,N,09153.800,W
";

// date,time,hdr,lat,NS,lon,EW
const GLL_FIELD_COUNT: usize = 7;
// date,time,hdr,sensor_time,lat,NS,lon,EW,quality,nsv,hdop,antenna_height,M,height_wgs84,M
const GGA_FIELD_COUNT: usize = 15;

const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S%.f";

pub struct Nav03Parser;

impl Nav03Parser {
    fn parse_timestamp(date: &str, time: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), TIMESTAMP_FORMAT)
            .map_err(|e| NavError::Parse(format!("bad timestamp prefix: {}", e)))
    }

    fn parse_gll(fields: &[&str]) -> Result<NavRecord> {
        if fields.len() != GLL_FIELD_COUNT {
            return Err(NavError::Parse(format!(
                "expected {} GLL fields, got {}",
                GLL_FIELD_COUNT,
                fields.len()
            )));
        }

        let timestamp = Self::parse_timestamp(fields[0], fields[1])?;
        let latitude = hemisphere_correction(nmea_coordinate(fields[3], 2)?, fields[4])?;
        let longitude = hemisphere_correction(nmea_coordinate(fields[5], 3)?, fields[6])?;

        // GLL carries no quality block: assume a standard GPS fix,
        // leave satellites/hdop/antenna height unavailable.
        Ok(NavRecord {
            iso_time: Some(Utc.from_utc_datetime(&timestamp)),
            sensor_time: Some(timestamp),
            ship_longitude: Some(longitude),
            ship_latitude: Some(latitude),
            nmea_quality: Some(1),
            valid_cksum: 1,
            valid_parse: 1,
            ..NavRecord::default()
        })
    }

    fn parse_gga(fields: &[&str]) -> Result<NavRecord> {
        if fields.len() != GGA_FIELD_COUNT {
            return Err(NavError::Parse(format!(
                "expected {} GGA fields, got {}",
                GGA_FIELD_COUNT,
                fields.len()
            )));
        }

        let timestamp = Self::parse_timestamp(fields[0], fields[1])?;
        let latitude = hemisphere_correction(nmea_coordinate(fields[4], 2)?, fields[5])?;
        let longitude = hemisphere_correction(nmea_coordinate(fields[6], 3)?, fields[7])?;

        let nmea_quality: u32 = fields[8]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad quality indicator: {:?}", fields[8])))?;
        let nsv: u32 = fields[9]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad satellite count: {:?}", fields[9])))?;
        let hdop: f64 = fields[10]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad hdop: {:?}", fields[10])))?;
        let antenna_height: f64 = fields[11]
            .parse()
            .map_err(|_| NavError::Parse(format!("bad antenna height: {:?}", fields[11])))?;

        Ok(NavRecord {
            iso_time: Some(Utc.from_utc_datetime(&timestamp)),
            sensor_time: Some(timestamp),
            ship_longitude: Some(longitude),
            ship_latitude: Some(latitude),
            nmea_quality: Some(nmea_quality),
            nsv: Some(nsv),
            hdop: Some(hdop),
            antenna_height: Some(antenna_height),
            valid_cksum: 1,
            valid_parse: 1,
            ..NavRecord::default()
        })
    }
}

impl NavParser for Nav03Parser {
    fn name(&self) -> &'static str {
        "nav03"
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

            let fields = split_fields(&line);
            let result = match fields.get(2) {
                Some(&"$GPGLL") => Self::parse_gll(&fields),
                Some(&"$GPGGA") => Self::parse_gga(&fields),
                // VTG/ZDA and anything else: not a position sentence
                _ => continue,
            };

            match result {
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
    use std::io::Write;

    #[test]
    fn test_parse_example_data_mixes_sentences() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE_DATA.as_bytes()).unwrap();

        let parsed = Nav03Parser.parse_file(file.path()).unwrap();

        // 1 GGA + 3 GLL; VTG lines are skipped entirely
        assert_eq!(parsed.records.len(), 4);
        assert_eq!(parsed.parse_errors, 0);

        let gga = &parsed.records[0];
        assert_eq!(gga.nmea_quality, Some(1));
        assert_eq!(gga.nsv, Some(8));
        assert_eq!(gga.antenna_height, Some(201.0));
        assert_eq!(gga.valid_cksum, 1);

        let gll = &parsed.records[1];
        assert_eq!(gll.nmea_quality, Some(1));
        assert!(gll.nsv.is_none());
        assert!(gll.hdop.is_none());
        assert!(gll.antenna_height.is_none());
        assert_eq!(gll.valid_cksum, 1);

        // Sensor clock carries the full prefix date, not a 1900 anchor
        assert_eq!(
            gll.sensor_time.unwrap().format("%Y-%m-%d").to_string(),
            "2010-10-05"
        );
    }

    #[test]
    fn test_malformed_gll_counts_as_error() {
        let input = "10/05/2010,13:06:28.593,$GPGLL,4651.739,N\n";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(input.as_bytes()).unwrap();

        let parsed = Nav03Parser.parse_file(file.path()).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.parse_errors, 1);
        assert_eq!(parsed.records[0].valid_parse, 0);
    }
}
