//! nav02: GGA sentences prefixed with an SCS timestamp
//!
//! Every physical line is `mm/dd/YYYY,HH:MM:SS.sss,$--GGA,...*cs`. The
//! prefix supplies the primary timestamp; the GGA time field supplies
//! the instrument clock; the trailing checksum is verified per line.

use std::path::Path;

use chrono::{NaiveDateTime, NaiveTime, TimeZone, Utc};
use log::{debug, warn};

use crate::error::{NavError, Result};
use crate::geodesy::{hemisphere_correction, nmea_coordinate, verify_checksum};
use crate::parser::{read_lines, split_fields, NavParser, ParsedFile};
use crate::types::{sensor_epoch, NavRecord};

const DESCRIPTION: &str = "Nav parser for GGA data prefixed with the SCS formatted timestamp \
                           (mm/dd/YYYY,HH:MM:SS.sss) and comma (,)";

const EXAMPLE_DATA: &str = "\
03/19/2019,13:13:02.354,$GNGGA,131302.00,2443.628838,N,11858.560367,W,2,15,0.8,-25.400,M,0.000,M,6.0,0436*60
03/19/2019,13:13:02.854,$GNGGA,131302.50,2443.629467,N,11858.561860,W,2,15,0.8,-25.495,M,0.000,M,4.0,0436*61
03/19/2019,13:13:03.368,$GNGGA,131303.00,2443.630108,N,11858.563351,W,2,15,0.8,-25.594,M,0.000,M,4.0,0436*6A
";

// date,time,hdr,sensor_time,lat,NS,lon,EW,quality,nsv,hdop,antenna_height,
// M,height_wgs84,M,last_update,dgps_station*checksum
const RAW_FIELD_COUNT: usize = 17;

const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S%.f";
const SENSOR_TIME_FORMAT: &str = "%H%M%S%.f";

pub struct Nav02Parser;

impl Nav02Parser {
    fn parse_line(fields: &[&str]) -> Result<NavRecord> {
        if fields.len() != RAW_FIELD_COUNT {
            return Err(NavError::Parse(format!(
                "expected {} fields, got {}",
                RAW_FIELD_COUNT,
                fields.len()
            )));
        }

        let timestamp =
            NaiveDateTime::parse_from_str(&format!("{} {}", fields[0], fields[1]), TIMESTAMP_FORMAT)
                .map_err(|e| NavError::Parse(format!("bad timestamp prefix: {}", e)))?;
        let sensor_tod = NaiveTime::parse_from_str(fields[3], SENSOR_TIME_FORMAT)
            .map_err(|e| NavError::Parse(format!("bad sensor time: {}", e)))?;

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

        let valid_cksum = verify_checksum(&fields[2..].join(","))?;

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

impl NavParser for Nav02Parser {
    fn name(&self) -> &'static str {
        "nav02"
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
