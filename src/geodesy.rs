//! Geodesy and NMEA sentence utilities
//!
//! Pure functions shared by the format parsers and the kinematic
//! processor: spherical-earth distance, initial compass bearing,
//! hemisphere sign correction, NMEA checksum verification and
//! ddmm.mmmm coordinate conversion.

use crate::error::{NavError, Result};

/// Mean earth radius used for the spherical approximation, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two (latitude, longitude) points in
/// decimal degrees, returned in kilometers.
///
/// Uses the haversine formula on a spherical earth, accurate to ~0.5%
/// against the WGS-84 ellipsoid.
pub fn great_circle_distance_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;

    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Initial compass bearing from one (latitude, longitude) point to
/// another, in degrees within [0, 360).
///
/// atan2-based; negative results are normalized by adding 360. For
/// identical points `atan2(0, 0)` is 0 in Rust, so the bearing of a
/// point to itself is 0.0 rather than an error.
pub fn bearing_degrees(from: (f64, f64), to: (f64, f64)) -> f64 {
    let lat1 = from.0.to_radians();
    let lat2 = to.0.to_radians();
    let dlon = (to.1 - from.1).to_radians();

    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let initial = x.atan2(y).to_degrees();

    (initial + 360.0) % 360.0
}

/// Negate a coordinate magnitude for the western/southern hemispheres.
///
/// `N` and `E` leave the magnitude unchanged; any other code is a
/// malformed sentence field.
pub fn hemisphere_correction(magnitude: f64, hemisphere: &str) -> Result<f64> {
    match hemisphere {
        "W" | "S" => Ok(-magnitude),
        "N" | "E" => Ok(magnitude),
        other => Err(NavError::Parse(format!(
            "invalid hemisphere code: {:?}",
            other
        ))),
    }
}

/// Verify the XOR checksum of an NMEA0183 sentence.
///
/// The checksum is the XOR of all bytes strictly between the `$` and
/// `*` delimiters, compared case-insensitively against the two-digit
/// hex suffix after `*`. A sentence without both delimiters is a format
/// violation, not a checksum mismatch. A suffix that is not valid hex
/// fails as a parse error, which callers treat like any other bad line.
pub fn verify_checksum(sentence: &str) -> Result<bool> {
    let sentence = sentence.trim_end();

    let start = sentence
        .find('$')
        .ok_or_else(|| NavError::InvalidSentence(format!("missing '$': {}", sentence)))?;
    let end = sentence
        .rfind('*')
        .ok_or_else(|| NavError::InvalidSentence(format!("missing '*': {}", sentence)))?;

    if end < start {
        return Err(NavError::InvalidSentence(format!(
            "'*' precedes '$': {}",
            sentence
        )));
    }

    let suffix = &sentence[end + 1..];
    if suffix.len() != 2 {
        return Err(NavError::Parse(format!(
            "checksum suffix is not two characters: {:?}",
            suffix
        )));
    }
    let expected = u8::from_str_radix(suffix, 16)
        .map_err(|_| NavError::Parse(format!("checksum suffix is not hex: {:?}", suffix)))?;

    let mut csum = 0u8;
    for byte in sentence[start + 1..end].bytes() {
        csum ^= byte;
    }

    Ok(csum == expected)
}

/// Convert an NMEA ddmm.mmmm (or dddmm.mmmm) field to decimal degrees.
///
/// `degree_digits` is 2 for latitude and 3 for longitude.
pub fn nmea_coordinate(field: &str, degree_digits: usize) -> Result<f64> {
    if field.len() < degree_digits {
        return Err(NavError::Parse(format!(
            "coordinate field too short: {:?}",
            field
        )));
    }

    let degrees: f64 = field[..degree_digits]
        .parse()
        .map_err(|_| NavError::Parse(format!("bad coordinate degrees: {:?}", field)))?;
    let minutes: f64 = field[degree_digits..]
        .parse()
        .map_err(|_| NavError::Parse(format!("bad coordinate minutes: {:?}", field)))?;

    Ok(degrees + minutes / 60.0)
}
