//! GeoCSV 2.0 header templates for the trackline products
//!
//! A GeoCSV file is an ordinary CSV preceded by `#key: value` metadata
//! lines. Each product carries its own template; callers may override
//! individual keys (cruise_id, creation_date, provenance DOIs) without
//! disturbing the template order.

/// Ordered metadata template; rendered top to bottom.
pub type GeoCsvTemplate = &'static [(&'static str, &'static str)];

pub const BESTRES_HEADER: GeoCsvTemplate = &[
    ("dataset", "GeoCSV 2.0"),
    ("title", "Processed Trackline Navigation Data: Best Resolution"),
    (
        "field_unit",
        "ISO_8601,degree_east,degree_north,(unitless),(unitless),(unitless),meter,meter/second,degree",
    ),
    (
        "field_type",
        "datetime,float,float,integer,integer,float,float,float,float",
    ),
    (
        "field_standard_name",
        "iso_time,ship_longitude,ship_latitude,nmea_quality,nsv,hdop,antenna_height,speed_made_good,course_made_good",
    ),
    (
        "field_long_name",
        "date and time,longitude of vessel,latitude of vessel,NMEA quality indicator,number of satellite vehicles observed,horizontal dilution of precision,height of antenna above mean sea level,course made good,speed made good",
    ),
    ("standard_name_cv", "http://www.rvdata.us/voc/fieldname"),
    ("ellipsoid", "WGS-84 (EPSG:4326)"),
    ("delimiter", ","),
    ("field_missing", "NAN"),
    (
        "attribution",
        "Rolling Deck to Repository (R2R) Program; http://www.rvdata.us/",
    ),
    ("source_repository", "doi:10.17616/R39C8D"),
    ("source_event", "doi:10.7284/908273"),
    ("source_dataset", "doi:10.7284/133064"),
    ("cruise_id", ""),
    ("creation_date", ""),
];

pub const ONEMIN_HEADER: GeoCsvTemplate = &[
    ("dataset", "GeoCSV 2.0"),
    (
        "title",
        "Processed Trackline Navigation Data: One Minute Resolution",
    ),
    (
        "field_unit",
        "ISO_8601,degree_east,degree_north,meter/second,degree",
    ),
    ("field_type", "datetime,float,float,float,float"),
    (
        "field_standard_name",
        "iso_time,ship_longitude,ship_latitude,speed_made_good,course_made_good",
    ),
    (
        "field_long_name",
        "date and time,longitude of vessel,latitude of vessel,speed made good,course made good",
    ),
    ("standard_name_cv", "http://www.rvdata.us/voc/fieldname"),
    ("ellipsoid", "WGS-84 (EPSG:4326)"),
    ("delimiter", ","),
    ("field_missing", "NAN"),
    (
        "attribution",
        "Rolling Deck to Repository (R2R) Program; http://www.rvdata.us/",
    ),
    ("source_repository", "doi:10.17616/R39C8D"),
    ("source_event", "doi:10.7284/908273"),
    ("source_dataset", "doi:10.7284/133064"),
    ("cruise_id", ""),
    ("creation_date", ""),
];

pub const CONTROL_HEADER: GeoCsvTemplate = &[
    ("dataset", "GeoCSV 2.0"),
    ("title", "Processed Trackline Navigation Data: Control Points"),
    ("field_unit", "ISO_8601,degree_east,degree_north"),
    ("field_type", "datetime,float,float"),
    (
        "field_standard_name",
        "iso_time,ship_longitude,ship_latitude",
    ),
    (
        "field_long_name",
        "date and time,longitude of vessel,latitude of vessel",
    ),
    ("standard_name_cv", "http://www.rvdata.us/voc/fieldname"),
    ("ellipsoid", "WGS-84 (EPSG:4326)"),
    ("delimiter", ","),
    ("field_missing", "NAN"),
    (
        "attribution",
        "Rolling Deck to Repository (R2R) Program; http://www.rvdata.us/",
    ),
    ("source_repository", "doi:10.17616/R39C8D"),
    ("source_event", "doi:10.7284/908273"),
    ("source_dataset", "doi:10.7284/133064"),
    ("cruise_id", ""),
    ("creation_date", ""),
];

/// Template for a product by name ("bestres", "1min", "control").
pub fn template_for_product(name: &str) -> Option<GeoCsvTemplate> {
    match name {
        "bestres" => Some(BESTRES_HEADER),
        "1min" => Some(ONEMIN_HEADER),
        "control" => Some(CONTROL_HEADER),
        _ => None,
    }
}

/// Render a template as `#key: value` lines. Overrides replace the
/// value of an exactly matching key; keys with no template entry are
/// ignored.
pub fn render_header(template: GeoCsvTemplate, overrides: &[(String, String)]) -> String {
    let mut header = String::new();
    for (key, default) in template {
        let value = overrides
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or(default);
        header.push_str(&format!("#{}: {}\n", key, value));
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_header_defaults() {
        let header = render_header(CONTROL_HEADER, &[]);
        assert!(header.starts_with("#dataset: GeoCSV 2.0\n"));
        assert!(header.contains("#title: Processed Trackline Navigation Data: Control Points\n"));
        assert!(header.contains("#cruise_id: \n"));
        assert_eq!(header.lines().count(), CONTROL_HEADER.len());
    }

    #[test]
    fn test_render_header_overrides_matching_keys() {
        let overrides = vec![
            ("cruise_id".to_string(), "FK210326".to_string()),
            ("not_a_key".to_string(), "ignored".to_string()),
        ];
        let header = render_header(BESTRES_HEADER, &overrides);
        assert!(header.contains("#cruise_id: FK210326\n"));
        assert!(!header.contains("not_a_key"));
    }

    #[test]
    fn test_template_lookup() {
        assert!(template_for_product("bestres").is_some());
        assert!(template_for_product("1min").is_some());
        assert!(template_for_product("control").is_some());
        assert!(template_for_product("hourly").is_none());
    }
}
