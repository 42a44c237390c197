//! Shared plumbing for the command-line tools

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::{NavError, Result};

/// Timestamp format accepted by the --startTS/--endTS options.
pub const CLI_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Map -v occurrence count to a log level and initialize env_logger.
/// Default level is warn; RUST_LOG still overrides everything.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .init();
}

/// Parse a `YYYY-mm-ddTHH:MM:SS[.ffffff]Z` crop bound.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, CLI_TIME_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| NavError::Parse(format!("bad timestamp {:?}: {}", value, e)))
}

/// Split a `key=value` metadata override.
pub fn parse_meta(value: &str) -> Result<(String, String)> {
    value
        .split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| NavError::Parse(format!("bad metadata override {:?}, want key=value", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_accepts_fractional_seconds() {
        assert!(parse_timestamp("2021-03-26T13:47:51.329619Z").is_ok());
        assert!(parse_timestamp("2021-03-26T13:47:51Z").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_parse_meta() {
        assert_eq!(
            parse_meta("cruise_id=FK210326").unwrap(),
            ("cruise_id".to_string(), "FK210326".to_string())
        );
        assert_eq!(
            parse_meta("title=a=b").unwrap(),
            ("title".to_string(), "a=b".to_string())
        );
        assert!(parse_meta("no-equals").is_err());
    }
}
