//! Format parsers for raw navigation sensor logs
//!
//! One parser per supported raw format. Every parser reads a whole
//! file and emits the same partially-populated `NavRecord` schema; a
//! malformed line never aborts the file, it becomes an all-null record
//! with `valid_parse = 0` so line accounting stays exact.

pub mod nav01;
pub mod nav02;
pub mod nav03;
pub mod nav33;

pub use nav01::Nav01Parser;
pub use nav02::Nav02Parser;
pub use nav03::Nav03Parser;
pub use nav33::Nav33Parser;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{NavError, Result};
use crate::types::NavRecord;

/// Result of parsing one raw file.
#[derive(Debug, Default)]
pub struct ParsedFile {
    /// Records in input order, including all-null parse failures.
    pub records: Vec<NavRecord>,
    /// Count of lines that failed to parse. Always equals the number of
    /// `valid_parse = 0` records, kept separately for report building.
    pub parse_errors: usize,
}

/// A raw navigation log format.
///
/// Implementations carry identity metadata for operator-facing
/// diagnostics alongside the actual file parser.
pub trait NavParser {
    /// Registry identifier, e.g. "nav02".
    fn name(&self) -> &'static str;

    /// Human-readable description of the raw format.
    fn description(&self) -> &'static str;

    /// A short verbatim block of example input.
    fn example_data(&self) -> &'static str;

    /// Parse one raw file into records. An unreadable file is a hard
    /// error; a bad line is not.
    fn parse_file(&self, path: &Path) -> Result<ParsedFile>;
}

/// Format identifiers accepted by the registry.
pub const NAV_FORMATS: [&str; 4] = ["nav01", "nav02", "nav03", "nav33"];

/// Look up a parser by format identifier.
pub fn parser_for_format(format: &str) -> Result<Box<dyn NavParser>> {
    match format {
        "nav01" => Ok(Box::new(Nav01Parser)),
        "nav02" => Ok(Box::new(Nav02Parser)),
        "nav03" => Ok(Box::new(Nav03Parser)),
        "nav33" => Ok(Box::new(Nav33Parser)),
        other => Err(NavError::UnknownFormat(other.to_string())),
    }
}

/// Read a raw file into (1-based line number, line) pairs. Unreadable
/// files are fatal for that file only; the caller decides whether to
/// skip or abort.
pub(crate) fn read_lines(path: &Path) -> Result<Vec<(usize, String)>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut lines = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        lines.push((idx + 1, line));
    }

    Ok(lines)
}

/// Split a raw line on commas. NMEA fields are never quoted, so a plain
/// split is the whole grammar.
pub(crate) fn split_fields(line: &str) -> Vec<&str> {
    line.trim_end().split(',').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_knows_every_format() {
        for format in NAV_FORMATS {
            let parser = parser_for_format(format).unwrap();
            assert_eq!(parser.name(), format);
            assert!(!parser.description().is_empty());
            assert!(parser.example_data().contains('$'));
        }
    }

    #[test]
    fn test_registry_rejects_unknown_format() {
        assert!(matches!(
            parser_for_format("nav99"),
            Err(NavError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_split_fields_strips_line_ending() {
        let fields = split_fields("a,b,c\r\n");
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let parser = parser_for_format("nav02").unwrap();
        assert!(parser
            .parse_file(Path::new("/nonexistent/input.raw"))
            .is_err());
    }
}
