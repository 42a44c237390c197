use std::fmt;

/// Custom error types for nav data processing
#[derive(Debug)]
pub enum NavError {
    /// I/O errors
    Io(std::io::Error),
    /// CSV read/write errors
    Csv(csv::Error),
    /// JSON read/write errors
    Json(serde_json::Error),
    /// Parse errors with context
    Parse(String),
    /// Structurally invalid sentence (e.g. missing $/* checksum delimiters)
    InvalidSentence(String),
    /// Unknown nav format identifier
    UnknownFormat(String),
    /// Statistics requested over an empty record sequence
    EmptySequence,
    /// Export/product-build error
    Export(String),
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::Io(err) => write!(f, "I/O error: {}", err),
            NavError::Csv(err) => write!(f, "CSV error: {}", err),
            NavError::Json(err) => write!(f, "JSON error: {}", err),
            NavError::Parse(msg) => write!(f, "Parse error: {}", msg),
            NavError::InvalidSentence(msg) => write!(f, "Invalid sentence: {}", msg),
            NavError::UnknownFormat(name) => write!(f, "Unknown nav format: {}", name),
            NavError::EmptySequence => write!(f, "Record sequence is empty"),
            NavError::Export(msg) => write!(f, "Export error: {}", msg),
        }
    }
}

impl std::error::Error for NavError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NavError::Io(err) => Some(err),
            NavError::Csv(err) => Some(err),
            NavError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NavError {
    fn from(err: std::io::Error) -> Self {
        NavError::Io(err)
    }
}

impl From<csv::Error> for NavError {
    fn from(err: csv::Error) -> Self {
        NavError::Csv(err)
    }
}

impl From<serde_json::Error> for NavError {
    fn from(err: serde_json::Error) -> Self {
        NavError::Json(err)
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
