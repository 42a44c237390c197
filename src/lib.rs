//! r2rnav Library
//!
//! A Rust library for processing raw shipboard GNSS navigation data
//! into quality-controlled trackline products. The pipeline parses
//! vendor-specific raw formats into a uniform record table, derives
//! kinematics (deltas, distance, speed, course, acceleration), writes
//! an intermediate r2rnav file, and builds reduced products from it.
//!
//! # Features
//!
//! - **`cli`** (default): Build the navparse/navinfo/navqa/navexport
//!   command-line tools
//!
//! # Quick Start
//!
//! Parse a raw file and derive kinematics:
//! ```rust,no_run
//! use r2rnav::{derive_kinematics, parser_for_format};
//! use std::path::Path;
//!
//! let parser = parser_for_format("nav02").unwrap();
//! let mut parsed = parser.parse_file(Path::new("gnss.raw")).unwrap();
//! derive_kinematics(&mut parsed.records);
//! println!("parsed {} records", parsed.records.len());
//! ```
//!
//! Build a quality-controlled best-resolution product:
//! ```rust,no_run
//! use r2rnav::{apply_qc, build_bestres, read_record_file, write_product};
//! use r2rnav::{QcThresholds, RecordFileFormat};
//! use std::path::Path;
//!
//! let records = read_record_file(Path::new("cruise.r2rnav"), RecordFileFormat::Csv).unwrap();
//! let records = apply_qc(records, &QcThresholds::default());
//! let product = build_bestres(records);
//! write_product(std::io::stdout(), &product, None).unwrap();
//! ```
//!
//! # Public API
//!
//! ## Parsing
//! - [`parser_for_format`] - Look up a raw-format parser by name
//! - [`NavParser`] - Trait every raw-format parser implements
//! - [`NavRecord`] - One observation epoch in the canonical schema
//!
//! ## Processing
//! - [`derive_kinematics`] - Fill the derived columns of a sequence
//! - [`crop_records`] - Restrict a sequence to a time window
//! - [`apply_qc`] - Hard-filter records against quality thresholds
//!
//! ## Products and files
//! - [`build_bestres`], [`build_onemin`], [`build_control`] - Reduced products
//! - [`write_record_file`], [`read_record_file`] - r2rnav intermediate files
//! - [`write_product`] - Product CSV, optionally with a GeoCSV header
//!
//! ## Reports
//! - [`InfoReport`], [`FileReport`], [`QaReport`] - Sequence summaries

#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod export;
pub mod filters;
pub mod geocsv;
pub mod geodesy;
pub mod kinematics;
pub mod parser;
pub mod r2rnav;
pub mod types;

pub use error::{NavError, Result};
pub use export::{build_bestres, build_control, build_onemin, rdp, NavProduct, RDP_EPSILON};
pub use filters::{apply_qc, QcThresholds};
pub use geocsv::{render_header, template_for_product};
pub use kinematics::{crop_records, derive_kinematics};
pub use parser::{parser_for_format, NavParser, ParsedFile, NAV_FORMATS};
pub use r2rnav::{read_record_file, write_product, write_record_file, RecordFileFormat};
pub use types::{
    FileReport, InfoReport, NavRecord, QaReport, DEFAULT_ACCELERATION_THRESHOLD,
    DEFAULT_GAP_THRESHOLD, DEFAULT_SPEED_THRESHOLD,
};
