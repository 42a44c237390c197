//! Parse raw position data, process it, and export the r2rnav
//! intermediate format.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, Command};
use glob::glob;
use log::{debug, info, warn};

use r2rnav::cli::{init_logging, parse_timestamp};
use r2rnav::{
    crop_records, derive_kinematics, parser_for_format, write_record_file, FileReport, NavRecord,
    RecordFileFormat, NAV_FORMATS,
};

/// Expand input arguments (files, directories, glob patterns) to a
/// sorted list of input files. Directory contents are taken flat.
fn build_file_list(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for input in inputs {
        if input.contains('*') || input.contains('?') || input.contains('[') {
            let pattern =
                glob(input).with_context(|| format!("invalid glob pattern {:?}", input))?;
            for entry in pattern {
                let path = entry.with_context(|| format!("error expanding {:?}", input))?;
                if path.is_file() && seen.insert(path.clone()) {
                    files.push(path);
                }
            }
            continue;
        }

        let path = Path::new(input);
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)
                .with_context(|| format!("cannot read directory {:?}", input))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            entries.sort();
            for entry in entries {
                if seen.insert(entry.clone()) {
                    files.push(entry);
                }
            }
        } else if path.is_file() {
            if seen.insert(path.to_path_buf()) {
                files.push(path.to_path_buf());
            }
        } else {
            warn!("path not found: {}", input);
        }
    }

    Ok(files)
}

fn build_command() -> Command {
    Command::new("navparse")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parse raw position data, process and export into r2rnav intermediate format")
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .help("Increase output verbosity, default level: warning")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Format type of input file(s)")
                .value_parser(NAV_FORMATS)
                .required(true),
        )
        .arg(
            Arg::new("logfile")
                .short('l')
                .long("logfile")
                .help("Write file report to specified logfile"),
        )
        .arg(
            Arg::new("logfileformat")
                .short('L')
                .long("logfileformat")
                .help("The file report format, default: text")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .help("Write output to specified outfile"),
        )
        .arg(
            Arg::new("outfileformat")
                .short('O')
                .long("outfileformat")
                .help("The outfile format, default: csv")
                .value_parser(["csv", "json"])
                .default_value("csv"),
        )
        .arg(
            Arg::new("startTS")
                .long("startTS")
                .help("Crop data to start timestamp, format: YYYY-mm-ddTHH:MM:SS.sssZ"),
        )
        .arg(
            Arg::new("endTS")
                .long("endTS")
                .help("Crop data to end timestamp, format: YYYY-mm-ddTHH:MM:SS.sssZ"),
        )
        .arg(
            Arg::new("input")
                .help("The input files, directories and/or file globs")
                .num_args(1..)
                .required(true),
        )
}

fn main() -> Result<()> {
    let matches = build_command().get_matches();
    init_logging(matches.get_count("verbosity"));

    let format = matches
        .get_one::<String>("format")
        .expect("format is required");
    let parser = parser_for_format(format)?;

    info!("Parser Name: {}", parser.name());
    info!("Parser Description: {}", parser.description());
    debug!("Parser Example Data:\n{}", parser.example_data());

    let start_ts = matches
        .get_one::<String>("startTS")
        .map(|s| parse_timestamp(s))
        .transpose()?;
    let end_ts = matches
        .get_one::<String>("endTS")
        .map(|s| parse_timestamp(s))
        .transpose()?;

    let inputs: Vec<String> = matches
        .get_many::<String>("input")
        .expect("input is required")
        .cloned()
        .collect();
    let file_list = build_file_list(&inputs)?;
    if file_list.is_empty() {
        bail!("no files to process");
    }
    info!(
        "Input files:\n  {}",
        file_list
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n  ")
    );

    let mut records: Vec<NavRecord> = Vec::new();
    let mut reports: Vec<FileReport> = Vec::new();

    for file in &file_list {
        info!("Parsing data file: {}", file.display());
        let parsed = match parser.parse_file(file) {
            Ok(parsed) => parsed,
            Err(err) => {
                // Unreadable file: skip it, keep going with the rest
                warn!("problem parsing file {}: {}", file.display(), err);
                continue;
            }
        };

        let report = match FileReport::build(
            &file.display().to_string(),
            &parsed.records,
            parsed.parse_errors,
        ) {
            Ok(report) => report,
            Err(_) => {
                warn!("No usable data parsed from {}", file.display());
                continue;
            }
        };

        reports.push(report);
        records.extend(parsed.records);
    }

    if let Some(start) = start_ts {
        info!("Cropping data older than {}", start);
    }
    if let Some(end) = end_ts {
        info!("Cropping data newer than {}", end);
    }
    let mut records = crop_records(records, start_ts, end_ts);

    if records.is_empty() {
        warn!("Data is empty after cropping for start/end timestamps");
    } else {
        info!("Processing data");
        derive_kinematics(&mut records);
    }

    for report in &reports {
        info!("File report:\n{}", report);
    }

    if let Some(logfile) = matches.get_one::<String>("logfile") {
        let logfileformat = matches
            .get_one::<String>("logfileformat")
            .expect("has default");
        info!("Saving file report to {} in {} format", logfile, logfileformat);

        let contents = if logfileformat == "json" {
            let values: Vec<_> = reports.iter().map(|r| r.to_json()).collect();
            serde_json::to_string_pretty(&values)?
        } else {
            reports
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        fs::write(logfile, contents)
            .with_context(|| format!("error saving file report file {:?}", logfile))?;
    }

    if let Some(outfile) = matches.get_one::<String>("outfile") {
        let outfileformat: RecordFileFormat = matches
            .get_one::<String>("outfileformat")
            .expect("has default")
            .parse()?;
        info!("Saving data to {} ({:?})", outfile, outfileformat);
        write_record_file(Path::new(outfile), &records, outfileformat)
            .with_context(|| format!("error saving data file {:?}", outfile))?;
    } else {
        info!("Sending data to stdout in csv format");
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        r2rnav::r2rnav::write_records_csv(&mut handle, &records)?;
        handle.flush()?;
    }

    Ok(())
}
