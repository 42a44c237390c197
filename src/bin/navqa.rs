//! Run a quality assessment against an r2rnav intermediate file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use log::{info, warn};

use r2rnav::cli::{init_logging, parse_timestamp};
use r2rnav::{
    crop_records, read_record_file, QaReport, RecordFileFormat, DEFAULT_ACCELERATION_THRESHOLD,
    DEFAULT_GAP_THRESHOLD, DEFAULT_SPEED_THRESHOLD,
};

fn build_command() -> Command {
    Command::new("navqa")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run a quality assessment against an r2rnav formatted file")
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .help("Increase output verbosity")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("logfile")
                .short('l')
                .long("logfile")
                .help("Write output to specified logfile"),
        )
        .arg(
            Arg::new("logfileformat")
                .short('L')
                .long("logfileformat")
                .help("Logfile format, default: text")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("startTS")
                .long("startTS")
                .help("Crop data to start timestamp"),
        )
        .arg(
            Arg::new("endTS")
                .long("endTS")
                .help("Crop data to end timestamp"),
        )
        .arg(
            Arg::new("gapthreshold")
                .short('g')
                .long("gapthreshold")
                .help("Gap threshold in seconds")
                .value_parser(value_parser!(f64))
                .default_value("300"),
        )
        .arg(
            Arg::new("speedthreshold")
                .short('s')
                .long("speedthreshold")
                .help("Speed threshold in m/s")
                .value_parser(value_parser!(f64))
                .default_value("8.7"),
        )
        .arg(
            Arg::new("accelerationthreshold")
                .short('a')
                .long("accelerationthreshold")
                .help("Acceleration threshold in m/s^2")
                .value_parser(value_parser!(f64))
                .default_value("1"),
        )
        .arg(
            Arg::new("inputformat")
                .short('I')
                .long("inputformat")
                .help("Format type of the input file, default: csv")
                .value_parser(["csv", "json"])
                .default_value("csv"),
        )
        .arg(
            Arg::new("input")
                .help("The input r2rnav file")
                .required(true),
        )
}

fn main() -> Result<()> {
    let matches = build_command().get_matches();
    init_logging(matches.get_count("verbosity"));

    let input = matches.get_one::<String>("input").expect("input required");
    let inputformat: RecordFileFormat = matches
        .get_one::<String>("inputformat")
        .expect("has default")
        .parse()?;

    let gap_seconds = *matches
        .get_one::<f64>("gapthreshold")
        .unwrap_or(&DEFAULT_GAP_THRESHOLD);
    let speed_threshold = *matches
        .get_one::<f64>("speedthreshold")
        .unwrap_or(&DEFAULT_SPEED_THRESHOLD);
    let acceleration_threshold = *matches
        .get_one::<f64>("accelerationthreshold")
        .unwrap_or(&DEFAULT_ACCELERATION_THRESHOLD);

    let start_ts = matches
        .get_one::<String>("startTS")
        .map(|s| parse_timestamp(s))
        .transpose()?;
    let end_ts = matches
        .get_one::<String>("endTS")
        .map(|s| parse_timestamp(s))
        .transpose()?;

    info!("Reading r2rnav file: {}", input);
    let records = read_record_file(Path::new(input), inputformat)
        .with_context(|| format!("unable to read input file {:?}", input))?;

    let records = crop_records(records, start_ts, end_ts);
    if (start_ts.is_some() || end_ts.is_some()) && records.is_empty() {
        warn!("Data is empty after cropping for start/end timestamps");
        return Ok(());
    }

    let report = QaReport::build(
        input,
        &records,
        gap_seconds,
        speed_threshold,
        acceleration_threshold,
    )?;

    if let Some(logfile) = matches.get_one::<String>("logfile") {
        let logfileformat = matches
            .get_one::<String>("logfileformat")
            .expect("has default");
        info!("Saving report to {} in {} format", logfile, logfileformat);

        let contents = if logfileformat == "json" {
            serde_json::to_string_pretty(&report.to_json())?
        } else {
            report.to_string()
        };
        fs::write(logfile, contents)
            .with_context(|| format!("error saving report file {:?}", logfile))?;
    } else {
        println!("{}", report);
    }

    Ok(())
}
