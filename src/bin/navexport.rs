//! Export trackline products from an r2rnav intermediate file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{value_parser, Arg, ArgAction, Command};
use log::{info, warn};

use r2rnav::cli::{init_logging, parse_meta, parse_timestamp};
use r2rnav::{
    apply_qc, build_bestres, build_control, build_onemin, crop_records, read_record_file,
    write_product, QcThresholds, RecordFileFormat,
};

fn build_command() -> Command {
    Command::new("navexport")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Export a trackline product from an r2rnav formatted file")
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .help("Increase output verbosity")
                .action(ArgAction::Count),
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
                .help("Outfile format, default: geocsv")
                .value_parser(["csv", "geocsv"])
                .default_value("geocsv"),
        )
        .arg(
            Arg::new("meta")
                .short('m')
                .long("meta")
                .help("Custom metadata for the geocsv header, format: \"key=value\"")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("qc")
                .short('q')
                .long("qc")
                .help("Exclude bad data points")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("type")
                .short('t')
                .long("type")
                .help("Type of output to generate, default: bestres")
                .value_parser(["bestres", "1min", "control"])
                .default_value("bestres"),
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
    let outfileformat = matches
        .get_one::<String>("outfileformat")
        .expect("has default");
    let product_type = matches.get_one::<String>("type").expect("has default");

    let thresholds = QcThresholds {
        gap_seconds: *matches
            .get_one::<f64>("gapthreshold")
            .expect("has default"),
        max_speed: *matches
            .get_one::<f64>("speedthreshold")
            .expect("has default"),
        max_acceleration: *matches
            .get_one::<f64>("accelerationthreshold")
            .expect("has default"),
    };

    // creation_date is always stamped; -m overrides win on collision
    let mut overrides = vec![(
        "creation_date".to_string(),
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    )];
    if let Some(meta) = matches.get_many::<String>("meta") {
        for entry in meta {
            let (key, value) = parse_meta(entry)?;
            overrides.retain(|(k, _)| k != &key);
            overrides.push((key, value));
        }
    }

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

    let mut records = crop_records(records, start_ts, end_ts);
    if (start_ts.is_some() || end_ts.is_some()) && records.is_empty() {
        warn!("Data is empty after cropping for start/end timestamps");
        return Ok(());
    }

    if matches.get_flag("qc") {
        info!("Removing bad data based on QC rules");
        records = apply_qc(records, &thresholds);
    }

    info!("Building {} dataset", product_type);
    let product = match product_type.as_str() {
        "bestres" => build_bestres(records),
        "1min" => build_onemin(records),
        "control" => build_control(records),
        other => bail!("unknown product type {:?}", other),
    };

    let geocsv_overrides = if outfileformat == "geocsv" {
        Some(overrides.as_slice())
    } else {
        None
    };

    if let Some(outfile) = matches.get_one::<String>("outfile") {
        info!("Saving nav export to {} in {} format", outfile, outfileformat);
        let file = BufWriter::new(
            File::create(outfile)
                .with_context(|| format!("error saving nav export file {:?}", outfile))?,
        );
        write_product(file, &product, geocsv_overrides)?;
    } else {
        info!("Sending nav export to stdout in {} format", outfileformat);
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        write_product(&mut handle, &product, geocsv_overrides)?;
        handle.flush()?;
    }

    Ok(())
}
