use clap::{arg, command, Command};
use farm::{FarmModel, Geometry};
use farmtool::ExportFormat;
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let matches = command!()
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(arg!(-v --verbose ... "Increases verbosity by one level (can be repeated)"))
        .arg(
            arg!(--vmodule <FILTER> "sets the env_logger filter to the given string: \
                                     default,module::path=level,... \
                                     {trace,debug,info,warn,error,none}")
            .required(false),
        )
        .subcommand(Command::new("version").about("Print version information"))
        .subcommand(
            Command::new("parse")
                .about("decodes a FARM file (or database directory) and prints a summary")
                .arg(arg!(-a - -all "If set, prints out every table."))
                .arg(arg!([PATH]).required(true).allow_invalid_utf8(true)),
        )
        .subcommand(
            Command::new("export")
                .about("writes a FARM file as JSON or as a Graphviz DOT graph")
                .arg(
                    arg!(--format <FORMAT> "json or dot")
                        .required(false)
                        .default_value("json"),
                )
                .arg(arg!([INPUT]).required(true).allow_invalid_utf8(true))
                .arg(arg!([OUTPUT]).required(false).allow_invalid_utf8(true)),
        )
        .subcommand(
            Command::new("list-features")
                .about("lists every feature with its category, code, geometry, and labels")
                .arg(arg!([PATH]).required(true).allow_invalid_utf8(true)),
        )
        .subcommand(
            Command::new("feature-info")
                .about("prints one feature and the attributes it may carry")
                .arg(arg!([PATH]).required(true).allow_invalid_utf8(true))
                .arg(arg!([LABEL]).required(true))
                .arg(arg!([GEOMETRY] "none, point, linear, or areal").required(true)),
        )
        .get_matches();

    // Logging stuff: keep above everything but the cmdline parsing.
    let mut log_builder = env_logger::Builder::new();
    match matches.occurrences_of("verbose") {
        0 => {
            log_builder.filter_level(log::LevelFilter::Warn);
        }
        1 => {
            log_builder.filter_level(log::LevelFilter::Info);
        }
        2 => {
            log_builder.filter_level(log::LevelFilter::Debug);
        }
        _ => {
            log_builder.filter_level(log::LevelFilter::Trace);
        }
    };
    if let Some(filter) = matches.value_of("vmodule") {
        log_builder.parse_filters(filter);
    }
    log_builder.init();

    match matches.subcommand() {
        Some(("version", _)) => {
            println!(env!("CARGO_PKG_VERSION"));
        }
        Some(("parse", sub_matches)) => {
            let path = sub_matches.value_of_os("PATH").ok_or("missing PATH")?;
            let model = FarmModel::open(path)?;
            if sub_matches.is_present("all") {
                println!("{:+}", &model); // Use {:+} for verbose printing.
            } else {
                println!("{}", &model);
            }
        }
        Some(("export", sub_matches)) => {
            let in_path = sub_matches.value_of_os("INPUT").ok_or("missing INPUT")?;
            let format: ExportFormat = sub_matches.value_of("format").unwrap_or("json").parse()?;
            let out_path = sub_matches.value_of_os("OUTPUT").map(Path::new);
            let written = farmtool::export(in_path, out_path, format)?;
            println!("Wrote data to {:?}", &written);
        }
        Some(("list-features", sub_matches)) => {
            let path = sub_matches.value_of_os("PATH").ok_or("missing PATH")?;
            let model = FarmModel::open(path)?;
            print!("{}", farmtool::list_features(&model));
        }
        Some(("feature-info", sub_matches)) => {
            let path = sub_matches.value_of_os("PATH").ok_or("missing PATH")?;
            let label = sub_matches.value_of("LABEL").ok_or("missing LABEL")?;
            let geometry: Geometry = sub_matches
                .value_of("GEOMETRY")
                .ok_or("missing GEOMETRY")?
                .parse()?;
            let model = FarmModel::open(path)?;
            print!("{}", farmtool::feature_info(&model, label, geometry)?);
        }
        _ => unreachable!(),
    }
    Ok(())
}
