use clap::Parser;
use log::{info, LevelFilter};

mod args;
mod seats;

use crate::seats::{run_election, RunSettings};

fn main() {
    let args = args::Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
    info!("args: {:?}", args);

    let settings = RunSettings {
        config_path: args.config,
        reference: args.reference,
        out: args.out,
        year: args.year,
        district: args.district,
    };

    if let Err(e) = run_election(&settings) {
        eprintln!("An error occurred: {}", e);
        if let Some(source) = std::error::Error::source(&e) {
            eprintln!("Caused by: {}", source);
        }
        std::process::exit(1);
    }
}
