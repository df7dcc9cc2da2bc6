//! `i2c-set-tout` - set the I2C clock-stretch timeout
//!
//! Prints `OK CLKT.TOUT = <value>` on success, or `ERROR <message>` on
//! stderr with exit status 1. A missing or extra argument is a usage
//! error (status 2).

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use i2ctout::cli::{render, Cli};
use i2ctout::{init_logging, Config};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match execute(&cli) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> anyhow::Result<String> {
    let request = cli.request()?;

    let path = cli.config.clone().unwrap_or_else(Config::default_config_path);
    let mut config = Config::load_from(Some(path.clone()))
        .with_context(|| format!("config file {}", path.display()))?;
    cli.apply_overrides(&mut config);

    let outcome = i2ctout::run(&config, request)?;
    Ok(render(&outcome, config.output.json)?)
}
