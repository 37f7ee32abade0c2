use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use log::LevelFilter;
use reckon::driver::{self, DriverContext};

mod cli;

pub fn interface() -> driver::Result<String> {
    let Cli {
        verbose,
        width,
        command,
    } = Cli::parse();

    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let context = DriverContext { width };
    let file = driver::load(command.input())?;

    match command {
        Command::Check { .. } => context.check(&file),
        Command::Run { .. } => context.run(&file),
        Command::Fmt { .. } => context.fmt(&file),
    }
}

fn main() -> ExitCode {
    match interface() {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}
