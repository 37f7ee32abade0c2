//! CLI definitions and plumbing.

use std::path::Path;

use clap::{ArgAction, Parser, Subcommand};
use reckon::ty::print::DEFAULT_WIDTH;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log more detail (-v for debug, -vv for trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// The line width used when printing
    #[arg(short = 'w', long, default_value_t = DEFAULT_WIDTH, global = true)]
    pub width: usize,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Type-check a program and print its principal type
    Check {
        #[arg(short = 'i', long)]
        input: Option<Box<Path>>,
    },
    /// Type-check and evaluate a program, printing its value
    Run {
        #[arg(short = 'i', long)]
        input: Option<Box<Path>>,
    },
    /// Print a program in canonical form
    Fmt {
        #[arg(short = 'i', long)]
        input: Option<Box<Path>>,
    },
}

impl Command {
    pub fn input(&self) -> Option<&Path> {
        match self {
            Command::Check { input }
            | Command::Run { input }
            | Command::Fmt { input } => input.as_deref(),
        }
    }
}
