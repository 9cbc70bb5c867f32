//! Command-line entry point and subcommand dispatch.

use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};

use crate::errors::print_error;
use crate::repl;
use crate::runtime::{Evaluator, StderrSink, StdoutSink};
use crate::syntax::parser;

#[derive(Debug, Parser)]
#[command(
    name = "rill",
    version,
    about = "A small line-oriented expression language."
)]
pub struct RillArgs {
    #[command(subcommand)]
    pub command: ArgsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ArgsCommand {
    /// Parse and evaluate a script.
    Run {
        /// The path to the script file to run.
        #[arg(required = true)]
        file: PathBuf,
        /// Echo each non-nil statement result to stderr.
        #[arg(long)]
        echo: bool,
    },
    /// Show the parsed statement listing for a script.
    Ast {
        /// The path to the script file to parse.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Start an interactive session.
    Repl,
}

/// The main entry point for the CLI.
pub fn run() {
    let args = RillArgs::parse();

    match args.command {
        ArgsCommand::Run { file, echo } => {
            let module = parser::parse_file(&file).unwrap_or_else(|e| {
                print_error(e);
                process::exit(1);
            });
            let mut evaluator = Evaluator::with_echo(echo);
            let result = evaluator.evaluate(
                &module.statements,
                &mut StdoutSink,
                &mut StderrSink,
            );
            if let Err(e) = result {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }

        ArgsCommand::Ast { file } => {
            let module = parser::parse_file(&file).unwrap_or_else(|e| {
                print_error(e);
                process::exit(1);
            });
            print!("{}", module.listing());
        }

        ArgsCommand::Repl => repl::run_repl(),
    }
}
