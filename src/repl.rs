//! Interactive shell with a persistent evaluation stack.
//!
//! Each submitted line is a complete program; there is no multi-line
//! continuation. The evaluator outlives individual lines, so state built
//! up during the session stays observable until `:clear`.

use std::io::{self, Write};

use crate::errors::print_error;
use crate::runtime::{Evaluator, StdoutSink};
use crate::syntax::parser;

/// REPL state that persists across evaluated lines.
pub struct ReplState {
    evaluator: Evaluator,
    line_number: usize,
}

impl Default for ReplState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplState {
    pub fn new() -> Self {
        Self {
            evaluator: Evaluator::with_echo(true),
            line_number: 1,
        }
    }

    /// Parses and evaluates one line in the persistent context.
    pub fn eval_line(&mut self, input: &str) -> Result<(), ()> {
        let source_name = format!("<repl:{}>", self.line_number);
        self.line_number += 1;

        let module = match parser::parse_named(input, &source_name) {
            Ok(module) => module,
            Err(e) => {
                print_error(e);
                return Err(());
            }
        };

        match self
            .evaluator
            .evaluate(&module.statements, &mut StdoutSink, &mut StdoutSink)
        {
            Ok(()) => Ok(()),
            Err(e) => {
                eprintln!("error: {e}");
                Err(())
            }
        }
    }

    pub fn reset(&mut self) {
        self.evaluator.reset();
    }
}

/// Main REPL entry point.
pub fn run_repl() {
    println!("Rill REPL");
    println!("Type :help for help, :quit to exit, :clear to reset the state");
    println!();

    let mut state = ReplState::new();

    loop {
        print!("rill> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF (Ctrl+D)
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.starts_with(':') {
                    match handle_repl_command(line, &mut state) {
                        ReplCommand::Continue => continue,
                        ReplCommand::Quit => break,
                    }
                }
                let _ = state.eval_line(line);
            }
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        }
    }
}

enum ReplCommand {
    Continue,
    Quit,
}

fn handle_repl_command(command: &str, state: &mut ReplState) -> ReplCommand {
    match command.to_ascii_lowercase().as_str() {
        ":help" | ":h" => {
            println!("Rill REPL Commands:");
            println!("  :help, :h     Show this help");
            println!("  :quit, :q     Exit the REPL");
            println!("  :clear, :c    Reset the evaluation stack");
            println!();
            println!("Enter expressions to evaluate them, one per line.");
            ReplCommand::Continue
        }
        ":quit" | ":q" => {
            println!("Goodbye!");
            ReplCommand::Quit
        }
        ":clear" | ":c" => {
            state.reset();
            println!("State cleared.");
            ReplCommand::Continue
        }
        other => {
            println!("Unknown command: {other} (try :help)");
            ReplCommand::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_persists_across_lines() {
        let mut state = ReplState::new();
        assert!(state.eval_line("$print 1 + 2").is_ok());
        assert!(state.eval_line("# just a comment").is_ok());
    }

    #[test]
    fn bad_lines_report_without_killing_the_session() {
        let mut state = ReplState::new();
        assert!(state.eval_line("1 +").is_err());
        assert!(state.eval_line("$print 2").is_ok());
    }
}
