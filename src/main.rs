//! In-tree CLI binary: a thin, batch-mode-only host for the interpreter library.
//!
//! Reads a script file, parses it, and runs it against the process's real stdin/stdout. No REPL,
//! no debug dumps, no sandboxing flags — the `parse`/`run` contract in `lib.rs` is the crate's
//! entire public surface, and this binary is just one caller of it among the CLI/REPL/HTTP
//! collaborators named in the crate docs.

use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pseudocode_interpreter::{parse, run, InterpretOptions};

/// Run an A-level pseudocode script.
#[derive(Parser, Debug)]
#[command(name = "pseudocode-interpreter")]
#[command(version)]
#[command(about = "Interpreter for A-level Computer Science pseudocode")]
struct CliArgs {
    /// Pseudocode source file to execute.
    script: PathBuf,

    /// Reject assignment to an undeclared variable instead of implicitly declaring it.
    #[arg(long)]
    strict: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = CliArgs::parse();

    let source = match std::fs::read_to_string(&args.script) {
        Ok(s) => s,
        Err(e) => {
            error!("cannot read {}: {}", args.script.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let program = match parse(&source) {
        Ok(program) => program,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdin = BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    let options = InterpretOptions { strict: args.strict };

    match run(&program, &mut stdin, &mut stdout, options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
