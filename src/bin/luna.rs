use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use luna::{Interpreter, LunaError, Repl, Value};

#[derive(Parser)]
#[command(author, version, about = "Luna language interpreter")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Luna script file
    Run { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
    /// Evaluate a snippet of Luna code
    Eval { source: String },
}

fn main() -> ExitCode {
    install_tracing();
    let args = Args::parse();
    let outcome = match args.command.unwrap_or(Command::Repl) {
        Command::Run { script } => run_script(script),
        Command::Repl => Repl::new().run(),
        Command::Eval { source } => Interpreter::new().eval_source(&source).map(print_result),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run_script(path: PathBuf) -> Result<(), LunaError> {
    let source = fs::read_to_string(&path)?;
    tracing::debug!(path = %path.display(), "running script");
    Interpreter::new().eval_source(&source)?;
    Ok(())
}

fn print_result(value: Value) {
    if !value.is_void() {
        println!("{value}");
    }
}

/// Logs go to stderr, filtered by `LUNA_LOG` (default `warn`).
fn install_tracing() {
    let filter = EnvFilter::try_from_env("LUNA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
