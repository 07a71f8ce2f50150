//! Entry point for the `herald` interactive shell.
//!
//! The binary delegates to [`herald_cli::run`], which parses arguments,
//! installs telemetry and feeds standard input line by line to the
//! dispatcher.

use std::io::{self, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'_> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    herald_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
