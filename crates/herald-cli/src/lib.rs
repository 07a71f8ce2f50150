//! Interactive shell host for the Herald command dispatcher.
//!
//! The shell reads one command per line from its input, dispatches it as a
//! configurable executor and prints whatever the commands send back. It
//! wires the engine to a worker-thread scheduler, an optional grant-list
//! permission check and an optional fixed locale, which makes it a small
//! end-to-end host for trying the engine out.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;

mod backend;
mod cli;
mod commands;
mod errors;
mod shell;
mod telemetry;


use cli::Cli;
use shell::Shell;

/// Runs the shell with the given arguments and IO handles.
///
/// Returns failure when the flags are invalid or the engine cannot be set
/// up. Commands that fail during the session only produce messages.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            write!(stdout, "{error}").ok();
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            write!(stderr, "{error}").ok();
            return ExitCode::FAILURE;
        }
    };

    match Shell::start(&cli).and_then(|shell| shell.serve(stdin, stdout)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(stderr, "{error}").ok();
            ExitCode::FAILURE
        }
    }
}
