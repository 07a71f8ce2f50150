//! Error type for the shell runtime.

use std::io;

use herald::command::RegistrationError;
use herald::dispatch::SetupError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("invalid configuration: {0}")]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to register shell commands: {0}")]
    Registration(#[from] RegistrationError),
    #[error("failed to read input: {0}")]
    ReadInput(io::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}
