//! Error types for dispatch and dispatcher setup.

use herald_config::ConfigError;
use thiserror::Error;

use crate::command::{CommandError, ResolutionError};
use crate::messages::{CatalogueError, MessageArgs, MessageKey};

/// A resolved command refused to run for this executor or input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The executor kind is not allowed to run the command.
    #[error("{command} cannot be run by this executor")]
    ContextMismatch {
        /// Command name.
        command: String,
    },

    /// The command is restricted to operators.
    #[error("{command} is restricted to operators")]
    OperatorOnly {
        /// Command name.
        command: String,
    },

    /// The executor lacks the command's permission node.
    #[error("{command} requires permission {node}")]
    PermissionDenied {
        /// Command name.
        command: String,
        /// Required permission node.
        node: String,
    },

    /// A supplied flag is not accepted by the command.
    #[error("unsupported flag -{flag}")]
    InvalidFlag {
        /// Offending flag.
        flag: char,
        /// Accepted flags.
        supported: String,
    },

    /// Fewer arguments than the command requires.
    #[error("expected at least {min} arguments, got {actual}")]
    TooFewArguments {
        /// Minimum count.
        min: usize,
        /// Supplied count.
        actual: usize,
        /// Usage text.
        usage: String,
    },

    /// More arguments than the command accepts.
    #[error("expected at most {max} arguments, got {actual}")]
    TooManyArguments {
        /// Maximum count.
        max: usize,
        /// Supplied count.
        actual: usize,
        /// Usage text.
        usage: String,
    },
}

/// Label sent in place of a node for operator-only refusals.
const OPERATOR_NODE: &str = "operator";

impl ValidationError {
    /// Message key and named arguments reported to the executor.
    #[must_use]
    pub fn message(&self) -> (MessageKey, MessageArgs) {
        match self {
            Self::ContextMismatch { command } => {
                (MessageKey::ContextMismatch, vec![("command", command.clone())])
            }
            Self::OperatorOnly { .. } => (
                MessageKey::PermissionDenied,
                vec![("node", OPERATOR_NODE.to_owned())],
            ),
            Self::PermissionDenied { node, .. } => {
                (MessageKey::PermissionDenied, vec![("node", node.clone())])
            }
            Self::InvalidFlag { flag, supported } => (
                MessageKey::FlagInvalid,
                vec![("flag", flag.to_string()), ("supported", supported.clone())],
            ),
            Self::TooFewArguments { min, usage, .. } => (
                MessageKey::ArgCountMin,
                vec![("min", min.to_string()), ("usage", usage.clone())],
            ),
            Self::TooManyArguments { max, usage, .. } => (
                MessageKey::ArgCountMax,
                vec![("max", max.to_string()), ("usage", usage.clone())],
            ),
        }
    }
}

/// A handler returned an error.
#[derive(Debug, Error)]
#[error("command '{command}' failed")]
pub struct ExecutionError {
    /// Command name.
    pub command: String,
    /// Whether a registered exception handler dealt with the error.
    pub handled: bool,
    /// Error returned by the handler.
    #[source]
    pub source: CommandError,
}

/// Why a line did not run to completion.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No command matched.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The command refused to run.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The handler failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl DispatchError {
    /// Message key and named arguments reported to the executor.
    #[must_use]
    pub fn message(&self) -> (MessageKey, MessageArgs) {
        match self {
            Self::Resolution(error) => (
                MessageKey::NotFound,
                vec![("command", error.subject().to_owned())],
            ),
            Self::Validation(error) => error.message(),
            Self::Execution(_) => (MessageKey::Exception, Vec::new()),
        }
    }
}

/// Errors raised while building a dispatcher from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The configuration is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A message override is invalid.
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
}
