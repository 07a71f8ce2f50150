//! Command descriptions, invocation context and the command tree.
//!
//! A [`CommandSpec`] describes one command: its names, who may run it, the
//! flags and argument counts it accepts, optional parameter types and the
//! handler to call. Specs are registered into a [`CommandTree`], an arena of
//! tree levels where a spec may own a child level to implement
//! sub-commands.

mod context;
mod spec;
mod tree;

#[cfg(test)]
mod tests;

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

pub use self::context::{Arguments, CommandContext};
pub use self::spec::CommandSpec;
pub use self::tree::{CommandTree, ResolutionError, Resolved, SpecId, TreeId};

/// Error a handler may return. Its `source()` chain is consulted when
/// matching exception handlers.
pub type CommandError = Box<dyn StdError + Send + Sync + 'static>;

/// Command entry point.
pub type Handler = Arc<dyn Fn(&CommandContext) -> Result<(), CommandError> + Send + Sync>;

/// Reasons a command could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The command name is blank or contains a space.
    #[error("invalid command name '{name}'")]
    InvalidName {
        /// Offending name or alias.
        name: String,
    },

    /// A name or alias is already taken at this tree level.
    #[error("'{name}' is already registered at this level")]
    Duplicate {
        /// Colliding name or alias.
        name: String,
    },

    /// The minimum argument count exceeds the maximum.
    #[error("command '{command}' requires at least {min} but at most {max} arguments")]
    InvalidBounds {
        /// Command name.
        command: String,
        /// Minimum count.
        min: usize,
        /// Maximum count.
        max: usize,
    },

    /// The referenced tree does not exist.
    #[error("unknown command tree {tree}")]
    UnknownTree {
        /// Tree index.
        tree: usize,
    },

    /// The default command name is not registered at that tree level.
    #[error("default command '{name}' is not registered at this level")]
    UnknownDefault {
        /// Requested name.
        name: String,
    },

    /// The command has neither a handler nor sub-commands.
    #[error("command '{command}' has no handler and no sub-commands")]
    MissingHandler {
        /// Command name.
        command: String,
    },

    /// A declared parameter type has no registered converter.
    #[error("command '{command}' declares parameter type '{ty}' with no converter")]
    UnsupportedParameter {
        /// Command name.
        command: String,
        /// Parameter type.
        ty: String,
    },
}
