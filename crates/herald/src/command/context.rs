//! Everything a handler sees about one invocation.

use std::fmt;
use std::sync::Arc;

use crate::convert::Value;
use crate::executor::{Backend, Executor};
use crate::session::{HistoryLog, Session, SessionState, SessionStore};

/// Arguments handed to a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// Tokens as typed, for commands without parameter types.
    Raw(Vec<String>),
    /// Converted values. A `None` marks a token that failed to convert.
    Typed(Vec<Option<Value>>),
}

impl Arguments {
    /// Number of arguments supplied.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Raw(tokens) => tokens.len(),
            Self::Typed(values) => values.len(),
        }
    }

    /// Returns `true` when no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw tokens, for untyped commands.
    #[must_use]
    pub fn raw(&self) -> Option<&[String]> {
        match self {
            Self::Raw(tokens) => Some(tokens),
            Self::Typed(_) => None,
        }
    }

    /// Converted values, for typed commands.
    #[must_use]
    pub fn typed(&self) -> Option<&[Option<Value>]> {
        match self {
            Self::Raw(_) => None,
            Self::Typed(values) => Some(values),
        }
    }

    /// Raw token at `index`.
    #[must_use]
    pub fn text(&self, index: usize) -> Option<&str> {
        self.raw()?.get(index).map(String::as_str)
    }

    /// Converted value at `index`. `None` for missing or failed positions.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.typed()?.get(index)?.as_ref()
    }
}

/// Invocation context passed to handlers.
///
/// The context owns everything it refers to so asynchronous handlers can
/// carry it to another thread.
#[derive(Clone)]
pub struct CommandContext {
    executor: Executor,
    label: String,
    flags: String,
    arguments: Arguments,
    sessions: Arc<SessionStore>,
    backend: Arc<dyn Backend>,
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("executor", &self.executor)
            .field("label", &self.label)
            .field("flags", &self.flags)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

impl CommandContext {
    /// Assembles a context.
    pub fn new(
        executor: Executor,
        label: impl Into<String>,
        flags: impl Into<String>,
        arguments: Arguments,
        sessions: Arc<SessionStore>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            executor,
            label: label.into(),
            flags: flags.into(),
            arguments,
            sessions,
            backend,
        }
    }

    /// Identity the command runs for.
    #[must_use]
    pub const fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Name or alias the command was invoked with.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Flag characters supplied, deduplicated.
    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Returns `true` when `flag` was supplied.
    #[must_use]
    pub fn has_flag(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }

    /// Supplied arguments.
    #[must_use]
    pub const fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Host backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Sends `text` to the executor.
    pub fn reply(&self, text: &str) {
        self.backend.send_message(&self.executor, text);
    }

    /// Session store shared by the dispatcher.
    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// The executor's session of kind `S`.
    #[must_use]
    pub fn session<S: SessionState>(&self) -> Arc<Session<S>> {
        self.sessions.get_session::<S>(&self.executor)
    }

    /// The executor's undo/redo history.
    #[must_use]
    pub fn history(&self) -> Arc<HistoryLog> {
        self.session()
    }
}
