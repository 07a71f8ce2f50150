//! Herald: a host-agnostic command dispatch engine.
//!
//! Hosts feed raw lines typed by an [`Executor`] into a [`Dispatcher`],
//! which resolves the command path against a tree of
//! [`command::CommandSpec`]s, tokenizes the remaining text into flags and
//! arguments, validates the invocation, converts typed parameters and runs
//! the handler. The host supplies message delivery through the [`Backend`]
//! trait and may register optional features (permissions, scheduling,
//! locale) at run time through the [`capability`] registry. Handlers keep
//! per-executor state, including an undo/redo history, in the
//! [`session`] store.

pub mod capability;
pub mod command;
pub mod convert;
pub mod dispatch;
mod executor;
pub mod messages;
pub mod session;
mod tokenizer;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod tests;

pub use self::dispatch::{DispatchError, Dispatched, Dispatcher};
pub use self::executor::{Backend, CONSOLE_NAME, Executor, ExecutorKind};
pub use self::tokenizer::{TokenizedLine, Tokenizer, split, split_plain};
