//! Executor identities and the host backend collaborator.
//!
//! An [`Executor`] is the identity a command runs on behalf of. Player-like
//! executors carry a stable display name that keys their sessions; every
//! console-like executor shares a single identity slot. The [`Backend`]
//! trait is the only hard dependency the engine takes on its host: message
//! delivery, operator status and name lookup. Everything optional goes
//! through capabilities instead.

use std::fmt;

/// Display name reported by console-like executors.
pub const CONSOLE_NAME: &str = "console";

/// Broad category of an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorKind {
    /// A named, player-like identity.
    Player,
    /// The host console or another unnamed system identity.
    Console,
}

/// Identity a command is dispatched for.
///
/// # Example
///
/// ```
/// use herald::Executor;
///
/// let alice = Executor::player("alice").with_operator(true);
/// assert!(alice.is_player());
/// assert!(alice.is_operator());
/// assert_eq!(Executor::console().name(), "console");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Executor {
    name: String,
    kind: ExecutorKind,
    operator: bool,
}

impl Executor {
    /// Creates a player-like executor with the given stable name.
    #[must_use]
    pub fn player(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ExecutorKind::Player,
            operator: false,
        }
    }

    /// Creates the console identity. Console executors are operators.
    #[must_use]
    pub fn console() -> Self {
        Self {
            name: CONSOLE_NAME.to_owned(),
            kind: ExecutorKind::Console,
            operator: true,
        }
    }

    /// Returns a copy with the operator flag set to `operator`.
    #[must_use]
    pub fn with_operator(mut self, operator: bool) -> Self {
        self.operator = operator;
        self
    }

    /// Stable display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executor category.
    #[must_use]
    pub const fn kind(&self) -> ExecutorKind {
        self.kind
    }

    /// Returns `true` for player-like executors.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self.kind, ExecutorKind::Player)
    }

    /// Returns `true` for console-like executors.
    #[must_use]
    pub const fn is_console(&self) -> bool {
        matches!(self.kind, ExecutorKind::Console)
    }

    /// Operator flag carried by the identity itself.
    #[must_use]
    pub const fn is_operator(&self) -> bool {
        self.operator
    }
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Host services the dispatcher requires on every invocation.
///
/// Implementations must be shareable across threads because asynchronous
/// commands reply from scheduler threads.
pub trait Backend: Send + Sync {
    /// Delivers `text` to `executor`.
    fn send_message(&self, executor: &Executor, text: &str);

    /// Reports whether `executor` has operator rights.
    ///
    /// The default trusts the flag carried by the identity.
    fn is_operator(&self, executor: &Executor) -> bool {
        executor.is_operator()
    }

    /// Looks up an online executor by display name.
    fn find_executor(&self, name: &str) -> Option<Executor>;
}
