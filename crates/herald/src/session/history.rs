//! Undo/redo history kept as a session state.
//!
//! Entries form a doubly linked chain starting at a sentinel root that holds
//! no action. The chain from the root to the current entry is the undo
//! stack; entries after the current one are the redo stack. Executing a new
//! action discards the redo stack.
//!
//! Pointer updates happen under the session lock. Action effects run after
//! the lock is released, so effects of concurrent calls for one owner may
//! interleave out of pointer order.

use std::fmt;
use std::sync::Arc;

use super::{Session, SessionState};

/// A reversible effect.
pub trait Action: Send + Sync {
    /// Reverts the effect.
    fn undo(&self);

    /// Re-applies the effect after an undo.
    fn redo(&self);

    /// Applies the effect the first time. Defaults to [`Self::redo`].
    fn first_run(&self) {
        self.redo();
    }
}

/// [`Action`] built from a pair of closures.
pub struct FnAction<U, R> {
    undo: U,
    redo: R,
}

impl<U, R> FnAction<U, R>
where
    U: Fn() + Send + Sync,
    R: Fn() + Send + Sync,
{
    /// Creates an action from its undo and redo effects.
    pub const fn new(undo: U, redo: R) -> Self {
        Self { undo, redo }
    }
}

impl<U, R> fmt::Debug for FnAction<U, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction").finish_non_exhaustive()
    }
}

impl<U, R> Action for FnAction<U, R>
where
    U: Fn() + Send + Sync,
    R: Fn() + Send + Sync,
{
    fn undo(&self) {
        (self.undo)();
    }

    fn redo(&self) {
        (self.redo)();
    }
}

const ROOT: usize = 0;

struct Entry {
    action: Option<Arc<dyn Action>>,
    previous: Option<usize>,
    next: Option<usize>,
}

impl Entry {
    const fn root() -> Self {
        Self {
            action: None,
            previous: None,
            next: None,
        }
    }
}

/// Linked chain of executed actions.
pub struct History {
    entries: Vec<Entry>,
    current: usize,
}

impl Default for History {
    fn default() -> Self {
        Self {
            entries: vec![Entry::root()],
            current: ROOT,
        }
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("len", &self.len())
            .field("current", &self.current)
            .finish()
    }
}

impl SessionState for History {
    const TYPE_TAG: &'static str = "history";
}

impl History {
    fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Number of recorded actions, including undone ones still redoable.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    /// Returns `true` when no action has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` unless the pointer sits at the root.
    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.current != ROOT
    }

    /// Returns `true` when an undone action can be re-applied.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.entry(self.current)
            .is_some_and(|entry| entry.next.is_some())
    }

    /// Appends `action` after the current entry, dropping the redo chain.
    fn push(&mut self, action: Arc<dyn Action>) {
        let index = self.current + 1;
        self.entries.truncate(index);
        self.entries.push(Entry {
            action: Some(action),
            previous: Some(self.current),
            next: None,
        });
        if let Some(current) = self.entries.get_mut(self.current) {
            current.next = Some(index);
        }
        self.current = index;
    }

    /// Steps back, returning the action to revert.
    fn step_back(&mut self) -> Option<Arc<dyn Action>> {
        let entry = self.entry(self.current)?;
        let previous = entry.previous?;
        let action = entry.action.clone()?;
        self.current = previous;
        Some(action)
    }

    /// Steps forward, returning the action to re-apply.
    fn step_forward(&mut self) -> Option<Arc<dyn Action>> {
        let next = self.entry(self.current)?.next?;
        let action = self.entry(next)?.action.clone()?;
        self.current = next;
        Some(action)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Session holding an owner's undo/redo history.
pub type HistoryLog = Session<History>;

impl Session<History> {
    /// Records `action` and runs its first-run effect.
    pub fn execute(&self, action: impl Action + 'static) {
        let shared: Arc<dyn Action> = Arc::new(action);
        self.lock().push(Arc::clone(&shared));
        shared.first_run();
    }

    /// Reverts the current action. Returns `false` at the root.
    pub fn undo(&self) -> bool {
        let action = self.lock().step_back();
        action.is_some_and(|reverted| {
            reverted.undo();
            true
        })
    }

    /// Re-applies the next undone action. Returns `false` when none exists.
    pub fn redo(&self) -> bool {
        let action = self.lock().step_forward();
        action.is_some_and(|reapplied| {
            reapplied.redo();
            true
        })
    }

    /// Returns `true` when [`Self::undo`] would revert something.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.lock().can_undo()
    }

    /// Returns `true` when [`Self::redo`] would re-apply something.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.lock().can_redo()
    }

    /// Discards every entry without running any effect.
    pub fn clear(&self) {
        self.lock().reset();
    }

    /// Number of recorded actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
