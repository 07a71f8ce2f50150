//! Per-executor state slots with inactivity expiry.
//!
//! A [`SessionStore`] keeps one slot map per player-like executor (keyed by
//! display name) and a single shared slot map for every console-like
//! executor. Each slot holds a [`Session`] of one [`SessionState`] type,
//! identified by the type's tag. Sessions are created lazily, have their
//! access time refreshed on every lookup, and are replaced by a fresh
//! session once they are observed to have expired.

mod history;

#[cfg(test)]
mod tests;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::executor::Executor;

pub use self::history::{Action, FnAction, History, HistoryLog};

/// Tracing target for session bookkeeping.
pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Errors raised by session mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session expired and can no longer be refreshed or reconfigured.
    #[error("session '{tag}' has expired")]
    Expired {
        /// Type tag of the expired session.
        tag: &'static str,
    },
}

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// State kept in a session slot.
pub trait SessionState: Default + Send + 'static {
    /// Tag distinguishing this state kind within an owner's slots.
    const TYPE_TAG: &'static str;

    /// Inactivity lifetime for new sessions of this kind.
    ///
    /// `None` defers to the store's default; `Some(Duration::ZERO)` never
    /// expires.
    fn expire_ttl() -> Option<Duration> {
        None
    }
}

#[derive(Debug)]
struct Expiry {
    last_access: Instant,
    ttl: Duration,
    expired: bool,
}

/// One owner's state of kind `S`, with expiry bookkeeping.
pub struct Session<S> {
    clock: Arc<dyn Clock>,
    expiry: Mutex<Expiry>,
    state: Mutex<S>,
}

impl<S: SessionState> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("tag", &S::TYPE_TAG)
            .field("expiry", &*self.expiry())
            .finish_non_exhaustive()
    }
}

impl<S: SessionState> Session<S> {
    /// Creates a session whose access time is now.
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let last_access = clock.now();
        Self {
            clock,
            expiry: Mutex::new(Expiry {
                last_access,
                ttl,
                expired: false,
            }),
            state: Mutex::new(S::default()),
        }
    }

    /// Tag of the state kind this session holds.
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        S::TYPE_TAG
    }

    fn expiry(&self) -> MutexGuard<'_, Expiry> {
        self.expiry
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Reports whether the session has expired.
    ///
    /// A session expires when [`Self::expire`] was called or, with a
    /// non-zero TTL, when more than the TTL has passed since the last
    /// access. Once observed, expiry is permanent.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let mut expiry = self.expiry();
        if !expiry.expired && !expiry.ttl.is_zero() {
            let idle = self.clock.now().saturating_duration_since(expiry.last_access);
            expiry.expired = idle > expiry.ttl;
        }
        expiry.expired
    }

    /// Marks the session as expired.
    pub fn expire(&self) {
        self.expiry().expired = true;
    }

    /// Records an access now.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Expired`] if the session already expired.
    pub fn update_access_time(&self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.expiry().last_access = self.clock.now();
        Ok(())
    }

    /// Changes the inactivity lifetime. Zero disables expiry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Expired`] if the session already expired.
    pub fn set_expire_ttl(&self, ttl: Duration) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.expiry().ttl = ttl;
        Ok(())
    }

    /// Current inactivity lifetime.
    #[must_use]
    pub fn expire_ttl(&self) -> Duration {
        self.expiry().ttl
    }

    /// Instant of the last recorded access.
    #[must_use]
    pub fn last_access(&self) -> Instant {
        self.expiry().last_access
    }

    /// Locks the session state.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Runs `f` with exclusive access to the state.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        f(&mut self.lock())
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.is_expired() {
            Err(SessionError::Expired { tag: S::TYPE_TAG })
        } else {
            Ok(())
        }
    }
}

/// Type-erased view of a session used for bookkeeping across kinds.
trait StoredSession: Send + Sync {
    fn is_expired(&self) -> bool;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<S: SessionState> StoredSession for Session<S> {
    fn is_expired(&self) -> bool {
        Self::is_expired(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

type Slots = HashMap<&'static str, Arc<dyn StoredSession>>;
type SharedSlots = Arc<Mutex<Slots>>;

fn lock_slots(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Per-owner session slots.
///
/// # Example
///
/// ```
/// use herald::Executor;
/// use herald::session::{SessionState, SessionStore};
///
/// #[derive(Default)]
/// struct Counter(u32);
///
/// impl SessionState for Counter {
///     const TYPE_TAG: &'static str = "counter";
/// }
///
/// let store = SessionStore::new();
/// let alice = Executor::player("alice");
/// store.get_session::<Counter>(&alice).with_state(|c| c.0 += 1);
/// assert_eq!(store.get_session::<Counter>(&alice).lock().0, 1);
/// ```
pub struct SessionStore {
    players: RwLock<HashMap<String, SharedSlots>>,
    console: SharedSlots,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let players = self
            .players
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .len();
        f.debug_struct("SessionStore")
            .field("players", &players)
            .field("default_ttl", &self.default_ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a store using the system clock and no default expiry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), Duration::ZERO)
    }

    /// Creates a store with an explicit clock and default TTL.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            console: Arc::default(),
            clock,
            default_ttl,
        }
    }

    /// Sets the TTL applied to kinds that do not declare their own.
    #[must_use]
    pub fn with_default_ttl(mut self, default_ttl: Duration) -> Self {
        self.default_ttl = default_ttl;
        self
    }

    /// TTL applied to kinds that do not declare their own.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn slots_for(&self, owner: &Executor) -> SharedSlots {
        if owner.is_console() {
            return Arc::clone(&self.console);
        }
        let existing = self
            .players
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .get(owner.name())
            .cloned();
        existing.unwrap_or_else(|| {
            Arc::clone(
                self.players
                    .write()
                    .unwrap_or_else(|poison| poison.into_inner())
                    .entry(owner.name().to_owned())
                    .or_default(),
            )
        })
    }

    /// Returns `owner`'s session of kind `S`.
    ///
    /// A live session has its access time refreshed. A missing or expired
    /// one is replaced by a fresh session.
    #[must_use]
    pub fn get_session<S: SessionState>(&self, owner: &Executor) -> Arc<Session<S>> {
        let shared = self.slots_for(owner);
        let mut slots = lock_slots(&shared);

        let live = slots
            .get(S::TYPE_TAG)
            .filter(|stored| !stored.is_expired())
            .and_then(|stored| Arc::clone(stored).into_any().downcast::<Session<S>>().ok());
        if let Some(session) = live
            && session.update_access_time().is_ok()
        {
            return session;
        }

        let ttl = S::expire_ttl().unwrap_or(self.default_ttl);
        let session = Arc::new(Session::<S>::new(Arc::clone(&self.clock), ttl));
        let stored: Arc<dyn StoredSession> = Arc::clone(&session) as Arc<dyn StoredSession>;
        slots.insert(S::TYPE_TAG, stored);
        debug!(
            target: SESSION_TARGET,
            owner = owner.name(),
            tag = S::TYPE_TAG,
            ttl_secs = ttl.as_secs(),
            "session created"
        );
        session
    }

    /// Drops every session held for `owner`. Returns `true` if any existed.
    pub fn forget(&self, owner: &Executor) -> bool {
        if owner.is_console() {
            let mut slots = lock_slots(&self.console);
            let had_any = !slots.is_empty();
            slots.clear();
            return had_any;
        }
        self.players
            .write()
            .unwrap_or_else(|poison| poison.into_inner())
            .remove(owner.name())
            .is_some_and(|slots| !lock_slots(&slots).is_empty())
    }

    /// Evicts every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut removed = purge_slots(&self.console);
        let mut players = self
            .players
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        players.retain(|_, slots| {
            removed += purge_slots(slots);
            !lock_slots(slots).is_empty()
        });
        if removed > 0 {
            debug!(target: SESSION_TARGET, removed, "expired sessions purged");
        }
        removed
    }
}

fn purge_slots(shared: &Mutex<Slots>) -> usize {
    let mut slots = lock_slots(shared);
    let before = slots.len();
    slots.retain(|_, stored| !stored.is_expired());
    before - slots.len()
}
