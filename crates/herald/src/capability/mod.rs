//! Runtime capability negotiation between the engine and its host.
//!
//! A [`Capability`] names an optional behaviour together with its parameter
//! and result shape. Hosts register implementations per owner in a shared
//! [`CapabilityRegistry`]; the engine calls them through a
//! [`CapabilityProxy`] bound to that owner. Every proxy call is resolved
//! against the registry at call time, so implementations registered after a
//! proxy was handed out are picked up, and withdrawn ones stop being called.
//!
//! A call to a capability nobody registered returns
//! [`Availability::Unavailable`], which callers can tell apart from an
//! implementation that legitimately answered `false` or `None`.

mod host;

#[cfg(test)]
mod tests;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use tracing::debug;

pub use self::host::{HostCapabilities, Task, known};

/// Tracing target for capability negotiation.
pub(crate) const CAPABILITY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::capability");

/// Typed descriptor of an optional host behaviour.
///
/// `A` is the argument passed to the implementation and `R` its result.
/// Two capabilities with the same name but different shapes are distinct.
///
/// # Example
///
/// ```
/// use herald::capability::Capability;
///
/// const GREETING: Capability<String, String> = Capability::new("greeting");
/// assert_eq!(GREETING.name(), "greeting");
/// ```
pub struct Capability<A, R> {
    name: &'static str,
    shape: PhantomData<fn(A) -> R>,
}

impl<A, R> Capability<A, R> {
    /// Declares a capability called `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            shape: PhantomData,
        }
    }

    /// Capability name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<A, R> Clone for Capability<A, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, R> Copy for Capability<A, R> {}

impl<A, R> fmt::Debug for Capability<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.name).finish()
    }
}

impl<A: 'static, R: 'static> Capability<A, R> {
    fn key(&self) -> CapabilityKey {
        CapabilityKey {
            name: self.name,
            shape: TypeId::of::<fn(A) -> R>(),
        }
    }
}

/// Result of calling a capability through a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability<R> {
    /// An implementation was registered and returned this value.
    Available(R),
    /// No implementation is registered for the capability.
    Unavailable,
}

impl<R> Availability<R> {
    /// Returns `true` when an implementation answered.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Converts into an `Option`, losing the distinction from `None` results.
    #[must_use]
    pub fn available(self) -> Option<R> {
        match self {
            Self::Available(value) => Some(value),
            Self::Unavailable => None,
        }
    }

    /// Returns the answer, or `fallback` when unavailable.
    #[must_use]
    pub fn unwrap_or(self, fallback: R) -> R {
        self.available().unwrap_or(fallback)
    }
}

/// Identifies the object that supplies a set of capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerKey(String);

impl OwnerKey {
    /// Creates an owner key.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CapabilityKey {
    name: &'static str,
    shape: TypeId,
}

type Implementation<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;
type ErasedImplementation = Arc<dyn Any + Send + Sync>;

/// Shared table of capability implementations keyed by owner.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: RwLock<HashMap<OwnerKey, HashMap<CapabilityKey, ErasedImplementation>>>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poison| poison.into_inner());
        let mut owners: Vec<(&str, Vec<&str>)> = entries
            .iter()
            .map(|(owner, caps)| (owner.as_str(), caps.keys().map(|key| key.name).collect()))
            .collect();
        owners.sort_unstable();
        f.debug_struct("CapabilityRegistry")
            .field("owners", &owners)
            .finish()
    }
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `implementation` for `capability` on behalf of `owner`.
    ///
    /// A previous implementation for the same owner and capability is
    /// replaced; returns `true` when that happened.
    pub fn register<A, R, F>(
        &self,
        owner: &OwnerKey,
        capability: Capability<A, R>,
        implementation: F,
    ) -> bool
    where
        A: 'static,
        R: 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let typed: Implementation<A, R> = Arc::new(implementation);
        let erased: ErasedImplementation = Arc::new(typed);
        let replaced = self
            .entries
            .write()
            .unwrap_or_else(|poison| poison.into_inner())
            .entry(owner.clone())
            .or_default()
            .insert(capability.key(), erased)
            .is_some();
        debug!(
            target: CAPABILITY_TARGET,
            owner = owner.as_str(),
            capability = capability.name(),
            replaced,
            "capability registered"
        );
        replaced
    }

    /// Withdraws `capability` from `owner`. Returns `true` if it was present.
    pub fn unregister<A: 'static, R: 'static>(
        &self,
        owner: &OwnerKey,
        capability: Capability<A, R>,
    ) -> bool {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poison| poison.into_inner());
        let removed = entries
            .get_mut(owner)
            .and_then(|caps| caps.remove(&capability.key()))
            .is_some();
        if entries.get(owner).is_some_and(HashMap::is_empty) {
            entries.remove(owner);
        }
        removed
    }

    /// Withdraws every capability supplied by `owner`, returning how many.
    pub fn unregister_owner(&self, owner: &OwnerKey) -> usize {
        self.entries
            .write()
            .unwrap_or_else(|poison| poison.into_inner())
            .remove(owner)
            .map_or(0, |caps| caps.len())
    }

    /// Builds an untyped proxy bound to `owner`.
    #[must_use]
    pub fn proxy(self: &Arc<Self>, owner: OwnerKey) -> CapabilityProxy {
        CapabilityProxy {
            registry: Arc::clone(self),
            owner,
        }
    }

    /// Builds the typed interface `I` over a proxy bound to `owner`.
    #[must_use]
    pub fn create_proxy<I: CapabilityInterface>(self: &Arc<Self>, owner: OwnerKey) -> I {
        I::bind(self.proxy(owner))
    }

    fn lookup<A: 'static, R: 'static>(
        &self,
        owner: &OwnerKey,
        capability: Capability<A, R>,
    ) -> Option<Implementation<A, R>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poison| poison.into_inner());
        entries
            .get(owner)
            .and_then(|caps| caps.get(&capability.key()))
            .and_then(|erased| erased.downcast_ref::<Implementation<A, R>>())
            .cloned()
    }
}

/// Typed view over a [`CapabilityProxy`].
///
/// Implementors expose one method per capability they understand and leave
/// resolution to the proxy.
pub trait CapabilityInterface {
    /// Wraps `proxy`.
    fn bind(proxy: CapabilityProxy) -> Self;
}

/// Late-binding handle onto one owner's capabilities.
#[derive(Clone)]
pub struct CapabilityProxy {
    registry: Arc<CapabilityRegistry>,
    owner: OwnerKey,
}

impl fmt::Debug for CapabilityProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProxy")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl CapabilityInterface for CapabilityProxy {
    fn bind(proxy: CapabilityProxy) -> Self {
        proxy
    }
}

impl CapabilityProxy {
    /// Owner this proxy resolves against.
    #[must_use]
    pub const fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    /// Reports whether `capability` currently has an implementation.
    #[must_use]
    pub fn is_available<A: 'static, R: 'static>(&self, capability: Capability<A, R>) -> bool {
        self.registry.lookup(&self.owner, capability).is_some()
    }

    /// Calls `capability`, handing `args` back when it is unavailable.
    ///
    /// The registry lock is released before the implementation runs.
    ///
    /// # Errors
    ///
    /// Returns `Err(args)` when no implementation is registered.
    pub fn try_call<A: 'static, R: 'static>(
        &self,
        capability: Capability<A, R>,
        args: A,
    ) -> Result<R, A> {
        match self.registry.lookup(&self.owner, capability) {
            Some(implementation) => Ok(implementation(args)),
            None => Err(args),
        }
    }

    /// Calls `capability`, reporting [`Availability::Unavailable`] when no
    /// implementation is registered.
    pub fn call<A: 'static, R: 'static>(
        &self,
        capability: Capability<A, R>,
        args: A,
    ) -> Availability<R> {
        match self.try_call(capability, args) {
            Ok(result) => Availability::Available(result),
            Err(_) => Availability::Unavailable,
        }
    }
}
