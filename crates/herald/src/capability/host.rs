//! Well-known host capabilities consumed by the dispatcher.

use crate::executor::Executor;

use super::{Availability, CapabilityInterface, CapabilityProxy};

/// Unit of work handed to an asynchronous scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Capabilities the dispatcher knows how to use.
pub mod known {
    use super::{Executor, Task};
    use crate::capability::Capability;

    /// Existence marker: registered only by hosts that check permissions.
    pub const PERMISSIONS: Capability<(), ()> = Capability::new("permissions");

    /// Answers whether an executor holds a permission node.
    pub const HAS_PERMISSION: Capability<(Executor, String), bool> =
        Capability::new("has-permission");

    /// Runs a task off the calling thread without waiting for it.
    pub const SCHEDULE_ASYNC: Capability<Task, ()> = Capability::new("schedule-async");

    /// Reports the preferred locale of an executor.
    pub const LOCALE: Capability<Executor, Option<String>> = Capability::new("locale");
}

/// Typed view of the optional behaviours a host may provide.
///
/// Each method resolves its capability when called, so a host may register
/// features after the dispatcher has been built.
#[derive(Debug, Clone)]
pub struct HostCapabilities {
    proxy: CapabilityProxy,
}

impl CapabilityInterface for HostCapabilities {
    fn bind(proxy: CapabilityProxy) -> Self {
        Self { proxy }
    }
}

impl HostCapabilities {
    /// Underlying proxy.
    #[must_use]
    pub const fn proxy(&self) -> &CapabilityProxy {
        &self.proxy
    }

    /// Reports whether the host checks permissions at all.
    #[must_use]
    pub fn permissions_supported(&self) -> bool {
        self.proxy.call(known::PERMISSIONS, ()).is_available()
    }

    /// Asks the host whether `executor` holds `node`.
    ///
    /// Only meaningful when [`Self::permissions_supported`] is `true`.
    pub fn has_permission(&self, executor: &Executor, node: &str) -> Availability<bool> {
        self.proxy
            .call(known::HAS_PERMISSION, (executor.clone(), node.to_owned()))
    }

    /// Submits `task` to the host scheduler.
    ///
    /// # Errors
    ///
    /// Returns the task unchanged when no scheduler is registered so the
    /// caller can run it itself.
    pub fn schedule_async(&self, task: Task) -> Result<(), Task> {
        self.proxy.try_call(known::SCHEDULE_ASYNC, task)
    }

    /// Locale reported for `executor`, when the host provides one.
    #[must_use]
    pub fn locale(&self, executor: &Executor) -> Option<String> {
        self.proxy
            .call(known::LOCALE, executor.clone())
            .available()
            .flatten()
    }
}
