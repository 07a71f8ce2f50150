//! Routing of handler failures and outgoing dispatcher messages.

use std::error::Error as StdError;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, error};

use super::DISPATCH_TARGET;
use crate::capability::HostCapabilities;
use crate::command::CommandContext;
use crate::executor::{Backend, Executor};
use crate::messages::{MessageCatalogue, MessageKey};

trait ErasedExceptionHandler: Send + Sync {
    fn try_handle(&self, error: &(dyn StdError + 'static), ctx: &CommandContext) -> bool;
    fn type_name(&self) -> &'static str;
}

struct Typed<E, F> {
    handle: F,
    error: PhantomData<fn(&E)>,
}

impl<E, F> ErasedExceptionHandler for Typed<E, F>
where
    E: StdError + 'static,
    F: Fn(&E, &CommandContext) + Send + Sync,
{
    fn try_handle(&self, error: &(dyn StdError + 'static), ctx: &CommandContext) -> bool {
        let mut cursor = Some(error);
        while let Some(candidate) = cursor {
            if let Some(typed) = candidate.downcast_ref::<E>() {
                (self.handle)(typed, ctx);
                return true;
            }
            cursor = candidate.source();
        }
        false
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }
}

/// Ordered chain of typed error handlers.
///
/// A handler matches when the failing error, or any error in its
/// `source()` chain, has the handler's type. The first registered match
/// wins. Panics raised by command handlers are not intercepted.
#[derive(Clone, Default)]
pub struct ExceptionHandlers {
    chain: Vec<Arc<dyn ErasedExceptionHandler>>,
}

impl fmt::Debug for ExceptionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.chain.iter().map(|handler| handler.type_name()).collect();
        f.debug_struct("ExceptionHandlers")
            .field("chain", &names)
            .finish()
    }
}

impl ExceptionHandlers {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler for errors of type `E`.
    pub fn register<E, F>(&mut self, handle: F)
    where
        E: StdError + 'static,
        F: Fn(&E, &CommandContext) + Send + Sync + 'static,
    {
        self.chain.push(Arc::new(Typed {
            handle,
            error: PhantomData::<fn(&E)>,
        }));
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns `true` when no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Offers `error` to each handler in order. Returns `true` once one
    /// accepts it.
    pub fn handle(&self, error: &(dyn StdError + 'static), ctx: &CommandContext) -> bool {
        self.chain
            .iter()
            .any(|handler| handler.try_handle(error, ctx))
    }
}

/// Everything needed to talk back to an executor, cheap to clone into
/// scheduled tasks.
#[derive(Clone)]
pub(crate) struct Responder {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) capabilities: HostCapabilities,
    pub(crate) catalogue: Arc<MessageCatalogue>,
    pub(crate) handlers: Arc<ExceptionHandlers>,
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("capabilities", &self.capabilities)
            .field("catalogue", &self.catalogue)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

impl Responder {
    /// Renders `key` in the executor's locale.
    pub(crate) fn render(
        &self,
        executor: &Executor,
        key: MessageKey,
        args: &[(&str, String)],
    ) -> String {
        let locale = self.capabilities.locale(executor);
        self.catalogue.translate(locale.as_deref(), key, args)
    }

    /// Sends `key` to `executor`.
    pub(crate) fn notify(&self, executor: &Executor, key: MessageKey, args: &[(&str, String)]) {
        let text = self.render(executor, key, args);
        self.backend.send_message(executor, &text);
    }

    /// Routes a handler failure through the exception chain, falling back
    /// to a logged error and the generic exception message. Returns whether
    /// a registered handler accepted it.
    pub(crate) fn route_failure(
        &self,
        command: &str,
        failure: &(dyn StdError + 'static),
        ctx: &CommandContext,
    ) -> bool {
        if self.handlers.handle(failure, ctx) {
            debug!(
                target: DISPATCH_TARGET,
                command,
                executor = ctx.executor().name(),
                error = %failure,
                "handler error routed to exception handler"
            );
            return true;
        }
        error!(
            target: DISPATCH_TARGET,
            command,
            executor = ctx.executor().name(),
            error = %failure,
            "unhandled command error"
        );
        self.notify(ctx.executor(), MessageKey::Exception, &[]);
        false
    }
}
