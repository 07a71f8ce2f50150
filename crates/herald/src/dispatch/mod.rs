//! The dispatcher: resolve, validate, convert, invoke, report.
//!
//! [`Dispatcher::dispatch`] takes one raw line typed by an executor and runs
//! it to completion on the calling thread, except for asynchronous commands
//! which are handed to the host scheduler. Resolution and validation
//! failures produce one translated message to the executor and a `false`
//! return; handler errors go through the exception-handler chain. Nothing
//! on these paths panics or propagates out of `dispatch`.
//!
//! Panics raised inside command handlers are not caught.

mod errors;
mod failure;
mod validate;


use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use herald_config::Config;
use tracing::{debug, warn};

use self::failure::Responder;
use crate::capability::{HostCapabilities, Task, known};
use crate::command::{
    Arguments, CommandContext, CommandSpec, CommandTree, Handler, RegistrationError,
    ResolutionError, TreeId,
};
use crate::convert::ConverterRegistry;
use crate::executor::{Backend, Executor};
use crate::messages::{MessageCatalogue, MessageKey};
use crate::session::SessionStore;
use crate::tokenizer::Tokenizer;

pub use self::errors::{DispatchError, ExecutionError, SetupError, ValidationError};
pub use self::failure::ExceptionHandlers;

/// Tracing target for dispatch.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// How a successful dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// The handler ran on the calling thread and succeeded.
    Completed,
    /// The handler was submitted to the host scheduler.
    Scheduled,
}

/// Command dispatch engine.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use herald::capability::{CapabilityRegistry, HostCapabilities, OwnerKey};
/// use herald::command::CommandSpec;
/// use herald::{Backend, Dispatcher, Executor};
///
/// struct Quiet;
///
/// impl Backend for Quiet {
///     fn send_message(&self, _executor: &Executor, _text: &str) {}
///     fn find_executor(&self, _name: &str) -> Option<Executor> {
///         None
///     }
/// }
///
/// let registry = Arc::new(CapabilityRegistry::new());
/// let capabilities: HostCapabilities = registry.create_proxy(OwnerKey::new("host"));
/// let mut dispatcher = Dispatcher::new(Arc::new(Quiet), capabilities);
/// dispatcher
///     .register_command(CommandSpec::new("ping").handler(|ctx| {
///         ctx.reply("pong");
///         Ok(())
///     }))
///     .expect("register ping");
///
/// assert!(dispatcher.dispatch(&Executor::console(), "ping"));
/// assert!(!dispatcher.dispatch(&Executor::console(), "pong"));
/// ```
pub struct Dispatcher {
    tree: CommandTree,
    converters: ConverterRegistry,
    tokenizer: Tokenizer,
    sessions: Arc<SessionStore>,
    responder: Responder,
    permission_fallback_warned: AtomicBool,
    scheduler_fallback_warned: AtomicBool,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tree", &self.tree)
            .field("converters", &self.converters)
            .field("tokenizer", &self.tokenizer)
            .field("sessions", &self.sessions)
            .field("responder", &self.responder)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with default tokenizer, converters and messages.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, capabilities: HostCapabilities) -> Self {
        Self {
            tree: CommandTree::new(),
            converters: ConverterRegistry::new(),
            tokenizer: Tokenizer::default(),
            sessions: Arc::new(SessionStore::new()),
            responder: Responder {
                backend,
                capabilities,
                catalogue: Arc::new(MessageCatalogue::new(herald_config::DEFAULT_LOCALE)),
                handlers: Arc::new(ExceptionHandlers::new()),
            },
            permission_fallback_warned: AtomicBool::new(false),
            scheduler_fallback_warned: AtomicBool::new(false),
        }
    }

    /// Creates a dispatcher configured by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when the configuration is inconsistent or a
    /// message override is invalid.
    pub fn from_config(
        config: &Config,
        backend: Arc<dyn Backend>,
        capabilities: HostCapabilities,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        let catalogue = MessageCatalogue::from_config(config)?;
        let sessions = SessionStore::new().with_default_ttl(config.session_ttl());
        Ok(Self::new(backend, capabilities)
            .with_tokenizer(Tokenizer::from_config(config))
            .with_catalogue(catalogue)
            .with_sessions(Arc::new(sessions)))
    }

    /// Replaces the tokenizer.
    #[must_use]
    pub const fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Replaces the message catalogue.
    #[must_use]
    pub fn with_catalogue(mut self, catalogue: MessageCatalogue) -> Self {
        self.responder.catalogue = Arc::new(catalogue);
        self
    }

    /// Replaces the session store.
    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Converter registry, for registering custom parameter types.
    pub const fn converters_mut(&mut self) -> &mut ConverterRegistry {
        &mut self.converters
    }

    /// Exception-handler chain.
    pub fn exception_handlers_mut(&mut self) -> &mut ExceptionHandlers {
        Arc::make_mut(&mut self.responder.handlers)
    }

    /// Appends a handler for handler errors of type `E`.
    pub fn register_exception_handler<E, F>(&mut self, handle: F)
    where
        E: std::error::Error + 'static,
        F: Fn(&E, &CommandContext) + Send + Sync + 'static,
    {
        self.exception_handlers_mut().register::<E, F>(handle);
    }

    /// Message catalogue.
    #[must_use]
    pub fn catalogue(&self) -> &MessageCatalogue {
        &self.responder.catalogue
    }

    /// Session store handed to handlers.
    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Host capabilities the dispatcher consults.
    #[must_use]
    pub const fn capabilities(&self) -> &HostCapabilities {
        &self.responder.capabilities
    }

    /// Registered command tree.
    #[must_use]
    pub const fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// Top-level commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandSpec> {
        self.tree.commands(TreeId::ROOT)
    }

    /// Registers a top-level command.
    ///
    /// # Errors
    ///
    /// See [`Self::register_in`].
    pub fn register_command(&mut self, spec: CommandSpec) -> Result<(), RegistrationError> {
        self.register_in(TreeId::ROOT, spec)
    }

    /// Adds an empty level for sub-commands.
    pub fn create_child_tree(&mut self) -> TreeId {
        self.tree.create_child()
    }

    /// Registers `spec` at level `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when a name collides, the bounds are
    /// inverted, a tree is unknown, the spec has nothing to run, or a
    /// parameter type has no converter.
    pub fn register_in(
        &mut self,
        tree: TreeId,
        spec: CommandSpec,
    ) -> Result<(), RegistrationError> {
        if let Some(ty) = spec
            .param_types()
            .into_iter()
            .flatten()
            .find(|ty| !self.converters.is_supported(ty))
        {
            return Err(RegistrationError::UnsupportedParameter {
                command: spec.name().to_owned(),
                ty: ty.to_string(),
            });
        }
        let name = spec.name().to_owned();
        self.tree.register(tree, spec)?;
        debug!(target: DISPATCH_TARGET, command = name.as_str(), %tree, "command registered");
        Ok(())
    }

    /// Runs the command called `name` when input ends at level `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::UnknownDefault`] when `name` is not
    /// registered at that level.
    pub fn set_default_command(
        &mut self,
        tree: TreeId,
        name: &str,
    ) -> Result<(), RegistrationError> {
        self.tree.set_default(tree, name)
    }

    /// Runs `line` for `executor`.
    ///
    /// Returns `true` when the handler succeeded or was handed to the
    /// scheduler.
    #[must_use]
    pub fn dispatch(&self, executor: &Executor, line: &str) -> bool {
        self.try_dispatch(executor, line).is_ok()
    }

    /// Runs `line` for `executor`, reporting how it ended.
    ///
    /// Messages are sent to the executor exactly as for [`Self::dispatch`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when resolution, validation or the handler
    /// failed.
    pub fn try_dispatch(
        &self,
        executor: &Executor,
        line: &str,
    ) -> Result<Dispatched, DispatchError> {
        let outcome = self.run(executor, line);
        match &outcome {
            Ok(dispatched) => debug!(
                target: DISPATCH_TARGET,
                executor = executor.name(),
                line,
                ?dispatched,
                "dispatched"
            ),
            Err(DispatchError::Execution(_)) => {}
            Err(error) => {
                debug!(
                    target: DISPATCH_TARGET,
                    executor = executor.name(),
                    line,
                    %error,
                    "dispatch refused"
                );
                let (key, args) = error.message();
                self.responder.notify(executor, key, &args);
            }
        }
        outcome
    }

    fn run(&self, executor: &Executor, line: &str) -> Result<Dispatched, DispatchError> {
        let (words, flags) = self.split_line(line);
        let resolved = self.tree.resolve(&words)?;
        let label = resolved.label.to_owned();
        let consumed = resolved.consumed;
        let spec = self
            .tree
            .spec(resolved.spec)
            .ok_or_else(|| DispatchError::Resolution(not_found(&label)))?;
        let handler = spec
            .handler_ref()
            .ok_or_else(|| DispatchError::Resolution(not_found(&label)))?;

        validate::check_context(spec, executor)?;
        validate::check_operator(spec, executor, self.responder.backend.as_ref())?;
        self.check_permission(spec, executor)?;

        let tokens: Vec<String> = words.into_iter().skip(consumed).collect();
        validate::check_flags(spec, &flags)?;
        validate::check_arg_count(spec, tokens.len())?;

        let arguments = match spec.param_types() {
            Some(params) => Arguments::Typed(self.converters.convert_all(
                &tokens,
                params,
                executor,
                self.responder.backend.as_ref(),
            )),
            None => Arguments::Raw(tokens),
        };
        let ctx = CommandContext::new(
            executor.clone(),
            label,
            flags,
            arguments,
            Arc::clone(&self.sessions),
            Arc::clone(&self.responder.backend),
        );

        if spec.is_async()
            && let Some(dispatched) = self.schedule(spec.name(), handler, &ctx)
        {
            return Ok(dispatched);
        }
        self.invoke(spec.name(), handler, &ctx)
    }

    /// Splits `line` into the root label followed by its argument tokens,
    /// plus the flag string. Flags come from a leading `-xyz` token right
    /// after the root label.
    fn split_line(&self, line: &str) -> (Vec<String>, String) {
        let Some((label, rest)) = self.tokenizer.split_label(line) else {
            return (Vec::new(), String::new());
        };
        let (flags, tokens) = self
            .tokenizer
            .split(rest.trim_start_matches(' '))
            .into_parts();
        (std::iter::once(label).chain(tokens).collect(), flags)
    }

    fn invoke(
        &self,
        command: &str,
        handler: &Handler,
        ctx: &CommandContext,
    ) -> Result<Dispatched, DispatchError> {
        handler(ctx).map(|()| Dispatched::Completed).map_err(|source| {
            let handled = self.responder.route_failure(command, &*source, ctx);
            DispatchError::Execution(ExecutionError {
                command: command.to_owned(),
                handled,
                source,
            })
        })
    }

    /// Hands the handler to the scheduler. Returns `None` when no scheduler
    /// is available and the caller should run it inline.
    fn schedule(
        &self,
        command: &str,
        handler: &Handler,
        ctx: &CommandContext,
    ) -> Option<Dispatched> {
        let capabilities = &self.responder.capabilities;
        if !capabilities.proxy().is_available(known::SCHEDULE_ASYNC) {
            self.warn_no_scheduler();
            return None;
        }

        let responder = self.responder.clone();
        let task_handler = Arc::clone(handler);
        let task_ctx = ctx.clone();
        let name = command.to_owned();
        let task: Task = Box::new(move || {
            if let Err(source) = task_handler(&task_ctx) {
                responder.route_failure(&name, &*source, &task_ctx);
            }
        });

        match capabilities.schedule_async(task) {
            Ok(()) => Some(Dispatched::Scheduled),
            Err(task) => {
                // Scheduler withdrawn since the availability check; the task reports its
                // own failures.
                self.warn_no_scheduler();
                task();
                Some(Dispatched::Completed)
            }
        }
    }

    fn warn_no_scheduler(&self) {
        if !self.scheduler_fallback_warned.swap(true, Ordering::Relaxed) {
            let text = self
                .responder
                .catalogue
                .translate(None, MessageKey::NoSchedulerWarning, &[]);
            warn!(target: DISPATCH_TARGET, "{text}");
        }
    }

    fn check_permission(
        &self,
        spec: &CommandSpec,
        executor: &Executor,
    ) -> Result<(), ValidationError> {
        let Some(node) = spec.permission_node() else {
            return Ok(());
        };
        let capabilities = &self.responder.capabilities;
        let answer = if capabilities.permissions_supported() {
            capabilities.has_permission(executor, node).available()
        } else {
            None
        };
        let allowed = answer.unwrap_or_else(|| {
            if !self.permission_fallback_warned.swap(true, Ordering::Relaxed) {
                warn!(
                    target: DISPATCH_TARGET,
                    node,
                    "host reports no permission support; falling back to operator status"
                );
            }
            self.responder.backend.is_operator(executor)
        });
        if allowed {
            Ok(())
        } else {
            Err(ValidationError::PermissionDenied {
                command: spec.name().to_owned(),
                node: node.to_owned(),
            })
        }
    }
}

fn not_found(word: &str) -> ResolutionError {
    ResolutionError::NotFound {
        path: String::new(),
        word: word.to_owned(),
    }
}
