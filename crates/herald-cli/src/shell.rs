//! The read-dispatch-print loop.

use std::io::{BufRead, Write};
use std::sync::Arc;

use herald::capability::{CapabilityRegistry, OwnerKey};
use herald::dispatch::SetupError;
use herald::{Dispatcher, Executor};
use tracing::info;

use crate::backend::{self, ShellBackend, ThreadScheduler};
use crate::cli::Cli;
use crate::commands;
use crate::errors::AppError;
use crate::telemetry;

const SHELL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shell");

/// Owner key under which the shell registers its capabilities.
const HOST_OWNER: &str = "herald-shell";

/// Lines that end the session.
const EXIT_WORDS: &[&str] = &["exit", "quit"];

/// Counters reported when a session ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) dispatched: usize,
    pub(crate) failed: usize,
}

pub(crate) struct Shell {
    executor: Executor,
    backend: Arc<ShellBackend>,
    scheduler: Option<Arc<ThreadScheduler>>,
    dispatcher: Dispatcher,
}

impl Shell {
    /// Validates the flags, installs telemetry and builds the dispatcher.
    pub(crate) fn start(cli: &Cli) -> Result<Self, AppError> {
        let config = cli.config();
        config.validate().map_err(SetupError::from)?;
        telemetry::initialise(&config)?;

        let executor = cli.executor();
        let backend = Arc::new(ShellBackend::new(executor.clone(), &cli.players));
        let scheduler = (!cli.no_scheduler).then(|| Arc::new(ThreadScheduler::default()));
        let registry = Arc::new(CapabilityRegistry::new());
        let owner = OwnerKey::new(HOST_OWNER);
        backend::register_capabilities(
            &registry,
            &owner,
            scheduler.as_ref(),
            &cli.grants,
            cli.executor_locale.as_deref(),
        );

        let mut dispatcher =
            Dispatcher::from_config(&config, backend.clone(), registry.create_proxy(owner))?;
        commands::install(&mut dispatcher, backend.roster())?;
        info!(
            target: SHELL_TARGET,
            executor = executor.name(),
            commands = dispatcher.commands().count(),
            "shell ready"
        );

        Ok(Self {
            executor,
            backend,
            scheduler,
            dispatcher,
        })
    }

    /// Dispatches each input line until end of input or an exit word, then
    /// waits for scheduled commands and prints what they sent.
    pub(crate) fn serve(
        &self,
        input: &mut impl BufRead,
        out: &mut impl Write,
    ) -> Result<Summary, AppError> {
        let mut summary = Summary::default();
        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line).map_err(AppError::ReadInput)? == 0 {
                break;
            }
            let command = line.trim();
            if command.is_empty() {
                continue;
            }
            if EXIT_WORDS.contains(&command) {
                break;
            }
            summary.dispatched += 1;
            if !self.dispatcher.dispatch(&self.executor, command) {
                summary.failed += 1;
            }
            self.backend.flush(out).map_err(AppError::WriteOutput)?;
        }

        if let Some(scheduler) = &self.scheduler {
            scheduler.join_all();
        }
        self.backend.flush(out).map_err(AppError::WriteOutput)?;
        info!(
            target: SHELL_TARGET,
            dispatched = summary.dispatched,
            failed = summary.failed,
            "session ended"
        );
        Ok(summary)
    }
}
