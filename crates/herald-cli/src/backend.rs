//! Host collaborators for the shell: message delivery, a worker-thread
//! scheduler and a grant-list permission check.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use herald::capability::{CapabilityRegistry, OwnerKey, Task, known};
use herald::{Backend, Executor};
use tracing::{debug, warn};

const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");

/// One message waiting to be printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Outgoing {
    pub(crate) recipient: String,
    pub(crate) text: String,
}

/// Backend that queues messages until the shell prints them.
///
/// Handlers may run on scheduler threads, so delivery only appends to a
/// shared outbox; [`ShellBackend::flush`] writes it out on the shell thread.
#[derive(Debug)]
pub(crate) struct ShellBackend {
    me: Executor,
    roster: Vec<Executor>,
    outbox: Mutex<Vec<Outgoing>>,
}

impl ShellBackend {
    /// Creates a backend for `me`, who can see the players in `others`.
    pub(crate) fn new(me: Executor, others: &[String]) -> Self {
        let mut roster: Vec<Executor> = others
            .iter()
            .filter(|name| name.as_str() != me.name())
            .map(|name| Executor::player(name.as_str()))
            .collect();
        if me.is_player() {
            roster.insert(0, me.clone());
        }
        Self {
            me,
            roster,
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Players known to the host, including the shell user when a player.
    pub(crate) fn roster(&self) -> &[Executor] {
        &self.roster
    }

    /// Writes and clears queued messages. Messages for anyone but the shell
    /// user are prefixed with their recipient.
    pub(crate) fn flush(&self, out: &mut impl Write) -> io::Result<()> {
        let pending = std::mem::take(
            &mut *self
                .outbox
                .lock()
                .unwrap_or_else(|poison| poison.into_inner()),
        );
        for message in pending {
            if message.recipient == self.me.name() {
                writeln!(out, "{}", message.text)?;
            } else {
                writeln!(out, "[to {}] {}", message.recipient, message.text)?;
            }
        }
        out.flush()
    }
}

impl Backend for ShellBackend {
    fn send_message(&self, executor: &Executor, text: &str) {
        self.outbox
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(Outgoing {
                recipient: executor.name().to_owned(),
                text: text.to_owned(),
            });
    }

    fn find_executor(&self, name: &str) -> Option<Executor> {
        self.roster
            .iter()
            .find(|executor| executor.name().eq_ignore_ascii_case(name))
            .cloned()
    }
}

/// Runs scheduled tasks on their own threads and joins them on demand.
#[derive(Debug, Default)]
pub(crate) struct ThreadScheduler {
    spawned: Mutex<Spawned>,
}

#[derive(Debug, Default)]
struct Spawned {
    running: Vec<JoinHandle<()>>,
    finished: usize,
}

impl Spawned {
    /// Joins the threads that have already exited.
    fn reap(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.running)
            .into_iter()
            .partition(JoinHandle::is_finished);
        self.running = running;
        self.finished += done.into_iter().map(joined).filter(|&ok| ok).count();
    }
}

fn joined(handle: JoinHandle<()>) -> bool {
    let ok = handle.join().is_ok();
    if !ok {
        warn!(target: HOST_TARGET, "scheduled command panicked");
    }
    ok
}

impl ThreadScheduler {
    pub(crate) fn spawn(&self, task: Task) {
        let handle = thread::spawn(task);
        let mut spawned = self.spawned();
        spawned.reap();
        spawned.running.push(handle);
    }

    /// Waits for every task spawned so far. Returns how many finished.
    pub(crate) fn join_all(&self) -> usize {
        let (running, reaped) = {
            let mut spawned = self.spawned();
            (
                std::mem::take(&mut spawned.running),
                std::mem::take(&mut spawned.finished),
            )
        };
        reaped + running.into_iter().map(joined).filter(|&ok| ok).count()
    }

    fn spawned(&self) -> MutexGuard<'_, Spawned> {
        self.spawned
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Returns `true` when `grant` covers `node`. A grant ending in `.*` covers
/// every node below its prefix; `*` covers everything.
pub(crate) fn grant_covers(grant: &str, node: &str) -> bool {
    if grant == "*" || grant == node {
        return true;
    }
    grant
        .strip_suffix(".*")
        .and_then(|prefix| node.strip_prefix(prefix))
        .is_some_and(|rest| rest.starts_with('.'))
}

/// Registers the shell's optional features with `registry`.
pub(crate) fn register_capabilities(
    registry: &CapabilityRegistry,
    owner: &OwnerKey,
    scheduler: Option<&Arc<ThreadScheduler>>,
    grants: &[String],
    locale: Option<&str>,
) {
    if let Some(shared) = scheduler {
        let workers = Arc::clone(shared);
        registry.register(owner, known::SCHEDULE_ASYNC, move |task: Task| {
            workers.spawn(task);
        });
    }

    if !grants.is_empty() {
        let granted = grants.to_vec();
        registry.register(owner, known::PERMISSIONS, |()| ());
        registry.register(
            owner,
            known::HAS_PERMISSION,
            move |(_, node): (Executor, String)| {
                granted.iter().any(|grant| grant_covers(grant, &node))
            },
        );
    }

    if let Some(tag) = locale {
        let reported = tag.to_owned();
        registry.register(owner, known::LOCALE, move |_: Executor| Some(reported.clone()));
    }

    debug!(
        target: HOST_TARGET,
        owner = owner.as_str(),
        scheduler = scheduler.is_some(),
        grants = grants.len(),
        locale,
        "host capabilities registered"
    );
}
