//! Shared test doubles for the engine's collaborators.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mockall::mock;
use tracing::Level;

use crate::executor::{Backend, Executor};
use crate::session::Clock;

mock! {
    pub HostBackend {}
    impl Backend for HostBackend {
        fn send_message(&self, executor: &Executor, text: &str);
        fn is_operator(&self, executor: &Executor) -> bool;
        fn find_executor(&self, name: &str) -> Option<Executor>;
    }
}

/// Backend that records every delivered message and knows a fixed roster.
#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    roster: Vec<Executor>,
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingBackend {
    pub(crate) fn with_roster(roster: Vec<Executor>) -> Self {
        Self {
            roster,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Messages delivered so far as `(recipient, text)` pairs.
    pub(crate) fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().expect("lock messages").clone()
    }

    /// Texts delivered so far, regardless of recipient.
    pub(crate) fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, text)| text).collect()
    }
}

impl Backend for RecordingBackend {
    fn send_message(&self, executor: &Executor, text: &str) {
        self.messages
            .lock()
            .expect("lock messages")
            .push((executor.name().to_owned(), text.to_owned()));
    }

    fn find_executor(&self, name: &str) -> Option<Executor> {
        self.roster
            .iter()
            .find(|executor| executor.name() == name)
            .cloned()
    }
}

/// Clock whose time only moves when a test advances it.
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("lock clock");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("lock clock")
    }
}

/// Collects formatted log lines written while [`LogCapture::scope`] runs.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Runs `f` with a thread-local subscriber that writes warnings and
    /// errors into this capture.
    pub(crate) fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    /// Captured lines containing `needle`.
    pub(crate) fn matching(&self, needle: &str) -> Vec<String> {
        let bytes = self.buffer.lock().expect("lock log capture").clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_owned)
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("lock log capture")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
