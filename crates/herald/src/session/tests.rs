//! Unit tests for session expiry, slot ownership and history.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::test_support::ManualClock;

#[derive(Debug, Default)]
struct Draft(Vec<String>);

impl SessionState for Draft {
    const TYPE_TAG: &'static str = "draft";
}

#[derive(Debug, Default)]
struct ShortLived;

impl SessionState for ShortLived {
    const TYPE_TAG: &'static str = "short-lived";

    fn expire_ttl() -> Option<Duration> {
        Some(Duration::from_secs(5))
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    store: SessionStore,
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new());
    let store = SessionStore::with_clock(clock.clone(), Duration::from_secs(60));
    Harness { clock, store }
}

fn alice() -> Executor {
    Executor::player("alice")
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

#[rstest]
fn zero_ttl_never_expires() {
    let clock = Arc::new(ManualClock::new());
    let session = Session::<Draft>::new(clock.clone(), Duration::ZERO);
    clock.advance(Duration::from_secs(86_400));
    assert!(!session.is_expired());
}

#[rstest]
fn expires_strictly_after_ttl_of_inactivity() {
    let clock = Arc::new(ManualClock::new());
    let session = Session::<Draft>::new(clock.clone(), Duration::from_secs(10));

    clock.advance(Duration::from_secs(10));
    assert!(!session.is_expired());

    clock.advance(Duration::from_millis(1));
    assert!(session.is_expired());
}

#[rstest]
fn expiry_is_sticky_once_observed() {
    let clock = Arc::new(ManualClock::new());
    let session = Session::<Draft>::new(clock.clone(), Duration::from_secs(1));
    clock.advance(Duration::from_secs(2));
    assert!(session.is_expired());

    assert_eq!(
        session.set_expire_ttl(Duration::ZERO),
        Err(SessionError::Expired { tag: "draft" })
    );
    assert!(session.is_expired());
}

#[rstest]
fn refreshing_access_postpones_expiry() {
    let clock = Arc::new(ManualClock::new());
    let session = Session::<Draft>::new(clock.clone(), Duration::from_secs(10));
    clock.advance(Duration::from_secs(8));
    session.update_access_time().expect("still live");
    clock.advance(Duration::from_secs(8));
    assert!(!session.is_expired());
}

#[rstest]
fn explicitly_expired_session_rejects_mutation() {
    let session = Session::<Draft>::new(Arc::new(ManualClock::new()), Duration::ZERO);
    session.expire();
    assert!(session.is_expired());
    assert_eq!(
        session.update_access_time(),
        Err(SessionError::Expired { tag: "draft" })
    );
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[rstest]
fn lookup_returns_the_same_live_session(harness: Harness) {
    let first = harness.store.get_session::<Draft>(&alice());
    first.with_state(|draft| draft.0.push("line".into()));
    let second = harness.store.get_session::<Draft>(&alice());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.lock().0, ["line"]);
}

#[rstest]
fn expired_session_is_replaced_on_lookup(harness: Harness) {
    let first = harness.store.get_session::<Draft>(&alice());
    first.with_state(|draft| draft.0.push("stale".into()));
    harness.clock.advance(Duration::from_secs(61));

    let second = harness.store.get_session::<Draft>(&alice());
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(first.is_expired());
    assert!(second.lock().0.is_empty());
}

#[rstest]
fn lookup_refreshes_access_time(harness: Harness) {
    let session = harness.store.get_session::<Draft>(&alice());
    harness.clock.advance(Duration::from_secs(40));
    let refreshed = harness.store.get_session::<Draft>(&alice());
    harness.clock.advance(Duration::from_secs(40));
    assert!(Arc::ptr_eq(&session, &refreshed));
    assert!(!session.is_expired());
}

#[rstest]
fn state_kind_may_declare_its_own_ttl(harness: Harness) {
    let short = harness.store.get_session::<ShortLived>(&alice());
    let draft = harness.store.get_session::<Draft>(&alice());
    assert_eq!(short.expire_ttl(), Duration::from_secs(5));
    assert_eq!(draft.expire_ttl(), Duration::from_secs(60));
}

#[rstest]
fn players_are_isolated_and_consoles_share_a_slot(harness: Harness) {
    harness
        .store
        .get_session::<Draft>(&alice())
        .with_state(|draft| draft.0.push("alice".into()));
    assert!(
        harness
            .store
            .get_session::<Draft>(&Executor::player("bob"))
            .lock()
            .0
            .is_empty()
    );

    let console = harness.store.get_session::<Draft>(&Executor::console());
    let other_console = Executor::console().with_operator(false);
    assert!(Arc::ptr_eq(
        &console,
        &harness.store.get_session::<Draft>(&other_console)
    ));
}

#[rstest]
fn forget_drops_every_kind_for_an_owner(harness: Harness) {
    let draft = harness.store.get_session::<Draft>(&alice());
    let _short = harness.store.get_session::<ShortLived>(&alice());

    assert!(harness.store.forget(&alice()));
    assert!(!harness.store.forget(&alice()));
    assert!(!Arc::ptr_eq(
        &draft,
        &harness.store.get_session::<Draft>(&alice())
    ));
}

#[rstest]
fn purge_evicts_only_expired_sessions(harness: Harness) {
    let _alice_short = harness.store.get_session::<ShortLived>(&alice());
    let _alice_draft = harness.store.get_session::<Draft>(&alice());
    let _console_short = harness.store.get_session::<ShortLived>(&Executor::console());
    harness.clock.advance(Duration::from_secs(6));

    assert_eq!(harness.store.purge_expired(), 2);
    assert_eq!(harness.store.purge_expired(), 0);
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, label: &'static str) -> impl Action + 'static {
    let on_undo = Arc::clone(journal);
    let on_redo = Arc::clone(journal);
    FnAction::new(
        move || on_undo.lock().expect("journal").push(format!("undo {label}")),
        move || on_redo.lock().expect("journal").push(format!("do {label}")),
    )
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().expect("journal").clone()
}

#[rstest]
fn undo_at_root_reports_false(harness: Harness) {
    let log = harness.store.get_session::<History>(&alice());
    assert!(!log.can_undo());
    assert!(!log.undo());
    assert!(!log.redo());
}

#[rstest]
fn undo_and_redo_walk_the_chain(harness: Harness) {
    let journal = Journal::default();
    let log = harness.store.get_session::<History>(&alice());

    log.execute(record(&journal, "a"));
    log.execute(record(&journal, "b"));
    assert!(log.undo());
    assert!(log.undo());
    assert!(!log.undo());
    assert!(log.redo());

    assert_eq!(
        entries(&journal),
        ["do a", "do b", "undo b", "undo a", "do a"]
    );
    assert!(log.can_undo());
    assert!(log.can_redo());
}

#[rstest]
fn executing_after_undo_discards_redo_chain(harness: Harness) {
    let journal = Journal::default();
    let log = harness.store.get_session::<History>(&alice());

    log.execute(record(&journal, "a"));
    log.execute(record(&journal, "b"));
    assert!(log.undo());
    log.execute(record(&journal, "c"));

    assert!(!log.redo());
    assert_eq!(log.len(), 2);
    assert!(log.undo());
    assert_eq!(entries(&journal).last().map(String::as_str), Some("undo c"));
}

struct FirstRunDiffers(Journal);

impl Action for FirstRunDiffers {
    fn undo(&self) {
        self.0.lock().expect("journal").push("undo".into());
    }

    fn redo(&self) {
        self.0.lock().expect("journal").push("redo".into());
    }

    fn first_run(&self) {
        self.0.lock().expect("journal").push("first".into());
    }
}

#[rstest]
fn first_run_effect_is_used_only_on_execute(harness: Harness) {
    let journal = Journal::default();
    let log = harness.store.get_session::<History>(&alice());
    log.execute(FirstRunDiffers(Arc::clone(&journal)));
    assert!(log.undo());
    assert!(log.redo());
    assert_eq!(entries(&journal), ["first", "undo", "redo"]);
}

#[rstest]
fn effects_may_reenter_the_history(harness: Harness) {
    let log = harness.store.get_session::<History>(&alice());
    let observed = Arc::clone(&log);
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    log.execute(FnAction::new(|| {}, move || {
        *sink.lock().expect("sink") = Some(observed.len());
    }));
    assert_eq!(*seen.lock().expect("sink"), Some(1));
}

#[rstest]
fn clear_resets_to_root_without_effects(harness: Harness) {
    let journal = Journal::default();
    let log = harness.store.get_session::<History>(&alice());
    log.execute(record(&journal, "a"));
    log.clear();
    assert!(log.is_empty());
    assert!(!log.undo());
    assert_eq!(entries(&journal), ["do a"]);
}
