//! Unit tests for capability registration and late-binding proxies.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::{fixture, rstest};

use super::*;
use crate::executor::Executor;

const IS_READY: Capability<(), bool> = Capability::new("is-ready");
const SHOUT: Capability<String, String> = Capability::new("shout");

#[fixture]
fn registry() -> Arc<CapabilityRegistry> {
    Arc::new(CapabilityRegistry::new())
}

fn host() -> OwnerKey {
    OwnerKey::new("host")
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

#[rstest]
fn unregistered_capability_is_unavailable(registry: Arc<CapabilityRegistry>) {
    let proxy = registry.proxy(host());
    assert_eq!(proxy.call(IS_READY, ()), Availability::Unavailable);
    assert!(!proxy.is_available(IS_READY));
}

#[rstest]
fn unavailable_differs_from_a_false_answer(registry: Arc<CapabilityRegistry>) {
    registry.register(&host(), IS_READY, |()| false);
    let proxy = registry.proxy(host());
    let answer = proxy.call(IS_READY, ());
    assert_eq!(answer, Availability::Available(false));
    assert_ne!(answer, Availability::Unavailable);
}

#[test]
fn availability_helpers() {
    assert_eq!(Availability::Available(3).available(), Some(3));
    assert_eq!(Availability::<i32>::Unavailable.available(), None);
    assert_eq!(Availability::<i32>::Unavailable.unwrap_or(7), 7);
    assert!(Availability::Available(()).is_available());
}

// ---------------------------------------------------------------------------
// Late binding
// ---------------------------------------------------------------------------

#[rstest]
fn proxy_sees_capabilities_registered_after_creation(registry: Arc<CapabilityRegistry>) {
    let proxy = registry.proxy(host());
    assert!(!proxy.is_available(SHOUT));

    registry.register(&host(), SHOUT, |text: String| text.to_uppercase());

    assert_eq!(
        proxy.call(SHOUT, "hi".into()),
        Availability::Available("HI".to_owned())
    );
}

#[rstest]
fn re_registration_replaces_previous_implementation(registry: Arc<CapabilityRegistry>) {
    assert!(!registry.register(&host(), SHOUT, |text: String| text));
    assert!(registry.register(&host(), SHOUT, |text: String| format!("{text}!")));
    let proxy = registry.proxy(host());
    assert_eq!(proxy.call(SHOUT, "hey".into()).available().as_deref(), Some("hey!"));
}

#[rstest]
fn withdrawn_capability_becomes_unavailable(registry: Arc<CapabilityRegistry>) {
    registry.register(&host(), IS_READY, |()| true);
    let proxy = registry.proxy(host());
    assert!(proxy.is_available(IS_READY));

    assert!(registry.unregister(&host(), IS_READY));
    assert!(!registry.unregister(&host(), IS_READY));
    assert_eq!(proxy.call(IS_READY, ()), Availability::Unavailable);
}

#[rstest]
fn unregister_owner_drops_everything_it_supplied(registry: Arc<CapabilityRegistry>) {
    registry.register(&host(), IS_READY, |()| true);
    registry.register(&host(), SHOUT, |text: String| text);
    assert_eq!(registry.unregister_owner(&host()), 2);
    assert_eq!(registry.unregister_owner(&host()), 0);
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[rstest]
fn owners_are_isolated(registry: Arc<CapabilityRegistry>) {
    registry.register(&OwnerKey::new("other"), IS_READY, |()| true);
    let proxy = registry.proxy(host());
    assert_eq!(proxy.call(IS_READY, ()), Availability::Unavailable);
}

#[rstest]
fn same_name_with_a_different_shape_is_a_different_capability(registry: Arc<CapabilityRegistry>) {
    const IS_READY_FOR: Capability<String, bool> = Capability::new("is-ready");
    registry.register(&host(), IS_READY, |()| true);
    let proxy = registry.proxy(host());
    assert_eq!(proxy.call(IS_READY_FOR, "x".into()), Availability::Unavailable);
}

#[rstest]
fn try_call_hands_arguments_back_when_unavailable(registry: Arc<CapabilityRegistry>) {
    let proxy = registry.proxy(host());
    assert_eq!(proxy.try_call(SHOUT, "keep".into()), Err("keep".to_owned()));
}

// ---------------------------------------------------------------------------
// HostCapabilities
// ---------------------------------------------------------------------------

#[rstest]
fn host_interface_detects_permission_support(registry: Arc<CapabilityRegistry>) {
    let caps: HostCapabilities = registry.create_proxy(host());
    assert!(!caps.permissions_supported());
    assert_eq!(
        caps.has_permission(&Executor::player("alice"), "node"),
        Availability::Unavailable
    );

    registry.register(&host(), known::PERMISSIONS, |()| ());
    registry.register(&host(), known::HAS_PERMISSION, |(executor, node): (Executor, String)| {
        executor.name() == "alice" && node == "node"
    });

    assert!(caps.permissions_supported());
    assert_eq!(
        caps.has_permission(&Executor::player("alice"), "node"),
        Availability::Available(true)
    );
    assert_eq!(
        caps.has_permission(&Executor::player("bob"), "node"),
        Availability::Available(false)
    );
}

#[rstest]
fn host_interface_runs_tasks_through_the_scheduler(registry: Arc<CapabilityRegistry>) {
    let caps: HostCapabilities = registry.create_proxy(host());
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&ran);
    let rejected = caps
        .schedule_async(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .expect_err("no scheduler yet");
    rejected();
    assert_eq!(ran.load(Ordering::SeqCst), 1);

    registry.register(&host(), known::SCHEDULE_ASYNC, |task: Task| task());
    let counter = Arc::clone(&ran);
    caps.schedule_async(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
    .map_err(|_| "scheduler registered")
    .expect("scheduled");
    assert_eq!(ran.load(Ordering::SeqCst), 2);
}

#[rstest]
fn host_interface_reports_locale(registry: Arc<CapabilityRegistry>) {
    let caps: HostCapabilities = registry.create_proxy(host());
    assert_eq!(caps.locale(&Executor::console()), None);
    registry.register(&host(), known::LOCALE, |executor: Executor| {
        executor.is_player().then(|| "fr-FR".to_owned())
    });
    assert_eq!(caps.locale(&Executor::player("alice")).as_deref(), Some("fr-FR"));
    assert_eq!(caps.locale(&Executor::console()), None);
}
