//! Crate-level integration and BDD tests.

use std::sync::Arc;

use mockall::predicate::{always, eq};

use crate::capability::{CapabilityRegistry, HostCapabilities, OwnerKey};
use crate::command::CommandSpec;
use crate::convert::{ParamType, Value};
use crate::test_support::MockHostBackend;
use crate::{Dispatcher, Executor};


fn dispatcher_over(backend: MockHostBackend) -> Dispatcher {
    let registry = Arc::new(CapabilityRegistry::new());
    let capabilities: HostCapabilities = registry.create_proxy(OwnerKey::new("mock-host"));
    Dispatcher::new(Arc::new(backend), capabilities)
}

#[test]
fn end_to_end_reply_reaches_the_backend() {
    let mut backend = MockHostBackend::new();
    backend
        .expect_find_executor()
        .with(eq("bob"))
        .times(1)
        .returning(|name| Some(Executor::player(name)));
    backend
        .expect_send_message()
        .with(eq(Executor::player("alice")), eq("hello bob"))
        .times(1)
        .return_const(());

    let mut dispatcher = dispatcher_over(backend);
    dispatcher
        .register_command(
            CommandSpec::new("greet")
                .params([ParamType::Executor])
                .min_args(1)
                .handler(|ctx| {
                    let target = ctx
                        .arguments()
                        .value(0)
                        .and_then(Value::as_executor)
                        .map_or("nobody", Executor::name);
                    ctx.reply(&format!("hello {target}"));
                    Ok(())
                }),
        )
        .expect("register greet");

    assert!(dispatcher.dispatch(&Executor::player("alice"), "greet bob"));
}

#[test]
fn end_to_end_operator_check_uses_backend_override() {
    let mut backend = MockHostBackend::new();
    backend
        .expect_is_operator()
        .with(always())
        .times(1)
        .returning(|executor| executor.name() == "root");
    backend.expect_send_message().never();

    let mut dispatcher = dispatcher_over(backend);
    dispatcher
        .register_command(
            CommandSpec::new("shutdown")
                .operator_only(true)
                .handler(|_ctx| Ok(())),
        )
        .expect("register shutdown");

    assert!(dispatcher.dispatch(&Executor::player("root"), "shutdown"));
}
