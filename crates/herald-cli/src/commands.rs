//! Commands offered by the shell.

use std::sync::Arc;

use herald::Dispatcher;
use herald::Executor;
use herald::command::{CommandContext, CommandError, CommandSpec, RegistrationError};
use herald::convert::{ParamType, Value};
use herald::session::{FnAction, Session, SessionState};
use thiserror::Error;

/// Failures reported by shell commands.
///
/// A registered exception handler turns each one into a reply, so these
/// never reach the generic error message.
#[derive(Debug, Error)]
pub(crate) enum ShellError {
    #[error("Cannot divide by zero.")]
    DivisionByZero,
    #[error("The result does not fit in a 64-bit integer.")]
    Overflow,
    #[error("Argument {position} must be a whole number.")]
    NotANumber { position: usize },
    #[error("That player is not online.")]
    UnknownPlayer,
}

/// Notes kept per executor by the `note` commands.
#[derive(Debug, Default)]
struct Notes(Vec<String>);

impl SessionState for Notes {
    const TYPE_TAG: &'static str = "notes";
}

/// Registers every shell command with `dispatcher`.
///
/// `roster` lists the players `broadcast` reaches besides the sender.
pub(crate) fn install(
    dispatcher: &mut Dispatcher,
    roster: &[Executor],
) -> Result<(), RegistrationError> {
    dispatcher.register_exception_handler(|error: &ShellError, ctx: &CommandContext| {
        ctx.reply(&error.to_string());
    });

    let notes = dispatcher.create_child_tree();
    for spec in note_commands() {
        dispatcher.register_in(notes, spec)?;
    }
    dispatcher.set_default_command(notes, "list")?;

    let mut specs = vec![
        echo(),
        add(),
        div(),
        greet(),
        whoami(),
        broadcast(roster.to_vec()),
        fly(),
        later(),
        CommandSpec::new("note")
            .usage("note [add|list|undo|redo|clear]")
            .description("Keeps an undoable list of notes.")
            .children(notes),
    ];
    specs.push(help(&specs));
    for spec in specs {
        dispatcher.register_command(spec)?;
    }
    Ok(())
}

fn joined(ctx: &CommandContext) -> String {
    ctx.arguments()
        .raw()
        .map(|args| args.join(" "))
        .unwrap_or_default()
}

fn integer(ctx: &CommandContext, index: usize) -> Result<i64, ShellError> {
    ctx.arguments()
        .value(index)
        .and_then(Value::as_integer)
        .ok_or(ShellError::NotANumber {
            position: index + 1,
        })
}

fn echo() -> CommandSpec {
    CommandSpec::new("echo")
        .alias("say")
        .usage("echo [-u] <text...>")
        .description("Repeats the text; -u shouts it.")
        .flags("u")
        .handler(|ctx| {
            let text = joined(ctx);
            if ctx.has_flag('u') {
                ctx.reply(&text.to_uppercase());
            } else {
                ctx.reply(&text);
            }
            Ok(())
        })
}

fn add() -> CommandSpec {
    CommandSpec::new("add")
        .usage("add <a> <b>")
        .description("Adds two whole numbers.")
        .params([ParamType::Integer, ParamType::Integer])
        .min_args(2)
        .max_args(2)
        .handler(|ctx| {
            let (a, b) = (integer(ctx, 0)?, integer(ctx, 1)?);
            let sum = a.checked_add(b).ok_or(ShellError::Overflow)?;
            ctx.reply(&format!("{a} + {b} = {sum}"));
            Ok(())
        })
}

fn div() -> CommandSpec {
    CommandSpec::new("div")
        .usage("div <a> <b>")
        .description("Divides two whole numbers.")
        .params([ParamType::Integer, ParamType::Integer])
        .min_args(2)
        .max_args(2)
        .handler(|ctx| {
            let (a, b) = (integer(ctx, 0)?, integer(ctx, 1)?);
            if b == 0 {
                return Err(ShellError::DivisionByZero.into());
            }
            let quotient = a.checked_div(b).ok_or(ShellError::Overflow)?;
            let remainder = a.checked_rem(b).ok_or(ShellError::Overflow)?;
            ctx.reply(&format!("{a} / {b} = {quotient} remainder {remainder}"));
            Ok(())
        })
}

fn greet() -> CommandSpec {
    CommandSpec::new("greet")
        .usage("greet <player>")
        .description("Says hello to a player.")
        .params([ParamType::Executor])
        .min_args(1)
        .max_args(1)
        .handler(|ctx| {
            let target = ctx
                .arguments()
                .value(0)
                .and_then(Value::as_executor)
                .ok_or(ShellError::UnknownPlayer)?;
            ctx.backend().send_message(
                target,
                &format!("{} says hello!", ctx.executor().name()),
            );
            ctx.reply(&format!("You greeted {}.", target.name()));
            Ok(())
        })
}

fn whoami() -> CommandSpec {
    CommandSpec::new("whoami")
        .description("Shows who you are running as.")
        .max_args(0)
        .handler(|ctx| {
            let executor = ctx.executor();
            let kind = if executor.is_player() { "player" } else { "console" };
            let role = if ctx.backend().is_operator(executor) {
                ", operator"
            } else {
                ""
            };
            ctx.reply(&format!("{} ({kind}{role})", executor.name()));
            Ok(())
        })
}

fn broadcast(roster: Vec<Executor>) -> CommandSpec {
    CommandSpec::new("broadcast")
        .usage("broadcast <text...>")
        .description("Sends a message to every player.")
        .operator_only(true)
        .min_args(1)
        .handler(move |ctx| {
            let text = format!("[broadcast] {}", joined(ctx));
            let sender = ctx.executor().name();
            for player in roster.iter().filter(|player| player.name() != sender) {
                ctx.backend().send_message(player, &text);
            }
            ctx.reply(&text);
            Ok(())
        })
}

fn fly() -> CommandSpec {
    CommandSpec::new("fly")
        .description("Takes off. Needs herald.fly.")
        .permission("herald.fly")
        .allow_console(false)
        .max_args(0)
        .handler(|ctx| {
            ctx.reply("You take off.");
            Ok(())
        })
}

fn later() -> CommandSpec {
    CommandSpec::new("later")
        .usage("later <text...>")
        .description("Repeats the text from a background task.")
        .asynchronous(true)
        .min_args(1)
        .handler(|ctx| {
            ctx.reply(&format!("later: {}", joined(ctx)));
            Ok(())
        })
}

fn help(specs: &[CommandSpec]) -> CommandSpec {
    let mut listing: Vec<String> = specs
        .iter()
        .map(|spec| format!("{} - {}", spec.usage_text(), spec.description_text()))
        .collect();
    listing.push("help - Lists commands.".to_owned());
    CommandSpec::new("help")
        .alias("?")
        .description("Lists commands.")
        .max_args(0)
        .handler(move |ctx| {
            for line in &listing {
                ctx.reply(line);
            }
            Ok(())
        })
}

fn note_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("add")
            .usage("note add <text...>")
            .min_args(1)
            .handler(|ctx| {
                let text = joined(ctx);
                let (kept, restored) = (live_notes(ctx), live_notes(ctx));
                ctx.history().execute(FnAction::new(
                    move || {
                        kept().with_state(|Notes(items)| items.pop());
                    },
                    move || restored().with_state(|Notes(items)| items.push(text.clone())),
                ));
                ctx.reply("Noted.");
                Ok(())
            }),
        CommandSpec::new("list").max_args(0).handler(|ctx| {
            let notes: Arc<Session<Notes>> = ctx.session();
            let items = notes.with_state(|Notes(items)| items.clone());
            if items.is_empty() {
                ctx.reply("No notes.");
            }
            for (number, item) in items.iter().enumerate() {
                ctx.reply(&format!("{}. {item}", number + 1));
            }
            Ok(())
        }),
        CommandSpec::new("clear").max_args(0).handler(|ctx| {
            let notes: Arc<Session<Notes>> = ctx.session();
            let snapshot = notes.with_state(|Notes(items)| items.clone());
            let (kept, cleared) = (live_notes(ctx), live_notes(ctx));
            ctx.history().execute(FnAction::new(
                move || kept().with_state(|Notes(items)| items.clone_from(&snapshot)),
                move || cleared().with_state(|Notes(items)| items.clear()),
            ));
            ctx.reply("Notes cleared.");
            Ok(())
        }),
        CommandSpec::new("undo").max_args(0).handler(|ctx| {
            step(ctx, ctx.history().undo(), "Undone.", "Nothing to undo.")
        }),
        CommandSpec::new("redo").max_args(0).handler(|ctx| {
            step(ctx, ctx.history().redo(), "Redone.", "Nothing to redo.")
        }),
    ]
}

/// Looks the executor's notes up again on every call.
///
/// Notes and history expire independently, so an undo or redo must reach
/// whichever notes session is live when it runs.
fn live_notes(ctx: &CommandContext) -> impl Fn() -> Arc<Session<Notes>> + Send + Sync + 'static {
    let store = Arc::clone(ctx.sessions());
    let owner = ctx.executor().clone();
    move || store.get_session::<Notes>(&owner)
}

fn step(
    ctx: &CommandContext,
    moved: bool,
    done: &str,
    nothing: &str,
) -> Result<(), CommandError> {
    ctx.reply(if moved { done } else { nothing });
    Ok(())
}

#[cfg(test)]
mod tests {
    use herald::capability::{CapabilityRegistry, HostCapabilities, OwnerKey};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::backend::ShellBackend;

    struct Fixture {
        backend: Arc<ShellBackend>,
        dispatcher: Dispatcher,
    }

    impl Fixture {
        fn run(&self, line: &str) -> bool {
            self.dispatcher.dispatch(&Executor::player("alice"), line)
        }

        fn output(&self) -> String {
            let mut out = Vec::new();
            self.backend.flush(&mut out).expect("flush");
            String::from_utf8(out).expect("utf8")
        }
    }

    #[fixture]
    fn shell() -> Fixture {
        let me = Executor::player("alice");
        let backend = Arc::new(ShellBackend::new(me, &["bob".to_owned()]));
        let registry = Arc::new(CapabilityRegistry::new());
        let capabilities: HostCapabilities = registry.create_proxy(OwnerKey::new("shell"));
        let mut dispatcher = Dispatcher::new(backend.clone(), capabilities);
        install(&mut dispatcher, backend.roster()).expect("install commands");
        Fixture {
            backend,
            dispatcher,
        }
    }

    #[rstest]
    #[case::echo("echo hello  world", "hello world\n")]
    #[case::shout("say -u \"hi there\"", "HI THERE\n")]
    #[case::add("add 2 40", "2 + 40 = 42\n")]
    #[case::div("div 7 2", "7 / 2 = 3 remainder 1\n")]
    #[case::div_zero("div 1 0", "Cannot divide by zero.\n")]
    #[case::not_a_number("add 1 x", "Argument 2 must be a whole number.\n")]
    #[case::overflow("add 9223372036854775807 1", "The result does not fit in a 64-bit integer.\n")]
    #[case::whoami("whoami", "alice (player)\n")]
    #[case::greet("greet bob", "[to bob] alice says hello!\nYou greeted bob.\n")]
    #[case::unknown_player("greet carol", "That player is not online.\n")]
    fn commands_reply(shell: Fixture, #[case] line: &str, #[case] expected: &str) {
        shell.run(line);
        assert_eq!(shell.output(), expected);
    }

    #[rstest]
    fn shell_errors_are_handled_not_generic(shell: Fixture) {
        assert!(!shell.run("div 1 0"));
        assert!(!shell.output().contains("internal error"));
    }

    #[rstest]
    fn notes_support_undo_and_redo(shell: Fixture) {
        for line in ["note add milk", "note add eggs", "note undo", "note"] {
            assert!(shell.run(line), "{line}");
        }
        assert_eq!(shell.output(), "Noted.\nNoted.\nUndone.\n1. milk\n");

        for line in ["note clear", "note list", "note undo", "note redo", "note redo", "note"] {
            assert!(shell.run(line), "{line}");
        }
        assert_eq!(
            shell.output(),
            "Notes cleared.\nNo notes.\nUndone.\nRedone.\nNothing to redo.\nNo notes.\n"
        );
    }

    #[rstest]
    fn undo_and_redo_reach_notes_that_outlived_their_session(shell: Fixture) {
        let alice = Executor::player("alice");
        assert!(shell.run("note add milk"));
        shell
            .dispatcher
            .sessions()
            .get_session::<Notes>(&alice)
            .expire();

        for line in ["note", "note undo", "note redo", "note"] {
            assert!(shell.run(line), "{line}");
        }
        assert_eq!(
            shell.output(),
            "Noted.\nNo notes.\nUndone.\nRedone.\n1. milk\n"
        );
    }

    #[rstest]
    fn broadcast_needs_an_operator(shell: Fixture) {
        assert!(!shell.run("broadcast hi"));
        assert_eq!(
            shell.output(),
            "You do not have permission to do that (operator).\n"
        );
        assert!(
            shell
                .dispatcher
                .dispatch(&Executor::player("alice").with_operator(true), "broadcast hi all")
        );
        assert_eq!(
            shell.output(),
            "[to bob] [broadcast] hi all\n[broadcast] hi all\n"
        );
    }

    #[rstest]
    fn help_lists_every_command(shell: Fixture) {
        assert!(shell.run("?"));
        let output = shell.output();
        for name in [
            "echo", "add", "div", "greet", "whoami", "broadcast", "fly", "later", "note", "help",
        ] {
            assert!(output.contains(name), "{name} missing from {output}");
        }
    }
}
