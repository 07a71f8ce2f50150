//! Checks a resolved command must pass before its handler runs.

use super::errors::ValidationError;
use crate::command::CommandSpec;
use crate::executor::{Backend, Executor};

/// Rejects executors of a kind the command does not accept.
pub(super) fn check_context(
    spec: &CommandSpec,
    executor: &Executor,
) -> Result<(), ValidationError> {
    let allowed = if executor.is_player() {
        spec.players_allowed()
    } else {
        spec.console_allowed()
    };
    if allowed {
        Ok(())
    } else {
        Err(ValidationError::ContextMismatch {
            command: spec.name().to_owned(),
        })
    }
}

/// Rejects non-operators for operator-only commands.
pub(super) fn check_operator(
    spec: &CommandSpec,
    executor: &Executor,
    backend: &dyn Backend,
) -> Result<(), ValidationError> {
    if spec.is_operator_only() && !backend.is_operator(executor) {
        return Err(ValidationError::OperatorOnly {
            command: spec.name().to_owned(),
        });
    }
    Ok(())
}

/// Rejects the first flag the command does not declare.
pub(super) fn check_flags(spec: &CommandSpec, flags: &str) -> Result<(), ValidationError> {
    match flags.chars().find(|flag| !spec.supported_flags().contains(*flag)) {
        Some(flag) => Err(ValidationError::InvalidFlag {
            flag,
            supported: spec.supported_flags().to_owned(),
        }),
        None => Ok(()),
    }
}

/// Checks `count` against the bounded sides of the command's range.
pub(super) fn check_arg_count(spec: &CommandSpec, count: usize) -> Result<(), ValidationError> {
    if let Some(min) = spec.min()
        && count < min
    {
        return Err(ValidationError::TooFewArguments {
            min,
            actual: count,
            usage: spec.usage_text().to_owned(),
        });
    }
    if let Some(max) = spec.max()
        && count > max
    {
        return Err(ValidationError::TooManyArguments {
            max,
            actual: count,
            usage: spec.usage_text().to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::test_support::RecordingBackend;

    fn spec() -> CommandSpec {
        CommandSpec::new("pick").handler(|_ctx| Ok(()))
    }

    #[rstest]
    #[case::below_min(Some(2), Some(4), 1, false)]
    #[case::at_min(Some(2), Some(4), 2, true)]
    #[case::inside(Some(2), Some(4), 3, true)]
    #[case::at_max(Some(2), Some(4), 4, true)]
    #[case::above_max(Some(2), Some(4), 5, false)]
    #[case::unbounded_empty(None, None, 0, true)]
    #[case::unbounded_many(None, None, 500, true)]
    #[case::only_min(Some(1), None, 99, true)]
    #[case::only_max(None, Some(1), 2, false)]
    fn argument_count_bounds(
        #[case] min: Option<usize>,
        #[case] max: Option<usize>,
        #[case] count: usize,
        #[case] passes: bool,
    ) {
        let mut bounded = spec();
        if let Some(value) = min {
            bounded = bounded.min_args(value);
        }
        if let Some(value) = max {
            bounded = bounded.max_args(value);
        }
        assert_eq!(check_arg_count(&bounded, count).is_ok(), passes);
    }

    #[rstest]
    #[case::player_blocked(Executor::player("alice"), false, true, false)]
    #[case::player_allowed(Executor::player("alice"), true, false, true)]
    #[case::console_blocked(Executor::console(), true, false, false)]
    #[case::console_allowed(Executor::console(), false, true, true)]
    fn executor_context(
        #[case] executor: Executor,
        #[case] players: bool,
        #[case] console: bool,
        #[case] passes: bool,
    ) {
        let restricted = spec().allow_players(players).allow_console(console);
        assert_eq!(check_context(&restricted, &executor).is_ok(), passes);
    }

    #[test]
    fn operator_check_asks_the_backend() {
        let backend = RecordingBackend::default();
        let guarded = spec().operator_only(true);
        let operator = Executor::player("op").with_operator(true);
        assert!(check_operator(&guarded, &operator, &backend).is_ok());
        assert_eq!(
            check_operator(&guarded, &Executor::player("pleb"), &backend),
            Err(ValidationError::OperatorOnly {
                command: "pick".into()
            })
        );
        assert!(check_operator(&spec(), &Executor::player("pleb"), &backend).is_ok());
    }

    #[rstest]
    #[case::none("", true)]
    #[case::declared("ab", true)]
    #[case::undeclared("az", false)]
    fn flags_must_be_declared(#[case] flags: &str, #[case] passes: bool) {
        let flagged = spec().flags("abc");
        assert_eq!(check_flags(&flagged, flags).is_ok(), passes);
    }

    #[test]
    fn first_undeclared_flag_is_reported() {
        let err = check_flags(&spec().flags("a"), "axy").expect_err("x undeclared");
        assert_eq!(
            err,
            ValidationError::InvalidFlag {
                flag: 'x',
                supported: "a".into()
            }
        );
    }
}
